mod file;

use std::fs;
use std::io::{Result, Write};
use std::path::Path;

pub use file::TmpFile;

/// Replace the contents of `path` with `data` so that a reader never
/// observes a partially written file.
///
/// The data goes to a temporary file in the same directory, is synced to
/// the device and then renamed over `path`. Returns only once the new
/// contents are durable.
pub fn replace_with(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory)?;

    let tmp = TmpFile::create_in(directory)?;
    (&tmp).write_all(data)?;
    (&tmp).flush()?;
    tmp.persist(path)?;

    sync_directory(directory)
}

/// The rename itself is only durable once the directory entry is synced.
#[cfg(unix)]
fn sync_directory(directory: &Path) -> Result<()> {
    fs::File::open(directory)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| {
            log::warn!(
                "could not sync directory {}: {}",
                directory.display(),
                e
            );
            e
        })
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn replace_creates_missing_parents() {
        let dir = TempDir::new("replace_parents").unwrap();
        let path = dir.path().join("nested").join("offset");

        replace_with(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn replace_overwrites_and_leaves_no_scratch_files() {
        let dir = TempDir::new("replace_overwrite").unwrap();
        let path = dir.path().join("offset");

        for i in 0..5 {
            replace_with(&path, format!("value {i}").as_bytes()).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "value 4");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn directory_sync_failure_is_reported() {
        let dir = TempDir::new("replace_sync").unwrap();

        sync_directory(dir.path()).unwrap();
        let err = sync_directory(&dir.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
