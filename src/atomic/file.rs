use std::fs::{self, File};
use std::io::Result;
use std::path::{Path, PathBuf};

const TMP_NAME_LENGTH: usize = 10;
const TMP_SUFFIX: &str = ".tmp";

/// Scratch file living next to its final destination.
///
/// The file is removed on drop unless it has been moved into place with
/// [`TmpFile::persist`].
pub struct TmpFile {
    file: File,
    path: PathBuf,
    persisted: bool,
}

impl TmpFile {
    pub fn create_in(temp_dir: impl AsRef<Path>) -> Result<Self> {
        let name: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(TMP_NAME_LENGTH)
            .collect();
        let path = temp_dir
            .as_ref()
            .join(format!(".{name}{TMP_SUFFIX}"));
        let file = File::create(&path)?;
        Ok(Self {
            file,
            path,
            persisted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the contents to the device and rename the file over `dest`.
    ///
    /// `dest` must be on the same filesystem, otherwise the rename is not
    /// atomic and may fail.
    pub fn persist(mut self, dest: impl AsRef<Path>) -> Result<()> {
        self.file.sync_all()?;
        fs::rename(&self.path, dest.as_ref())?;
        self.persisted = true;
        Ok(())
    }
}

impl std::io::Write for &TmpFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (&self.file).flush()
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}
