use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use crate::{LinesError, Result};

/// Open a local file for reading from its first byte.
///
/// Reopening the same path after a restart must yield the same bytes the
/// stored offset was computed against; appending is fine, truncating or
/// rewriting is not.
pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(LinesError::EmptyPath);
    }

    match File::open(path) {
        Ok(file) => {
            log::debug!("opened {}", path.display());
            Ok(file)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(LinesError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
