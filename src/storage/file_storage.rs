use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::atomic;
use crate::storage::OffsetStore;
use crate::{LinesError, Offset, Result};

const LOG_PREFIX: &str = "[offset-storage]";
const STORAGE_VERSION: i32 = 1;

/// Offset store backed by a single small file.
///
/// Every write replaces the whole file through a synced temporary file, so
/// after a crash the file holds either the previous or the new offset,
/// never a mix of the two.
pub struct FileStore {
    label: String,
    log_prefix: String,
    path: PathBuf,
    lock: Mutex<()>,
}

/// On-disk representation of the stored offset.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct OffsetRecord {
    version: i32,
    offset: Offset,
}

impl FileStore {
    /// Create a new file store with a diagnostic label and file path.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(label: String, path: &Path) -> Self {
        Self {
            log_prefix: format!("{} {}", LOG_PREFIX, label),
            label,
            path: PathBuf::from(path),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the persisted offset. The next read returns zero again.
    pub fn erase(&self) -> Result<()> {
        let _guard = self.guard()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| LinesError::Storage(self.label.clone(), e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Offset> {
        let record: OffsetRecord =
            serde_json::from_slice(bytes).map_err(|err| {
                LinesError::Storage(self.label.clone(), err.to_string())
            })?;

        match record.version.cmp(&STORAGE_VERSION) {
            std::cmp::Ordering::Equal => Ok(record.offset),
            std::cmp::Ordering::Less => Err(LinesError::Storage(
                self.label.clone(),
                "Storage format is older than the app".to_owned(),
            )),
            std::cmp::Ordering::Greater => Err(LinesError::Storage(
                self.label.clone(),
                "Storage format is newer than the app".to_owned(),
            )),
        }
    }
}

impl OffsetStore for FileStore {
    /// A missing file means no line has been committed yet.
    fn read(&self) -> Result<Offset> {
        let _guard = self.guard()?;
        match fs::read(&self.path) {
            Ok(bytes) => {
                let offset = self.decode(&bytes)?;
                log::debug!(
                    "{} offset {} loaded from {:?}",
                    self.log_prefix,
                    offset,
                    self.path
                );
                Ok(offset)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "{} {:?} does not exist yet, starting from 0",
                    self.log_prefix,
                    self.path
                );
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, offset: Offset) -> Result<()> {
        let _guard = self.guard()?;
        let record = OffsetRecord {
            version: STORAGE_VERSION,
            offset,
        };
        let data = serde_json::to_vec(&record)?;
        atomic::replace_with(&self.path, &data)?;

        log::trace!("{} offset {} has been written", self.log_prefix, offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempdir::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new("test".to_owned(), &dir.path().join("offset.json"))
    }

    #[test]
    fn missing_file_reads_as_zero() {
        let dir = TempDir::new("file_store_missing").unwrap();
        let store = store_in(&dir);

        assert_eq!(store.read().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn offset_survives_a_new_instance() {
        let dir = TempDir::new("file_store_restart").unwrap();
        store_in(&dir).write(12).unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.read().unwrap(), 12);
    }

    #[test]
    fn record_is_versioned_json() {
        let dir = TempDir::new("file_store_format").unwrap();
        let store = store_in(&dir);
        store.write(42).unwrap();

        let raw = fs::read(store.path()).unwrap();
        let record: OffsetRecord = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            record,
            OffsetRecord {
                version: STORAGE_VERSION,
                offset: 42
            }
        );
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = TempDir::new("file_store_version").unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), br#"{"version":99,"offset":5}"#).unwrap();

        let err = store.read().unwrap_err();
        assert!(matches!(err, LinesError::Storage(label, _) if label == "test"));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = TempDir::new("file_store_garbage").unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"version: 2\nkey:1\n").unwrap();

        assert!(matches!(store.read(), Err(LinesError::Storage(_, _))));
    }

    #[test]
    fn erase_resets_to_zero() {
        let dir = TempDir::new("file_store_erase").unwrap();
        let store = store_in(&dir);
        store.write(9).unwrap();

        store.erase().unwrap();
        assert_eq!(store.read().unwrap(), 0);
        // erasing twice is fine
        store.erase().unwrap();
    }

    #[test]
    fn concurrent_writes_leave_a_valid_record() {
        let dir = TempDir::new("file_store_threads").unwrap();
        let store = Arc::new(store_in(&dir));

        let handles = (1..=10u64)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.write(i * 100))
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let offset = store.read().unwrap();
        assert_eq!(offset % 100, 0);
        assert!((100..=1000).contains(&offset));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
