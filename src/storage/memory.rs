use std::sync::Mutex;

use crate::storage::OffsetStore;
use crate::{LinesError, Offset, Result};

const LABEL: &str = "memory";

/// Process-local store, mostly useful for tests and for consumers that
/// only need to survive a reader being rebuilt, not a process restart.
///
/// The value sits behind a mutex so that e.g. a health check may read the
/// last committed offset while the reader writes a new one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Offset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: Offset) -> Self {
        Self {
            value: Mutex::new(offset),
        }
    }
}

impl OffsetStore for MemoryStore {
    fn read(&self) -> Result<Offset> {
        let value = self.value.lock().map_err(|e| {
            LinesError::Storage(LABEL.to_owned(), e.to_string())
        })?;
        Ok(*value)
    }

    fn write(&self, offset: Offset) -> Result<()> {
        let mut value = self.value.lock().map_err(|e| {
            LinesError::Storage(LABEL.to_owned(), e.to_string())
        })?;
        *value = offset;
        Ok(())
    }
}
