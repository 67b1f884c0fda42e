//! Where the reader keeps its resume point.
//!
//! An [`OffsetStore`] holds exactly one integer: the number of bytes of the
//! stream that have been consumed and handed out as lines. A successful
//! [`OffsetStore::write`] is the commit point for a line, so durable
//! implementations must not return before the value survives a crash.

pub mod file_storage;
pub mod memory;

use std::sync::Arc;

use crate::{Offset, Result};

pub use file_storage::FileStore;
pub use memory::MemoryStore;

pub trait OffsetStore: Send + Sync {
    /// Return the last offset written, or the store's initial value if
    /// nothing has been written yet.
    fn read(&self) -> Result<Offset>;

    /// Replace the stored offset. Must be durable once `Ok` is returned.
    fn write(&self, offset: Offset) -> Result<()>;
}

impl<T: OffsetStore + ?Sized> OffsetStore for &T {
    fn read(&self) -> Result<Offset> {
        (**self).read()
    }

    fn write(&self, offset: Offset) -> Result<()> {
        (**self).write(offset)
    }
}

impl<T: OffsetStore + ?Sized> OffsetStore for Arc<T> {
    fn read(&self) -> Result<Offset> {
        (**self).read()
    }

    fn write(&self, offset: Offset) -> Result<()> {
        (**self).write(offset)
    }
}

impl<T: OffsetStore + ?Sized> OffsetStore for Box<T> {
    fn read(&self) -> Result<Offset> {
        (**self).read()
    }

    fn write(&self, offset: Offset) -> Result<()> {
        (**self).write(offset)
    }
}
