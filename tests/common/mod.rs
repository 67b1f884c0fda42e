#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use stateful_lines::{MemoryStore, Offset, OffsetStore, Result};

static INIT: Once = Once::new();

pub fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Wraps a [`MemoryStore`] and counts how often it is touched.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn with_offset(offset: Offset) -> Self {
        Self {
            inner: MemoryStore::with_offset(offset),
            ..Default::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl OffsetStore for CountingStore {
    fn read(&self) -> Result<Offset> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read()
    }

    fn write(&self, offset: Offset) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(offset)
    }
}

/// Store that cannot be read.
pub struct BrokenStore;

impl OffsetStore for BrokenStore {
    fn read(&self) -> Result<Offset> {
        Err(anyhow::anyhow!("impossible to read offset").into())
    }

    fn write(&self, _offset: Offset) -> Result<()> {
        Err(anyhow::anyhow!("impossible to write offset").into())
    }
}

/// Store whose next `failures` writes are rejected; reads always succeed.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(failures),
        }
    }
}

impl OffsetStore for FlakyStore {
    fn read(&self) -> Result<Offset> {
        self.inner.read()
    }

    fn write(&self, offset: Offset) -> Result<()> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(anyhow::anyhow!("disk unplugged").into());
        }
        self.inner.write(offset)
    }
}
