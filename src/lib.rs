//! Line-by-line reading of a byte stream that survives process restarts.
//!
//! After every line handed out, [`LineReader`] persists the number of bytes
//! consumed so far through an [`OffsetStore`]. A reader built later over the
//! same stream (reopened from its first byte) and the same store skips what
//! was already delivered and continues with the next line.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use stateful_lines::{source, FileStore, LineReader};
//!
//! # fn main() -> stateful_lines::Result<()> {
//! let store = Arc::new(FileStore::new(
//!     "access-log".to_owned(),
//!     Path::new("/var/lib/consumer/access.offset"),
//! ));
//! let mut reader =
//!     LineReader::new(source::local::open("/var/log/access.log")?, store)?;
//! while let Some(line) = reader.read_line()? {
//!     println!("{}", String::from_utf8_lossy(&line));
//! }
//! # Ok(())
//! # }
//! ```

pub mod atomic;
mod errors;
pub mod reader;
pub mod source;
pub mod storage;

pub use errors::{LinesError, Result};
pub use reader::{
    LineReader, LineReaderBuilder, Lines, DEFAULT_BUFFER_CAPACITY,
    MAX_LINE_BYTES,
};
pub use storage::{FileStore, MemoryStore, OffsetStore};

/// Count of bytes consumed from the logical start of a stream.
pub type Offset = u64;

#[cfg(test)]
static INIT: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
pub(crate) fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        log::info!("Initializing stateful-lines tests");
    });
}
