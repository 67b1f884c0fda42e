use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use crate::storage::OffsetStore;
use crate::{LinesError, Offset, Result};

/// Longest line kept in memory, terminator excluded.
pub const MAX_LINE_BYTES: usize = 4096 * 2;

/// Read buffer size. Smaller than [`MAX_LINE_BYTES`], so long lines are
/// assembled from several fragments.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

const TERMINATOR: u8 = b'\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Exhausted,
}

/// Reads a stream line by line, persisting the consumed offset through an
/// [`OffsetStore`] before every line is returned.
///
/// Not meant to be shared between threads: line assembly and offset
/// bookkeeping mutate the reader in place.
pub struct LineReader<R> {
    source: BufReader<R>,
    store: Arc<dyn OffsetStore>,
    max_line_bytes: usize,
    state: State,
    // bytes discarded at construction
    restored: Offset,
    // absolute stream position, everything consumed from `source`
    position: Offset,
    // absolute position the store is known to hold
    committed: Offset,
    // fragments of a line whose assembly was interrupted by an I/O error
    partial: Vec<u8>,
    // line consumed from the source whose offset could not be persisted
    pending: Option<Vec<u8>>,
    // the previous line was too long and its tail must be dropped
    skip_remainder: bool,
}

pub struct LineReaderBuilder<R> {
    source: Option<R>,
    store: Option<Arc<dyn OffsetStore>>,
    max_line_bytes: usize,
    buffer_capacity: usize,
}

impl<R> Default for LineReaderBuilder<R> {
    fn default() -> Self {
        Self {
            source: None,
            store: None,
            max_line_bytes: MAX_LINE_BYTES,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl<R: Read> LineReaderBuilder<R> {
    pub fn source(mut self, source: R) -> Self {
        self.source = Some(source);
        self
    }

    /// The store is shared: whoever created it may keep reading it, e.g.
    /// to report progress.
    pub fn store(mut self, store: Arc<dyn OffsetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Validate the arguments, then restore the position recorded in the
    /// store by discarding that many bytes from the front of the source.
    ///
    /// # Errors
    /// [`LinesError::NilSource`] and [`LinesError::NilStorage`] are returned
    /// before any I/O happens. A source shorter than the stored offset is
    /// reported as [`LinesError::StreamRestore`]: the stored offset was
    /// computed against a different stream and resuming from it would skip
    /// or repeat data.
    pub fn build(self) -> Result<LineReader<R>> {
        let source = self.source.ok_or(LinesError::NilSource)?;
        let store = self.store.ok_or(LinesError::NilStorage)?;
        if self.max_line_bytes == 0 {
            return Err(LinesError::InvalidConfig(
                "max_line_bytes must be positive".to_owned(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(LinesError::InvalidConfig(
                "buffer_capacity must be positive".to_owned(),
            ));
        }

        let restored = store
            .read()
            .map_err(|e| LinesError::StoreRead(Box::new(e)))?;

        let mut source = BufReader::with_capacity(self.buffer_capacity, source);
        discard(&mut source, restored).map_err(|source| {
            LinesError::StreamRestore {
                offset: restored,
                source,
            }
        })?;
        log::debug!("restored position {}", restored);

        Ok(LineReader {
            source,
            store,
            max_line_bytes: self.max_line_bytes,
            state: State::Open,
            restored,
            position: restored,
            committed: restored,
            partial: Vec::new(),
            pending: None,
            skip_remainder: false,
        })
    }
}

impl<R: Read> LineReader<R> {
    pub fn builder() -> LineReaderBuilder<R> {
        LineReaderBuilder::default()
    }

    /// Build a reader with the default limits.
    pub fn new(source: R, store: Arc<dyn OffsetStore>) -> Result<Self> {
        Self::builder().source(source).store(store).build()
    }

    /// Bytes committed since construction. Starts at zero right after the
    /// stored offset has been discarded.
    pub fn offset(&self) -> Offset {
        self.committed - self.restored
    }

    /// Offset found in the store at construction time.
    pub fn restored_offset(&self) -> Offset {
        self.restored
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Return the next line without its terminator, or `None` once the
    /// stream has no more lines.
    ///
    /// The new offset is written to the store before the line is returned.
    /// If that write fails, the error is returned, the committed offset does
    /// not move and the same line is offered again on the next call.
    ///
    /// A final line without a terminator is still returned; only the bytes
    /// actually present are counted.
    ///
    /// # Errors
    /// * [`LinesError::LineTooLong`] if the line exceeds the configured
    ///   limit. The rest of that line is dropped by the next call.
    /// * [`LinesError::Read`] if the source fails. Bytes already assembled
    ///   are kept for the next call.
    /// * [`LinesError::StoreWrite`] if the offset cannot be persisted.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.pending.take() {
            return self.commit(line).map(Some);
        }
        if self.state == State::Exhausted {
            return Ok(None);
        }
        if self.skip_remainder {
            self.skip_line()?;
            self.skip_remainder = false;
        }

        match self.assemble()? {
            Some(line) => self.commit(line).map(Some),
            None => {
                self.state = State::Exhausted;
                log::debug!("end of stream at position {}", self.position);
                Ok(None)
            }
        }
    }

    /// Iterate over the remaining lines. Iteration stops after the first
    /// error.
    pub fn lines(self) -> Lines<R> {
        Lines {
            reader: self,
            failed: false,
        }
    }

    fn commit(&mut self, line: Vec<u8>) -> Result<Vec<u8>> {
        if let Err(e) = self.store.write(self.position) {
            log::warn!("failed to persist offset {}: {}", self.position, e);
            self.pending = Some(line);
            return Err(LinesError::StoreWrite(Box::new(e)));
        }
        self.committed = self.position;
        log::trace!(
            "line of {} bytes delivered, offset {}",
            line.len(),
            self.committed
        );
        Ok(line)
    }

    /// Pull fragments from the buffered source until a terminator or the
    /// end of the stream is reached.
    fn assemble(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let buffer = match self.source.fill_buf() {
                Ok(buffer) => buffer,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinesError::Read(e)),
            };
            if buffer.is_empty() {
                if self.partial.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.partial)));
            }

            let (length, terminated) =
                match buffer.iter().position(|&b| b == TERMINATOR) {
                    Some(index) => (index, true),
                    None => (buffer.len(), false),
                };

            if self.partial.len() + length > self.max_line_bytes {
                self.consume(length);
                self.skip_remainder = !terminated;
                if terminated {
                    self.consume(1);
                }
                log::warn!(
                    "line longer than {} bytes near position {}",
                    self.max_line_bytes,
                    self.position
                );
                return Err(LinesError::LineTooLong {
                    limit: self.max_line_bytes,
                    partial: std::mem::take(&mut self.partial),
                });
            }

            self.partial.extend_from_slice(&buffer[..length]);
            if terminated {
                self.consume(length + 1);
                return Ok(Some(std::mem::take(&mut self.partial)));
            }
            self.consume(length);
        }
    }

    /// Drop bytes up to and including the next terminator.
    fn skip_line(&mut self) -> Result<()> {
        loop {
            let buffer = match self.source.fill_buf() {
                Ok(buffer) => buffer,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinesError::Read(e)),
            };
            if buffer.is_empty() {
                return Ok(());
            }
            match buffer.iter().position(|&b| b == TERMINATOR) {
                Some(index) => {
                    self.consume(index + 1);
                    return Ok(());
                }
                None => {
                    let length = buffer.len();
                    self.consume(length);
                }
            }
        }
    }

    fn consume(&mut self, amount: usize) {
        self.source.consume(amount);
        self.position += amount as Offset;
    }
}

/// Iterator returned by [`LineReader::lines`].
pub struct Lines<R> {
    reader: LineReader<R>,
    failed: bool,
}

impl<R> Lines<R> {
    pub fn into_inner(self) -> LineReader<R> {
        self.reader
    }
}

impl<R: Read> Iterator for Lines<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Consume exactly `count` bytes, failing if the source ends first.
fn discard<B: BufRead>(source: &mut B, count: Offset) -> io::Result<()> {
    let mut remaining = count;
    while remaining > 0 {
        let available = match source.fill_buf() {
            Ok(buffer) => buffer.len(),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "stream ended after {} of {} bytes",
                    count - remaining,
                    count
                ),
            ));
        }
        let step = usize::try_from(remaining)
            .map_or(available, |remaining| remaining.min(available));
        source.consume(step);
        remaining -= step as Offset;
    }
    Ok(())
}
