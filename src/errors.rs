use std::path::PathBuf;

use thiserror::Error;

use crate::Offset;

pub type Result<T> = std::result::Result<T, LinesError>;

#[derive(Error, Debug)]
pub enum LinesError {
    #[error("source is missing")]
    NilSource,
    #[error("storage is missing")]
    NilStorage,
    #[error("invalid reader configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot read stored offset: {0}")]
    StoreRead(#[source] Box<LinesError>),
    #[error("cannot persist offset: {0}")]
    StoreWrite(#[source] Box<LinesError>),
    #[error("cannot restore last position {offset}: {source}")]
    StreamRestore {
        offset: Offset,
        #[source]
        source: std::io::Error,
    },
    /// `partial` holds what was accumulated before the limit was hit.
    /// It is not a complete line.
    #[error("line is longer than {limit} bytes")]
    LineTooLong { limit: usize, partial: Vec<u8> },
    #[error("cannot read line: {0}")]
    Read(#[source] std::io::Error),
    #[error("path is empty")]
    EmptyPath,
    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0} {1}")]
    Storage(String, String),
    #[error("Parsing error")]
    Parse,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LinesError {
    pub fn is_line_too_long(&self) -> bool {
        matches!(self, Self::LineTooLong { .. })
    }

    /// True for failures that came from the offset store rather than
    /// from the stream.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreRead(_) | Self::StoreWrite(_))
    }
}

impl From<serde_json::Error> for LinesError {
    fn from(_: serde_json::Error) -> Self {
        Self::Parse
    }
}
