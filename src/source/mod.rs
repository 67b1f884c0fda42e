//! Byte sources the reader can be pointed at.
//!
//! [`LineReader`](crate::LineReader) accepts any [`std::io::Read`]; the
//! helpers here only cover the common case of a file on the local disk.

pub mod local;
