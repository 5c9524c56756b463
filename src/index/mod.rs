//! Per-file indexes: offset↔line/column mapping and syntax-node span
//! lookup. Both are built once per source file, queried during that
//! file's extraction pass, and discarded.
pub mod source;
pub mod span;

use thiserror::Error;

/// Errors raised by index queries.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Offset arithmetic outside the text bounds. Fatal for the current
    /// file only; the caller skips the file and continues the batch.
    #[error("offset {offset} out of range (text length {len})")]
    OutOfRange { offset: usize, len: usize },

    /// No node contains the queried span. Cannot happen for a
    /// well-formed parse; callers treat it as a contract failure.
    #[error("no enclosing node for span {start}:{end}")]
    NoEnclosingNode { start: usize, end: usize },
}
