//! Error types for record decoding, tag parsing and file processing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E101: Source file could not be opened
    E101SourceOpen,
    /// E102: Output sink rejected a write
    E102SinkWrite,
    /// E103: Identifier path has an invalid percent escape
    E103MalformedPath,
    /// E104: Identifier query string is unusable
    E104MalformedQuery,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E101SourceOpen => "E101",
            Self::E102SinkWrite => "E102",
            Self::E103MalformedPath => "E103",
            Self::E104MalformedQuery => "E104",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a [`RecordReader`](crate::rowbinary::RecordReader) stops yielding records.
///
/// All variants end iteration. `EndOfInput` is the clean case; the others mean
/// the tail of the source is unusable, and whatever was read before it stays valid.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Source ended exactly on a record boundary
    #[error("end of input")]
    EndOfInput,

    /// Source ended in the middle of a record, or a length prefix is implausible
    #[error("corrupted record at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    /// Underlying read failed
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }
}

/// Per-identifier parse failures. The caller skips the record and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("[{code}] malformed path {path:?}: {reason}")]
    MalformedPath {
        code: ErrorCode,
        path: String,
        reason: &'static str,
    },

    #[error("[{code}] malformed query: {reason}")]
    MalformedQuery {
        code: ErrorCode,
        reason: &'static str,
    },
}

impl TagError {
    pub fn malformed_path(path: &str, reason: &'static str) -> Self {
        Self::MalformedPath {
            code: ErrorCode::E103MalformedPath,
            path: path.to_string(),
            reason,
        }
    }

    pub fn malformed_query(reason: &'static str) -> Self {
        Self::MalformedQuery {
            code: ErrorCode::E104MalformedQuery,
            reason,
        }
    }
}

/// Errors that stop processing of the current file.
///
/// Output written before the error stays in the sink and is not rolled back.
#[derive(Debug, Error)]
pub enum TaggedError {
    #[error("[{code}] failed to open {path}: {source}", code = ErrorCode::E101SourceOpen)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "[{code}] output write failed after {metrics_written} metrics: {source}",
        code = ErrorCode::E102SinkWrite
    )]
    Sink {
        metrics_written: usize,
        #[source]
        source: io::Error,
    },
}

impl TaggedError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Open { .. } => ErrorCode::E101SourceOpen,
            Self::Sink { .. } => ErrorCode::E102SinkWrite,
        }
    }
}

/// Result type alias for TaggedError
pub type Result<T> = std::result::Result<T, TaggedError>;
