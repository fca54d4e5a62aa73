//! Error types for the file-converter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal for one conversion**: the input is missing,
//!   the format is not supported, the arguments are inconsistent, the codec
//!   failed, or the output could not be written. Returned as
//!   `Err(ConvertError)` from every `convert*` function.
//!
//! * [`ItemFailure`]: **Non-fatal for a batch**: a flattened, cloneable
//!   record of one failed item. Stored inside
//!   [`crate::output::ConversionOutcome`] so a batch of 100 files yields 100
//!   outcomes even when some of them fail.
//!
//! Every variant maps onto exactly one [`ErrorKind`], the stable taxonomy
//! callers match on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error taxonomy shared by [`ConvertError`] and [`ItemFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input missing or unreadable.
    FileNotFound,
    /// Extension not in the converter's declared set, or no target format given.
    UnsupportedFormat,
    /// Caller arguments are inconsistent (e.g. resize without dimensions).
    InvalidArguments,
    /// The external codec failed during the transform.
    ConversionFailed,
    /// Output directory not creatable or output not writable.
    IoWrite,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::InvalidArguments => "invalid arguments",
            ErrorKind::ConversionFailed => "conversion failed",
            ErrorKind::IoWrite => "write error",
        };
        f.write_str(name)
    }
}

/// All errors returned by a single conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found, or the path is not a regular file.
    #[error("{reason}")]
    FileNotFound { path: PathBuf, reason: String },

    /// The file system refused to let us inspect or read the input.
    #[error("Cannot read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Format errors ─────────────────────────────────────────────────────
    /// Extension not accepted, or no output format could be determined.
    #[error("{0}")]
    UnsupportedFormat(String),

    // ── Argument errors ───────────────────────────────────────────────────
    /// Inconsistent or out-of-domain arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    // ── Codec errors ──────────────────────────────────────────────────────
    /// The external library failed while transforming `path`.
    #[error("Failed to convert '{path}': {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory or write the output file.
    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::FileNotFound { .. } | ConvertError::Unreadable { .. } => {
                ErrorKind::FileNotFound
            }
            ConvertError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ConvertError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ConvertError::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            ConvertError::OutputWrite { .. } => ErrorKind::IoWrite,
        }
    }

    /// Wrap an external library error raised while converting `path`.
    pub(crate) fn failed(path: impl Into<PathBuf>, cause: impl fmt::Display) -> Self {
        ConvertError::ConversionFailed {
            path: path.into(),
            detail: cause.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::OutputWrite {
            path: path.into(),
            source,
        }
    }
}

/// A cloneable, serialisable record of one failed batch item.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ItemFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ConvertError> for ItemFailure {
    fn from(e: &ConvertError) -> Self {
        ItemFailure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<ConvertError> for ItemFailure {
    fn from(e: ConvertError) -> Self {
        ItemFailure::from(&e)
    }
}
