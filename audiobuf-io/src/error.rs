//! Error types for audiobuf-io
//!
//! Three failure kinds surface to callers:
//! - `Source`: open/decode/write failures and malformed files
//! - `Resample`: converter creation or per-chunk processing failures
//! - `Internal`: capacity-estimate violations (a sizing bug, not bad input)
//!
//! Every variant carries the file the call was working on.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for audiobuf-io
#[derive(Error, Debug)]
pub enum Error {
    /// Open, decode or write failure on an audio file
    #[error("{kind} in file {}", .path.display())]
    Source {
        kind: SourceErrorKind,
        path: PathBuf,
    },

    /// Resampler creation or processing failure
    #[error("Resampling error: {message} in file {}", .path.display())]
    Resample { message: String, path: PathBuf },

    /// Output capacity estimate violated
    #[error("Internal error: {message} in file {}", .path.display())]
    Internal { message: String, path: PathBuf },
}

/// Native cause of a `Source` error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// File missing, unreadable or unwritable
    #[error("System error: {0}")]
    System(String),

    /// Container not recognised
    #[error("Unrecognised format: {0}")]
    UnrecognisedFormat(String),

    /// Non-positive frames, channels, sample rate or format code
    #[error("Malformed file: {0}")]
    MalformedFile(String),

    /// Container recognised but encoding unsupported
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Unrecoverable failure while decoding packets
    #[error("Decode error: {0}")]
    Decode(String),

    /// Fewer frames reached the file than requested
    #[error("Short write: {written} of {expected} frames written")]
    ShortWrite { expected: usize, written: usize },
}

/// User-visible failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid or unsupported format
    InvalidFormat,
    /// File not found or I/O failure
    FileNotFound,
    /// Resampling failure
    Resampling,
    /// Internal error
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::InvalidFormat => "invalid format",
            ErrorCategory::FileNotFound => "file not found",
            ErrorCategory::Resampling => "resampling error",
            ErrorCategory::Internal => "internal error",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn source_error(kind: SourceErrorKind, path: impl AsRef<Path>) -> Self {
        Error::Source {
            kind,
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn resample(message: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Error::Resample {
            message: message.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn internal(message: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Error::Internal {
            message: message.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// File the failing call was working on
    pub fn path(&self) -> &Path {
        match self {
            Error::Source { path, .. }
            | Error::Resample { path, .. }
            | Error::Internal { path, .. } => path,
        }
    }

    /// Map to the user-visible failure category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Source { kind, .. } => match kind {
                SourceErrorKind::System(_) | SourceErrorKind::ShortWrite { .. } => {
                    ErrorCategory::FileNotFound
                }
                SourceErrorKind::UnrecognisedFormat(_)
                | SourceErrorKind::MalformedFile(_)
                | SourceErrorKind::UnsupportedEncoding(_)
                | SourceErrorKind::Decode(_) => ErrorCategory::InvalidFormat,
            },
            Error::Resample { .. } => ErrorCategory::Resampling,
            Error::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Convenience Result type using audiobuf-io Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_file() {
        let err = Error::source_error(
            SourceErrorKind::MalformedFile("channels is 0".to_string()),
            "/music/a.wav",
        );
        assert_eq!(
            err.to_string(),
            "Malformed file: channels is 0 in file /music/a.wav"
        );
        assert_eq!(err.path(), Path::new("/music/a.wav"));
    }

    #[test]
    fn test_categories() {
        let cases = [
            (SourceErrorKind::System("gone".into()), ErrorCategory::FileNotFound),
            (
                SourceErrorKind::ShortWrite { expected: 2, written: 1 },
                ErrorCategory::FileNotFound,
            ),
            (SourceErrorKind::UnrecognisedFormat("x".into()), ErrorCategory::InvalidFormat),
            (SourceErrorKind::MalformedFile("x".into()), ErrorCategory::InvalidFormat),
            (SourceErrorKind::UnsupportedEncoding("x".into()), ErrorCategory::InvalidFormat),
            (SourceErrorKind::Decode("x".into()), ErrorCategory::InvalidFormat),
        ];
        for (kind, expected) in cases {
            assert_eq!(Error::source_error(kind, "f.wav").category(), expected);
        }

        assert_eq!(Error::resample("x", "f.wav").category(), ErrorCategory::Resampling);
        assert_eq!(Error::internal("x", "f.wav").category(), ErrorCategory::Internal);
    }
}
