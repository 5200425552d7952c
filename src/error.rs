//! Error taxonomy for configuration loading.
//!
//! None of these errors escape a resolver operation. They are carried inside
//! [`LoadOutcome`](crate::config::LoadOutcome) values and logged, so callers
//! can inspect what went wrong without the load sequence ever aborting.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading or parsing a single configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseError,
    },
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(origin: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            origin: origin.into(),
            source,
        }
    }
}

/// Malformed content in the `key=value` text format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed \\uXXXX escape on line {line}")]
    MalformedUnicodeEscape { line: usize },
}

/// A tagged value that could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("unknown type tag '{0}'")]
    UnknownTag(String),

    #[error("'{value}' is not a valid {tag}")]
    InvalidNumber { tag: String, value: String },

    #[error("'{0}' is not a boolean (expected true or false)")]
    InvalidBoolean(String),

    #[error("'{value}' does not match date format {format}")]
    InvalidDate { value: String, format: &'static str },

    #[error("list element '{element}' is not a valid integer")]
    InvalidList { element: String },
}
