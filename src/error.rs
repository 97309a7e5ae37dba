use std::path::PathBuf;
use thiserror::Error;

use crate::format::Format;

/// Broad category of a [`StoreError`].
///
/// `Configuration` errors come from the builder and are raised before any
/// file is touched. `Validation` errors reject a write without mutating the
/// store. `Format` errors mean stored text could not be turned into (or out
/// of) a tree. `Io` is only surfaced by [`Store::try_save`](crate::Store::try_save)
/// and by reads during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Format,
    Io,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported store type '{name}' (expected one of {})", Format::NAMES.join(", "))]
    UnknownFormat { name: String },

    #[error("Invalid XML root element name '{0}'")]
    InvalidRootElement(String),

    #[error("Non-scalar value for key `{key}`: {reason}")]
    NonScalarValue { key: String, reason: String },

    #[error("Expected a mapping of keys to values, got {found}")]
    NotAMapping { found: &'static str },

    #[error("Value for key `{key}` is not an integer")]
    NotAnInteger { key: String },

    #[error("Counter `{key}` would overflow")]
    CounterOverflow { key: String },

    #[error("Cannot descend into `{key}`: it holds a {found}, not a mapping")]
    NotAContainer { key: String, found: &'static str },

    #[error("Failed to parse {format} content: {reason}")]
    Parse { format: Format, reason: String },

    #[error("{format} content does not return a mapping")]
    NotAMappingDocument { format: Format },

    #[error("Failed to encode {format} content: {reason}")]
    Serialize { format: Format, reason: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No file path configured (call .file() on the builder)")]
    NoFile,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UnknownFormat { .. } | StoreError::InvalidRootElement(_) => {
                ErrorKind::Configuration
            }
            StoreError::NonScalarValue { .. }
            | StoreError::NotAMapping { .. }
            | StoreError::NotAnInteger { .. }
            | StoreError::CounterOverflow { .. }
            | StoreError::NotAContainer { .. } => ErrorKind::Validation,
            StoreError::Parse { .. }
            | StoreError::NotAMappingDocument { .. }
            | StoreError::Serialize { .. } => ErrorKind::Format,
            StoreError::Io { .. } | StoreError::NoFile => ErrorKind::Io,
        }
    }

    pub(crate) fn parse(format: Format, reason: impl ToString) -> Self {
        StoreError::Parse {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn serialize(format: Format, reason: impl ToString) -> Self {
        StoreError::Serialize {
            format,
            reason: reason.to_string(),
        }
    }
}
