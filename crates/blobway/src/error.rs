//! Error types for blobway.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required parameter `{field}`")]
    MissingParameter { field: String },

    #[error("invalid value for `{field}`: {value}")]
    InvalidValue { field: String, value: String },

    #[error("unreachable host for {url}: {message}")]
    UnreachableHost { url: String, message: String },

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("filesystem error at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("storage root for {kind} is unavailable")]
    RootUnavailable { kind: String },

    #[error("transfer cancelled")]
    Cancelled,

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("transfer task panicked: {0}")]
    UnexpectedException(String),
}

impl Error {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingParameter { field: field.into() }
    }

    pub(crate) fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// The stable kind this error surfaces as at the boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingParameter { .. } => ErrorKind::MissingParameter,
            Error::InvalidValue { .. } => ErrorKind::InvalidValue,
            Error::UnreachableHost { .. } => ErrorKind::UnreachableHost,
            Error::HttpStatus { .. } => ErrorKind::HttpStatus,
            Error::Filesystem { .. } | Error::RootUnavailable { .. } => ErrorKind::FilesystemError,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Unexpected(_) => ErrorKind::UnexpectedError,
            Error::UnexpectedException(_) => ErrorKind::UnexpectedException,
        }
    }
}

/// Stable error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingParameter,
    InvalidValue,
    UnreachableHost,
    HttpStatus,
    FilesystemError,
    Cancelled,
    UnexpectedError,
    UnexpectedException,
}

impl ErrorKind {
    /// Boundary token paired with each kind.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingParameter => "ERROR_UNEXPECTED_EMPTY_VALUE",
            ErrorKind::InvalidValue => "ERROR_INVALID_VALUE",
            ErrorKind::UnreachableHost => "ERROR_UNKNOWN_HOST",
            ErrorKind::HttpStatus => "ERROR_HTTP_STATUS",
            ErrorKind::FilesystemError => "ERROR_FILESYSTEM",
            ErrorKind::Cancelled => "ERROR_CANCELLED",
            ErrorKind::UnexpectedError => "ERROR_UNEXPECTED_ERROR",
            ErrorKind::UnexpectedException => "ERROR_UNEXPECTED_EXCEPTION",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised while loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
