//! Error types for document merging

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a caller-supplied hook (edit function, customizer)
///
/// The message is surfaced verbatim when the hook aborts a merge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Invalid start and/or end object!")]
    InvalidStartOrEnd,

    #[error("Invalid edit value: expected an object or array")]
    InvalidEdit,

    #[error("Streaming not supported! ({identity})")]
    UnsupportedInput { identity: String },

    #[error("Error while parsing {identity}: {message}")]
    Parse { identity: String, message: String },

    #[error(transparent)]
    Edit(HookError),

    #[error(transparent)]
    Customizer(HookError),

    #[error("Failed to load document from {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}
