//! Input documents and how they are loaded
//!
//! A document pairs an identity (used in error messages and passed to edit
//! hooks) with its contents. Only fully materialized contents can be merged.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::CombineError;

/// Opaque identity of an input document, usually its path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for DocumentId {
    fn from(path: &Path) -> Self {
        Self(path.display().to_string())
    }
}

impl From<&str> for DocumentId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Contents of an input document
pub enum Contents {
    /// Fully read text
    Buffer(String),
    /// No contents at all (e.g. a directory entry); skipped
    Empty,
    /// An unread stream; not supported
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Buffer(text) => f.debug_tuple("Buffer").field(&text.len()).finish(),
            Contents::Empty => f.write_str("Empty"),
            Contents::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// A single input document
#[derive(Debug)]
pub struct Document {
    pub id: DocumentId,
    /// Directory the output path is resolved against
    pub base: PathBuf,
    pub contents: Contents,
}

impl Document {
    /// Create a document from in-memory text
    pub fn from_text(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base: PathBuf::new(),
            contents: Contents::Buffer(text.into()),
        }
    }

    /// Create a document backed by an unread stream
    pub fn from_stream(id: impl Into<DocumentId>, reader: Box<dyn Read + Send>) -> Self {
        Self {
            id: id.into(),
            base: PathBuf::new(),
            contents: Contents::Stream(reader),
        }
    }

    /// Load a document from the file system
    ///
    /// Directories yield [`Contents::Empty`]; files are read fully.
    pub fn from_path(path: &Path) -> Result<Self, CombineError> {
        if !path.exists() {
            return Err(CombineError::InvalidPath(path.to_path_buf()));
        }

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let contents = if path.is_dir() {
            Contents::Empty
        } else {
            let text = fs::read_to_string(path).map_err(|e| CombineError::LoadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            Contents::Buffer(text)
        };

        Ok(Self {
            id: DocumentId::from(path),
            base,
            contents,
        })
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }
}

/// Load documents from paths, preserving their order
pub fn load_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Document>, CombineError> {
    paths.iter().map(|p| Document::from_path(p.as_ref())).collect()
}
