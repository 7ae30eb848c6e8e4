//! Error types for document backend operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during document backend operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document does not exist in the backend.
    #[error("document not found: {}", path.display())]
    NotFound {
        /// Location of the missing document.
        path: PathBuf,
    },

    /// A unique temporary name could not be allocated.
    #[error("unable to allocate a temporary document for {name} in {}", root.display())]
    Exhausted {
        /// Logical name the temporary document was derived from.
        name: String,
        /// Directory the document was to be created in.
        root: PathBuf,
    },

    /// The backend refused the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a not-found error for the given location.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
