//! Document backend trait definition.

use crate::error::StorageResult;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix appended to every temporary document name.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Handle to a private, not-yet-published document.
///
/// A handle only names the document; it owns no OS resources. Writes go
/// through a [`WriteChannel`] obtained from [`DocumentBackend::open_write`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempDocument {
    name: String,
    location: PathBuf,
}

impl TempDocument {
    /// Creates a handle for a document at `location`.
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// Returns the logical name the document was derived from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend location of the temporary document.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }
}

impl fmt::Display for TempDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location.display())
    }
}

/// Builds a collision-avoiding temporary name: `<name>.<uuid>.tmp`.
#[must_use]
pub fn temporary_name(name: &str) -> String {
    format!("{name}.{}{TEMP_SUFFIX}", Uuid::new_v4().simple())
}

/// Exclusive write access to one temporary document.
///
/// Closing consumes the channel, so a channel can never be closed twice.
pub trait WriteChannel: Send + fmt::Debug {
    /// Writes all of `data` starting at the absolute byte `offset`.
    ///
    /// The document grows as needed. A write that cannot be completed in full
    /// is an error; partial writes are never reported as success.
    ///
    /// # Errors
    ///
    /// Returns an error if the seek or write fails.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Flushes pending bytes and releases the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or sync fails.
    fn close(self: Box<Self>) -> StorageResult<()>;
}

/// A store of documents that supports private temporaries and atomic publish.
///
/// # Invariants
///
/// - `create_temporary` never returns a location already in use
/// - `rename` is observed as all-or-nothing by readers of the destination
/// - `delete` of a missing document is not an error
///
/// # Implementors
///
/// - [`super::FileDocumentBackend`] - Local filesystem
/// - [`super::InMemoryDocumentBackend`] - For testing
pub trait DocumentBackend: Send + Sync + fmt::Debug {
    /// Creates an empty temporary document under `root`, named after `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be created.
    fn create_temporary(&self, root: &Path, name: &str) -> StorageResult<TempDocument>;

    /// Opens a write channel to a temporary document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing or cannot be opened.
    fn open_write(&self, document: &TempDocument) -> StorageResult<Box<dyn WriteChannel>>;

    /// Moves a temporary document to `destination`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the temporary document
    /// does not exist, or an I/O error if the move fails.
    fn rename(&self, document: &TempDocument, destination: &Path) -> StorageResult<()>;

    /// Deletes a temporary document.
    ///
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document could not be removed.
    fn delete(&self, document: &TempDocument) -> StorageResult<bool>;

    /// Returns whether a document exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, path: &Path) -> StorageResult<bool>;
}
