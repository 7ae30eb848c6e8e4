//! In-memory document backend for testing.

use crate::backend::{temporary_name, DocumentBackend, TempDocument, WriteChannel};
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Failures an [`InMemoryDocumentBackend`] injects on demand.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Faults {
    /// Fail every `create_temporary` call.
    pub fail_create: bool,
    /// Allow this many successful writes, then fail every later write.
    pub fail_writes_after: Option<usize>,
    /// Fail every `rename` call.
    pub fail_rename: bool,
    /// Fail every `delete` call.
    pub fail_delete: bool,
}

#[derive(Debug, Default)]
struct Shared {
    documents: RwLock<HashMap<PathBuf, Vec<u8>>>,
    faults: Mutex<Faults>,
    writes: Mutex<usize>,
}

/// An in-memory document backend.
///
/// Documents are keyed by path. Clones share the same documents, so a test
/// can hand one clone to a transaction and inspect the other.
///
/// # Example
///
/// ```rust
/// use chunktx_storage::{DocumentBackend, InMemoryDocumentBackend};
/// use std::path::Path;
///
/// let backend = InMemoryDocumentBackend::new();
/// let doc = backend.create_temporary(Path::new("/root"), "a.bin").unwrap();
/// let mut channel = backend.open_write(&doc).unwrap();
/// channel.write_at(0, b"abc").unwrap();
/// channel.close().unwrap();
/// backend.rename(&doc, Path::new("/root/a.bin")).unwrap();
/// assert_eq!(backend.document(Path::new("/root/a.bin")).unwrap(), b"abc");
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentBackend {
    shared: Arc<Shared>,
}

impl InMemoryDocumentBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the injected failures.
    pub fn set_faults(&self, faults: Faults) {
        *self.shared.faults.lock() = faults;
        *self.shared.writes.lock() = 0;
    }

    /// Returns a copy of the document stored at `path`.
    #[must_use]
    pub fn document(&self, path: &Path) -> Option<Vec<u8>> {
        self.shared.documents.read().get(path).cloned()
    }

    /// Returns every stored path, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.shared.documents.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.documents.read().len()
    }

    /// Returns true if no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.documents.read().is_empty()
    }

    fn faults(&self) -> Faults {
        *self.shared.faults.lock()
    }
}

impl DocumentBackend for InMemoryDocumentBackend {
    fn create_temporary(&self, root: &Path, name: &str) -> StorageResult<TempDocument> {
        if self.faults().fail_create {
            return Err(StorageError::backend("injected create failure"));
        }

        let mut documents = self.shared.documents.write();
        loop {
            let location = root.join(temporary_name(name));
            if !documents.contains_key(&location) {
                documents.insert(location.clone(), Vec::new());
                return Ok(TempDocument::new(name, location));
            }
        }
    }

    fn open_write(&self, document: &TempDocument) -> StorageResult<Box<dyn WriteChannel>> {
        if !self.shared.documents.read().contains_key(document.location()) {
            return Err(StorageError::not_found(document.location()));
        }

        Ok(Box::new(MemoryWriteChannel {
            shared: Arc::clone(&self.shared),
            location: document.location().to_path_buf(),
        }))
    }

    fn rename(&self, document: &TempDocument, destination: &Path) -> StorageResult<()> {
        if self.faults().fail_rename {
            return Err(StorageError::backend("injected rename failure"));
        }

        let mut documents = self.shared.documents.write();
        let data = documents
            .remove(document.location())
            .ok_or_else(|| StorageError::not_found(document.location()))?;
        documents.insert(destination.to_path_buf(), data);
        Ok(())
    }

    fn delete(&self, document: &TempDocument) -> StorageResult<bool> {
        if self.faults().fail_delete {
            return Err(StorageError::backend("injected delete failure"));
        }

        Ok(self
            .shared
            .documents
            .write()
            .remove(document.location())
            .is_some())
    }

    fn exists(&self, path: &Path) -> StorageResult<bool> {
        Ok(self.shared.documents.read().contains_key(path))
    }
}

#[derive(Debug)]
struct MemoryWriteChannel {
    shared: Arc<Shared>,
    location: PathBuf,
}

impl WriteChannel for MemoryWriteChannel {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        {
            let limit = self.shared.faults.lock().fail_writes_after;
            let mut writes = self.shared.writes.lock();
            if limit.is_some_and(|limit| *writes >= limit) {
                return Err(StorageError::backend("injected write failure"));
            }
            *writes += 1;
        }

        let mut documents = self.shared.documents.write();
        let document = documents
            .get_mut(&self.location)
            .ok_or_else(|| StorageError::not_found(&self.location))?;

        let start = usize::try_from(offset)
            .map_err(|_| StorageError::backend(format!("offset {offset} out of range")))?;
        let end = start + data.len();
        if document.len() < end {
            document.resize(end, 0);
        }
        document[start..end].copy_from_slice(data);
        Ok(())
    }

    fn close(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}
