//! File-based document backend.

use crate::backend::{temporary_name, DocumentBackend, TempDocument, WriteChannel};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Attempts made before giving up on finding an unused temporary name.
const CREATE_ATTEMPTS: usize = 8;

/// A document backend on the local filesystem.
///
/// Temporary documents live next to their final destination under the
/// storage root, so publishing is a same-filesystem `rename`.
///
/// # Durability
///
/// - Closing a channel calls `File::flush()`
/// - With `sync_on_close` (the default) it also calls `File::sync_all()`
///
/// # Example
///
/// ```no_run
/// use chunktx_storage::{DocumentBackend, FileDocumentBackend};
/// use std::path::Path;
///
/// let backend = FileDocumentBackend::new();
/// let doc = backend.create_temporary(Path::new("/srv/uploads"), "report.pdf").unwrap();
/// let mut channel = backend.open_write(&doc).unwrap();
/// channel.write_at(0, b"%PDF").unwrap();
/// channel.close().unwrap();
/// backend.rename(&doc, Path::new("/srv/uploads/report.pdf")).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileDocumentBackend {
    sync_on_close: bool,
}

impl Default for FileDocumentBackend {
    fn default() -> Self {
        Self {
            sync_on_close: true,
        }
    }
}

impl FileDocumentBackend {
    /// Creates a backend that syncs documents when their channel closes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether closing a channel syncs data to disk.
    #[must_use]
    pub const fn with_sync(mut self, sync_on_close: bool) -> Self {
        self.sync_on_close = sync_on_close;
        self
    }
}

impl DocumentBackend for FileDocumentBackend {
    fn create_temporary(&self, root: &Path, name: &str) -> StorageResult<TempDocument> {
        fs::create_dir_all(root)?;

        for _ in 0..CREATE_ATTEMPTS {
            let location = root.join(temporary_name(name));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&location)
            {
                Ok(_) => {
                    debug!(path = %location.display(), "created temporary document");
                    return Ok(TempDocument::new(name, location));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Exhausted {
            name: name.to_string(),
            root: root.to_path_buf(),
        })
    }

    fn open_write(&self, document: &TempDocument) -> StorageResult<Box<dyn WriteChannel>> {
        let file = match OpenOptions::new().write(true).open(document.location()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(document.location()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Box::new(FileWriteChannel {
            path: document.location().to_path_buf(),
            file,
            sync_on_close: self.sync_on_close,
        }))
    }

    fn rename(&self, document: &TempDocument, destination: &Path) -> StorageResult<()> {
        if !document.location().is_file() {
            return Err(StorageError::not_found(document.location()));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(document.location(), destination)?;
        Ok(())
    }

    fn delete(&self, document: &TempDocument) -> StorageResult<bool> {
        match fs::remove_file(document.location()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &Path) -> StorageResult<bool> {
        Ok(path.try_exists()?)
    }
}

/// Write channel over an open file handle.
#[derive(Debug)]
struct FileWriteChannel {
    path: PathBuf,
    file: File,
    sync_on_close: bool,
}

impl WriteChannel for FileWriteChannel {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        // write_all surfaces a short write as ErrorKind::WriteZero
        self.file.write_all(data)?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> StorageResult<()> {
        self.file.flush()?;
        if self.sync_on_close {
            self.file.sync_all()?;
        }
        debug!(path = %self.path.display(), "closed write channel");
        Ok(())
    }
}
