//! Upload transaction header.

use crate::error::{CoreError, CoreResult};
use crate::upload::PayloadIterator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Immutable description of a file to upload.
///
/// Size and modification time are captured once, when the header is built,
/// and never checked against the source again. The transaction trusts the
/// declared size to detect completion.
///
/// Only `path`, `size` and `mtime` travel over the wire; the local source
/// path stays with the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHeader {
    path: PathBuf,
    size: u64,
    mtime: u64,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl UploadHeader {
    /// Creates a header for a document that will be published at `path`,
    /// relative to the storage root.
    pub fn new(path: impl Into<PathBuf>, size: u64, mtime: u64) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            source: None,
        }
    }

    /// Builds a header from a local file, published under its file name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSource`] if the file does not exist, is
    /// not a regular file, or cannot be read.
    pub fn from_file(source: impl AsRef<Path>) -> CoreResult<Self> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .ok_or_else(|| CoreError::invalid_source(source, "path has no file name"))?;
        Self::from_file_as(source, name)
    }

    /// Builds a header from a local file, published at `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSource`] if the file does not exist, is
    /// not a regular file, or cannot be read.
    pub fn from_file_as(
        source: impl AsRef<Path>,
        destination: impl Into<PathBuf>,
    ) -> CoreResult<Self> {
        let source = source.as_ref();
        let metadata = match fs::metadata(source) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::invalid_source(source, "file does not exist"))
            }
            Err(e) => return Err(CoreError::invalid_source(source, e.to_string())),
        };
        if !metadata.is_file() {
            return Err(CoreError::invalid_source(source, "not a regular file"));
        }
        File::open(source)
            .map_err(|e| CoreError::invalid_source(source, format!("unreadable: {e}")))?;

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            });

        Ok(Self {
            path: destination.into(),
            size: metadata.len(),
            mtime,
            source: Some(source.to_path_buf()),
        })
    }

    /// Returns the logical path, relative to the storage root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the declared size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the modification time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Returns the local source file, if this header was built from one.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Returns the final path component, used to name temporary documents.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| String::from("upload"), |n| n.to_string_lossy().into_owned())
    }

    /// Returns the logical path normalized for publishing under a root.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDestination`] if the path is absolute,
    /// climbs out of the root with `..`, or names nothing.
    pub fn destination(&self) -> CoreResult<PathBuf> {
        let mut relative = PathBuf::new();
        for component in self.path.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(CoreError::InvalidDestination {
                        path: self.path.clone(),
                    })
                }
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(CoreError::InvalidDestination {
                path: self.path.clone(),
            });
        }
        Ok(relative)
    }

    /// Opens an iterator over the source file in `chunk_size` strides.
    ///
    /// # Errors
    ///
    /// See [`PayloadIterator::new`].
    pub fn payloads(&self, chunk_size: usize) -> CoreResult<PayloadIterator> {
        PayloadIterator::new(self, chunk_size)
    }
}

impl fmt::Display for UploadHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UploadHeader{{path={}, size={}, mtime={}}}",
            self.path.display(),
            self.size,
            self.mtime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn from_file_captures_size() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        fs::write(&source, b"0123456789").unwrap();

        let header = UploadHeader::from_file(&source).unwrap();
        assert_eq!(header.size(), 10);
        assert_eq!(header.path(), Path::new("a.bin"));
        assert_eq!(header.source(), Some(source.as_path()));
        assert!(header.mtime() > 0);
    }

    #[test]
    fn from_file_missing() {
        let dir = tempdir().unwrap();
        let err = UploadHeader::from_file(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSource { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn from_file_directory() {
        let dir = tempdir().unwrap();
        let err = UploadHeader::from_file_as(dir.path(), "a.bin").unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn destination_normalizes() {
        let header = UploadHeader::new("./reports/./q1.pdf", 1, 0);
        assert_eq!(header.destination().unwrap(), PathBuf::from("reports/q1.pdf"));
        assert_eq!(header.name(), "q1.pdf");
    }

    #[test]
    fn destination_rejects_escapes() {
        for path in ["../etc/passwd", "/etc/passwd", "", "."] {
            let header = UploadHeader::new(path, 1, 0);
            assert!(
                matches!(
                    header.destination(),
                    Err(CoreError::InvalidDestination { .. })
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn display() {
        let header = UploadHeader::new("a.bin", 10, 5);
        assert_eq!(header.to_string(), "UploadHeader{path=a.bin, size=10, mtime=5}");
    }
}
