//! Error types for chunktx core.

use crate::types::TransactionId;
use chunktx_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in chunktx core operations.
///
/// Construction-time validation failures ([`CoreError::InvalidSource`],
/// configuration errors) never reach a transaction. Everything else is raised
/// while a transaction is in flight and makes the processor abort it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The header refers to a missing, non-regular or unreadable file.
    #[error("invalid source {}: {reason}", path.display())]
    InvalidSource {
        /// The offending source path.
        path: PathBuf,
        /// Why the source was rejected.
        reason: String,
    },

    /// A chunk could not be read from the source file.
    #[error("unable to read chunk at offset {offset} from {}: {source}", path.display())]
    SourceRead {
        /// The source being read.
        path: PathBuf,
        /// Offset of the chunk being read.
        offset: u64,
        /// The underlying read failure.
        #[source]
        source: io::Error,
    },

    /// The temporary document could not be created or opened.
    #[error("unable to allocate temporary document for {name} in {}: {source}", root.display())]
    ResourceAllocation {
        /// Logical name of the document.
        name: String,
        /// Storage root the document was to be created in.
        root: PathBuf,
        /// The backend failure.
        #[source]
        source: StorageError,
    },

    /// The header's logical path cannot be published under a storage root.
    #[error("invalid destination path: {}", path.display())]
    InvalidDestination {
        /// The rejected logical path.
        path: PathBuf,
    },

    /// No in-flight transaction has this id.
    #[error("unknown transaction {id}")]
    UnknownTransaction {
        /// The id that was looked up.
        id: TransactionId,
    },

    /// A payload reaches past the declared size.
    #[error("payload at offset {offset} with {len} bytes exceeds declared size {size}")]
    PayloadOutOfBounds {
        /// Payload offset.
        offset: u64,
        /// Payload length.
        len: usize,
        /// Declared size from the header.
        size: u64,
    },

    /// A payload's bytes do not match its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Payload offset.
        offset: u64,
        /// Checksum carried by the payload.
        expected: u32,
        /// Checksum computed over the bytes.
        actual: u32,
    },

    /// The transaction lifecycle was violated.
    #[error("internal inconsistency: {message}")]
    InternalInconsistency {
        /// What went wrong.
        message: String,
    },

    /// Operation not permitted with the given arguments.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Wire encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// A failure triggered an abort, and the abort failed too.
    #[error("{cause} (abort also failed: {abort})")]
    AbortFailed {
        /// The original failure.
        #[source]
        cause: Box<CoreError>,
        /// The failure raised by the abort.
        abort: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates an invalid source error.
    pub fn invalid_source(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an internal inconsistency error.
    pub fn internal_inconsistency(message: impl Into<String>) -> Self {
        Self::InternalInconsistency {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Attaches the failure of a follow-up abort to this error.
    #[must_use]
    pub fn with_abort_failure(self, abort: CoreError) -> Self {
        Self::AbortFailed {
            cause: Box::new(self),
            abort: Box::new(abort),
        }
    }

    /// Returns the original failure, looking through abort failures.
    #[must_use]
    pub fn cause(&self) -> &CoreError {
        match self {
            Self::AbortFailed { cause, .. } => cause.cause(),
            other => other,
        }
    }

    /// Returns true if this is an unknown-transaction lookup failure.
    #[must_use]
    pub fn is_unknown_transaction(&self) -> bool {
        matches!(self, Self::UnknownTransaction { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::UnknownTransaction {
            id: TransactionId::new(7),
        };
        assert_eq!(err.to_string(), "unknown transaction txn:7");

        let err = CoreError::PayloadOutOfBounds {
            offset: 8,
            len: 4,
            size: 10,
        };
        assert!(err.to_string().contains("declared size 10"));
    }

    #[test]
    fn abort_failure_keeps_cause() {
        let cause = CoreError::from(StorageError::backend("write failed"));
        let abort = CoreError::from(StorageError::backend("delete failed"));
        let err = cause.with_abort_failure(abort);

        let message = err.to_string();
        assert!(message.contains("write failed"));
        assert!(message.contains("delete failed"));
        assert!(matches!(err.cause(), CoreError::Storage(_)));
    }

    #[test]
    fn unknown_transaction_predicate() {
        let err = CoreError::UnknownTransaction {
            id: TransactionId::new(1),
        };
        assert!(err.is_unknown_transaction());
        assert!(!CoreError::codec("x").is_unknown_transaction());
    }
}
