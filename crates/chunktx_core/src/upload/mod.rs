//! Chunked file upload.
//!
//! A file is described by an [`UploadHeader`], split into [`UploadPayload`]s
//! by a [`PayloadIterator`], and written by an [`UploadTransaction`] into a
//! temporary document that is renamed into place once every byte arrived.
//!
//! ```rust,ignore
//! let config = Config::new().storage_root("/srv/uploads").chunk_size(4096);
//! let processor = upload::file_processor(&config)?;
//! let header = UploadHeader::from_file("report.pdf")?;
//! let report = upload::upload(&processor, &header, config.chunk_size)?;
//! assert_eq!(report.outcome, Outcome::Commit);
//! ```

mod coverage;
mod header;
mod iterator;
mod payload;
mod transaction;

pub use coverage::Coverage;
pub use header::UploadHeader;
pub use iterator::PayloadIterator;
pub use payload::{checksum, UploadPayload};
pub use transaction::UploadTransaction;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::processor::TransactionProcessor;
use crate::transaction::{Outcome, Transaction, TransactionFactory};
use crate::types::TransactionId;
use chunktx_storage::{DocumentBackend, FileDocumentBackend};
use std::sync::Arc;
use tracing::{debug, warn};

/// A processor of upload transactions.
pub type UploadProcessor = TransactionProcessor<UploadHeader, UploadPayload>;

/// Creates [`UploadTransaction`]s over a shared backend.
#[derive(Debug, Clone)]
pub struct UploadTransactionFactory {
    backend: Arc<dyn DocumentBackend>,
}

impl UploadTransactionFactory {
    /// Creates a factory writing through `backend`.
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl TransactionFactory<UploadHeader, UploadPayload> for UploadTransactionFactory {
    fn new_transaction(&self) -> Box<dyn Transaction<UploadHeader, UploadPayload>> {
        Box::new(UploadTransaction::new(Arc::clone(&self.backend)))
    }
}

/// Builds an upload processor over `backend` as `config` describes.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn processor(config: &Config, backend: Arc<dyn DocumentBackend>) -> CoreResult<UploadProcessor> {
    config.validate()?;
    let factory = UploadTransactionFactory::new(backend);
    let contexts = Arc::new(config.context());
    Ok(if config.serial {
        TransactionProcessor::serial(factory, contexts)
    } else {
        TransactionProcessor::new(factory, contexts)
    })
}

/// Builds an upload processor over the local filesystem.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn file_processor(config: &Config) -> CoreResult<UploadProcessor> {
    let backend = FileDocumentBackend::new().with_sync(config.sync_on_commit);
    processor(config, Arc::new(backend))
}

/// Summary of a driven upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Id the transaction ran under, or [`TransactionId::NONE`] if it ended
    /// during `init`.
    pub transaction_id: TransactionId,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Number of payloads handed to the processor.
    pub chunks: u64,
}

/// Drives one upload from `init` through every payload of `header`'s source.
///
/// If the source cannot be read partway the transaction is aborted before the
/// read error is returned.
///
/// # Errors
///
/// Returns the first error raised by the processor or the source.
pub fn upload(
    processor: &UploadProcessor,
    header: &UploadHeader,
    chunk_size: usize,
) -> CoreResult<UploadReport> {
    let init = processor.init(header)?;
    let id = init.transaction_id;
    if init.outcome.is_terminal() {
        return Ok(UploadReport {
            transaction_id: id,
            outcome: init.outcome,
            chunks: 0,
        });
    }

    let payloads = match header.payloads(chunk_size) {
        Ok(payloads) => payloads,
        Err(e) => return Err(give_up(processor, id, e)),
    };

    let mut chunks = 0;
    for payload in payloads {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => return Err(give_up(processor, id, e)),
        };
        chunks += 1;
        let result = processor.process(id, payload)?;
        if result.outcome.is_terminal() {
            debug!(%id, outcome = %result.outcome, chunks, "upload finished");
            return Ok(UploadReport {
                transaction_id: id,
                outcome: result.outcome,
                chunks,
            });
        }
    }

    let incomplete = CoreError::internal_inconsistency(format!(
        "source exhausted after {chunks} chunks without completing the upload"
    ));
    Err(give_up(processor, id, incomplete))
}

fn give_up(processor: &UploadProcessor, id: TransactionId, cause: CoreError) -> CoreError {
    warn!(%id, error = %cause, "abandoning upload");
    match processor.abort(id) {
        Ok(()) => cause,
        Err(abort) => cause.with_abort_failure(abort),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunktx_storage::InMemoryDocumentBackend;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn memory_processor(serial: bool) -> (InMemoryDocumentBackend, UploadProcessor) {
        let backend = InMemoryDocumentBackend::new();
        let config = Config::new().storage_root("/tenant").serial(serial);
        let processor = processor(&config, Arc::new(backend.clone())).unwrap();
        (backend, processor)
    }

    #[test]
    fn upload_publishes_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        fs::write(&source, b"0123456789").unwrap();

        let (backend, processor) = memory_processor(false);
        let header = UploadHeader::from_file(&source).unwrap();
        let report = upload(&processor, &header, 4).unwrap();

        assert_eq!(report.outcome, Outcome::Commit);
        assert_eq!(report.chunks, 3);
        assert_eq!(
            backend.document(Path::new("/tenant/a.bin")).unwrap(),
            b"0123456789"
        );
        assert_eq!(processor.in_flight(), 0);
    }

    #[test]
    fn empty_source_commits_during_init() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("empty.bin");
        fs::write(&source, b"").unwrap();

        let (backend, processor) = memory_processor(true);
        let header = UploadHeader::from_file(&source).unwrap();
        let report = upload(&processor, &header, 4).unwrap();

        assert_eq!(report.transaction_id, TransactionId::NONE);
        assert_eq!(report.chunks, 0);
        assert_eq!(backend.paths(), vec![Path::new("/tenant/empty.bin").to_path_buf()]);
    }

    #[test]
    fn shrunken_source_aborts() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.bin");
        fs::write(&source, b"0123456789").unwrap();
        let header = UploadHeader::from_file(&source).unwrap();
        fs::write(&source, b"0123").unwrap();

        let (backend, processor) = memory_processor(false);
        let err = upload(&processor, &header, 4).unwrap_err();

        assert!(matches!(err, CoreError::SourceRead { offset: 4, .. }));
        assert!(backend.is_empty());
        assert_eq!(processor.in_flight(), 0);
    }

    #[test]
    fn zero_chunk_size_config_rejected() {
        let config = Config::new().chunk_size(0);
        assert!(processor(&config, Arc::new(InMemoryDocumentBackend::new())).is_err());
    }

    #[test]
    fn factory_builds_fresh_transactions() {
        let factory = UploadTransactionFactory::new(Arc::new(InMemoryDocumentBackend::new()));
        let a = factory.new_transaction();
        let b = factory.new_transaction();
        assert!(format!("{a:?}").contains("UploadTransaction"));
        assert!(format!("{b:?}").contains("header: None"));
    }
}
