//! The chunked upload transaction.

use crate::context::ExecutionContext;
use crate::error::{CoreError, CoreResult};
use crate::transaction::{Reply, Transaction, TransactionState};
use crate::upload::{Coverage, UploadHeader, UploadPayload};
use chunktx_storage::{DocumentBackend, StorageError, TempDocument, WriteChannel};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Writes chunks into a private temporary document and publishes it once
/// every byte of the declared size has been written.
///
/// - `init` creates `<name>.<uuid>.tmp` under the storage root and opens it
/// - `process` writes each chunk at its offset; overlapping chunks overwrite
/// - `commit` closes the channel and renames the document into place
/// - `abort` closes the channel and deletes the document
///
/// A transaction dropped while it still owns its temporary document deletes
/// the document.
pub struct UploadTransaction {
    backend: Arc<dyn DocumentBackend>,
    header: Option<UploadHeader>,
    document: Option<TempDocument>,
    channel: Option<Box<dyn WriteChannel>>,
    coverage: Coverage,
    chunks: u64,
    state: TransactionState,
}

impl UploadTransaction {
    /// Creates an uninitialized transaction writing through `backend`.
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            header: None,
            document: None,
            channel: None,
            coverage: Coverage::new(),
            chunks: 0,
            state: TransactionState::Active,
        }
    }

    /// Returns the header, once initialized.
    #[must_use]
    pub fn header(&self) -> Option<&UploadHeader> {
        self.header.as_ref()
    }

    /// Returns the temporary document while the transaction owns one.
    #[must_use]
    pub fn document(&self) -> Option<&TempDocument> {
        self.document.as_ref()
    }

    /// Returns the number of chunks written.
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Returns the number of distinct bytes written.
    #[must_use]
    pub fn bytes_applied(&self) -> u64 {
        self.coverage.covered()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn declared_size(&self) -> CoreResult<u64> {
        self.header
            .as_ref()
            .map(UploadHeader::size)
            .ok_or_else(|| CoreError::internal_inconsistency("transaction not initialized"))
    }
}

impl Transaction<UploadHeader, UploadPayload> for UploadTransaction {
    fn init(&mut self, ctx: &ExecutionContext, header: &UploadHeader) -> CoreResult<Reply> {
        self.state.ensure_active()?;
        if self.header.is_some() {
            return Err(CoreError::internal_inconsistency(
                "transaction already initialized",
            ));
        }
        header.destination()?;
        self.header = Some(header.clone());

        let name = header.name();
        let root = ctx.storage_root();
        let allocation = |source: StorageError| CoreError::ResourceAllocation {
            name: name.clone(),
            root: root.to_path_buf(),
            source,
        };

        let document = self
            .backend
            .create_temporary(root, &name)
            .map_err(allocation)?;
        debug!(document = %document, tenant = %ctx.tenant_id(), "allocated temporary document");
        // owned from here on, so abort can clean up a failed open
        let document = self.document.insert(document);
        self.channel = Some(self.backend.open_write(document).map_err(allocation)?);

        if header.size() == 0 {
            Ok(Reply::commit())
        } else {
            Ok(Reply::proceed())
        }
    }

    fn process(&mut self, payload: UploadPayload) -> CoreResult<Reply> {
        self.state.ensure_active()?;
        let size = self.declared_size()?;
        if payload.is_empty() {
            return Ok(Reply::skip());
        }
        payload.verify()?;
        let end = payload
            .end()
            .filter(|&end| end <= size)
            .ok_or(CoreError::PayloadOutOfBounds {
                offset: payload.offset(),
                len: payload.len(),
                size,
            })?;

        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| CoreError::internal_inconsistency("write channel is closed"))?;
        channel.write_at(payload.offset(), payload.data())?;
        self.coverage.insert(payload.offset(), end);
        self.chunks += 1;

        if self.coverage.is_complete(size) {
            Ok(Reply::commit())
        } else {
            Ok(Reply::proceed())
        }
    }

    fn commit(&mut self, ctx: &ExecutionContext) -> CoreResult<()> {
        self.state.ensure_active()?;
        let size = self.declared_size()?;
        if !self.coverage.is_complete(size) {
            return Err(CoreError::internal_inconsistency(format!(
                "commit with {} of {size} bytes applied",
                self.coverage.covered()
            )));
        }

        let channel = self
            .channel
            .take()
            .ok_or_else(|| CoreError::internal_inconsistency("write channel already closed"))?;
        channel.close()?;

        let document = self
            .document
            .as_ref()
            .ok_or_else(|| CoreError::internal_inconsistency("no temporary document"))?;
        let destination = match &self.header {
            Some(header) => ctx.storage_root().join(header.destination()?),
            None => return Err(CoreError::internal_inconsistency("transaction not initialized")),
        };

        match self.backend.rename(document, &destination) {
            Ok(()) => {}
            Err(StorageError::NotFound { path }) => {
                return Err(CoreError::internal_inconsistency(format!(
                    "temporary document {} vanished before commit",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        }

        self.document = None;
        self.state = TransactionState::Committed;
        info!(path = %destination.display(), bytes = size, chunks = self.chunks, "published upload");
        Ok(())
    }

    fn abort(&mut self, _ctx: &ExecutionContext) -> CoreResult<()> {
        match self.state {
            TransactionState::Committed => {
                return Err(CoreError::internal_inconsistency(
                    "abort after commit",
                ))
            }
            TransactionState::Aborted => return Ok(()),
            TransactionState::Active => {}
        }
        self.state = TransactionState::Aborted;

        let closed = match self.channel.take() {
            Some(channel) => channel.close(),
            None => Ok(()),
        };
        let deleted = match self.document.take() {
            Some(document) => {
                debug!(document = %document, "deleting temporary document");
                self.backend.delete(&document).map(|_| ())
            }
            None => Ok(()),
        };

        closed?;
        deleted?;
        Ok(())
    }
}

impl Drop for UploadTransaction {
    fn drop(&mut self) {
        self.channel = None;
        if let Some(document) = self.document.take() {
            match self.backend.delete(&document) {
                Ok(true) => warn!(document = %document, "discarded abandoned temporary document"),
                Ok(false) => {}
                Err(e) => {
                    warn!(document = %document, error = %e, "failed to discard temporary document")
                }
            }
        }
    }
}

impl fmt::Debug for UploadTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTransaction")
            .field("header", &self.header)
            .field("document", &self.document)
            .field("bytes_applied", &self.coverage.covered())
            .field("chunks", &self.chunks)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
