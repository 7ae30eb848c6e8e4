//! Transaction processor.
//!
//! The processor drives the [`Transaction`] state machine against a
//! [`Registry`] of in-flight transactions:
//!
//! ```text
//! init(header) ─► Continue ─► store ─► id
//!              ─► Commit   ─► commit ─► NONE
//!              ─► Abort    ─► abort  ─► NONE
//!
//! process(id, payload) ─► Continue/Skip ─► stays registered
//!                      ─► Commit/Abort  ─► commit/abort, then remove
//! ```
//!
//! Any error raised by `init` or `process` aborts the transaction before the
//! error reaches the caller. If that abort fails as well, both failures are
//! returned together as [`CoreError::AbortFailed`].

mod registry;

pub use registry::{MapRegistry, Registry, SerialRegistry, Slot};

use crate::context::{ContextProvider, ExecutionContext};
use crate::error::{CoreError, CoreResult};
use crate::transaction::{Outcome, Reply, Transaction, TransactionFactory, TransactionState};
use crate::types::TransactionId;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of [`TransactionProcessor::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitResult {
    /// Id to pass to `process`, or [`TransactionId::NONE`] if the
    /// transaction already ended.
    pub transaction_id: TransactionId,
    /// Outcome of the init step.
    pub outcome: Outcome,
    /// Transaction-specific detail.
    pub detail: Option<Vec<u8>>,
}

/// Result of [`TransactionProcessor::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Outcome of the process step.
    pub outcome: Outcome,
    /// Transaction-specific detail.
    pub detail: Option<Vec<u8>>,
}

impl From<Reply> for ProcessResult {
    fn from(reply: Reply) -> Self {
        Self {
            outcome: reply.outcome,
            detail: reply.detail,
        }
    }
}

/// A transaction together with the lifecycle state the processor enforces.
#[derive(Debug)]
pub struct InFlight<H, P> {
    transaction: Box<dyn Transaction<H, P>>,
    state: TransactionState,
}

impl<H, P> InFlight<H, P> {
    fn new(transaction: Box<dyn Transaction<H, P>>) -> Self {
        Self {
            transaction,
            state: TransactionState::Active,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Commits; a failed commit is followed by an abort so nothing leaks.
    fn commit(&mut self, ctx: &ExecutionContext) -> CoreResult<()> {
        self.state.ensure_active()?;
        match self.transaction.commit(ctx) {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(e) => Err(self.fail(ctx, e)),
        }
    }

    fn abort(&mut self, ctx: &ExecutionContext) -> CoreResult<()> {
        self.state.ensure_active()?;
        self.state = TransactionState::Aborted;
        self.transaction.abort(ctx)
    }

    /// Aborts after `cause`, returning the error to surface.
    fn fail(&mut self, ctx: &ExecutionContext, cause: CoreError) -> CoreError {
        self.state = TransactionState::Aborted;
        match self.transaction.abort(ctx) {
            Ok(()) => cause,
            Err(abort) => cause.with_abort_failure(abort),
        }
    }
}

/// Drives transactions from `init` through `process` to commit or abort.
///
/// The processor is `Send + Sync`; calls for different ids never block one
/// another beyond the registry lookup. Calls for the same id are serialized.
///
/// # Example
///
/// ```rust,ignore
/// let processor = TransactionProcessor::new(factory, Arc::new(FixedContext::anonymous(root)));
/// let init = processor.init(&header)?;
/// for payload in header.payloads(4096)? {
///     let result = processor.process(init.transaction_id, payload?)?;
/// }
/// ```
pub struct TransactionProcessor<H, P> {
    factory: Box<dyn TransactionFactory<H, P>>,
    registry: Box<dyn Registry<InFlight<H, P>>>,
    contexts: Arc<dyn ContextProvider>,
}

impl<H: 'static, P: 'static> TransactionProcessor<H, P> {
    /// Creates a processor that allows any number of in-flight transactions.
    pub fn new(
        factory: impl TransactionFactory<H, P> + 'static,
        contexts: Arc<dyn ContextProvider>,
    ) -> Self {
        Self::with_registry(factory, MapRegistry::new(), contexts)
    }

    /// Creates a processor with a single in-flight slot.
    ///
    /// A second `init` while a transaction is in flight aborts the first.
    pub fn serial(
        factory: impl TransactionFactory<H, P> + 'static,
        contexts: Arc<dyn ContextProvider>,
    ) -> Self {
        Self::with_registry(factory, SerialRegistry::new(), contexts)
    }

    /// Creates a processor over a custom registry.
    pub fn with_registry(
        factory: impl TransactionFactory<H, P> + 'static,
        registry: impl Registry<InFlight<H, P>> + 'static,
        contexts: Arc<dyn ContextProvider>,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            registry: Box::new(registry),
            contexts,
        }
    }

    /// Starts a new transaction from `header`.
    ///
    /// # Errors
    ///
    /// Returns the error raised by the transaction's `init` (after aborting
    /// it), or by the immediate commit/abort when `init` reached a terminal
    /// outcome.
    pub fn init(&self, header: &H) -> CoreResult<InitResult> {
        for (id, slot) in self.registry.evict_for_store() {
            self.force_end(id, &slot);
        }

        let ctx = self.contexts.context();
        let mut entry = InFlight::new(self.factory.new_transaction());

        let reply = match entry.transaction.init(&ctx, header) {
            Ok(reply) => reply,
            Err(e) => return Err(entry.fail(&ctx, e)),
        };

        let transaction_id = match reply.outcome {
            Outcome::Continue | Outcome::Skip => {
                let id = self.registry.store(entry);
                debug!(%id, tenant = %ctx.tenant_id(), "transaction registered");
                id
            }
            Outcome::Commit => {
                entry.commit(&ctx)?;
                debug!(tenant = %ctx.tenant_id(), "transaction committed during init");
                TransactionId::NONE
            }
            Outcome::Abort => {
                entry.abort(&ctx)?;
                debug!(tenant = %ctx.tenant_id(), "transaction rejected during init");
                TransactionId::NONE
            }
        };

        Ok(InitResult {
            transaction_id,
            outcome: reply.outcome,
            detail: reply.detail,
        })
    }

    /// Applies `payload` to the transaction registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if no transaction is
    /// registered under `id`. Any other error means the transaction has been
    /// aborted and unregistered.
    pub fn process(&self, id: TransactionId, payload: P) -> CoreResult<ProcessResult> {
        let slot = self
            .registry
            .retrieve(id)
            .ok_or(CoreError::UnknownTransaction { id })?;
        let mut entry = slot.lock();
        if !entry.state.is_active() {
            // lost a race with the call that ended it
            return Err(CoreError::UnknownTransaction { id });
        }

        let ctx = self.contexts.context();
        let reply = match entry.transaction.process(payload) {
            Ok(reply) => reply,
            Err(e) => {
                let err = entry.fail(&ctx, e);
                self.registry.remove(id);
                warn!(%id, error = %err, "transaction aborted after failure");
                return Err(err);
            }
        };

        let finished = match reply.outcome {
            Outcome::Continue | Outcome::Skip => return Ok(reply.into()),
            Outcome::Commit => entry.commit(&ctx),
            Outcome::Abort => entry.abort(&ctx),
        };
        self.registry.remove(id);
        finished?;

        debug!(%id, outcome = %reply.outcome, "transaction ended");
        Ok(reply.into())
    }

    /// Aborts the transaction registered under `id`.
    ///
    /// Callers use this to give up on a transaction whose payloads can no
    /// longer be produced.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownTransaction`] if no transaction is
    /// registered under `id`, or the error raised by the abort.
    pub fn abort(&self, id: TransactionId) -> CoreResult<()> {
        let slot = self
            .registry
            .retrieve(id)
            .ok_or(CoreError::UnknownTransaction { id })?;
        let mut entry = slot.lock();
        if !entry.state.is_active() {
            return Err(CoreError::UnknownTransaction { id });
        }

        let ctx = self.contexts.context();
        let aborted = entry.abort(&ctx);
        self.registry.remove(id);
        aborted
    }

    /// Returns the number of in-flight transactions.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    fn force_end(&self, id: TransactionId, slot: &Slot<InFlight<H, P>>) {
        let mut entry = slot.lock();
        if !entry.state.is_active() {
            return;
        }
        warn!(%id, "abandoning in-flight transaction for a new one");
        if let Err(e) = entry.abort(&self.contexts.context()) {
            warn!(%id, error = %e, "failed to abort abandoned transaction");
        }
    }
}

impl<H, P> fmt::Debug for TransactionProcessor<H, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("in_flight", &self.registry.len())
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}
