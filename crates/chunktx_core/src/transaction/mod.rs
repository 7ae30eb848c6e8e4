//! The transaction contract.
//!
//! A transaction is driven through a fixed lifecycle:
//!
//! ```text
//! init ──► process* ──► commit
//!   │          │
//!   └──────────┴──────► abort
//! ```
//!
//! - **Exactly one terminal outcome**: every transaction ends in either
//!   `commit` or `abort`, never both
//! - **Cleanup on every exit path**: `abort` must tolerate an `init` that
//!   failed partway
//! - **No calls after the end**: once `commit` or `abort` ran, the
//!   processor forgets the transaction

mod state;

pub use state::{Outcome, Reply, TransactionState};

use crate::context::ExecutionContext;
use crate::error::CoreResult;
use std::fmt;

/// A multi-step operation identified by a header `H` and advanced by
/// payloads `P`.
///
/// Implementors only describe the steps. Registration, id assignment and
/// the abort-on-failure rule live in [`crate::TransactionProcessor`].
pub trait Transaction<H, P>: Send + fmt::Debug {
    /// Prepares the transaction from its header.
    ///
    /// Returns `Commit` when no payload will ever arrive, `Continue` when
    /// payloads are expected, or `Abort` to reject the header.
    ///
    /// # Errors
    ///
    /// Returns an error if resources cannot be allocated. The processor then
    /// calls [`Transaction::abort`].
    fn init(&mut self, ctx: &ExecutionContext, header: &H) -> CoreResult<Reply>;

    /// Applies one payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be applied. The processor then
    /// calls [`Transaction::abort`].
    fn process(&mut self, payload: P) -> CoreResult<Reply>;

    /// Publishes the applied work.
    ///
    /// # Errors
    ///
    /// Returns an error if publishing fails, or
    /// [`crate::CoreError::InternalInconsistency`] if the transaction
    /// already ended.
    fn commit(&mut self, ctx: &ExecutionContext) -> CoreResult<()>;

    /// Discards the applied work and releases every resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resources cannot be released.
    fn abort(&mut self, ctx: &ExecutionContext) -> CoreResult<()>;
}

/// Creates a fresh transaction instance for every `init`.
pub trait TransactionFactory<H, P>: Send + Sync {
    /// Returns a new, uninitialized transaction.
    fn new_transaction(&self) -> Box<dyn Transaction<H, P>>;
}

impl<H, P, F> TransactionFactory<H, P> for F
where
    F: Fn() -> Box<dyn Transaction<H, P>> + Send + Sync,
{
    fn new_transaction(&self) -> Box<dyn Transaction<H, P>> {
        self()
    }
}
