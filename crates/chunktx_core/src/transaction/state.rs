//! Transaction lifecycle state.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionState {
    /// Transaction is active and can accept payloads.
    #[default]
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

impl TransactionState {
    /// Checks if the transaction is still active.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Ensures the transaction is active.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InternalInconsistency`] once a terminal state
    /// has been reached.
    pub fn ensure_active(self) -> CoreResult<()> {
        match self {
            Self::Active => Ok(()),
            Self::Committed => Err(CoreError::internal_inconsistency(
                "transaction already committed",
            )),
            Self::Aborted => Err(CoreError::internal_inconsistency(
                "transaction already aborted",
            )),
        }
    }
}

/// What the engine should do after an `init` or `process` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// More payloads are expected.
    Continue,
    /// All work is applied; publish the result.
    Commit,
    /// Discard all work.
    Abort,
    /// The payload was ignored without affecting completion.
    Skip,
}

impl Outcome {
    /// Returns true for `Commit` and `Abort`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Commit | Self::Abort)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continue => "CONTINUE",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Skip => "SKIP",
        };
        f.write_str(name)
    }
}

/// The result of one `init` or `process` step.
///
/// `detail` is an opaque payload the transaction hands back to the caller,
/// for example a pre-check response the initiator can plan around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// What happens next.
    pub outcome: Outcome,
    /// Optional transaction-specific detail.
    pub detail: Option<Vec<u8>>,
}

impl Reply {
    /// Creates a reply without detail.
    #[must_use]
    pub const fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            detail: None,
        }
    }

    /// A `Continue` reply.
    #[must_use]
    pub const fn proceed() -> Self {
        Self::new(Outcome::Continue)
    }

    /// A `Commit` reply.
    #[must_use]
    pub const fn commit() -> Self {
        Self::new(Outcome::Commit)
    }

    /// An `Abort` reply.
    #[must_use]
    pub const fn abort() -> Self {
        Self::new(Outcome::Abort)
    }

    /// A `Skip` reply.
    #[must_use]
    pub const fn skip() -> Self {
        Self::new(Outcome::Skip)
    }

    /// Attaches detail to the reply.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Vec<u8>>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_active() {
        let state = TransactionState::default();
        assert!(state.is_active());
        assert!(state.ensure_active().is_ok());
    }

    #[test]
    fn terminal_states_reject_work() {
        assert!(matches!(
            TransactionState::Committed.ensure_active(),
            Err(CoreError::InternalInconsistency { .. })
        ));
        assert!(matches!(
            TransactionState::Aborted.ensure_active(),
            Err(CoreError::InternalInconsistency { .. })
        ));
    }

    #[test]
    fn terminal_outcomes() {
        assert!(Outcome::Commit.is_terminal());
        assert!(Outcome::Abort.is_terminal());
        assert!(!Outcome::Continue.is_terminal());
        assert!(!Outcome::Skip.is_terminal());
    }

    #[test]
    fn reply_detail() {
        let reply = Reply::proceed().with_detail(b"resume-at:4".to_vec());
        assert_eq!(reply.outcome, Outcome::Continue);
        assert_eq!(reply.detail.as_deref(), Some(&b"resume-at:4"[..]));
        assert_eq!(Outcome::Commit.to_string(), "COMMIT");
    }
}
