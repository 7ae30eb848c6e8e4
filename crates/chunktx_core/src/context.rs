//! Execution context supplied by the host for each call.

use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Tenant identity and storage scope for one `init`, `commit` or `abort`.
///
/// Contexts are created per invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    tenant_id: Uuid,
    storage_root: PathBuf,
}

impl ExecutionContext {
    /// Creates a context for `tenant_id` rooted at `storage_root`.
    pub fn new(tenant_id: Uuid, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            tenant_id,
            storage_root: storage_root.into(),
        }
    }

    /// Returns the tenant this call runs on behalf of.
    #[must_use]
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// Returns the directory scoping all temporary and final documents.
    #[must_use]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

/// Supplies a fresh [`ExecutionContext`] for every processor call.
pub trait ContextProvider: Send + Sync + fmt::Debug {
    /// Returns the context for the current call.
    fn context(&self) -> ExecutionContext;
}

/// A provider that always returns the same tenant and storage root.
#[derive(Debug, Clone)]
pub struct FixedContext {
    tenant_id: Uuid,
    storage_root: PathBuf,
}

impl FixedContext {
    /// Creates a provider for one tenant.
    pub fn new(tenant_id: Uuid, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            tenant_id,
            storage_root: storage_root.into(),
        }
    }

    /// Creates a provider for a freshly generated tenant id.
    pub fn anonymous(storage_root: impl Into<PathBuf>) -> Self {
        Self::new(Uuid::new_v4(), storage_root)
    }
}

impl ContextProvider for FixedContext {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.tenant_id, self.storage_root.clone())
    }
}
