//! Processor configuration.

use crate::context::FixedContext;
use crate::error::{CoreError, CoreResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Default chunk size used when splitting sources into payloads.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Configuration for building an upload processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory that scopes all temporary and published documents.
    pub storage_root: PathBuf,

    /// Size of each payload produced from a source file.
    pub chunk_size: usize,

    /// Tenant the processor acts for. A random tenant is used if unset.
    pub tenant_id: Option<Uuid>,

    /// Whether to sync documents to disk before publishing them.
    pub sync_on_commit: bool,

    /// Whether to allow only one in-flight transaction at a time.
    pub serial: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: std::env::temp_dir(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            tenant_id: None,
            sync_on_commit: true,
            serial: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage root.
    #[must_use]
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Sets the payload chunk size.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the tenant id.
    #[must_use]
    pub const fn tenant_id(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets whether to sync documents before publishing.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether the processor keeps a single in-flight slot.
    #[must_use]
    pub const fn serial(mut self, value: bool) -> Self {
        self.serial = value;
        self
    }

    /// Checks the configuration for values no processor can run with.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for a zero chunk size.
    pub fn validate(&self) -> CoreResult<()> {
        if self.chunk_size == 0 {
            return Err(CoreError::invalid_operation("chunk size must be positive"));
        }
        Ok(())
    }

    /// Returns a context provider for the configured tenant and root.
    #[must_use]
    pub fn context(&self) -> FixedContext {
        match self.tenant_id {
            Some(tenant_id) => FixedContext::new(tenant_id, self.storage_root.clone()),
            None => FixedContext::anonymous(self.storage_root.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextProvider;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.sync_on_commit);
        assert!(!config.serial);
        assert!(config.tenant_id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let tenant = Uuid::new_v4();
        let config = Config::new()
            .storage_root("/srv/uploads")
            .chunk_size(4096)
            .tenant_id(tenant)
            .sync_on_commit(false)
            .serial(true);

        assert_eq!(config.chunk_size, 4096);
        assert!(!config.sync_on_commit);
        assert!(config.serial);

        let ctx = config.context().context();
        assert_eq!(ctx.tenant_id(), tenant);
        assert_eq!(ctx.storage_root(), std::path::Path::new("/srv/uploads"));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let config = Config::new().chunk_size(0);
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidOperation { .. })
        ));
    }
}
