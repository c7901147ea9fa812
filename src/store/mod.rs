pub mod object;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::sync::{FileIdentity, FileInventory};

pub use object::{ObjectStore, S3Options};

/// Remote storage consumed by the sync engine.
///
/// Implementations are shared across upload workers and must tolerate
/// concurrent `put_file` calls.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every stored object, keyed by its path relative to the configured
    /// prefix. The hash is that of the original (unencrypted) content.
    async fn list_files(&self) -> Result<FileInventory, BackendError>;

    /// Store the local file at `path`, attaching its identity as metadata.
    async fn put_file(&self, path: &str, identity: &FileIdentity) -> Result<(), BackendError>;

    /// Display name for diagnostics
    fn name(&self) -> &str;
}

/// Settings shared by every store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    /// Key prefix; always starts with `/`.
    pub prefix: String,
    /// When set, uploads are logged and reported as successful without
    /// writing anything.
    pub dry_run: bool,
}

impl StoreConfig {
    /// Configuration for `bucket` with the default `/` prefix.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: "/".to_string(),
            dry_run: false,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Default a missing prefix to `/` and make sure it starts with `/`.
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    match prefix {
        None => "/".to_string(),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{}", p),
    }
}
