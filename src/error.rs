// Centralized error handling module
// Error types for the sync engine, the remote store and configuration loading

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a remote store.
///
/// `put_file` failures are isolated per file by the engine; a failing
/// `list_files` aborts the whole run.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The storage service rejected or could not complete an operation
    #[error("storage operation on '{key}' failed: {source}")]
    Storage {
        key: String,
        #[source]
        source: opendal::Error,
    },

    /// The local file could not be read for upload
    #[error("failed to read local file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store was constructed with an unusable configuration
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// Any other backend-specific failure
    #[error("{0}")]
    Other(String),
}

/// Fatal errors that abort a sync run before statistics are produced.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local file could not be read while computing its identity
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The remote inventory could not be fetched
    #[error("remote listing failed: {0}")]
    Backend(#[from] BackendError),

    /// The hashing thread pool could not be created
    #[error("failed to start identity workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// A blocking worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// A short hint for the operator, shown alongside fatal errors
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                Some("Check file permissions, or pass --skip-unreadable to continue without it")
            }
            SyncError::Io { .. } => {
                Some("The file may have been removed during the run; pass --skip-unreadable to continue without it")
            }
            SyncError::Backend(_) => Some("Check the bucket name, region, endpoint and credentials"),
            SyncError::Pool(_) | SyncError::Join(_) => None,
        }
    }
}

/// Errors loading the optional TOML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
