// Library module for bucketsync
// Re-exports modules for use in integration tests and the binary

pub mod cli;
pub mod config;
pub mod error;
pub mod filelist;
pub mod store;
pub mod sync;

pub use error::{BackendError, ConfigError, SyncError};
pub use store::{ObjectStore, RemoteStore, StoreConfig};
pub use sync::{FileIdentity, FileInventory, RunStatistics, SyncConfig, SyncEngine, SyncPlan};
