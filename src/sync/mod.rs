//! One-way sync of local files to a remote store.
//!
//! Files are identified by content hash; only files that are missing
//! remotely or whose hash changed are uploaded.

pub mod engine;
pub mod enumerate;
pub mod identity;
pub mod planner;
pub mod stats;

pub use engine::{IdentityFailurePolicy, SyncConfig, SyncEngine};
pub use enumerate::enumerate;
pub use identity::{identity_of, FileIdentity};
pub use planner::{inventory_key, plan, FileInventory, SyncPlan};
pub use stats::{Checkpoints, RunStatistics};
