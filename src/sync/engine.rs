//! Sync engine for one-way uploads to a remote store.
//!
//! Drives a run through its phases: enumerate, identify, query remote,
//! plan, upload. Each phase completes before the next one starts.

use chrono::Local;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::store::RemoteStore;
use crate::sync::enumerate::enumerate;
use crate::sync::identity::{identity_of, FileIdentity};
use crate::sync::planner::{inventory_key, plan, FileInventory, SyncPlan};
use crate::sync::stats::{Checkpoints, RunStatistics};

/// What to do when a file's identity cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityFailurePolicy {
    /// Fail the whole run with the first error in sorted path order.
    ///
    /// Hashing is not cut short: every file is hashed before the error is
    /// returned, so the reported path does not depend on thread scheduling.
    #[default]
    Abort,
    /// Log the failure, report the path in the statistics and carry on.
    Skip,
}

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of uploads in flight.
    pub upload_concurrency: usize,
    /// Worker threads used to hash files.
    pub hash_threads: usize,
    /// Handling of unreadable files.
    pub identity_failure: IdentityFailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: 4,
            hash_threads: num_cpus::get(),
            identity_failure: IdentityFailurePolicy::Abort,
        }
    }
}

/// Local inventory plus the paths it was built from.
#[derive(Debug, Default)]
struct LocalFiles {
    inventory: FileInventory,
    /// Inventory key to local path as enumerated.
    sources: HashMap<String, String>,
    failed: Vec<String>,
}

/// Sync engine for orchestrating upload runs.
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new sync engine.
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronize `paths` (files or directories) to the remote store.
    ///
    /// Upload failures are reported in the returned statistics. A failing
    /// remote listing, or an unreadable file under
    /// [`IdentityFailurePolicy::Abort`], aborts the run.
    pub async fn run<S: AsRef<str>>(&self, paths: &[S]) -> Result<RunStatistics, SyncError> {
        info!(store = self.store.name(), inputs = paths.len(), "starting run");
        let start = Local::now();

        let inputs: Vec<String> = paths.iter().map(|p| p.as_ref().to_string()).collect();
        let all_files = tokio::task::spawn_blocking(move || enumerate(inputs.as_slice())).await?;
        let enumerated = Local::now();
        let total_files = all_files.len();

        let local = self.identify(all_files).await?;
        let total_size: u64 = local.inventory.values().map(|f| f.size_bytes).sum();
        info!(files = local.inventory.len(), bytes = total_size, "source files identified");
        let identified = Local::now();

        let remote = self.store.list_files().await?;
        info!(files = remote.len(), "remote files listed");
        let queried = Local::now();

        let to_upload = plan(&local.inventory, &remote);
        info!(
            files = to_upload.len(),
            bytes = to_upload.total_bytes(),
            "files selected for upload"
        );
        let planned = Local::now();

        let (errors, uploaded_bytes) = self.upload(&to_upload, &local.sources).await;
        let uploaded = Local::now();

        info!(
            uploaded = to_upload.len() - errors.len(),
            failed = errors.len(),
            bytes = uploaded_bytes,
            "run finished"
        );

        let checkpoints = Checkpoints {
            start,
            enumerated,
            identified,
            queried,
            planned,
            uploaded,
            end: Local::now(),
        };

        Ok(RunStatistics::new(
            checkpoints,
            total_files,
            to_upload.len(),
            total_size,
            uploaded_bytes,
            errors,
            local.failed,
        ))
    }

    /// Compute identities for every file on a bounded thread pool.
    async fn identify(&self, files: BTreeSet<String>) -> Result<LocalFiles, SyncError> {
        let threads = self.config.hash_threads.max(1);
        let files: Vec<String> = files.into_iter().collect();
        info!(count = files.len(), threads, "computing file identities");

        let results = tokio::task::spawn_blocking(move || -> Result<_, SyncError> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("identity-{}", i))
                .build()?;

            Ok(pool.install(|| {
                files
                    .into_par_iter()
                    .map(|path| {
                        let identity = identity_of(Path::new(&path));
                        (path, identity)
                    })
                    .collect::<Vec<_>>()
            }))
        })
        .await??;

        collect_identities(results, self.config.identity_failure)
    }

    /// Upload every planned file. Returns the failed paths and the bytes
    /// uploaded successfully.
    async fn upload(&self, to_upload: &SyncPlan, sources: &HashMap<String, String>) -> (Vec<String>, u64) {
        let semaphore = Arc::new(Semaphore::new(self.config.upload_concurrency.max(1)));
        let mut handles = Vec::with_capacity(to_upload.len());

        // Dispatch in sorted key order
        for (key, identity) in to_upload.iter() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let path = sources.get(key).cloned().unwrap_or_else(|| key.clone());
            let store = Arc::clone(&self.store);
            let identity = identity.clone();
            let task_path = path.clone();
            let size = identity.size_bytes;

            let handle = tokio::spawn(async move {
                debug!(path = %task_path, size = identity.size_bytes, "uploading file");
                let result = store.put_file(&task_path, &identity).await;
                drop(permit);
                result
            });

            handles.push((path, size, handle));
        }

        let mut errors = Vec::new();
        let mut uploaded_bytes = 0u64;

        for (path, size, handle) in handles {
            match handle.await {
                Ok(Ok(())) => uploaded_bytes += size,
                Ok(Err(err)) => {
                    error!(path = %path, error = %err, "error uploading file");
                    errors.push(path);
                }
                Err(err) => {
                    error!(path = %path, error = %err, "upload task failed");
                    errors.push(path);
                }
            }
        }

        errors.sort();
        (errors, uploaded_bytes)
    }
}

/// Fold per-file identity results, in sorted path order, into the local
/// inventory according to `policy`.
fn collect_identities(
    results: Vec<(String, Result<FileIdentity, SyncError>)>,
    policy: IdentityFailurePolicy,
) -> Result<LocalFiles, SyncError> {
    let mut local = LocalFiles::default();

    for (path, result) in results {
        let identity = match result {
            Ok(identity) => identity,
            Err(err) => match policy {
                IdentityFailurePolicy::Abort => return Err(err),
                IdentityFailurePolicy::Skip => {
                    error!(path = %path, error = %err, "failed to compute file identity, skipping");
                    local.failed.push(path);
                    continue;
                }
            },
        };

        let key = inventory_key(&path);
        if let Some(existing) = local.sources.get(&key) {
            warn!(path = %path, existing = %existing, key = %key, "skipping path that maps to an existing key");
            continue;
        }

        debug!(path = %path, hash = %identity.content_hash, "identified file");
        local.sources.insert(key.clone(), path);
        local.inventory.insert(key, identity);
    }

    Ok(local)
}
