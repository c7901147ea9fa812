//! Upload planning.
//!
//! Compares the local inventory against the remote one and selects every
//! file that is missing remotely or whose content hash differs.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::sync::identity::FileIdentity;

/// Mapping from inventory key to file identity.
pub type FileInventory = HashMap<String, FileIdentity>;

/// Files selected for upload, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    files: BTreeMap<String, FileIdentity>,
}

impl SyncPlan {
    /// Number of files to upload.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FileIdentity> {
        self.files.get(key)
    }

    /// Planned files in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileIdentity)> {
        self.files.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    /// Combined size of every planned file.
    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|f| f.size_bytes).sum()
    }
}

impl IntoIterator for SyncPlan {
    type Item = (String, FileIdentity);
    type IntoIter = std::collections::btree_map::IntoIter<String, FileIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// Select the subset of `local` that needs uploading.
///
/// A file is selected when its key is absent from `remote` or the remote
/// hash differs. Size and modification time are not compared, and keys
/// only present remotely are ignored.
pub fn plan(local: &FileInventory, remote: &FileInventory) -> SyncPlan {
    debug!(
        local = local.len(),
        remote = remote.len(),
        "comparing local files with remote inventory"
    );

    let files: BTreeMap<String, FileIdentity> = local
        .iter()
        .filter(|(key, identity)| match remote.get(*key) {
            Some(existing) => existing.content_hash != identity.content_hash,
            None => true,
        })
        .map(|(key, identity)| (key.clone(), identity.clone()))
        .collect();

    debug!(count = files.len(), "found files to upload");
    SyncPlan { files }
}

/// Key under which a local path is stored remotely, relative to the prefix.
///
/// Empty and `.` segments are dropped, the same way object paths are
/// normalized on write, so `/srv//www/./a.txt` and `srv/www/a.txt` share a
/// key.
pub fn inventory_key(path: &str) -> String {
    let normalized = if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_string()
    };
    normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
