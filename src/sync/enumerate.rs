//! Expansion of input paths into concrete files.
//!
//! Inputs may be files or directories; directories are walked recursively.
//! Symlinked directories are never descended into, so link cycles cannot
//! make the walk loop.

use jwalk::{Parallelism, WalkDir};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Expand `paths` into the deduplicated set of regular files they name.
///
/// Missing paths and paths that are neither files nor directories are
/// skipped with a warning; the run continues.
pub fn enumerate<S: AsRef<str>>(paths: &[S]) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    info!(count = paths.len(), "listing files under input paths");

    for raw in paths {
        let raw = raw.as_ref();
        let path = Path::new(raw);

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = raw, "skipping non-existent path");
                continue;
            }
            Err(e) => {
                warn!(path = raw, error = %e, "skipping inaccessible path");
                continue;
            }
        };

        if metadata.is_file() {
            files.insert(raw.to_string());
        } else if metadata.is_dir() {
            let found = walk_dir(path);
            debug!(path = raw, count = found.len(), "found files under directory");
            files.extend(found);
        } else {
            warn!(path = raw, "skipping unknown path type");
        }
    }

    debug!(count = files.len(), "done finding candidate files");
    files
}

/// Collect every regular file at any depth under `root`.
fn walk_dir(root: &Path) -> Vec<String> {
    let mut found = Vec::new();

    for entry_result in WalkDir::new(root)
        .parallelism(Parallelism::RayonNewPool(0))
        .skip_hidden(false)
        .follow_links(false)
    {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "error walking directory");
                continue;
            }
        };

        let file_type = entry.file_type();
        let path = entry.path();

        let is_regular = if file_type.is_file() {
            true
        } else if file_type.is_symlink() {
            // Links to files count; links to directories are not followed
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => true,
                Ok(_) => {
                    debug!(path = %path.display(), "not following symlink");
                    false
                }
                Err(_) => {
                    debug!(path = %path.display(), "skipping dangling symlink");
                    false
                }
            }
        } else {
            false
        };

        if !is_regular {
            continue;
        }

        match path.to_str() {
            Some(path_str) => found.push(path_str.to_string()),
            None => warn!(path = %path.display(), "skipping path that is not valid UTF-8"),
        }
    }

    found
}
