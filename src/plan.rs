use crate::fingerprint::{fingerprint_file, Fingerprint};
use crate::manifest::{ManifestStore, MANIFEST_NAME};
use crate::remote::{join_remote, rel_parent};
use crate::scanner::{ancestors, path_depth};
use crate::transport::RemoteEntry;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Result of comparing the scanned tree with the manifest.
#[derive(Debug, Default)]
pub struct TransferPlan {
    /// Paths to upload, in scan order
    pub uploads: Vec<String>,
    /// Paths whose fingerprint matches the manifest
    pub skipped: Vec<String>,
    /// Fingerprint of every readable scanned file, uploaded or not
    pub fingerprints: BTreeMap<String, Fingerprint>,
    /// Scanned paths that could not be read for hashing
    pub unreadable: Vec<String>,
}

/// Fingerprint every scanned file and decide which ones need uploading.
pub fn plan_transfers(
    local_root: &Path,
    scanned: &[String],
    manifest: &ManifestStore,
    force_upload: bool,
) -> TransferPlan {
    let hashed: Vec<(&String, Option<Fingerprint>)> = scanned
        .par_iter()
        .map(|rel| (rel, fingerprint_file(&local_root.join(rel))))
        .collect();

    let mut plan = TransferPlan::default();
    for (rel, fingerprint) in hashed {
        let fingerprint = match fingerprint {
            Some(f) => f,
            None => {
                warn!("Skipping unreadable file: {}", rel);
                plan.unreadable.push(rel.clone());
                continue;
            }
        };

        let unchanged = manifest.lookup(rel) == Some(&fingerprint);
        if force_upload || !unchanged {
            debug!("Changed: {}", rel);
            plan.uploads.push(rel.clone());
        } else {
            debug!("Unchanged: {}", rel);
            plan.skipped.push(rel.clone());
        }
        plan.fingerprints.insert(rel.clone(), fingerprint);
    }
    plan
}

/// Remote directories that must exist before `uploads` can be written: the
/// remote root plus the parent of every upload target.
pub fn required_directories(remote_root: &str, uploads: &[String]) -> Vec<String> {
    let mut dirs: Vec<String> = uploads
        .iter()
        .filter_map(|rel| rel_parent(rel))
        .map(|parent| join_remote(remote_root, parent))
        .collect();
    dirs.push(remote_root.replace('\\', "/"));
    dirs.sort();
    dirs.dedup();
    dirs
}

/// Everything the remote tree is expected to contain after the run.
pub fn expected_remote_paths(scanned: &[String]) -> HashSet<String> {
    let mut expected: HashSet<String> = scanned.iter().cloned().collect();
    for rel in scanned {
        expected.extend(ancestors(rel));
    }
    expected.insert(MANIFEST_NAME.to_string());
    expected
}

/// Remote entries that have no local counterpart, deepest first so a
/// directory is emptied before its own removal is attempted.
pub fn plan_deletions(scanned: &[String], remote: &[RemoteEntry]) -> Vec<String> {
    let expected = expected_remote_paths(scanned);
    let mut extra: Vec<String> = remote
        .iter()
        .filter(|e| !expected.contains(&e.name))
        .map(|e| e.name.clone())
        .collect();
    extra.sort_by(|a, b| path_depth(b).cmp(&path_depth(a)).then_with(|| b.cmp(a)));
    extra.dedup();
    extra
}
