use crate::manifest::MANIFEST_NAME;
use crate::scanner::normalize_rel_path;
use crate::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::Path;

pub struct LocalScanner {
    excludes: GlobSet,
}

impl LocalScanner {
    /// Build a scanner from shell-style exclusion globs. Patterns are matched
    /// against the whole `/`-separated relative path and `*` crosses
    /// directory boundaries, so `*.tmp` also excludes `sub/x.tmp`.
    pub fn new(excludes: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in excludes {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self { excludes: builder.build()? })
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        rel_path == MANIFEST_NAME || self.excludes.is_match(rel_path)
    }

    /// Relative paths of every regular file under `root`, in walk order.
    pub fn scan(&self, root: &Path) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Err(crate::SftpSyncError::DirectoryNotFound(root.to_path_buf()));
        }
        let root = root.canonicalize()?;

        let mut builder = WalkBuilder::new(&root);
        // Every regular file is a candidate, hidden or gitignored alike.
        builder.standard_filters(false);
        builder.follow_links(false);
        builder.sort_by_file_name(|a, b| a.cmp(b));

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Scan error: {}", err);
                    continue;
                }
            };
            if !is_regular_file(&entry) {
                continue;
            }

            let relative_path = match entry.path().strip_prefix(&root) {
                Ok(rp) => rp,
                Err(_) => continue,
            };
            let path_str = normalize_rel_path(&relative_path.to_string_lossy());

            if self.is_excluded(&path_str) {
                tracing::debug!("Excluded: {}", path_str);
                continue;
            }
            if seen.insert(path_str.clone()) {
                files.push(path_str);
            }
        }
        Ok(files)
    }
}

/// Regular files, and symlinks whose target is one. Links are resolved here
/// rather than by the walker so symlinked directories are never descended.
fn is_regular_file(entry: &ignore::DirEntry) -> bool {
    if !entry.path_is_symlink() {
        return entry.file_type().map(|t| t.is_file()).unwrap_or(false);
    }
    match std::fs::metadata(entry.path()) {
        Ok(meta) => meta.is_file(),
        Err(err) => {
            tracing::warn!("Skipping dangling symlink {}: {}", entry.path().display(), err);
            false
        }
    }
}
