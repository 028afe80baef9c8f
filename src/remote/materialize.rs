use crate::Result;
use crate::scanner::path_depth;
use crate::transport::RemoteChannel;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Creates remote directories parent-before-child, remembering every path it
/// has confirmed so each one costs at most one `stat` per run.
pub struct DirectoryMaterializer<'a> {
    channel: &'a dyn RemoteChannel,
    known: HashSet<String>,
    created: usize,
}

impl<'a> DirectoryMaterializer<'a> {
    pub fn new(channel: &'a dyn RemoteChannel) -> Self {
        Self { channel, known: HashSet::new(), created: 0 }
    }

    /// Number of directories this materializer actually created.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Ensure every directory in `dirs` exists, shallowest first.
    pub fn ensure_all<I>(&mut self, dirs: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let unique: BTreeSet<String> = dirs.into_iter().collect();
        let mut ordered: Vec<String> = unique.into_iter().collect();
        ordered.sort_by_key(|d| path_depth(d));

        for dir in ordered {
            self.ensure(&dir)?;
        }
        Ok(())
    }

    /// Ensure `dir` and all of its ancestors exist.
    pub fn ensure(&mut self, dir: &str) -> Result<()> {
        let dir = dir.replace('\\', "/");
        if self.known.contains(&dir) {
            return Ok(());
        }

        let mut acc = String::new();
        if dir.starts_with('/') {
            acc.push('/');
        }
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            if !acc.is_empty() && !acc.ends_with('/') {
                acc.push('/');
            }
            acc.push_str(part);
            if self.known.contains(&acc) {
                continue;
            }
            self.ensure_component(&acc)?;
            self.known.insert(acc.clone());
        }
        Ok(())
    }

    fn ensure_component(&mut self, path: &str) -> Result<()> {
        match self.channel.stat(path)? {
            Some(meta) if meta.is_dir => {
                debug!("Remote directory exists: {}", path);
                return Ok(());
            }
            Some(_) => {
                return Err(crate::SftpSyncError::DirectoryCreateFailed {
                    path: path.to_string(),
                    reason: "path exists and is not a directory".into(),
                });
            }
            None => {}
        }

        match self.channel.mkdir(path) {
            Ok(()) => {
                info!("Created directory: {}", path);
                self.created += 1;
                Ok(())
            }
            Err(e) => {
                // Someone else may have created it in the meantime.
                match self.channel.stat(path) {
                    Ok(Some(meta)) if meta.is_dir => {
                        debug!("mkdir {} failed but directory now exists: {}", path, e);
                        Ok(())
                    }
                    _ => Err(crate::SftpSyncError::DirectoryCreateFailed {
                        path: path.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }
}
