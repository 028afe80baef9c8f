use crate::Result;
use crate::remote::join_remote;
use crate::transport::{RemoteChannel, RemoteEntry};

/// Walk the remote tree under `root` and return every file and directory as a
/// root-relative entry (the `name` field carries the relative path).
///
/// The walk uses an explicit stack so tree depth is not bounded by the call
/// stack. A missing root is an empty tree.
pub fn list_remote_tree(channel: &dyn RemoteChannel, root: &str) -> Result<Vec<RemoteEntry>> {
    match channel.stat(root)? {
        Some(meta) if meta.is_dir => {}
        _ => return Ok(Vec::new()),
    }

    let mut entries = Vec::new();
    let mut pending = vec![String::new()];

    while let Some(current_rel) = pending.pop() {
        let current_abs = join_remote(root, &current_rel);

        for entry in channel.list_entries(&current_abs)? {
            let rel_path = if current_rel.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", current_rel, entry.name)
            };

            if entry.is_dir {
                pending.push(rel_path.clone());
            }
            entries.push(RemoteEntry { name: rel_path, is_dir: entry.is_dir });
        }
    }
    Ok(entries)
}
