pub mod listing;
pub mod materialize;

pub use listing::list_remote_tree;
pub use materialize::DirectoryMaterializer;

/// Join a remote root and a relative path with `/`.
pub fn join_remote(root: &str, rel_path: &str) -> String {
    let root = root.replace('\\', "/");
    let root = if root.len() > 1 { root.trim_end_matches('/') } else { root.as_str() };
    if rel_path.is_empty() {
        return root.to_string();
    }
    if root.is_empty() {
        rel_path.to_string()
    } else if root.ends_with('/') {
        format!("{}{}", root, rel_path)
    } else {
        format!("{}/{}", root, rel_path)
    }
}

/// Parent directory of a relative path, or `None` for top-level entries.
pub fn rel_parent(rel_path: &str) -> Option<&str> {
    rel_path.rfind('/').map(|i| &rel_path[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/srv/www/", "a.txt"), "/srv/www/a.txt");
        assert_eq!(join_remote("upload", "sub/b.txt"), "upload/sub/b.txt");
        assert_eq!(join_remote("/", "a.txt"), "/a.txt");
        assert_eq!(join_remote("", "a.txt"), "a.txt");
        assert_eq!(join_remote("C:\\site", "a.txt"), "C:/site/a.txt");
        assert_eq!(join_remote("/srv", ""), "/srv");
    }

    #[test]
    fn test_rel_parent() {
        assert_eq!(rel_parent("a/b/c.txt"), Some("a/b"));
        assert_eq!(rel_parent("c.txt"), None);
    }
}
