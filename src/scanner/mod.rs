pub mod local;

pub use local::LocalScanner;

/// Normalize a platform relative path to the `/`-separated form used as a
/// manifest key.
pub fn normalize_rel_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Number of path components in a relative path ("a/b/c" -> 3).
pub fn path_depth(rel_path: &str) -> usize {
    rel_path.split('/').filter(|p| !p.is_empty()).count()
}

/// Every proper ancestor directory of a relative path, shallowest first.
/// `"a/b/c.txt"` yields `["a", "a/b"]`.
pub fn ancestors(rel_path: &str) -> Vec<String> {
    let parts: Vec<&str> = rel_path.split('/').collect();
    (1..parts.len()).map(|i| parts[..i].join("/")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_rel_path("sub\\dir\\f.txt"), "sub/dir/f.txt");
        assert_eq!(normalize_rel_path("./a//b"), "a/b");
    }

    #[test]
    fn test_ancestors_and_depth() {
        assert_eq!(ancestors("a/b/c.txt"), vec!["a".to_string(), "a/b".to_string()]);
        assert!(ancestors("top.txt").is_empty());
        assert_eq!(path_depth("a/b/c.txt"), 3);
        assert_eq!(path_depth("a"), 1);
    }
}
