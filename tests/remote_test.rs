use sftpsync::remote::{list_remote_tree, DirectoryMaterializer};
use sftpsync::transport::{RemoteChannel, RemoteEntry, RemoteMetadata};
use sftpsync::{Result, SftpSyncError};
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::sync::Mutex;

/// In-memory remote tree: path -> is_dir.
struct MockChannel {
    nodes: Mutex<BTreeMap<String, bool>>,
    stat_calls: Mutex<Vec<String>>,
    mkdir_calls: Mutex<Vec<String>>,
    /// mkdir reports failure but the directory appears anyway (another writer won)
    racy: HashSet<String>,
    /// mkdir always fails and nothing is created
    broken: HashSet<String>,
}

impl MockChannel {
    fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            stat_calls: Mutex::new(Vec::new()),
            mkdir_calls: Mutex::new(Vec::new()),
            racy: HashSet::new(),
            broken: HashSet::new(),
        }
    }

    fn add(&self, path: &str, is_dir: bool) {
        self.nodes.lock().unwrap().insert(path.to_string(), is_dir);
    }

    fn mkdirs(&self) -> Vec<String> {
        self.mkdir_calls.lock().unwrap().clone()
    }
}

impl RemoteChannel for MockChannel {
    fn stat(&self, path: &str) -> Result<Option<RemoteMetadata>> {
        self.stat_calls.lock().unwrap().push(path.to_string());
        Ok(self.nodes.lock().unwrap().get(path).map(|&is_dir| RemoteMetadata { is_dir }))
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.mkdir_calls.lock().unwrap().push(path.to_string());
        if self.broken.contains(path) {
            return Err(SftpSyncError::Remote(format!("mkdir {}: permission denied", path)));
        }
        self.add(path, true);
        if self.racy.contains(path) {
            return Err(SftpSyncError::Remote(format!("mkdir {}: failure", path)));
        }
        Ok(())
    }

    fn open_read(&self, _path: &str) -> Result<Option<Box<dyn Read + '_>>> {
        Ok(None)
    }

    fn open_write(&self, _path: &str) -> Result<Box<dyn Write + '_>> {
        Ok(Box::new(std::io::sink()))
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.nodes.lock().unwrap().remove(path).map(|_| ()).ok_or_else(|| SftpSyncError::RemoteNotFound(path.into()))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.remove(path)
    }

    fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let prefix = format!("{}/", path);
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .iter()
            .filter_map(|(p, &is_dir)| {
                let rest = p.strip_prefix(&prefix)?;
                if rest.contains('/') {
                    None
                } else {
                    Some(RemoteEntry { name: rest.to_string(), is_dir })
                }
            })
            .collect())
    }
}

#[test]
fn test_remote_listing_walks_whole_tree() {
    let channel = MockChannel::new();

    // /remote
    //   |- file.txt
    //   |- subdir/
    //       |- deep.txt
    //       |- nested/
    //           |- x.bin
    channel.add("/remote", true);
    channel.add("/remote/file.txt", false);
    channel.add("/remote/subdir", true);
    channel.add("/remote/subdir/deep.txt", false);
    channel.add("/remote/subdir/nested", true);
    channel.add("/remote/subdir/nested/x.bin", false);

    let mut entries = list_remote_tree(&channel, "/remote").expect("Listing failed");
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["file.txt", "subdir", "subdir/deep.txt", "subdir/nested", "subdir/nested/x.bin"]);

    let subdir = entries.iter().find(|e| e.name == "subdir").unwrap();
    assert!(subdir.is_dir);
    let deep = entries.iter().find(|e| e.name == "subdir/deep.txt").unwrap();
    assert!(!deep.is_dir);
}

#[test]
fn test_remote_listing_of_missing_root_is_empty() {
    let channel = MockChannel::new();
    assert!(list_remote_tree(&channel, "/nowhere").unwrap().is_empty());
}

#[test]
fn test_materializer_creates_parents_first_once() {
    let channel = MockChannel::new();
    channel.add("/srv", true);

    let mut materializer = DirectoryMaterializer::new(&channel);
    materializer
        .ensure_all(vec![
            "/srv/site/a/b".to_string(),
            "/srv/site".to_string(),
            "/srv/site/a".to_string(),
            "/srv/site/c".to_string(),
        ])
        .unwrap();

    assert_eq!(channel.mkdirs(), vec!["/srv/site", "/srv/site/a", "/srv/site/c", "/srv/site/a/b"]);
    assert_eq!(materializer.created(), 4);

    // Everything is cached now; no further remote round-trips.
    let stats_before = channel.stat_calls.lock().unwrap().len();
    materializer.ensure("/srv/site/a/b").unwrap();
    materializer.ensure_all(vec!["/srv/site/c".to_string()]).unwrap();
    assert_eq!(channel.stat_calls.lock().unwrap().len(), stats_before);
    assert_eq!(channel.mkdirs().len(), 4);
}

#[test]
fn test_materializer_keeps_relative_roots_relative() {
    let channel = MockChannel::new();
    let mut materializer = DirectoryMaterializer::new(&channel);
    materializer.ensure("upload/sub").unwrap();
    assert_eq!(channel.mkdirs(), vec!["upload", "upload/sub"]);
}

#[test]
fn test_materializer_tolerates_concurrent_creation() {
    let mut channel = MockChannel::new();
    channel.racy.insert("/site".to_string());

    let mut materializer = DirectoryMaterializer::new(&channel);
    materializer.ensure("/site/assets").unwrap();
    assert_eq!(channel.mkdirs(), vec!["/site", "/site/assets"]);
}

#[test]
fn test_materializer_reports_persistent_failure() {
    let mut channel = MockChannel::new();
    channel.broken.insert("/locked".to_string());

    let mut materializer = DirectoryMaterializer::new(&channel);
    let err = materializer.ensure("/locked/dir").unwrap_err();
    match err {
        SftpSyncError::DirectoryCreateFailed { path, .. } => assert_eq!(path, "/locked"),
        other => panic!("unexpected error: {}", other),
    }
    // Nothing beneath the failed component is attempted.
    assert_eq!(channel.mkdirs(), vec!["/locked"]);
}

#[test]
fn test_materializer_rejects_file_in_the_way() {
    let channel = MockChannel::new();
    channel.add("/site", true);
    channel.add("/site/docs", false);

    let mut materializer = DirectoryMaterializer::new(&channel);
    assert!(matches!(
        materializer.ensure("/site/docs/api"),
        Err(SftpSyncError::DirectoryCreateFailed { .. })
    ));
    assert!(channel.mkdirs().is_empty());
}
