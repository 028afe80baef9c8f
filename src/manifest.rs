use crate::fingerprint::Fingerprint;
use crate::Result;
use std::collections::BTreeMap;
use tracing::warn;

/// Reserved name of the manifest document under the remote root.
pub const MANIFEST_NAME: &str = ".sftp_upload_action_hashes";

/// Last known remote state: relative path -> content fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestStore {
    entries: BTreeMap<String, Fingerprint>,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized manifest. A corrupt document yields an empty store,
    /// which makes the run a full upload rather than a failure.
    pub fn load(doc: &str) -> Self {
        if doc.trim().is_empty() {
            return Self::new();
        }
        match serde_json::from_str::<BTreeMap<String, Fingerprint>>(doc) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("Failed to parse remote manifest, treating it as empty: {}", e);
                Self::new()
            }
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn replace_all(&mut self, entries: BTreeMap<String, Fingerprint>) {
        self.entries = entries;
    }

    /// Indented JSON with sorted keys, so consecutive manifests diff cleanly.
    pub fn serialize(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.entries)?;
        out.push('\n');
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_lookup() {
        let store = ManifestStore::load(r#"{"a.txt": "abc", "sub/b.txt": "def"}"#);
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("sub/b.txt").map(|f| f.as_str()), Some("def"));
        assert!(store.lookup("missing").is_none());
    }

    #[test]
    fn test_malformed_manifest_resets_to_empty() {
        assert!(ManifestStore::load("{not json").is_empty());
        assert!(ManifestStore::load(r#"["a", "b"]"#).is_empty());
        assert!(ManifestStore::load(r#"{"a": 1}"#).is_empty());
        assert!(ManifestStore::load("").is_empty());
    }

    #[test]
    fn test_serialize_is_sorted_and_indented() {
        let mut store = ManifestStore::new();
        let mut entries = BTreeMap::new();
        entries.insert("z.txt".to_string(), Fingerprint::from("2".to_string()));
        entries.insert("a.txt".to_string(), Fingerprint::from("1".to_string()));
        store.replace_all(entries);

        let doc = store.serialize().unwrap();
        assert_eq!(doc, "{\n  \"a.txt\": \"1\",\n  \"z.txt\": \"2\"\n}\n");
        assert_eq!(ManifestStore::load(&doc), store);
    }

    #[test]
    fn test_replace_all_drops_old_entries() {
        let mut store = ManifestStore::load(r#"{"old.txt": "x"}"#);
        let mut entries = BTreeMap::new();
        entries.insert("new.txt".to_string(), Fingerprint::from("y".to_string()));
        store.replace_all(entries);
        assert!(store.lookup("old.txt").is_none());
        assert_eq!(store.len(), 1);
    }
}
