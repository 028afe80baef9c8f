//! Content fingerprints used for change detection.
//!
//! A fingerprint is the first 128 bits of a BLAKE3 digest, hex encoded. It is
//! only compared for equality against the remote manifest, so the truncated
//! digest is plenty.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Read buffer size for hashing and uploads.
pub const CHUNK_SIZE: usize = 64 * 1024;

const FINGERPRINT_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut fp = Fingerprinter::new();
        fp.update(data);
        fp.finish()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Incremental hasher, fed chunk by chunk.
pub struct Fingerprinter {
    hasher: blake3::Hasher,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self { hasher: blake3::Hasher::new() }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finish(self) -> Fingerprint {
        let digest = self.hasher.finalize();
        Fingerprint(hex::encode(&digest.as_bytes()[..FINGERPRINT_BYTES]))
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint a local file without loading it into memory.
///
/// Returns `None` when the file cannot be opened or read, e.g. when it was
/// removed between scanning and hashing.
pub fn fingerprint_file(path: &Path) -> Option<Fingerprint> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Cannot open {:?} for hashing: {}", path, e);
            return None;
        }
    };

    let mut fp = Fingerprinter::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => fp.update(&buffer[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Read failed while hashing {:?}: {}", path, e);
                return None;
            }
        }
    }
    Some(fp.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let fp = Fingerprint::of_bytes(b"hello");
        assert_eq!(fp.as_str().len(), 32);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, Fingerprint::of_bytes(b"hello"));
        assert_ne!(fp, Fingerprint::of_bytes(b"hello!"));
    }

    #[test]
    fn test_file_matches_bytes_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path).unwrap().write_all(&data).unwrap();

        assert_eq!(fingerprint_file(&path), Some(Fingerprint::of_bytes(&data)));
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(fingerprint_file(&dir.path().join("gone.txt")), None);
    }
}
