//! Filesystem-backed transport. Remote paths are plain local paths, which
//! makes it usable for mirroring to a mounted share and for tests.

use crate::Result;
use crate::transport::{RemoteChannel, RemoteEntry, RemoteMetadata, Transport};
use std::fs;
use std::io::{ErrorKind, Read, Write};

#[derive(Debug, Default, Clone)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for LocalTransport {
    fn open_channel(&self) -> Result<Box<dyn RemoteChannel + '_>> {
        Ok(Box::new(LocalChannel))
    }
}

pub struct LocalChannel;

fn map_io(path: &str, e: std::io::Error) -> crate::SftpSyncError {
    if e.kind() == ErrorKind::NotFound {
        crate::SftpSyncError::RemoteNotFound(path.to_string())
    } else {
        crate::SftpSyncError::Remote(format!("{}: {}", path, e))
    }
}

impl RemoteChannel for LocalChannel {
    fn stat(&self, path: &str) -> Result<Option<RemoteMetadata>> {
        match fs::metadata(path) {
            Ok(m) => Ok(Some(RemoteMetadata { is_dir: m.is_dir() })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(path, e)),
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        fs::create_dir(path).map_err(|e| map_io(path, e))
    }

    fn open_read(&self, path: &str) -> Result<Option<Box<dyn Read + '_>>> {
        match fs::File::open(path) {
            Ok(f) => Ok(Some(Box::new(f))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(path, e)),
        }
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>> {
        let f = fs::File::create(path).map_err(|e| map_io(path, e))?;
        Ok(Box::new(f))
    }

    fn remove(&self, path: &str) -> Result<()> {
        fs::remove_file(path).map_err(|e| map_io(path, e))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        fs::remove_dir(path).map_err(|e| map_io(path, e))
    }

    fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| map_io(path, e))? {
            let entry = entry.map_err(|e| map_io(path, e))?;
            let is_dir = entry.file_type().map_err(|e| map_io(path, e))?.is_dir();
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir,
            });
        }
        Ok(entries)
    }
}
