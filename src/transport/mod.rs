use crate::Result;
use std::io::{Read, Write};

pub mod local;
pub mod ssh;

pub use local::LocalTransport;
pub use ssh::{SshConfig, SshTransport};

/// Metadata returned by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub is_dir: bool,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name, without the parent path
    pub name: String,
    pub is_dir: bool,
}

/// An authenticated session that hands out independent channels.
///
/// Channels are not shared between threads; every worker opens its own.
pub trait Transport: Sync {
    fn open_channel(&self) -> Result<Box<dyn RemoteChannel + '_>>;
}

/// File operations over one channel. Paths are `/`-separated remote paths.
pub trait RemoteChannel {
    /// `Ok(None)` when the path does not exist.
    fn stat(&self, path: &str) -> Result<Option<RemoteMetadata>>;
    fn mkdir(&self, path: &str) -> Result<()>;
    /// `Ok(None)` when the path does not exist.
    fn open_read(&self, path: &str) -> Result<Option<Box<dyn Read + '_>>>;
    /// Create or truncate.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>>;
    fn remove(&self, path: &str) -> Result<()>;
    fn rmdir(&self, path: &str) -> Result<()>;
    /// Entries of a directory, excluding `.` and `..`.
    fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>>;
}
