pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod plan;
pub mod remote;
pub mod scanner;
pub mod scheduler;
pub mod transport;

pub use engine::{RunSummary, SyncEngine};
pub use error::SftpSyncError;
pub type Result<T> = std::result::Result<T, SftpSyncError>;
