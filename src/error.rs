use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum SftpSyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("SSH connection failed: {0}")]
    SshConnection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Local directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to create remote directory {path}: {reason}")]
    DirectoryCreateFailed { path: String, reason: String },

    #[error("Remote path not found: {0}")]
    RemoteNotFound(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("{failed} item(s) failed to transfer")]
    TransferFailed { failed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}
