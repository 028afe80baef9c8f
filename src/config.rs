use crate::transport::SshConfig;
use crate::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Every option can also be supplied through an `INPUT_*` environment
/// variable, which is how CI action runners pass inputs.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Remote SSH host
    #[arg(long, env = "INPUT_HOST")]
    pub host: Option<String>,

    /// Port for SSH
    #[arg(short = 'p', long, env = "INPUT_PORT", default_value_t = 22)]
    pub port: u16,

    /// Remote user name
    #[arg(short = 'u', long, env = "INPUT_USERNAME")]
    pub username: Option<String>,

    /// Password authentication
    #[arg(long, env = "INPUT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Private key file path or inline key material
    #[arg(short = 'i', long, env = "INPUT_PRIVATEKEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Passphrase for the private key
    #[arg(long, env = "INPUT_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Local directory to upload
    #[arg(long, env = "INPUT_LOCALDIR")]
    pub local_dir: Option<PathBuf>,

    /// Remote directory to upload into
    #[arg(long, env = "INPUT_REMOTEDIR")]
    pub remote_dir: Option<String>,

    /// Perform a trial run with no changes made
    #[arg(short = 'n', long, env = "INPUT_DRYRUN", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub dry_run: bool,

    /// Upload every file, ignoring the remote manifest
    #[arg(short = 'f', long, env = "INPUT_FORCEUPLOAD", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub force_upload: bool,

    /// Exclude patterns (comma separated globs, matched against relative paths)
    #[arg(short, long, env = "INPUT_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Delete remote files and directories that no longer exist locally
    #[arg(long, env = "INPUT_REMOVEEXTRAFILESONSERVER", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub remove_extra_files: bool,

    /// Number of parallel transfers
    #[arg(short = 'j', long, env = "INPUT_CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,

    /// Show a progress bar during transfer
    #[arg(short = 'P', long, default_value_t = false)]
    pub progress: bool,

    /// Suppress non-error messages
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// What to synchronize and how, independent of the connection.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub local_root: PathBuf,
    pub remote_root: String,
    pub dry_run: bool,
    pub force_upload: bool,
    pub excludes: Vec<String>,
    pub remove_extra: bool,
    pub concurrency: usize,
    pub progress: bool,
}

impl SyncOptions {
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            dry_run: false,
            force_upload: false,
            excludes: Vec::new(),
            remove_extra: false,
            concurrency: 4,
            progress: false,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Args {
    /// Validate the parsed arguments and split them into connection and sync
    /// settings. Empty values count as missing.
    pub fn into_settings(self) -> Result<(SshConfig, SyncOptions)> {
        let host = non_empty(self.host);
        let username = non_empty(self.username);
        let local_dir = self.local_dir.filter(|p| !p.as_os_str().is_empty());
        let remote_dir = non_empty(self.remote_dir);

        let mut missing = Vec::new();
        if host.is_none() { missing.push("host"); }
        if username.is_none() { missing.push("username"); }
        if local_dir.is_none() { missing.push("local-dir"); }
        if remote_dir.is_none() { missing.push("remote-dir"); }

        let (host, username, local_dir, remote_dir) = match (host, username, local_dir, remote_dir) {
            (Some(h), Some(u), Some(l), Some(r)) => (h, u, l, r),
            _ => {
                return Err(crate::SftpSyncError::Config(format!("Missing required inputs: {}", missing.join(", "))));
            }
        };

        if self.concurrency == 0 {
            return Err(crate::SftpSyncError::Config("concurrency must be at least 1".into()));
        }

        let ssh = SshConfig {
            host,
            port: self.port,
            user: username,
            password: non_empty(self.password),
            private_key: non_empty(self.private_key),
            passphrase: non_empty(self.passphrase),
        };

        let options = SyncOptions {
            local_root: local_dir,
            remote_root: remote_dir,
            dry_run: self.dry_run,
            force_upload: self.force_upload,
            excludes: self.exclude.iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            remove_extra: self.remove_extra_files,
            concurrency: self.concurrency,
            progress: self.progress,
        };

        Ok((ssh, options))
    }
}
