use crate::Result;
use crate::transport::{RemoteChannel, RemoteEntry, RemoteMetadata, Transport};
use ssh2::{ErrorCode, Session, Sftp};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// SFTP status code for a missing file.
const FX_NO_SUCH_FILE: i32 = 2;

#[derive(Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Path to a private key file, or the key material itself
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// One authenticated SSH connection.
struct Connection {
    session: Session,
    _tcp: TcpStream,
}

impl Connection {
    fn open(config: &SshConfig) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| crate::SftpSyncError::SshConnection(format!("Failed to connect to {}:{}: {}", config.host, config.port, e)))?;

        let mut session = Session::new()
            .map_err(|e| crate::SftpSyncError::SshConnection(e.to_string()))?;

        session.set_tcp_stream(tcp.try_clone().map_err(crate::SftpSyncError::Io)?);
        session.set_compress(true);
        session.handshake()
            .map_err(|e| crate::SftpSyncError::SshConnection(format!("Handshake failed: {}", e)))?;

        authenticate(&session, config)?;

        if !session.authenticated() {
            return Err(crate::SftpSyncError::Authentication(format!("Authentication failed for user {}", config.user)));
        }

        Ok(Self { session, _tcp: tcp })
    }

    fn sftp(&self) -> Result<Sftp> {
        self.session.sftp().map_err(|e| crate::SftpSyncError::SshConnection(format!("SFTP init failed: {}", e)))
    }
}

/// Hands every channel its own SSH connection, since libssh2 serializes all
/// calls on a session. The connection made by `connect` is kept for the
/// first channel.
pub struct SshTransport {
    config: SshConfig,
    spare: Mutex<Option<Connection>>,
}

impl SshTransport {
    /// Connect once up front so bad hosts or credentials fail the run early.
    pub fn connect(config: &SshConfig) -> Result<Self> {
        let conn = Connection::open(config)?;
        Ok(Self {
            config: config.clone(),
            spare: Mutex::new(Some(conn)),
        })
    }
}

fn authenticate(session: &Session, config: &SshConfig) -> Result<()> {
    let passphrase = config.passphrase.as_deref();

    if let Some(key) = &config.private_key {
        let key_path = Path::new(key);
        if key_path.is_file() {
            debug!("Authenticating with key file {:?}", key_path);
            session.userauth_pubkey_file(&config.user, None, key_path, passphrase)
                .map_err(|e| crate::SftpSyncError::Authentication(format!("Key auth failed: {}", e)))?;
        } else {
            authenticate_key_material(session, &config.user, key, passphrase)?;
        }
        return Ok(());
    }

    if let Some(password) = &config.password {
        session.userauth_password(&config.user, password)
            .map_err(|e| crate::SftpSyncError::Authentication(format!("Password auth failed: {}", e)))?;
        return Ok(());
    }

    // No explicit credentials: agent first, then the usual key files.
    if session.userauth_agent(&config.user).is_err() || !session.authenticated() {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).unwrap_or_default();
        let default_keys = [
            PathBuf::from(&home).join(".ssh/id_rsa"),
            PathBuf::from(&home).join(".ssh/id_ed25519"),
        ];

        for key in default_keys {
            if key.exists()
                && session.userauth_pubkey_file(&config.user, None, &key, None).is_ok()
                && session.authenticated()
            {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn authenticate_key_material(session: &Session, user: &str, key: &str, passphrase: Option<&str>) -> Result<()> {
    debug!("Authenticating with inline key material");
    session.userauth_pubkey_memory(user, None, key, passphrase)
        .map_err(|e| crate::SftpSyncError::Authentication(format!("Key auth failed: {}", e)))
}

#[cfg(not(unix))]
fn authenticate_key_material(_session: &Session, _user: &str, _key: &str, _passphrase: Option<&str>) -> Result<()> {
    Err(crate::SftpSyncError::Config("Inline private key material is not supported on this platform; pass a key file path".into()))
}

impl Transport for SshTransport {
    fn open_channel(&self) -> Result<Box<dyn RemoteChannel + '_>> {
        let spare = self.spare.lock().ok().and_then(|mut guard| guard.take());
        let conn = match spare {
            Some(conn) => conn,
            None => {
                debug!("Opening SSH connection to {}:{}", self.config.host, self.config.port);
                Connection::open(&self.config)?
            }
        };
        let sftp = conn.sftp()?;
        Ok(Box::new(SftpChannel { sftp, _conn: conn }))
    }
}

/// An SFTP subsystem channel that owns its connection.
pub struct SftpChannel {
    sftp: Sftp,
    _conn: Connection,
}

fn is_no_such_file(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(FX_NO_SUCH_FILE))
}

fn remote_err(op: &str, path: &str, e: ssh2::Error) -> crate::SftpSyncError {
    if is_no_such_file(&e) {
        crate::SftpSyncError::RemoteNotFound(path.to_string())
    } else {
        crate::SftpSyncError::Remote(format!("{} {}: {}", op, path, e))
    }
}

impl RemoteChannel for SftpChannel {
    fn stat(&self, path: &str) -> Result<Option<RemoteMetadata>> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(Some(RemoteMetadata { is_dir: stat.is_dir() })),
            Err(e) if is_no_such_file(&e) => Ok(None),
            Err(e) => Err(remote_err("stat", path, e)),
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.sftp.mkdir(Path::new(path), 0o755).map_err(|e| remote_err("mkdir", path, e))
    }

    fn open_read(&self, path: &str) -> Result<Option<Box<dyn Read + '_>>> {
        match self.sftp.open(Path::new(path)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if is_no_such_file(&e) => Ok(None),
            Err(e) => Err(remote_err("open", path, e)),
        }
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>> {
        let file = self.sftp.create(Path::new(path)).map_err(|e| remote_err("create", path, e))?;
        Ok(Box::new(file))
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.sftp.unlink(Path::new(path)).map_err(|e| remote_err("remove", path, e))
    }

    fn rmdir(&self, path: &str) -> Result<()> {
        self.sftp.rmdir(Path::new(path)).map_err(|e| remote_err("rmdir", path, e))
    }

    fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let items = self.sftp.readdir(Path::new(path)).map_err(|e| remote_err("readdir", path, e))?;

        let mut entries = Vec::new();
        for (pb, stat) in items {
            // readdir returns the listed path joined with the entry name
            let name = pb.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name == "." || name == ".." || name.is_empty() {
                continue;
            }
            entries.push(RemoteEntry { name: name.to_string(), is_dir: stat.is_dir() });
        }
        Ok(entries)
    }
}
