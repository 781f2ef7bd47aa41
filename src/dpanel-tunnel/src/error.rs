use crate::service::ServiceState;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TunnelError>;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("invalid source download url {url:?}: {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("failed to {action} {}: {source}", path.display())]
    FilesystemFailure {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to persist tunnel configuration to {}: {source}", path.display())]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed: {reason}")]
    SubprocessFailure { command: String, reason: String },

    #[error("{0:?} is not a valid semantic version")]
    VersionUnparsable(String),

    #[error("tunnel entry {0:?} is defined more than once")]
    DuplicateEntry(String),

    #[error("listener {host}:{port} is used by more than one tunnel entry")]
    DuplicateListener { host: String, port: u16 },

    #[error("port {port} is already in use on the tunnel server {host}")]
    ListenerPortInUse { host: String, port: u16 },

    #[error("archive entry {path} has unsupported type {kind}")]
    UnsupportedEntry { path: String, kind: String },

    #[error("archive entry {0} points outside the install directory")]
    UnsafeEntryPath(String),

    #[error("archive does not contain the {0} binary")]
    BinaryNotFound(String),

    #[error("service setup stopped after reaching {reached}: {source}")]
    ServiceStep {
        reached: ServiceState,
        #[source]
        source: Box<TunnelError>,
    },
}

impl TunnelError {
    /// Adapter for `map_err` on filesystem calls.
    pub(crate) fn fs(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| TunnelError::FilesystemFailure {
            action,
            path,
            source,
        }
    }
}
