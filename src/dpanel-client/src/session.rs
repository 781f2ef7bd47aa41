use crate::error::{ApiError, ApiResult};
use crate::types::MachineRecord;
use dpanel_common::workdir::DevetekWorkDir;
use std::fs;
use std::path::Path;

/// Session cookie and registration marker kept under `~/.devetek`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    workdir: DevetekWorkDir,
}

impl SessionStore {
    pub fn new(workdir: DevetekWorkDir) -> Self {
        Self { workdir }
    }

    pub fn for_current_user() -> ApiResult<Self> {
        DevetekWorkDir::resolve()
            .map(Self::new)
            .map_err(|e| ApiError::Configuration(e.to_string()))
    }

    /// The stored cookie; an empty file counts as no session.
    pub fn cookie(&self) -> ApiResult<String> {
        let cookie = fs::read_to_string(&self.workdir.session_file)
            .map(|content| content.trim().to_string())
            .map_err(|_| ApiError::NoSession)?;
        if cookie.is_empty() {
            return Err(ApiError::NoSession);
        }
        Ok(cookie)
    }

    pub fn exists(&self) -> bool {
        self.cookie().is_ok()
    }

    pub fn save_cookie(&self, cookie: &str) -> ApiResult<()> {
        self.write(&self.workdir.session_file, cookie.as_bytes())
    }

    /// Server this machine was registered as, if any.
    pub fn machine(&self) -> Option<MachineRecord> {
        let content = fs::read(&self.workdir.machine_file).ok()?;
        serde_json::from_slice::<MachineRecord>(&content)
            .ok()
            .filter(|machine| machine.id != 0)
    }

    pub fn save_machine(&self, machine: &MachineRecord) -> ApiResult<()> {
        let content = serde_json::to_vec_pretty(machine).map_err(|e| ApiError::Io {
            path: self.workdir.machine_file.clone(),
            source: e.into(),
        })?;
        self.write(&self.workdir.machine_file, &content)
    }

    fn write(&self, path: &Path, content: &[u8]) -> ApiResult<()> {
        self.workdir.init().map_err(|e| ApiError::Io {
            path: self.workdir.path.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        fs::write(path, content).map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
