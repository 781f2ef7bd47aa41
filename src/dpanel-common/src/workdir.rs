use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const WORK_DIR_NAME: &str = ".devetek";
const SESSION_FILE: &str = "session";
const MACHINE_FILE: &str = "machine.json";
const LOG_FILE: &str = "dpid.log";

/// Per-user state directory (`~/.devetek`) holding the panel session, the
/// registration marker and the CLI log.
#[derive(Debug, Clone)]
pub struct DevetekWorkDir {
    pub path: PathBuf,
    pub session_file: PathBuf,
    pub machine_file: PathBuf,
    pub log_file: PathBuf,
}

impl DevetekWorkDir {
    pub fn resolve() -> Result<Self> {
        let home = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(Self::at(home.join(WORK_DIR_NAME)))
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            session_file: path.join(SESSION_FILE),
            machine_file: path.join(MACHINE_FILE),
            log_file: path.join(LOG_FILE),
            path,
        }
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))
    }

    pub fn log_file_name(&self) -> &str {
        LOG_FILE
    }
}
