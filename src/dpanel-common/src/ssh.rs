use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// The current user's `~/.ssh/authorized_keys`.
#[derive(Debug, Clone)]
pub struct AuthorizedKeys {
    path: PathBuf,
}

impl AuthorizedKeys {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_current_user() -> Result<Self> {
        let home = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(Self::new(home.join(".ssh").join("authorized_keys")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Missing or unreadable files authorize nothing.
    pub fn contains(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty()
            && fs::read_to_string(&self.path)
                .map(|content| content.contains(key))
                .unwrap_or(false)
    }

    /// Appends `key` on its own line, creating `~/.ssh` (0700) and the file (0644) when absent.
    pub fn append(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o644)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        writeln!(file, "{}", key.trim())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::info!("appended SSH key to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAACAQ dpanel@host";

    #[test]
    fn append_creates_missing_file_and_directory() {
        let temp = TempDir::new().unwrap();
        let keys = AuthorizedKeys::new(temp.path().join(".ssh").join("authorized_keys"));

        assert!(!keys.exists());
        assert!(!keys.contains(KEY));

        keys.append(KEY).unwrap();

        assert!(keys.exists());
        assert!(keys.contains(KEY));
        assert_eq!(fs::read_to_string(keys.path()).unwrap(), format!("{}\n", KEY));
    }

    #[test]
    fn append_keeps_existing_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("authorized_keys");
        fs::write(&path, "ssh-ed25519 AAAAexisting me@laptop\n").unwrap();

        let keys = AuthorizedKeys::new(&path);
        keys.append(KEY).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("ssh-ed25519 AAAAexisting me@laptop\n"));
        assert!(keys.contains(KEY));
    }

    #[test]
    fn blank_key_is_never_authorized() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("authorized_keys");
        fs::write(&path, "ssh-rsa AAAA\n").unwrap();

        assert!(!AuthorizedKeys::new(path).contains("  "));
    }
}
