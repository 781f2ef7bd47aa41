use crate::error::{Result, TunnelError};
use crate::settings::TunnelSettings;
use flate2::read::GzDecoder;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

const BIN_DIR_MODE: u32 = 0o755;

/// Unpacks a release archive and moves the agent binary into the system bin dir.
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    bin_dir: PathBuf,
    binary_name: String,
}

impl ArchiveInstaller {
    pub fn new(bin_dir: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            binary_name: binary_name.into(),
        }
    }

    pub fn from_settings(settings: &TunnelSettings) -> Self {
        Self::new(&settings.bin_dir, &settings.binary_name)
    }

    /// Extracts `archive` into `install_dir`, installs the binary and removes
    /// the archive. Returns the installed binary path.
    ///
    /// Nothing is placed in the bin dir unless the whole archive unpacked cleanly.
    /// A half-extracted `install_dir` is left behind on failure.
    pub fn extract(&self, archive: &Path, install_dir: &Path) -> Result<PathBuf> {
        tracing::info!(
            "extracting {} into {}",
            archive.display(),
            install_dir.display()
        );

        unpack(archive, install_dir)?;
        let extracted = self.locate_binary(install_dir)?;
        let installed = self.install_binary(&extracted)?;

        if let Err(e) = fs::remove_file(archive) {
            tracing::warn!("failed to remove archive {}: {}", archive.display(), e);
        }

        Ok(installed)
    }

    fn locate_binary(&self, install_dir: &Path) -> Result<PathBuf> {
        let top_level = install_dir.join(&self.binary_name);
        if top_level.is_file() {
            return Ok(top_level);
        }

        find_file(install_dir, &self.binary_name)
            .map_err(TunnelError::fs("search", install_dir))?
            .ok_or_else(|| TunnelError::BinaryNotFound(self.binary_name.clone()))
    }

    fn install_binary(&self, extracted: &Path) -> Result<PathBuf> {
        if !self.bin_dir.is_dir() {
            fs::create_dir_all(&self.bin_dir).map_err(TunnelError::fs("create", &self.bin_dir))?;
            set_mode(&self.bin_dir, BIN_DIR_MODE)?;
        }

        // Writing over a running agent fails with ETXTBSY, so the new binary is
        // copied next to it and swapped in with a same-filesystem rename.
        let target = self.bin_dir.join(&self.binary_name);
        let staged = self.bin_dir.join(format!(".{}.new", self.binary_name));
        let _ = fs::remove_file(&staged);

        fs::copy(extracted, &staged).map_err(TunnelError::fs("copy binary to", &staged))?;
        if let Err(e) = fs::rename(&staged, &target) {
            let _ = fs::remove_file(&staged);
            return Err(TunnelError::fs("replace", &target)(e));
        }

        if let Err(e) = fs::remove_file(extracted) {
            tracing::debug!("left {} in staging: {}", extracted.display(), e);
        }

        tracing::info!("installed {} to {}", self.binary_name, target.display());
        Ok(target)
    }
}

/// Restores directories and regular files; any other entry type aborts.
fn unpack(archive: &Path, install_dir: &Path) -> Result<()> {
    let file = File::open(archive).map_err(TunnelError::fs("open", archive))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    fs::create_dir_all(install_dir).map_err(TunnelError::fs("create", install_dir))?;

    let entries = archive
        .entries()
        .map_err(TunnelError::fs("read entries of", install_dir))?;

    // a read-only directory must not block the files that follow it
    let mut directories = Vec::new();

    for entry in entries {
        let mut entry = entry.map_err(TunnelError::fs("read entry in", install_dir))?;
        let raw_path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let entry_type = entry.header().entry_type();

        if entry_type.is_pax_global_extensions() {
            continue;
        }

        let relative = safe_relative_path(&raw_path)?;
        let target = install_dir.join(&relative);
        let mode = entry
            .header()
            .mode()
            .map_err(TunnelError::fs("read mode of", &target))?
            & 0o7777;

        match entry_type {
            EntryType::Directory => {
                fs::create_dir_all(&target).map_err(TunnelError::fs("create", &target))?;
                directories.push((target, mode));
            }
            EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(TunnelError::fs("create", parent))?;
                }
                let mut out = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(mode)
                    .open(&target)
                    .map_err(TunnelError::fs("create", &target))?;
                io::copy(&mut entry, &mut out).map_err(TunnelError::fs("write", &target))?;
                set_mode(&target, mode)?;
            }
            other => {
                return Err(TunnelError::UnsupportedEntry {
                    path: raw_path,
                    kind: format!("{:?}", other),
                })
            }
        }
    }

    for (directory, mode) in directories.iter().rev() {
        set_mode(directory, *mode)?;
    }

    Ok(())
}

/// Rejects absolute paths and `..` so nothing lands outside the install dir.
fn safe_relative_path(raw: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TunnelError::UnsafeEntryPath(raw.to_string()))
            }
        }
    }
    Ok(relative)
}

// umask must not change the archive's declared mode
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode))
        .map_err(TunnelError::fs("set permissions on", path))
}

fn find_file(dir: &Path, name: &str) -> io::Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(found) = find_file(&path, name)? {
                return Ok(Some(found));
            }
        } else if path.file_name().is_some_and(|file| file == name) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
