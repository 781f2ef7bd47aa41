use crate::{warning_message, Colorize};
use anyhow::{bail, Result};
use std::process::{Command, Stdio};

/// Fails with a readable hint when `command` is run without root privileges.
pub fn ensure_sudo(command: &str) -> Result<()> {
    if !is_sudo() {
        warning_message!(
            "`{}` requires root privileges. Please run `sudo dpid {}`.",
            command,
            command
        );
        bail!("`{}` must be run as root or with sudo", command);
    }
    Ok(())
}

/// True when the process is root, or when `sudo` works without a password prompt.
pub fn is_sudo() -> bool {
    is_root()
        || Command::new("sudo")
            .args(["-n", "true"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
}

pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    Linux,
    Macos,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os: Os,
    pub full_os: String,
    pub arch: Arch,
    pub full_arch: String,
}

impl PlatformInfo {
    pub fn build() -> Self {
        Self::from_consts(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_consts(os: &str, arch: &str) -> Self {
        let parsed_os = match os {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            other => Os::Other(other.to_string()),
        };
        let parsed_arch = match arch {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            other => Arch::Other(other.to_string()),
        };

        PlatformInfo {
            os: parsed_os,
            full_os: os.to_string(),
            arch: parsed_arch,
            full_arch: arch.to_string(),
        }
    }

    /// OS name as used in the tunnel agent release assets.
    pub fn release_os(&self) -> Result<&'static str> {
        match &self.os {
            Os::Linux => Ok("linux"),
            Os::Macos => Ok("darwin"),
            Os::Other(other) => bail!("unsupported operating system: {}", other),
        }
    }

    /// Architecture name as used in the tunnel agent release assets.
    pub fn release_arch(&self) -> Result<&'static str> {
        match &self.arch {
            Arch::X86_64 => Ok("amd64"),
            Arch::Aarch64 => Ok("arm64"),
            Arch::Other(other) => bail!("unsupported architecture: {}", other),
        }
    }

    pub fn as_os_and_arch_string(&self) -> String {
        format!("{} ({})", self.full_os, self.full_arch)
    }
}
