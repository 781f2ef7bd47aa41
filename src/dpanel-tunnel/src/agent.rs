use crate::artifact::{self, AgentArtifact};
use crate::error::{Result, TunnelError};
use crate::fetcher::ArtifactFetcher;
use crate::installer::ArchiveInstaller;
use crate::settings::TunnelSettings;
use crate::version::{self, VersionStatus};
use dpanel_common::system::PlatformInfo;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCheck {
    pub installed: String,
    pub latest: String,
    pub status: VersionStatus,
}

/// Download and install of the agent binary for the current platform.
pub struct TunnelAgent<'a> {
    settings: &'a TunnelSettings,
    platform: PlatformInfo,
    fetcher: ArtifactFetcher,
}

impl<'a> TunnelAgent<'a> {
    pub fn new(settings: &'a TunnelSettings) -> Result<Self> {
        Self::with_platform(settings, PlatformInfo::build())
    }

    pub fn with_platform(settings: &'a TunnelSettings, platform: PlatformInfo) -> Result<Self> {
        Ok(Self {
            settings,
            platform,
            fetcher: ArtifactFetcher::new(settings.http_timeout())?,
        })
    }

    pub fn quiet(mut self) -> Self {
        self.fetcher = self.fetcher.quiet();
        self
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn artifact(&self, version: &str) -> Result<AgentArtifact> {
        AgentArtifact::for_platform(&self.settings.binary_name, version, &self.platform)
    }

    /// Downloads `version` next to the working directory, unpacks it and moves
    /// the binary into the bin dir.
    pub async fn install(&self, version: &str) -> Result<PathBuf> {
        let artifact = self.artifact(version)?;
        let (url, file_name) = artifact.resolve(&self.settings.download_base_url)?;
        let archive = self.settings.download_dir()?.join(&file_name);

        tracing::info!(
            "installing {} {} for {} ({})",
            artifact.binary,
            artifact.version,
            artifact.os,
            artifact.arch
        );
        self.fetcher.download(url.as_str(), &archive).await?;

        let staging = tempfile::Builder::new()
            .prefix("dpanel-tunnel-")
            .tempdir()
            .map_err(TunnelError::fs("create staging directory in", &std::env::temp_dir()))?;

        ArchiveInstaller::from_settings(self.settings).extract(&archive, staging.path())
    }

    pub fn installed_version(&self) -> String {
        artifact::installed_version(self.settings)
    }

    pub async fn latest_version(&self) -> Result<String> {
        artifact::latest_version(
            &self.settings.release_metadata_url,
            self.settings.http_timeout(),
        )
        .await
    }

    pub async fn check_upgrade(&self) -> Result<UpgradeCheck> {
        let latest = self.latest_version().await?;
        let installed = self.installed_version();
        let status = version::compare(&installed, &latest);

        Ok(UpgradeCheck {
            installed,
            latest,
            status,
        })
    }

    pub fn binary_path(&self) -> PathBuf {
        self.settings.binary_path()
    }

    pub fn is_installed(&self) -> bool {
        self.binary_path().is_file()
    }
}
