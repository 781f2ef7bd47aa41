use crate::error::{Result, TunnelError};
use crate::settings::TunnelSettings;
use dpanel_common::system::PlatformInfo;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use url::Url;

/// One downloadable release of the agent for a single platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentArtifact {
    pub binary: String,
    pub version: String,
    pub os: String,
    pub arch: String,
}

impl AgentArtifact {
    pub fn new(
        binary: impl Into<String>,
        version: impl Into<String>,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            version: version.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Artifact for `version` on the given platform, named as the agent's releases are.
    pub fn for_platform(binary: &str, version: &str, platform: &PlatformInfo) -> Result<Self> {
        let os = platform
            .release_os()
            .map_err(|e| TunnelError::ConfigurationInvalid(e.to_string()))?;
        let arch = platform
            .release_arch()
            .map_err(|e| TunnelError::ConfigurationInvalid(e.to_string()))?;
        Ok(Self::new(binary, version, os, arch))
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.tar.gz",
            self.binary, self.version, self.os, self.arch
        )
    }

    /// Download URL (`<base>/<version>/<file name>`) and the archive file name.
    pub fn resolve(&self, base_url: &str) -> Result<(Url, String)> {
        let invalid = |reason: &str| TunnelError::InvalidSource {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        if base_url.trim().is_empty() {
            return Err(invalid("base url is not set"));
        }

        let mut url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https are supported"));
        }

        let file_name = self.file_name();
        url.path_segments_mut()
            .map_err(|_| invalid("url cannot have path segments"))?
            .pop_if_empty()
            .extend([self.version.as_str(), file_name.as_str()]);

        Ok((url, file_name))
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    tag_name: String,
}

/// Tag of the most recent agent release.
pub async fn latest_version(metadata_url: &str, timeout: Duration) -> Result<String> {
    let network = |reason: String| TunnelError::NetworkFailure {
        url: metadata_url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        // api.github.com rejects requests without a user agent
        .user_agent(concat!("dpid/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| network(e.to_string()))?;

    let response = client
        .get(metadata_url)
        .send()
        .await
        .map_err(|e| network(e.to_string()))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(network(format!("unexpected status {}", response.status())));
    }

    let release: ReleaseMetadata = response
        .json()
        .await
        .map_err(|e| network(format!("malformed release metadata: {}", e)))?;

    tracing::debug!("latest {} release is {}", metadata_url, release.tag_name);
    Ok(release.tag_name)
}

/// Version reported by the installed agent, or an empty string when it is
/// missing or cannot be run.
pub fn installed_version(settings: &TunnelSettings) -> String {
    let Some(binary) = installed_binary(settings) else {
        return String::new();
    };

    Command::new(&binary)
        .arg("version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_default()
}

fn installed_binary(settings: &TunnelSettings) -> Option<PathBuf> {
    let pinned = settings.binary_path();
    if pinned.is_file() {
        return Some(pinned);
    }
    which::which(&settings.binary_name).ok()
}
