use crate::error::{Result, TunnelError};
use semver::Version;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    UpgradeNeeded,
    UpToDate,
    Unknown,
}

/// Parses a release tag such as `v0.1.1-beta.2`. Agents that print a banner
/// (`marijan version v0.1.1`) are read from their last word.
pub fn parse_version(raw: &str) -> Result<Version> {
    let token = raw.split_whitespace().last().unwrap_or_default();
    let token = token.strip_prefix('v').unwrap_or(token);
    Version::parse(token).map_err(|_| TunnelError::VersionUnparsable(raw.to_string()))
}

/// Compares the installed agent against the latest release. An empty
/// `installed` means nothing is installed yet.
pub fn compare(installed: &str, latest: &str) -> VersionStatus {
    let Ok(latest) = parse_version(latest) else {
        return VersionStatus::Unknown;
    };

    if installed.trim().is_empty() {
        return VersionStatus::UpgradeNeeded;
    }

    match parse_version(installed).map(|installed| installed.cmp(&latest)) {
        Ok(Ordering::Less) => VersionStatus::UpgradeNeeded,
        Ok(_) => VersionStatus::UpToDate,
        Err(_) => VersionStatus::Unknown,
    }
}
