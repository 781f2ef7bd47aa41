use crate::error::{Result, TunnelError};
use config::{Config, ConfigBuilder};
use config::builder::DefaultState;
use dpanel_common::env::{
    get_env_var, TUNNEL_BASE_URL_ENV_VAR, TUNNEL_HOST_ENV_VAR, TUNNEL_PORT_ENV_VAR,
    TUNNEL_RELEASE_URL_ENV_VAR, TUNNEL_VERSION_ENV_VAR,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BINARY_NAME: &str = "marijan";
pub const DEFAULT_BINARY_VERSION: &str = "v0.1.1-beta.2";
pub const RELEASES_URL: &str = "https://github.com/devetek/tuman/releases";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://github.com/devetek/tuman/releases/download";
pub const DEFAULT_RELEASE_METADATA_URL: &str =
    "https://api.github.com/repos/devetek/tuman/releases/latest";
pub const DEFAULT_RELAY_HOST: &str = "tunnel.beta.devetek.app";
pub const DEFAULT_RELAY_PORT: u16 = 2220;
pub const DEFAULT_CONFIG_DIR: &str = "/opt/dpanel/tunnel";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_UNIT_PATH: &str = "/usr/lib/systemd/system/dpanel-tunnel.service";
pub const DEFAULT_SERVICE_NAME: &str = "dpanel-tunnel";
pub const DEFAULT_BIN_DIR: &str = "/usr/local/bin";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Everything the tunnel pipeline needs to know about where things live.
/// Built once at startup and passed down by reference.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TunnelSettings {
    pub binary_name: String,
    pub version: String,
    pub download_base_url: String,
    pub release_metadata_url: String,
    pub relay_host: String,
    pub relay_port: u16,
    pub config_dir: PathBuf,
    pub config_file: String,
    pub unit_path: PathBuf,
    pub service_name: String,
    pub bin_dir: PathBuf,
    /// Where the archive is downloaded; the working directory when unset.
    pub download_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
}

impl TunnelSettings {
    /// Defaults overridden by the `DNOCS_TUNNEL_*` environment variables.
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .set_override_option("download_base_url", get_env_var(TUNNEL_BASE_URL_ENV_VAR))?
            .set_override_option(
                "release_metadata_url",
                get_env_var(TUNNEL_RELEASE_URL_ENV_VAR),
            )?
            .set_override_option("version", get_env_var(TUNNEL_VERSION_ENV_VAR))?
            .set_override_option("relay_host", get_env_var(TUNNEL_HOST_ENV_VAR))?
            .set_override_option("relay_port", get_env_var(TUNNEL_PORT_ENV_VAR))?;

        Self::finish(builder)
    }

    /// Built-in values only, ignoring the environment.
    pub fn built_in() -> Result<Self> {
        Self::finish(Self::defaults()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("binary_name", DEFAULT_BINARY_NAME)?
            .set_default("version", DEFAULT_BINARY_VERSION)?
            .set_default("download_base_url", DEFAULT_DOWNLOAD_BASE_URL)?
            .set_default("release_metadata_url", DEFAULT_RELEASE_METADATA_URL)?
            .set_default("relay_host", DEFAULT_RELAY_HOST)?
            .set_default("relay_port", i64::from(DEFAULT_RELAY_PORT))?
            .set_default("config_dir", DEFAULT_CONFIG_DIR)?
            .set_default("config_file", DEFAULT_CONFIG_FILE)?
            .set_default("unit_path", DEFAULT_UNIT_PATH)?
            .set_default("service_name", DEFAULT_SERVICE_NAME)?
            .set_default("bin_dir", DEFAULT_BIN_DIR)?
            .set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Self = builder.build()?.try_deserialize()?;
        if settings.binary_name.trim().is_empty() {
            return Err(TunnelError::ConfigurationInvalid(
                "binary name must not be empty".to_string(),
            ));
        }
        if settings.version.trim().is_empty() {
            return Err(TunnelError::ConfigurationInvalid(
                "agent version must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(&self.config_file)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.bin_dir.join(&self.binary_name)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Directory the archive is downloaded into.
    pub fn download_dir(&self) -> Result<PathBuf> {
        match &self.download_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(TunnelError::fs(
                "resolve the working directory",
                Path::new("."),
            )),
        }
    }
}

impl From<config::ConfigError> for TunnelError {
    fn from(err: config::ConfigError) -> Self {
        TunnelError::ConfigurationInvalid(err.to_string())
    }
}
