use crate::error::ApiResult;
use config::Config;
use dpanel_common::env::{get_env_var, API_BASE_URL_ENV_VAR};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://pawon.terpusat.com";
pub const DEFAULT_FRONTEND_URL: &str = "https://cloud.terpusat.com";
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PanelSettings {
    pub api_base_url: String,
    pub frontend_url: String,
    pub read_timeout_secs: u64,
    pub create_timeout_secs: u64,
}

impl PanelSettings {
    /// Defaults, with `DPANEL_API_BASE_URL` pointing the client at another panel.
    pub fn load() -> ApiResult<Self> {
        let settings = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("frontend_url", DEFAULT_FRONTEND_URL)?
            .set_default("read_timeout_secs", DEFAULT_READ_TIMEOUT_SECS as i64)?
            .set_default("create_timeout_secs", DEFAULT_CREATE_TIMEOUT_SECS as i64)?
            .set_override_option("api_base_url", get_env_var(API_BASE_URL_ENV_VAR))?
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Used for calls that make the panel generate keys or proxies.
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    pub fn servers_page(&self) -> String {
        format!(
            "{}/v2/resources/servers",
            self.frontend_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn api_base_url_can_be_overridden() {
        std::env::remove_var(API_BASE_URL_ENV_VAR);
        let settings = PanelSettings::load().unwrap();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.read_timeout(), Duration::from_secs(5));
        assert_eq!(settings.create_timeout(), Duration::from_secs(30));

        std::env::set_var(API_BASE_URL_ENV_VAR, "http://127.0.0.1:8080");
        let settings = PanelSettings::load().unwrap();
        std::env::remove_var(API_BASE_URL_ENV_VAR);

        assert_eq!(settings.api_base_url, "http://127.0.0.1:8080");
        assert_eq!(
            settings.servers_page(),
            "https://cloud.terpusat.com/v2/resources/servers"
        );
    }
}
