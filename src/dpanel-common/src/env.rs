use std::env;

// Panel API
pub const API_BASE_URL_ENV_VAR: &str = "DPANEL_API_BASE_URL";

// Tunnel agent distribution
pub const TUNNEL_BASE_URL_ENV_VAR: &str = "DNOCS_TUNNEL_BASE_URL";
pub const TUNNEL_RELEASE_URL_ENV_VAR: &str = "DNOCS_TUNNEL_RELEASE_URL";
pub const TUNNEL_VERSION_ENV_VAR: &str = "DNOCS_TUNNEL_VERSION";
pub const TUNNEL_HOST_ENV_VAR: &str = "DNOCS_TUNNEL_HOST";
pub const TUNNEL_PORT_ENV_VAR: &str = "DNOCS_TUNNEL_PORT";

/// Returns the variable only when it is set to a non-blank value.
pub fn get_env_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
