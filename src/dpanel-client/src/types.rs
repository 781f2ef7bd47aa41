use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapped around every panel response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub status: String,
    pub data: Option<T>,
    pub error: Option<Value>,
}

impl<T> ApiResponse<T> {
    /// The `error` field when it carries anything; it is a string on most
    /// endpoints and an object on a few.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) if message.is_empty() => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub fullname: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total_item: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SshKeyList {
    pub pagination: Pagination,
    pub secrets: Vec<SshKey>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub data: Value,
}

impl SshKey {
    /// The `public` half; `data` is either an object or a JSON-encoded string.
    pub fn public_key(&self) -> Option<String> {
        let data = match &self.data {
            Value::String(encoded) => serde_json::from_str(encoded).ok()?,
            other => other.clone(),
        };
        data.get("public")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SshKeyPayload {
    pub key_size: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub key_prefix: String,
}

impl SshKeyPayload {
    pub fn generated_at(now: DateTime<Local>) -> Self {
        Self {
            key_size: 4096,
            name: format!("cli-ssh-key-{}", now.format("%Y%m%d%H%M%S")),
            kind: "ssh-key".to_string(),
            key_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterPayload {
    pub advance_mode: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<u64>,
    pub upstream: String,
}

impl RouterPayload {
    /// Proxy from a panel-assigned domain to the tunnel's HTTP listener.
    pub fn proxy_pass(listener_port: u16, service_port: u16) -> Self {
        let name = format!("http-{}-to-{}", listener_port, service_port);
        Self {
            advance_mode: false,
            kind: "proxy_pass".to_string(),
            domain: format!("{} 1", name),
            name,
            machine_id: None,
            upstream: format!("localhost:{}", listener_port),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Router {
    pub id: u64,
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServerPayload {
    pub provider: String,
    pub secret_id: String,
    pub address: String,
    pub ssh_port: String,
    pub http_port: String,
    pub domain: String,
    pub ssh_user: String,
}

/// A server as the panel reports it; also what `machine.json` holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MachineRecord {
    pub id: u64,
    pub address: String,
    pub domain: String,
    pub ssh_port: String,
    pub http_port: String,
}
