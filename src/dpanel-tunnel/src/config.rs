//! The tunnel configuration consumed by the agent: an ordered list of
//! listener-to-service mappings, persisted as a JSON array.
use crate::error::{Result, TunnelError};
use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_LISTENER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVICE_HOST: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelKind {
    Ssh,
    Http,
}

impl TunnelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelKind::Ssh => "ssh",
            TunnelKind::Http => "http",
        }
    }

    /// Entries written before `Kind` existed only carry it as the id prefix.
    fn from_legacy_id(id: &str) -> Option<Self> {
        if id.starts_with("ssh-") {
            Some(TunnelKind::Ssh)
        } else if id.starts_with("http-") {
            Some(TunnelKind::Http)
        } else {
            None
        }
    }
}

impl fmt::Display for TunnelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "RawEntry")]
pub struct TunnelListenerEntry {
    #[serde(rename = "NoTCP")]
    pub no_tcp: bool,
    #[serde(rename = "ID")]
    pub id: String,
    pub kind: TunnelKind,
    pub tunnel_host: String,
    #[serde(with = "port_string")]
    pub tunnel_port: u16,
    pub listener_host: String,
    #[serde(with = "port_string")]
    pub listener_port: u16,
    pub service_host: String,
    #[serde(with = "port_string")]
    pub service_port: u16,
    pub state: EntryState,
}

impl TunnelListenerEntry {
    /// Active entry forwarding `listener_port` on the relay to `service_port` on this machine.
    pub fn new(
        kind: TunnelKind,
        relay_host: &str,
        relay_port: u16,
        listener_port: u16,
        service_port: u16,
    ) -> Self {
        Self {
            no_tcp: false,
            id: format!("{}-{}-to-{}", kind, listener_port, service_port),
            kind,
            tunnel_host: relay_host.to_string(),
            tunnel_port: relay_port,
            listener_host: DEFAULT_LISTENER_HOST.to_string(),
            listener_port,
            service_host: DEFAULT_SERVICE_HOST.to_string(),
            service_port,
            state: EntryState::Active,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntry {
    #[serde(rename = "NoTCP", default)]
    no_tcp: bool,
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    kind: Option<TunnelKind>,
    tunnel_host: String,
    #[serde(with = "port_string")]
    tunnel_port: u16,
    listener_host: String,
    #[serde(with = "port_string")]
    listener_port: u16,
    service_host: String,
    #[serde(with = "port_string")]
    service_port: u16,
    state: EntryState,
}

impl TryFrom<RawEntry> for TunnelListenerEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        let kind = raw
            .kind
            .or_else(|| TunnelKind::from_legacy_id(&raw.id))
            .ok_or_else(|| format!("tunnel entry {:?} has no kind", raw.id))?;

        Ok(Self {
            no_tcp: raw.no_tcp,
            id: raw.id,
            kind,
            tunnel_host: raw.tunnel_host,
            tunnel_port: raw.tunnel_port,
            listener_host: raw.listener_host,
            listener_port: raw.listener_port,
            service_host: raw.service_host,
            service_port: raw.service_port,
            state: raw.state,
        })
    }
}

/// The agent reads ports as strings.
mod port_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(port: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(port)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim().parse().map_err(de::Error::custom)
    }
}

/// Answers whether something already listens on a relay port.
#[automock]
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn is_port_used(&self, host: &str, port: u16) -> bool;
}

/// TCP connect against the relay host.
pub struct RelayPortProbe;

#[async_trait]
impl PortProbe for RelayPortProbe {
    async fn is_port_used(&self, host: &str, port: u16) -> bool {
        dpanel_common::network::is_port_used(host, port).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TunnelConfiguration {
    entries: Vec<TunnelListenerEntry>,
}

impl TunnelConfiguration {
    pub fn build(entries: Vec<TunnelListenerEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut listeners = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(TunnelError::DuplicateEntry(entry.id.clone()));
            }
            if !listeners.insert((entry.tunnel_host.as_str(), entry.listener_port)) {
                return Err(TunnelError::DuplicateListener {
                    host: entry.tunnel_host.clone(),
                    port: entry.listener_port,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Like [`Self::build`], but also refuses listener ports that already
    /// answer on their relay host.
    pub async fn build_checked(
        entries: Vec<TunnelListenerEntry>,
        probe: &dyn PortProbe,
    ) -> Result<Self> {
        let config = Self::build(entries)?;
        for entry in &config.entries {
            if probe
                .is_port_used(&entry.tunnel_host, entry.listener_port)
                .await
            {
                return Err(TunnelError::ListenerPortInUse {
                    host: entry.tunnel_host.clone(),
                    port: entry.listener_port,
                });
            }
        }
        Ok(config)
    }

    pub fn entries(&self) -> &[TunnelListenerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_of_kind(&self, kind: TunnelKind) -> Option<&TunnelListenerEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    /// Overwrites `path` with the whole configuration.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let persist_failed = |source| TunnelError::PersistFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(persist_failed)?;
        }

        let json = serde_json::to_vec(&self.entries).map_err(|e| TunnelError::PersistFailed {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        fs::write(path, json).map_err(persist_failed)?;

        tracing::debug!(
            "wrote {} tunnel entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Missing and unreadable files both load as an empty configuration.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("no tunnel configuration at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "ignoring unparsable tunnel configuration {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
