use crate::config::TunnelConfiguration;
use crate::error::{Result, TunnelError};
use crate::settings::TunnelSettings;
use mockall::automock;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const DOCUMENTATION_URL: &str = "https://cloud.terpusat.com";

/// How far [`ServiceManager::create_service`] got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceState {
    NotInstalled,
    ConfigWritten,
    UnitWritten,
    Enabled,
    Running,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::NotInstalled => "not installed",
            ServiceState::ConfigWritten => "config written",
            ServiceState::UnitWritten => "unit written",
            ServiceState::Enabled => "enabled",
            ServiceState::Running => "running",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Enable,
    Start,
    Reload,
    Stop,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Enable => "enable",
            ServiceAction::Start => "start",
            ServiceAction::Reload => "reload",
            ServiceAction::Stop => "stop",
        }
    }
}

/// What the unit file describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledServiceDescriptor {
    pub service_name: String,
    pub binary_path: PathBuf,
    pub config_path: PathBuf,
    pub version: String,
}

impl InstalledServiceDescriptor {
    pub fn from_settings(settings: &TunnelSettings) -> Self {
        Self {
            service_name: settings.service_name.clone(),
            binary_path: settings.binary_path(),
            config_path: settings.config_path(),
            version: settings.version.clone(),
        }
    }
}

pub fn render_unit(descriptor: &InstalledServiceDescriptor) -> String {
    format!(
        r#"[Unit]
Description=dPanel Agent name "{name}", version {version} by devetek.com
Documentation={docs}
After=network-online.target
Wants=network-online.target systemd-networkd-wait-online.service
StartLimitIntervalSec=120
StartLimitBurst=5

[Service]
Restart=always
RestartSec=10s

; User and group the process will run as.
User=root
Group=root

; Service runtime configuration
ExecStart="{binary}" run --config "{config}"
ExecReload=/bin/kill -USR2 $MAINPID
ExecStop=/bin/kill -SIGTERM $MAINPID

[Install]
WantedBy=multi-user.target
"#,
        name = descriptor.service_name,
        version = descriptor.version,
        docs = DOCUMENTATION_URL,
        binary = descriptor.binary_path.display(),
        config = descriptor.config_path.display(),
    )
}

/// Host init system.
#[automock]
pub trait ServiceControl {
    fn run(&self, action: ServiceAction, service: &str) -> Result<()>;
}

pub struct Systemctl;

impl ServiceControl for Systemctl {
    fn run(&self, action: ServiceAction, service: &str) -> Result<()> {
        let command = format!("systemctl {} {}", action.as_str(), service);
        tracing::debug!("running `{}`", command);

        let output = Command::new("systemctl")
            .arg(action.as_str())
            .arg(service)
            .output()
            .map_err(|e| TunnelError::SubprocessFailure {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TunnelError::SubprocessFailure {
                command,
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

/// Writes the agent's configuration and unit file and drives the service.
pub struct ServiceManager<C: ServiceControl> {
    control: C,
    config_path: PathBuf,
    unit_path: PathBuf,
    descriptor: InstalledServiceDescriptor,
}

impl ServiceManager<Systemctl> {
    pub fn systemd(settings: &TunnelSettings) -> Self {
        Self::new(Systemctl, settings)
    }
}

impl<C: ServiceControl> ServiceManager<C> {
    pub fn new(control: C, settings: &TunnelSettings) -> Self {
        Self {
            control,
            config_path: settings.config_path(),
            unit_path: settings.unit_path.clone(),
            descriptor: InstalledServiceDescriptor::from_settings(settings),
        }
    }

    /// Runs every step from scratch: config, unit, enable, start. Stops at the
    /// first failure without undoing earlier steps.
    pub fn create_service(&self, config: &TunnelConfiguration) -> Result<ServiceState> {
        let mut state = ServiceState::NotInstalled;

        while state != ServiceState::Running {
            let next = self.advance(state, config).map_err(|e| TunnelError::ServiceStep {
                reached: state,
                source: Box::new(e),
            })?;
            tracing::info!("{} service: {} -> {}", self.descriptor.service_name, state, next);
            state = next;
        }

        Ok(state)
    }

    fn advance(&self, state: ServiceState, config: &TunnelConfiguration) -> Result<ServiceState> {
        match state {
            ServiceState::NotInstalled => {
                config.persist(&self.config_path)?;
                Ok(ServiceState::ConfigWritten)
            }
            ServiceState::ConfigWritten => {
                self.write_unit()?;
                Ok(ServiceState::UnitWritten)
            }
            ServiceState::UnitWritten => {
                self.trigger(ServiceAction::Enable)?;
                Ok(ServiceState::Enabled)
            }
            ServiceState::Enabled => {
                self.trigger(ServiceAction::Start)?;
                Ok(ServiceState::Running)
            }
            ServiceState::Running => Ok(ServiceState::Running),
        }
    }

    fn write_unit(&self) -> Result<()> {
        if let Some(parent) = self.unit_path.parent() {
            fs::create_dir_all(parent).map_err(TunnelError::fs("create", parent))?;
        }
        fs::write(&self.unit_path, render_unit(&self.descriptor))
            .map_err(TunnelError::fs("write", &self.unit_path))
    }

    pub fn reload_service(&self) -> Result<()> {
        self.trigger(ServiceAction::Reload)
    }

    pub fn stop_service(&self) -> Result<()> {
        self.trigger(ServiceAction::Stop)
    }

    fn trigger(&self, action: ServiceAction) -> Result<()> {
        self.control.run(action, &self.descriptor.service_name)
    }

    pub fn unit_path(&self) -> &Path {
        &self.unit_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TunnelKind, TunnelListenerEntry};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tempfile::TempDir;

    fn sandbox(temp: &TempDir) -> TunnelSettings {
        TunnelSettings {
            config_dir: temp.path().join("opt/dpanel/tunnel"),
            unit_path: temp.path().join("usr/lib/systemd/system/dpanel-tunnel.service"),
            ..TunnelSettings::built_in().unwrap()
        }
    }

    fn config() -> TunnelConfiguration {
        TunnelConfiguration::build(vec![TunnelListenerEntry::new(
            TunnelKind::Ssh,
            "tunnel.beta.devetek.app",
            2220,
            2222,
            22,
        )])
        .unwrap()
    }

    #[test]
    fn unit_runs_agent_with_config() {
        let unit = render_unit(&InstalledServiceDescriptor {
            service_name: "dpanel-tunnel".to_string(),
            binary_path: PathBuf::from("/usr/local/bin/marijan"),
            config_path: PathBuf::from("/opt/dpanel/tunnel/config.json"),
            version: "v0.1.1-beta.2".to_string(),
        });

        assert!(unit.contains(
            r#"Description=dPanel Agent name "dpanel-tunnel", version v0.1.1-beta.2 by devetek.com"#
        ));
        assert!(unit.contains(
            r#"ExecStart="/usr/local/bin/marijan" run --config "/opt/dpanel/tunnel/config.json""#
        ));
        assert!(unit.contains("Restart=always\n"));
        assert!(unit.contains("RestartSec=10s\n"));
        assert!(unit.contains("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn create_service_writes_files_then_enables_and_starts() {
        let temp = TempDir::new().unwrap();
        let settings = sandbox(&temp);

        let mut control = MockServiceControl::new();
        let mut seq = Sequence::new();
        control
            .expect_run()
            .with(eq(ServiceAction::Enable), eq("dpanel-tunnel"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        control
            .expect_run()
            .with(eq(ServiceAction::Start), eq("dpanel-tunnel"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let manager = ServiceManager::new(control, &settings);
        let state = manager.create_service(&config()).unwrap();

        assert_eq!(state, ServiceState::Running);
        assert_eq!(TunnelConfiguration::load(&settings.config_path()), config());
        let unit = fs::read_to_string(manager.unit_path()).unwrap();
        assert!(unit.contains(&format!(
            r#"run --config "{}""#,
            settings.config_path().display()
        )));
    }

    #[test]
    fn failed_enable_reports_reached_state_and_skips_start() {
        let temp = TempDir::new().unwrap();
        let settings = sandbox(&temp);

        let mut control = MockServiceControl::new();
        control
            .expect_run()
            .with(eq(ServiceAction::Enable), eq("dpanel-tunnel"))
            .times(1)
            .returning(|action, service| {
                Err(TunnelError::SubprocessFailure {
                    command: format!("systemctl {} {}", action.as_str(), service),
                    reason: "exit status: 1".to_string(),
                })
            });

        let manager = ServiceManager::new(control, &settings);
        let result = manager.create_service(&config());

        assert!(matches!(
            result,
            Err(TunnelError::ServiceStep {
                reached: ServiceState::UnitWritten,
                ..
            })
        ));
        assert!(settings.config_path().exists());
        assert!(settings.unit_path.exists());
    }

    #[test]
    fn reload_and_stop_target_the_service() {
        let temp = TempDir::new().unwrap();
        let settings = sandbox(&temp);

        let mut control = MockServiceControl::new();
        control
            .expect_run()
            .with(eq(ServiceAction::Reload), eq("dpanel-tunnel"))
            .times(1)
            .returning(|_, _| Ok(()));
        control
            .expect_run()
            .with(eq(ServiceAction::Stop), eq("dpanel-tunnel"))
            .times(1)
            .returning(|_, _| Ok(()));

        let manager = ServiceManager::new(control, &settings);
        manager.reload_service().unwrap();
        manager.stop_service().unwrap();
    }
}
