use super::require_session;
use crate::commands::TunnelCreateArgs;
use anyhow::{Context, Result};
use dpanel_client::PanelClient;
use dpanel_common::network::is_port_up;
use dpanel_common::system::ensure_sudo;
use dpanel_common::{field_message, info_message, success_message, warning_message, Colorize};
use dpanel_tunnel::agent::TunnelAgent;
use dpanel_tunnel::config::{RelayPortProbe, TunnelConfiguration, TunnelKind, TunnelListenerEntry};
use dpanel_tunnel::service::ServiceManager;
use dpanel_tunnel::settings::RELEASES_URL;
use dpanel_tunnel::version::VersionStatus;
use dpanel_tunnel::TunnelSettings;

/// Writes the listener config, installs the pinned agent release and starts it
/// as a systemd service.
pub async fn create(
    client: &PanelClient,
    settings: &TunnelSettings,
    args: TunnelCreateArgs,
) -> Result<()> {
    require_session(client)?;
    ensure_sudo("tunnel create")?;

    let entries = vec![
        TunnelListenerEntry::new(
            TunnelKind::Ssh,
            &settings.relay_host,
            settings.relay_port,
            args.tunnel_ssh_listener,
            args.tunnel_ssh_service,
        ),
        TunnelListenerEntry::new(
            TunnelKind::Http,
            &settings.relay_host,
            settings.relay_port,
            args.tunnel_http_listener,
            args.tunnel_http_service,
        ),
    ];
    let config = TunnelConfiguration::build_checked(entries, &RelayPortProbe)
        .await
        .context("Choose another listener port or contact prakasa@devetek.com")?;

    let agent = TunnelAgent::new(settings)?;
    info_message!(
        "Installing {} {} for {}",
        settings.binary_name,
        settings.version,
        agent.platform().as_os_and_arch_string()
    );
    let binary = agent.install(&settings.version).await?;

    let manager = ServiceManager::systemd(settings);
    manager.create_service(&config)?;

    success_message!(
        "{} is running {} with config {}",
        settings.service_name,
        binary.display(),
        settings.config_path().display()
    );
    for entry in config.entries() {
        info_message!(
            "{} listens on {}:{}",
            entry.id,
            entry.tunnel_host,
            entry.listener_port
        );
    }
    Ok(())
}

pub async fn upgrade(client: &PanelClient, settings: &TunnelSettings) -> Result<()> {
    require_session(client)?;

    let agent = TunnelAgent::new(settings)?;
    let check = match agent.check_upgrade().await {
        Ok(check) => check,
        Err(e) => {
            tracing::warn!("latest release lookup failed: {}", e);
            warning_message!(
                "Failed to fetch the new {} version. Please try again later, releases are listed at {}",
                settings.binary_name,
                RELEASES_URL
            );
            return Ok(());
        }
    };

    match check.status {
        VersionStatus::UpgradeNeeded => {
            ensure_sudo("tunnel upgrade")?;
            info_message!(
                "Your current version is {}, and new version available is {}",
                display_version(&check.installed),
                check.latest
            );
            info_message!("Installing new version...");
            agent.install(&check.latest).await?;
            success_message!(
                "Upgraded {} to {}, restart {} to run it",
                settings.binary_name,
                check.latest,
                settings.service_name
            );
        }
        VersionStatus::UpToDate => {
            success_message!("You are running the latest version {}", check.installed);
        }
        VersionStatus::Unknown => {
            warning_message!(
                "Unknown version checker status, make sure your {} version is valid semver",
                settings.binary_name
            );
        }
    }
    Ok(())
}

pub async fn status(settings: &TunnelSettings) -> Result<()> {
    let agent = TunnelAgent::new(settings)?.quiet();
    let installed = agent.installed_version();
    let latest = agent.latest_version().await;

    field_message!("Agent", "{}", agent.binary_path().display());
    field_message!("Installed", "{}", display_version(&installed));
    match &latest {
        Ok(latest) => {
            field_message!("Latest", "{}", latest);
            let status = match dpanel_tunnel::version::compare(&installed, latest) {
                VersionStatus::UpgradeNeeded => "upgrade available, run `dpid tunnel upgrade`",
                VersionStatus::UpToDate => "up to date",
                VersionStatus::Unknown => "unknown",
            };
            field_message!("Status", "{}", status);
        }
        Err(e) => {
            tracing::warn!("latest release lookup failed: {}", e);
            field_message!("Latest", "unavailable");
        }
    }

    let config = TunnelConfiguration::load(&settings.config_path());
    field_message!("Config", "{}", settings.config_path().display());
    if config.is_empty() {
        info_message!("No tunnel listeners configured");
    }
    for entry in config.entries() {
        let service = if is_port_up(entry.service_port).await {
            "up"
        } else {
            "down"
        };
        field_message!(
            entry.kind.as_str(),
            "{}:{} -> {}:{} ({:?}, service {})",
            entry.tunnel_host,
            entry.listener_port,
            entry.service_host,
            entry.service_port,
            entry.state,
            service
        );
    }
    Ok(())
}

fn display_version(version: &str) -> &str {
    if version.is_empty() {
        "not installed"
    } else {
        version
    }
}
