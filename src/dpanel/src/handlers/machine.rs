use super::auth::ensure_session;
use super::require_session;
use crate::commands::{MachineCreateArgs, RegisterArgs};
use anyhow::{bail, Context, Result};
use dpanel_client::types::{RouterPayload, ServerPayload, SshKey};
use dpanel_client::{ApiError, PanelClient};
use dpanel_common::network::{find_available_port, public_ip, PUBLIC_IP_URL, SERVICE_PORT_RANGE};
use dpanel_common::ssh::AuthorizedKeys;
use dpanel_common::system::ensure_sudo;
use dpanel_common::{info_message, success_message, Colorize};
use dpanel_tunnel::config::{TunnelConfiguration, TunnelKind};
use dpanel_tunnel::TunnelSettings;
use nix::unistd::{Uid, User};

const PROVIDER: &str = "other";

/// Where the panel reaches this machine.
struct Endpoint {
    address: String,
    ssh_port: u16,
    http_port: u16,
    domain: String,
}

pub async fn register(client: &PanelClient, args: RegisterArgs) -> Result<()> {
    ensure_session(client, &args.credentials).await?;
    let user = client
        .profile()
        .await
        .context("Error get user profile")?;
    tracing::info!("registering machine for {}", user.email);

    let key = authorize_panel_key(client).await?;
    let endpoint = Endpoint {
        address: resolve_address(args.ssh_ip).await?,
        ssh_port: args.ssh_port,
        http_port: resolve_http_port(args.http_port).await?,
        domain: String::new(),
    };

    register_machine(client, &key, endpoint).await
}

pub async fn create(
    client: &PanelClient,
    tunnel_settings: &TunnelSettings,
    args: MachineCreateArgs,
) -> Result<()> {
    ensure_sudo("machine create")?;
    require_session(client)?;

    let key = authorize_panel_key(client).await?;

    if client.is_registered().await {
        bail!("Server already registered with your account");
    }

    let endpoint = if args.behind_tunnel {
        tunnel_endpoint(client, tunnel_settings, args).await?
    } else {
        Endpoint {
            address: resolve_address(args.ssh_ip).await?,
            ssh_port: args.ssh_port,
            http_port: resolve_http_port(args.http_port).await?,
            domain: args.http_domain.unwrap_or_default(),
        }
    };

    register_machine(client, &key, endpoint).await
}

/// SSH goes through the tunnel's SSH listener; HTTP gets a panel router in
/// front of the tunnel's HTTP listener.
async fn tunnel_endpoint(
    client: &PanelClient,
    tunnel_settings: &TunnelSettings,
    args: MachineCreateArgs,
) -> Result<Endpoint> {
    let config = TunnelConfiguration::load(&tunnel_settings.config_path());
    if config.is_empty() {
        bail!("This machine is not connected to dPanel tunnel, run `dpid tunnel create` first");
    }

    let (address, ssh_port) = match config.entry_of_kind(TunnelKind::Ssh) {
        Some(ssh) => (ssh.tunnel_host.clone(), ssh.listener_port),
        None => (resolve_address(args.ssh_ip).await?, args.ssh_port),
    };

    let http = config
        .entry_of_kind(TunnelKind::Http)
        .context("Tunnel configuration has no HTTP listener")?;

    let router = client
        .create_router(&RouterPayload::proxy_pass(
            http.listener_port,
            http.service_port,
        ))
        .await
        .with_context(|| {
            format!(
                "Failed to create HTTP server for this machine. Login to dPanel, open {}/router, and delete the existing domain",
                client.settings().frontend_url
            )
        })?;
    info_message!("HTTP access for this machine: {}", router.domain);

    Ok(Endpoint {
        address,
        ssh_port,
        http_port: http.service_port,
        domain: router.domain,
    })
}

async fn register_machine(client: &PanelClient, key: &SshKey, endpoint: Endpoint) -> Result<()> {
    let payload = ServerPayload {
        provider: PROVIDER.to_string(),
        secret_id: key.id.to_string(),
        address: endpoint.address,
        ssh_port: endpoint.ssh_port.to_string(),
        http_port: endpoint.http_port.to_string(),
        domain: endpoint.domain,
        ssh_user: current_user()?,
    };

    let server = client
        .register_server(&payload)
        .await
        .context("Error register server")?;
    let setup = client
        .setup_server(server.id)
        .await
        .context("Error setup server")?;
    tracing::info!("server {} setup: {}", server.id, setup);

    success_message!(
        "Success register server, visit {} to check the progress!",
        client.settings().servers_page()
    );
    Ok(())
}

/// Lets the panel's SSH key into this machine.
async fn authorize_panel_key(client: &PanelClient) -> Result<SshKey> {
    let key = client
        .machine_ssh_key()
        .await
        .context("Error get secret ssh")?;
    let public_key = key
        .public_key()
        .ok_or(ApiError::MissingPublicKey(key.id))?;

    let authorized_keys = AuthorizedKeys::for_current_user()?;
    if !authorized_keys.contains(&public_key) {
        authorized_keys
            .append(&public_key)
            .context("Error append ssh key to authorized_keys file")?;
    }

    Ok(key)
}

async fn resolve_address(ssh_ip: Option<String>) -> Result<String> {
    match ssh_ip.filter(|ip| !ip.trim().is_empty()) {
        Some(ip) => Ok(ip),
        None => public_ip(PUBLIC_IP_URL)
            .await
            .context("Error get my public IP"),
    }
}

async fn resolve_http_port(http_port: Option<u16>) -> Result<u16> {
    match http_port {
        Some(port) => Ok(port),
        None => find_available_port(SERVICE_PORT_RANGE)
            .await
            .with_context(|| format!("No available port in {:?}", SERVICE_PORT_RANGE)),
    }
}

fn current_user() -> Result<String> {
    let user = User::from_uid(Uid::current())
        .context("Error getting current user")?
        .context("Current user has no passwd entry")?;
    Ok(user.name)
}
