use crate::commands::{AuthCommand, Cli, Command, MachineCommand, TunnelCommand};
use crate::handlers::{auth, machine, system, tunnel};
use crate::logging::setup_logging;
use anyhow::{Context, Result};
use clap::Parser;
use dpanel_client::session::SessionStore;
use dpanel_client::{PanelClient, PanelSettings};
use dpanel_common::workdir::DevetekWorkDir;
use dpanel_common::{warning_message, Colorize};
use dpanel_tunnel::TunnelSettings;

pub fn process_cli() -> Result<()> {
    let cli = Cli::parse();

    let workdir = DevetekWorkDir::resolve()?;
    if let Err(e) = setup_logging(&workdir) {
        warning_message!("Logging is disabled: {:#}", e);
    }

    tokio::runtime::Runtime::new()
        .context("Failed to start the async runtime")?
        .block_on(run_command(cli.command, workdir))
}

pub async fn run_command(command: Command, workdir: DevetekWorkDir) -> Result<()> {
    match command {
        Command::Version => system::version(),
        Command::Info => system::info(),
        Command::Auth {
            command: AuthCommand::Login(credentials),
        } => auth::login(&panel_client(workdir)?, &credentials).await,
        Command::Register(args) => machine::register(&panel_client(workdir)?, args).await,
        Command::Machine {
            command: MachineCommand::Create(args),
        } => {
            let tunnel_settings = TunnelSettings::load()?;
            machine::create(&panel_client(workdir)?, &tunnel_settings, args).await
        }
        Command::Tunnel { command } => {
            let settings = TunnelSettings::load()?;
            match command {
                TunnelCommand::Create(args) => {
                    tunnel::create(&panel_client(workdir)?, &settings, args).await
                }
                TunnelCommand::Upgrade => tunnel::upgrade(&panel_client(workdir)?, &settings).await,
                TunnelCommand::Status => tunnel::status(&settings).await,
            }
        }
    }
}

fn panel_client(workdir: DevetekWorkDir) -> Result<PanelClient> {
    let settings = PanelSettings::load().context("Failed to load panel settings")?;
    Ok(PanelClient::new(settings, SessionStore::new(workdir))?)
}
