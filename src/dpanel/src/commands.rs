use crate::VERSION;
use clap::{Args, Parser, Subcommand};

const ABOUT: &str = "dPanel ID CLI is a simple CLI tool to interact with dPanel, simplify the process of managing your dPanel.";

fn footer_message() -> String {
    "Full documentation is available at: https://cloud.terpusat.com/docs/d-panel-cli".to_string()
}

#[derive(Parser, Clone)]
#[clap(
    name = "dpid",
    about = ABOUT,
    version = VERSION,
    after_help = footer_message()
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage dPanel session
    Auth {
        #[clap(subcommand)]
        command: AuthCommand,
    },

    /// Register this machine to dPanel
    Register(RegisterArgs),

    /// Manage dPanel machine
    Machine {
        #[clap(subcommand)]
        command: MachineCommand,
    },

    /// Manage dPanel tunnel
    Tunnel {
        #[clap(subcommand)]
        command: TunnelCommand,
    },

    /// Prints dPanel ID CLI version
    Version,

    /// Prints the operating system and architecture of this machine
    Info,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Authorize to access dPanel
    Login(Credentials),
}

#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Your registered email address in dPanel
    #[clap(long, short = 'e')]
    pub email: String,

    /// Your registered password in dPanel
    #[clap(long, short = 'p')]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    #[clap(flatten)]
    pub credentials: Credentials,

    /// SSH IP of your machine, detected from the public IP when omitted
    #[clap(long, short = 'i')]
    pub ssh_ip: Option<String>,

    /// SSH port of your machine
    #[clap(long, short = 's', default_value_t = 22)]
    pub ssh_port: u16,

    /// HTTP port of your machine, defaults to the first free port from 9000
    #[clap(long, short = 't')]
    pub http_port: Option<u16>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MachineCommand {
    /// Add this machine to dPanel
    Create(MachineCreateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MachineCreateArgs {
    /// SSH IP of your machine, detected from the public IP when omitted
    #[clap(long, short = 'i')]
    pub ssh_ip: Option<String>,

    /// SSH port of your machine
    #[clap(long, short = 's', default_value_t = 22)]
    pub ssh_port: u16,

    /// HTTP port of your machine, defaults to the first free port from 9000
    #[clap(long, short = 'p')]
    pub http_port: Option<u16>,

    /// HTTP domain of the agent, e.g. https://my-machine-01.devetek.app
    #[clap(long, short = 'd')]
    pub http_domain: Option<String>,

    /// Read the tunnel config and create a domain for this machine
    #[clap(long, short = 't')]
    pub behind_tunnel: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TunnelCommand {
    /// Open connection to tunnel
    Create(TunnelCreateArgs),

    /// Upgrade the tunnel agent binary to the latest release
    Upgrade,

    /// Shows the installed agent, the latest release and the configured listeners
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct TunnelCreateArgs {
    /// Public SSH listener port on the tunnel server
    #[clap(long)]
    pub tunnel_ssh_listener: u16,

    /// Public HTTP listener port on the tunnel server
    #[clap(long)]
    pub tunnel_http_listener: u16,

    /// SSH port of your machine
    #[clap(long, default_value_t = 22)]
    pub tunnel_ssh_service: u16,

    /// HTTP port of your machine
    #[clap(long, default_value_t = 9000)]
    pub tunnel_http_service: u16,
}
