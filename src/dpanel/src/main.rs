use dpanel::process_command::process_cli;
use dpanel_common::{error_message, Colorize};

pub fn main() {
    if let Err(err) = rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default crypto provider: {:?}", e))
        .and_then(|_| process_cli())
    {
        error_message!("{:#}", err);
        std::process::exit(1);
    }
}
