pub mod commands;
pub mod handlers;
pub mod logging;
pub mod process_command;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) const LOGIN_HINT: &str = "Please login to your dPanel account, use command `dpid auth login --email=\"email@email.com\" --password=\"password\"`";
