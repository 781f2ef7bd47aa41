mod message;
pub mod env;
pub mod network;
pub mod ssh;
pub mod system;
pub mod workdir;

// re-export for convenient use with `message`
pub use colored::Colorize;
