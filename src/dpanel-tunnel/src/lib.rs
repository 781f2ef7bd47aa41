//! Install, configure and run the `marijan` tunnel agent.
//!
//! The pipeline is: resolve the release artifact for this platform, stream it
//! to disk, unpack it into the system binary directory, then write the tunnel
//! configuration and systemd unit and bring the service up.
pub mod agent;
pub mod artifact;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod installer;
pub mod service;
pub mod settings;
pub mod version;

pub use error::{Result, TunnelError};
pub use settings::TunnelSettings;
