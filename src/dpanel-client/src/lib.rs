//! Client for the dPanel REST API.
pub mod client;
pub mod endpoints;
pub mod error;
pub mod session;
pub mod settings;
pub mod types;

pub use client::PanelClient;
pub use error::{ApiError, ApiResult};
pub use settings::PanelSettings;
