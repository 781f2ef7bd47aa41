pub mod auth;
pub mod machine;
pub mod system;
pub mod tunnel;

use crate::LOGIN_HINT;
use anyhow::{anyhow, Result};
use dpanel_client::PanelClient;

pub(crate) fn require_session(client: &PanelClient) -> Result<()> {
    client.check_session().map_err(|_| anyhow!(LOGIN_HINT))
}
