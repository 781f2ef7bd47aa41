use crate::commands::Credentials;
use anyhow::{bail, Context, Result};
use dpanel_client::PanelClient;
use dpanel_common::{success_message, Colorize};

/// Logs in unless a session already exists, then confirms it with a profile call.
pub async fn login(client: &PanelClient, credentials: &Credentials) -> Result<()> {
    ensure_session(client, credentials).await?;
    success_message!("Success login to dPanel!");
    Ok(())
}

pub(crate) async fn ensure_session(client: &PanelClient, credentials: &Credentials) -> Result<()> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        bail!("Email and password are required");
    }

    if client.check_session().is_ok() {
        tracing::info!("reusing the stored dPanel session");
        return Ok(());
    }

    client
        .login(credentials.email.trim(), &credentials.password)
        .await
        .context("Login error")?;
    client
        .profile()
        .await
        .context("Error get user profile")?;

    Ok(())
}
