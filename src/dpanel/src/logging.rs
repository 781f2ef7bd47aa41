use anyhow::{Context, Result};
use dpanel_common::workdir::DevetekWorkDir;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Sends `tracing` output to `~/.devetek/dpid.log`. `RUST_LOG` overrides the level.
pub fn setup_logging(workdir: &DevetekWorkDir) -> Result<()> {
    workdir.init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_appender =
        RollingFileAppender::new(Rotation::NEVER, &workdir.path, workdir.log_file_name());

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_timer(SystemTime)
        .with_writer(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    tracing::debug!("logging to {}", workdir.log_file.display());

    Ok(())
}
