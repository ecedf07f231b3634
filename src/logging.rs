//! Tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Environment variable holding the log filter (e.g. `sathi=debug`)
pub const LOG_ENV: &str = "SATHI_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes buffered file output on drop and must be held
/// for the lifetime of the program.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  if config.logging.file {
    let log_dir = Config::data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
      .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "sathi.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(writer)
      .with_ansi(false)
      .try_init()
      .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

    Ok(Some(guard))
  } else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .try_init()
      .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

    Ok(None)
  }
}
