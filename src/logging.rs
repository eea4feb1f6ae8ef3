//! Tracing subscriber setup for the binary.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "pagecache=info";
const LOG_FILE: &str = "pagecache.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log.filter`, which wins over the default. With
/// `log.dir` set, events go to a daily-rolled file and the returned guard
/// must be held until exit so buffered lines are flushed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = filter_directive(config, std::env::var("RUST_LOG").ok());
  let env_filter =
    EnvFilter::try_new(&filter).map_err(|e| eyre!("Invalid log filter '{}': {}", filter, e))?;

  match &config.dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {:?}: {}", dir, e))?;
      let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(None)
    }
  }
}

fn filter_directive(config: &LogConfig, env: Option<String>) -> String {
  env
    .filter(|s| !s.trim().is_empty())
    .or_else(|| config.filter.clone())
    .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}
