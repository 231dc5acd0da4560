//! Logging setup.
//!
//! Logs go to stderr, and additionally to a daily-rolling file when
//! `logging.directory` is configured. `RUST_LOG` takes precedence over the
//! configured level.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.level))
    .map_err(|e| eyre!("Invalid log level {}: {}", config.level, e))?;

  let (writer, guard) = match &config.directory {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "live-proxy.log");
      let (file, guard) = tracing_appender::non_blocking(appender);
      (BoxMakeWriter::new(std::io::stderr.and(file)), Some(guard))
    }
    None => (BoxMakeWriter::new(std::io::stderr), None),
  };

  let layer = if config.json {
    fmt::layer().json().with_writer(writer).boxed()
  } else {
    fmt::layer().with_ansi(guard.is_none()).with_writer(writer).boxed()
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
