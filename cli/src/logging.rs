// stepline-cli/src/logging.rs

use crate::errors::{CliError, Result};
use std::sync::Mutex;
use stepline::RunLog;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`), a
/// console layer on stderr and, for runs, a plain-text layer appending to the
/// run log next to the step output.
pub fn init(run_log: Option<&RunLog>) -> Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

  let file = match run_log {
    Some(log) => {
      let handle = log.open_append().map_err(|source| CliError::RunLog {
        path: log.path().to_path_buf(),
        source,
      })?;
      Some(fmt::layer().with_ansi(false).with_target(false).with_writer(Mutex::new(handle)))
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(console)
    .with(file)
    .try_init()
    .map_err(|e| CliError::Logging(e.to_string()))
}
