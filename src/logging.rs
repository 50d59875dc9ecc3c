//! Tracing setup.
//!
//! The filter comes from `MINDTREE_LOG` (same syntax as `RUST_LOG`) and
//! defaults to `info`.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const ENV_VAR: &str = "MINDTREE_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// With `log_file` everything goes to that file. Without one, output goes
/// to stderr, except while the terminal editor owns the screen
/// (`interactive`), where nothing is logged.
pub fn init(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter());
    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None if interactive => return Ok(()),
        None => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init(),
    };
    installed.map_err(|err| anyhow!("cannot install logger: {err}"))
}
