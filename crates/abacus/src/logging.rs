//! Diagnostics for the CLI.
//!
//! The core library logs through the `log` facade. Those records are bridged
//! into `tracing` and written to stderr so they never mix with command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `debug` with `--verbose`.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact());
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}
