//! Diagnostic logging setup for the binary.

use anyhow::Context as _;

/// Installs a stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or debug
/// output when `verbose` is set.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
