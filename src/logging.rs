use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for the CLI.
///
/// `RUST_LOG` overrides `default_filter`. Logs go to stderr so command
/// output on stdout stays clean.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
