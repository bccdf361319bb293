//! Process-wide logging setup.

use anyhow::anyhow;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::RodeConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects levels (default `info`). Fails if a subscriber is
/// already installed.
pub fn init(config: &RodeConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.log_json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}
