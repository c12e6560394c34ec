//! CLI command implementations.

pub mod check;
pub mod watch;

pub use check::CheckCommand;
pub use watch::WatchCommand;

use crate::config::Config;
use crate::geizhals::{FetchClient, WreqTransport};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Builds a fetch client backed by the emulating HTTP transport.
pub(crate) fn build_client(config: &Config) -> Result<FetchClient> {
    let transport = WreqTransport::new(config.proxy.as_deref(), config.timeout())
        .context("Failed to create HTTP client")?;
    Ok(FetchClient::new(Arc::new(transport)).with_timeout(config.timeout()))
}
