//! One-shot target check, used before committing a URL to polling.

use crate::commands::build_client;
use crate::config::Config;
use crate::error::FetchError;
use crate::format::Formatter;
use crate::geizhals::{site, FetchClient};
use anyhow::Result;
use tracing::{debug, info};

/// Validates a URL and fetches it once.
pub struct CheckCommand {
    config: Config,
}

impl CheckCommand {
    /// Creates a new check command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Checks `url` and returns the formatted reading.
    pub async fn execute(&self, url: &str) -> Result<String> {
        let client = build_client(&self.config)?;
        self.execute_with_client(&client, url).await
    }

    /// Checks `url` with a provided client (for testing).
    pub async fn execute_with_client(&self, client: &FetchClient, url: &str) -> Result<String> {
        let target = site::validate(url).map_err(|e| setup_failure(&FetchError::from(e)))?;
        info!("Checking {}", target);

        let reading = client.fetch_reading(&target).await.map_err(|e| setup_failure(&e))?;
        debug!("Check succeeded for \"{}\"", reading.name);

        let formatter = Formatter::new(self.config.format, target.site().currency())
            .with_id(target.slug());
        Ok(formatter.format_reading(&reading))
    }
}

/// Turns a fetch error into the user-facing message for its setup code.
pub(crate) fn setup_failure(err: &FetchError) -> anyhow::Error {
    let code = err.setup_code();
    let message = match code {
        "invalid_url" => "Invalid URL, expected a geizhals.at or geizhals.de product page",
        "auth" => "Access denied by Geizhals",
        "connection" => "Failed to connect to Geizhals",
        _ => "Unexpected error",
    };
    anyhow::anyhow!("{} [{}]: {}", message, code, err.chain())
}
