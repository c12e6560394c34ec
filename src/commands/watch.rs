//! Continuous polling of one product page.

use crate::commands::build_client;
use crate::commands::check::setup_failure;
use crate::config::{Config, OutputFormat};
use crate::coordinator::{PollingCoordinator, UpdateError};
use crate::error::FetchError;
use crate::format::Formatter;
use crate::geizhals::{site, FetchClient};
use crate::scheduler::IntervalScheduler;
use anyhow::{bail, Result};
use std::future::Future;
use tracing::{info, warn};

/// Polls a product page until interrupted.
pub struct WatchCommand {
    config: Config,
}

impl WatchCommand {
    /// Creates a new watch command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Watches `url` (or the configured URL) until Ctrl-C.
    pub async fn execute(&self, url: Option<&str>) -> Result<()> {
        let client = build_client(&self.config)?;
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        self.execute_with_client(client, url, shutdown, |line| println!("{}", line)).await
    }

    /// Watches with a provided client and output sink (for testing).
    ///
    /// Returns an error if the first refresh fails or polling stops on an
    /// authentication failure.
    pub async fn execute_with_client<F, E>(
        &self,
        client: FetchClient,
        url: Option<&str>,
        shutdown: F,
        mut emit: E,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send,
        E: FnMut(String) + Send,
    {
        let Some(url) = url.or(self.config.url.as_deref()) else {
            bail!("No URL given. Pass one as argument or set `url` in the config file");
        };

        let target = site::validate(url).map_err(|e| setup_failure(&FetchError::from(e)))?;
        let formatter = Formatter::new(self.config.format, target.site().currency())
            .with_id(target.slug());
        let coordinator = PollingCoordinator::new(client, target);
        let scheduler = IntervalScheduler::new(self.config.interval());

        scheduler.first_refresh(&coordinator).await.map_err(|e| setup_failure(e.error()))?;
        info!("Watching {}", coordinator.target());

        if self.config.format == OutputFormat::Csv {
            emit(formatter.csv_header());
        }
        emit(formatter.format_state(&coordinator.state()));

        let result = scheduler
            .run(&coordinator, shutdown, |_| emit(formatter.format_state(&coordinator.state())))
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(UpdateError::AuthFailed(err)) => {
                bail!("Polling stopped, access denied by Geizhals: {}", err.chain())
            }
            Err(err) => Err(err.into()),
        }
    }
}
