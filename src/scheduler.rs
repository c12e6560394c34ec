//! Periodic invocation of coordinator ticks.
//!
//! The coordinator only exposes [`Refresh::tick`]; when and how often it runs
//! is decided here, so another runtime can drive it instead.

use crate::coordinator::{PollingCoordinator, UpdateError};
use crate::error::FetchError;
use crate::geizhals::PriceReading;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default time between two ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Something a scheduler can refresh periodically.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn tick(&self) -> Result<PriceReading, UpdateError>;
}

#[async_trait]
impl Refresh for PollingCoordinator {
    async fn tick(&self) -> Result<PriceReading, UpdateError> {
        PollingCoordinator::tick(self).await
    }
}

/// First refresh failed, so the target is not set up.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    #[error("authentication failed: {0}")]
    AuthFailed(Arc<FetchError>),

    #[error("target not ready: {0}")]
    NotReady(Arc<FetchError>),
}

impl SetupError {
    pub fn error(&self) -> &FetchError {
        match self {
            SetupError::AuthFailed(err) | SetupError::NotReady(err) => err,
        }
    }
}

impl From<UpdateError> for SetupError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::AuthFailed(err) => SetupError::AuthFailed(err),
            UpdateError::UpdateFailed(err) => SetupError::NotReady(err),
        }
    }
}

/// Fixed-interval scheduler on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct IntervalScheduler {
    interval: Duration,
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs the first tick inline; setup only succeeds if it produced a reading.
    pub async fn first_refresh(&self, target: &dyn Refresh) -> Result<PriceReading, SetupError> {
        debug!("Running first refresh");
        Ok(target.tick().await?)
    }

    /// Ticks `target` every interval until `shutdown` resolves or the target
    /// reports an authentication failure.
    ///
    /// The first tick happens one interval from now. Resolving `shutdown`
    /// abandons a tick that is still in flight. Returns the authentication
    /// failure that stopped polling, if any.
    pub async fn run<F, U>(
        &self,
        target: &dyn Refresh,
        shutdown: F,
        mut on_update: U,
    ) -> Result<(), UpdateError>
    where
        F: Future<Output = ()> + Send,
        U: FnMut(&Result<PriceReading, UpdateError>) + Send,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = std::pin::pin!(shutdown);

        info!("Polling every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Polling stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    info!("Polling stopped, abandoning refresh in flight");
                    return Ok(());
                }
                outcome = target.tick() => outcome,
            };

            on_update(&outcome);

            match outcome {
                Err(err @ UpdateError::AuthFailed(_)) => {
                    warn!("Polling disabled until reconfigured: {}", err);
                    return Err(err);
                }
                Err(err) => debug!("Will retry next interval: {}", err),
                Ok(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Refresh target replaying scripted outcomes, then succeeding forever.
    struct StubTarget {
        outcomes: Mutex<VecDeque<Result<PriceReading, UpdateError>>>,
        calls: AtomicUsize,
    }

    impl StubTarget {
        fn new(outcomes: Vec<Result<PriceReading, UpdateError>>) -> Self {
            Self { outcomes: Mutex::new(outcomes.into()), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Refresh for StubTarget {
        async fn tick(&self) -> Result<PriceReading, UpdateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PriceReading::new(1.0, 2.0, "Widget")))
        }
    }

    fn comm_error() -> UpdateError {
        UpdateError::UpdateFailed(Arc::new(FetchError::communication("timeout", None)))
    }

    fn auth_error() -> UpdateError {
        UpdateError::AuthFailed(Arc::new(FetchError::Authentication { status: 403 }))
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(IntervalScheduler::default().interval(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_first_refresh_success() {
        let target = StubTarget::new(vec![]);
        let reading = IntervalScheduler::default().first_refresh(&target).await.unwrap();
        assert_eq!(reading.name, "Widget");
        assert_eq!(target.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_refresh_not_ready() {
        let target = StubTarget::new(vec![Err(comm_error())]);
        let err = IntervalScheduler::default().first_refresh(&target).await.unwrap_err();
        assert!(matches!(err, SetupError::NotReady(_)));
        assert_eq!(err.error().setup_code(), "connection");
    }

    #[tokio::test]
    async fn test_first_refresh_auth_failed() {
        let target = StubTarget::new(vec![Err(auth_error())]);
        let err = IntervalScheduler::default().first_refresh(&target).await.unwrap_err();
        assert!(matches!(err, SetupError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let target = StubTarget::new(vec![Err(comm_error())]);
        let scheduler = IntervalScheduler::new(Duration::from_millis(10));
        let mut seen = Vec::new();

        let result = scheduler
            .run(&target, tokio::time::sleep(Duration::from_millis(75)), |outcome| {
                seen.push(outcome.is_ok())
            })
            .await;

        assert!(result.is_ok());
        assert!(target.calls() >= 3, "only {} ticks", target.calls());
        assert!(!seen[0]);
        assert!(seen[1]);
    }

    #[tokio::test]
    async fn test_run_stops_on_auth_failure() {
        let target =
            StubTarget::new(vec![Ok(PriceReading::new(1.0, 2.0, "Widget")), Err(auth_error())]);
        let scheduler = IntervalScheduler::new(Duration::from_millis(5));

        let result = scheduler.run(&target, std::future::pending(), |_| {}).await;

        assert!(matches!(result, Err(UpdateError::AuthFailed(_))));
        assert_eq!(target.calls(), 2);
    }

    #[tokio::test]
    async fn test_run_waits_one_interval_before_first_tick() {
        let target = StubTarget::new(vec![]);
        let scheduler = IntervalScheduler::new(Duration::from_secs(60));

        let result =
            scheduler.run(&target, tokio::time::sleep(Duration::from_millis(20)), |_| {}).await;

        assert!(result.is_ok());
        assert_eq!(target.calls(), 0);
    }
}
