//! Polling coordinator: runs fetch/extract ticks and caches the last reading.
//!
//! State is published as a whole `Arc<CoordinatorState>`, so readers see the
//! state from before or after a tick, never a mix. A tick that is dropped
//! while its request is in flight leaves the state untouched.

use crate::error::{ErrorKind, FetchError};
use crate::geizhals::{FetchClient, PriceReading, SensorValue, TargetUrl};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Snapshot of everything consumers can observe.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last successfully extracted reading, kept while degraded
    pub last_reading: Option<PriceReading>,
    /// Error of the most recent tick, cleared on success
    pub last_error: Option<Arc<FetchError>>,
    /// Set after an authentication failure until reconfigured
    pub auth_failed: bool,
}

impl CoordinatorState {
    pub fn status(&self) -> CoordinatorStatus {
        if self.auth_failed {
            CoordinatorStatus::AuthFailed
        } else if self.last_error.is_some() {
            CoordinatorStatus::Degraded
        } else if self.last_reading.is_some() {
            CoordinatorStatus::Healthy
        } else {
            CoordinatorStatus::Idle
        }
    }
}

/// Logical state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStatus {
    /// No tick has completed yet
    Idle,
    /// Last tick produced a reading
    Healthy,
    /// Last tick failed; a stale reading may still be available
    Degraded,
    /// Server rejected the request; polling stops until reconfigured
    AuthFailed,
}

impl fmt::Display for CoordinatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorStatus::Idle => write!(f, "idle"),
            CoordinatorStatus::Healthy => write!(f, "healthy"),
            CoordinatorStatus::Degraded => write!(f, "degraded"),
            CoordinatorStatus::AuthFailed => write!(f, "auth_failed"),
        }
    }
}

/// Outcome of a failed tick, as handed to the scheduler.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    /// Not retryable; the target needs reconfiguration.
    #[error("authentication failed: {0}")]
    AuthFailed(Arc<FetchError>),

    /// Retryable on the next scheduled tick.
    #[error("update failed: {0}")]
    UpdateFailed(Arc<FetchError>),
}

impl UpdateError {
    /// The classified error behind this outcome.
    pub fn error(&self) -> &FetchError {
        match self {
            UpdateError::AuthFailed(err) | UpdateError::UpdateFailed(err) => err,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, UpdateError::UpdateFailed(_))
    }
}

/// Drives fetch/extract cycles for a single target.
pub struct PollingCoordinator {
    client: FetchClient,
    target: RwLock<TargetUrl>,
    state: RwLock<Arc<CoordinatorState>>,
    tick_guard: tokio::sync::Mutex<()>,
}

impl PollingCoordinator {
    /// Creates an idle coordinator for an already validated target.
    pub fn new(client: FetchClient, target: TargetUrl) -> Self {
        Self {
            client,
            target: RwLock::new(target),
            state: RwLock::new(Arc::new(CoordinatorState::default())),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one fetch/extract cycle and publishes its outcome.
    ///
    /// Ticks never overlap; a second caller waits for the running tick.
    /// After an authentication failure this returns immediately without
    /// touching the network until [`reconfigure`](Self::reconfigure).
    pub async fn tick(&self) -> Result<PriceReading, UpdateError> {
        let _guard = self.tick_guard.lock().await;

        let current = self.state();
        if current.auth_failed {
            if let Some(err) = &current.last_error {
                debug!("Skipping tick, waiting for reconfiguration");
                return Err(UpdateError::AuthFailed(err.clone()));
            }
        }

        let target = self.target();
        debug!("Refreshing {}", target);

        match self.client.fetch_reading(&target).await {
            Ok(reading) => {
                info!(
                    "{}: {:?} - {:?} {}",
                    reading.name,
                    reading.min_price,
                    reading.max_price,
                    target.site().currency()
                );
                self.publish(CoordinatorState {
                    last_reading: Some(reading.clone()),
                    last_error: None,
                    auth_failed: false,
                });
                Ok(reading)
            }
            Err(err) => {
                let err = Arc::new(err);
                let auth_failed = err.kind() == ErrorKind::Authentication;

                match err.kind() {
                    ErrorKind::Authentication => {
                        warn!("Authentication failed for {}, polling disabled: {}", target, err)
                    }
                    ErrorKind::Communication => warn!("Update failed for {}: {}", target, err),
                    ErrorKind::InvalidUrl | ErrorKind::Generic => {
                        error!("Update failed for {}: {}", target, err.chain())
                    }
                }

                self.publish(CoordinatorState {
                    last_reading: current.last_reading.clone(),
                    last_error: Some(err.clone()),
                    auth_failed,
                });

                if auth_failed {
                    Err(UpdateError::AuthFailed(err))
                } else {
                    Err(UpdateError::UpdateFailed(err))
                }
            }
        }
    }

    /// Points the coordinator at a new target and resets it to idle.
    pub async fn reconfigure(&self, target: TargetUrl) {
        let _guard = self.tick_guard.lock().await;
        info!("Reconfigured to {}", target);
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = target;
        self.publish(CoordinatorState::default());
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<CoordinatorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Last good reading, possibly stale.
    pub fn reading(&self) -> Option<PriceReading> {
        self.state().last_reading.clone()
    }

    /// Error of the most recent tick, if it failed.
    pub fn last_error(&self) -> Option<Arc<FetchError>> {
        self.state().last_error.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.state().status()
    }

    /// Display values for the current reading; unavailable while idle.
    pub fn sensors(&self) -> Vec<SensorValue> {
        let currency = self.target().site().currency();
        self.reading()
            .unwrap_or(PriceReading { min_price: None, max_price: None, name: String::new() })
            .sensors(currency)
    }

    pub fn target(&self) -> TargetUrl {
        self.target.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, state: CoordinatorState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(state);
    }
}
