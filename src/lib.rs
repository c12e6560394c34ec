//! geizhals-watch - Geizhals price range monitor
//!
//! Fetches a Geizhals product page with browser emulation, extracts the
//! current minimum and maximum price plus the product name, and polls it on
//! a fixed interval while keeping the last good reading across failures.

pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod geizhals;
pub mod scheduler;

pub use config::Config;
pub use coordinator::{CoordinatorState, CoordinatorStatus, PollingCoordinator, UpdateError};
pub use error::{ErrorKind, FetchError};
pub use geizhals::{FetchClient, PriceReading, Site, TargetUrl};
pub use scheduler::IntervalScheduler;
