//! Geizhals-specific modules for URL validation, fetching, parsing, and data models.

pub mod client;
pub mod models;
pub mod parser;
pub mod price;
pub mod selectors;
pub mod site;

pub use client::{FetchClient, Transport, TransportError, TransportResponse, WreqTransport};
pub use models::{PriceReading, SensorValue};
pub use parser::extract;
pub use price::parse_price;
pub use site::{validate, Site, TargetUrl};
