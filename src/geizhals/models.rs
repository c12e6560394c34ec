//! Data models for extracted price readings.

use serde::{Deserialize, Serialize};

/// Price range and product name scraped from one product page.
///
/// Readings published by the coordinator always carry both prices and a
/// non-empty name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Lowest offer price
    pub min_price: Option<f64>,
    /// Highest offer price
    pub max_price: Option<f64>,
    /// Product name without site branding
    pub name: String,
}

impl PriceReading {
    /// Creates a fully populated reading.
    pub fn new(min_price: f64, max_price: f64, name: impl Into<String>) -> Self {
        Self { min_price: Some(min_price), max_price: Some(max_price), name: name.into() }
    }

    /// Returns the numeric values exposed for display, in `currency`.
    pub fn sensors(&self, currency: &str) -> Vec<SensorValue> {
        vec![
            SensorValue {
                key: "min_price",
                name: "Current minimum price",
                value: self.min_price,
                unit: currency.to_string(),
                precision: 2,
            },
            SensorValue {
                key: "max_price",
                name: "Current maximum price",
                value: self.max_price,
                unit: currency.to_string(),
                precision: 2,
            },
        ]
    }
}

/// A single measurement derived from a [`PriceReading`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorValue {
    /// Stable key of the measurement
    pub key: &'static str,
    /// Human readable label
    pub name: &'static str,
    /// Current value, if known
    pub value: Option<f64>,
    /// Unit of measurement (currency code)
    pub unit: String,
    /// Suggested number of decimals when displaying
    pub precision: usize,
}

impl SensorValue {
    /// Formats the value with its unit, or "unavailable".
    pub fn display(&self) -> String {
        match self.value {
            Some(v) => format!("{:.*} {}", self.precision, v, self.unit),
            None => "unavailable".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_new() {
        let reading = PriceReading::new(100.0, 120.0, "Widget");
        assert_eq!(reading.min_price, Some(100.0));
        assert_eq!(reading.max_price, Some(120.0));
        assert_eq!(reading.name, "Widget");
    }

    #[test]
    fn test_sensors() {
        let reading = PriceReading::new(399.99, 449.5, "Widget");
        let sensors = reading.sensors("EUR");
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].key, "min_price");
        assert_eq!(sensors[0].display(), "399.99 EUR");
        assert_eq!(sensors[1].key, "max_price");
        assert_eq!(sensors[1].display(), "449.50 EUR");
    }

    #[test]
    fn test_sensor_unavailable() {
        let sensor = SensorValue {
            key: "min_price",
            name: "Current minimum price",
            value: None,
            unit: "EUR".into(),
            precision: 2,
        };
        assert_eq!(sensor.display(), "unavailable");
    }

    #[test]
    fn test_reading_serde() {
        let reading = PriceReading::new(1.5, 2.5, "Widget");
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"min_price\":1.5"));
        let parsed: PriceReading = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reading);
    }
}
