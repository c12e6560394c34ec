//! Output formatting for price readings (table, JSON, CSV).

use crate::config::OutputFormat;
use crate::coordinator::{CoordinatorState, CoordinatorStatus};
use crate::geizhals::PriceReading;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Formats readings for output.
pub struct Formatter {
    format: OutputFormat,
    currency: String,
    id: Option<String>,
}

/// A reading in JSON form, tagged with the target id.
#[derive(Serialize)]
struct ReadingOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(flatten)]
    reading: &'a PriceReading,
}

/// One line of `watch` output in JSON form.
#[derive(Serialize)]
struct StatusLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    timestamp: u64,
    status: String,
    stale: bool,
    reading: Option<&'a PriceReading>,
    error: Option<String>,
}

impl Formatter {
    /// Creates a new formatter printing prices in `currency`.
    pub fn new(format: OutputFormat, currency: impl Into<String>) -> Self {
        Self { format, currency: currency.into(), id: None }
    }

    /// Tags JSON and table output with a stable target id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Formats a single reading.
    pub fn format_reading(&self, reading: &PriceReading) -> String {
        match self.format {
            OutputFormat::Json => {
                let output = ReadingOutput { id: self.id.as_deref(), reading };
                serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => self.table_reading(reading),
            OutputFormat::Csv => format!(
                "{}\n{}",
                self.csv_header(),
                self.csv_row(Some(reading), CoordinatorStatus::Healthy, false)
            ),
        }
    }

    /// Formats the coordinator state after a tick.
    ///
    /// While degraded the last good reading is still shown, marked stale.
    pub fn format_state(&self, state: &CoordinatorState) -> String {
        let status = state.status();
        let stale = status != CoordinatorStatus::Healthy && state.last_reading.is_some();
        let error = state.last_error.as_ref().map(|e| e.to_string());

        match self.format {
            OutputFormat::Json => {
                let line = StatusLine {
                    id: self.id.as_deref(),
                    timestamp: timestamp(),
                    status: status.to_string(),
                    stale,
                    reading: state.last_reading.as_ref(),
                    error,
                };
                serde_json::to_string(&line).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Csv => self.csv_row(state.last_reading.as_ref(), status, stale),
            OutputFormat::Table => {
                let mut line = match &state.last_reading {
                    Some(reading) => format!(
                        "{}  {} - {}",
                        reading.name,
                        self.price(reading.min_price),
                        self.price(reading.max_price)
                    ),
                    None => "No reading yet".to_string(),
                };
                if stale {
                    line.push_str("  (stale)");
                }
                if let Some(error) = error {
                    line.push_str(&format!("  [{}: {}]", status, error));
                }
                line
            }
        }
    }

    /// CSV header matching [`Formatter::format_state`] rows.
    pub fn csv_header(&self) -> String {
        "name,min_price,max_price,currency,status,stale".to_string()
    }

    fn table_reading(&self, reading: &PriceReading) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Product: {}", reading.name));
        if let Some(id) = &self.id {
            lines.push(format!("{:<22} {}", "ID:", id));
        }
        for sensor in reading.sensors(&self.currency) {
            lines.push(format!("{:<22} {}", format!("{}:", sensor.name), sensor.display()));
        }

        lines.join("\n")
    }

    fn csv_row(
        &self,
        reading: Option<&PriceReading>,
        status: CoordinatorStatus,
        stale: bool,
    ) -> String {
        let price = |value: Option<f64>| value.map(|p| format!("{:.2}", p)).unwrap_or_default();
        let (name, min, max) = match reading {
            Some(r) => (escape_csv(&r.name), price(r.min_price), price(r.max_price)),
            None => (String::new(), String::new(), String::new()),
        };
        format!("{},{},{},{},{},{}", name, min, max, self.currency, status, stale)
    }

    fn price(&self, value: Option<f64>) -> String {
        value
            .map(|p| format!("{:.2} {}", p, self.currency))
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Quotes a CSV field when it contains separators or quotes.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
