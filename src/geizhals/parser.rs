//! HTML parser for Geizhals product pages.

use crate::error::ExtractionError;
use crate::geizhals::models::PriceReading;
use crate::geizhals::price::parse_price;
use crate::geizhals::selectors;
use scraper::{Html, Selector};
use tracing::{debug, trace};

/// Extracts the price range and product name from a product page.
///
/// Either both prices and the name are found, or the whole extraction fails.
pub fn extract(markup: &str) -> Result<PriceReading, ExtractionError> {
    let document = Html::parse_document(markup);

    let min_text = element_text(&document, &selectors::MIN_PRICE, selectors::MIN_PRICE_SRC)?;
    let max_text = element_text(&document, &selectors::MAX_PRICE, selectors::MAX_PRICE_SRC)?;
    trace!("Raw price range: {} - {}", min_text, max_text);

    let min_price = parse_price(&min_text).map_err(|source| ExtractionError::InvalidPrice {
        selector: selectors::MIN_PRICE_SRC,
        source,
    })?;
    let max_price = parse_price(&max_text).map_err(|source| ExtractionError::InvalidPrice {
        selector: selectors::MAX_PRICE_SRC,
        source,
    })?;

    let headline = document
        .select(&selectors::TITLE)
        .next()
        .map(|e| e.text().collect::<String>())
        .ok_or(ExtractionError::MissingElement { selector: selectors::TITLE_SRC })?;

    let name = product_name(&headline);
    if name.is_empty() {
        return Err(ExtractionError::EmptyName);
    }

    debug!("Extracted {}: {:.2} - {:.2}", name, min_price, max_price);

    Ok(PriceReading::new(min_price, max_price, name))
}

/// Strips site branding from a headline like "Widget X | Geizhals".
pub fn product_name(headline: &str) -> String {
    headline.split(selectors::TITLE_DELIMITER).next().unwrap_or_default().trim().to_string()
}

/// Returns the trimmed, non-empty text of the first element matching `selector`.
fn element_text(
    document: &Html,
    selector: &Selector,
    source: &'static str,
) -> Result<String, ExtractionError> {
    let element = document
        .select(selector)
        .next()
        .ok_or(ExtractionError::MissingElement { selector: source })?;

    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        return Err(ExtractionError::EmptyText { selector: source });
    }

    Ok(text)
}
