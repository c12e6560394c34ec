//! Localized price string normalization.

use crate::error::PriceParseError;

const SEPARATORS: [char; 3] = ['.', ',', ':'];

/// Parses a price like "€ 399,99", "$1,234.56" or "400" into a number.
///
/// The last `.`, `,` or `:` is the decimal separator. Separators before it
/// are thousands grouping and dropped.
pub fn parse_price(raw: &str) -> Result<f64, PriceParseError> {
    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_digit() || SEPARATORS.contains(c)).collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(PriceParseError::NoDigits { input: raw.to_string() });
    }

    let normalized = match cleaned.rfind(SEPARATORS) {
        Some(last) => {
            let integer: String =
                cleaned[..last].chars().filter(|c| !SEPARATORS.contains(c)).collect();
            let fraction = &cleaned[last + 1..];
            format!("{}.{}", integer, fraction)
        }
        None => cleaned,
    };

    normalized
        .parse()
        .map_err(|source| PriceParseError::NotNumeric { input: raw.to_string(), source })
}
