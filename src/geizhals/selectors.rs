//! CSS selectors for Geizhals product pages.
//!
//! Update this file when Geizhals changes their HTML structure, and add a
//! fixture under `tests/fixtures/` reproducing the new markup.

use scraper::Selector;
use std::sync::LazyLock;

/// Selector source for the lowest offer price.
pub const MIN_PRICE_SRC: &str = "#pricerange-min";

/// Selector source for the highest offer price.
pub const MAX_PRICE_SRC: &str = "#pricerange-max";

/// Selector source for the product headline.
pub const TITLE_SRC: &str = "h1.variant__header__headline";

/// Lowest price of the listed offers.
pub static MIN_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(MIN_PRICE_SRC).unwrap());

/// Highest price of the listed offers.
pub static MAX_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(MAX_PRICE_SRC).unwrap());

/// Product headline; site branding follows a `|`.
pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(TITLE_SRC).unwrap());

/// Delimiter between the product name and site branding in the headline.
pub const TITLE_DELIMITER: char = '|';
