//! Supported Geizhals storefronts and target URL validation.

use crate::error::InvalidUrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Query block selecting the regional storefronts that contribute offers.
pub const LOCALE_QUERY: &str = "hloc=at&hloc=de&hloc=pl&hloc=uk&hloc=eu";

/// Path suffix of every product page.
pub const PAGE_SUFFIX: &str = ".html";

/// Geizhals country sites that can be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    #[default]
    At,
    De,
}

impl Site {
    /// Returns the Geizhals domain for this site.
    pub fn domain(&self) -> &'static str {
        match self {
            Site::At => "geizhals.at",
            Site::De => "geizhals.de",
        }
    }

    /// Returns the currency prices are listed in.
    pub fn currency(&self) -> &'static str {
        "EUR"
    }

    /// Returns the Accept-Language header value for this site.
    pub fn accept_language(&self) -> &'static str {
        match self {
            Site::At => "de-AT,de;q=0.9,en;q=0.8",
            Site::De => "de-DE,de;q=0.9,en;q=0.8",
        }
    }

    /// Returns all supported sites.
    pub fn all() -> &'static [Site] {
        &[Site::At, Site::De]
    }

    fn from_host(host: &str) -> Option<Site> {
        Site::all().iter().copied().find(|site| site.domain() == host)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Site::At => "at",
            Site::De => "de",
        };
        write!(f, "{}", code)
    }
}

/// A validated product page URL with the locale query block appended.
///
/// Only [`validate`] creates values of this type, so holding one means the
/// URL points to a supported site and product page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetUrl {
    url: String,
    site: Site,
    slug: String,
}

impl TargetUrl {
    /// The canonical URL that is requested on every poll.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The storefront this URL belongs to.
    pub fn site(&self) -> Site {
        self.site
    }

    /// Stable identifier derived from the configured URL (before the locale
    /// block was appended), usable as a unique id for the watched product.
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl AsRef<str> for TargetUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl FromStr for TargetUrl {
    type Err = InvalidUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

/// Checks that `raw` is a Geizhals product page and canonicalizes it.
///
/// The shape is validated first; the locale block is appended afterwards,
/// after `?` when the URL has no query yet and after `&` otherwise.
pub fn validate(raw: &str) -> Result<TargetUrl, InvalidUrlError> {
    let trimmed = raw.trim();

    let parsed = Url::parse(trimmed).map_err(|e| InvalidUrlError::Malformed {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let site = match parsed.host_str() {
        Some(host) if parsed.scheme() == "https" => Site::from_host(host),
        _ => None,
    }
    .ok_or_else(|| InvalidUrlError::UnsupportedHost { url: trimmed.to_string() })?;

    if !parsed.path().ends_with(PAGE_SUFFIX) {
        return Err(InvalidUrlError::MissingSuffix { url: trimmed.to_string() });
    }

    // Fragments would swallow the appended query block.
    let base = trimmed.split('#').next().unwrap_or(trimmed);
    let separator = if parsed.query().is_some() { '&' } else { '?' };
    let url = format!("{}{}{}", base, separator, LOCALE_QUERY);

    debug!("Canonical target URL: {}", url);

    Ok(TargetUrl { url, site, slug: slugify(base) })
}

/// Lowercase alphanumeric runs joined by single dashes.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
