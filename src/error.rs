//! Error taxonomy for fetching and extracting Geizhals price data.
//!
//! Consumers switch on [`FetchError::kind`] to decide between disabling a
//! target (authentication, invalid URL) and retrying on the next tick.

use std::fmt;
use thiserror::Error;

/// Boxed lower-level cause attached to transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to turn a localized price string into a number.
#[derive(Debug, Error)]
pub enum PriceParseError {
    #[error("no digits in price string \"{input}\"")]
    NoDigits { input: String },

    #[error("could not convert \"{input}\" to a number")]
    NotNumeric {
        input: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Configured URL does not point to a supported Geizhals product page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidUrlError {
    #[error("URL \"{url}\" could not be parsed: {reason}")]
    Malformed { url: String, reason: String },

    #[error("URL is not from Geizhals: {url}")]
    UnsupportedHost { url: String },

    #[error("URL does not end with .html: {url}")]
    MissingSuffix { url: String },
}

/// Product page markup did not have the expected shape.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("element {selector} not found in page")]
    MissingElement { selector: &'static str },

    #[error("element {selector} has no text")]
    EmptyText { selector: &'static str },

    #[error("invalid price in {selector}")]
    InvalidPrice {
        selector: &'static str,
        #[source]
        source: PriceParseError,
    },

    #[error("product title is empty")]
    EmptyName,
}

/// Tag of a [`FetchError`], for consumers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    Authentication,
    Communication,
    Generic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidUrl => write!(f, "invalid_url"),
            ErrorKind::Authentication => write!(f, "authentication"),
            ErrorKind::Communication => write!(f, "communication"),
            ErrorKind::Generic => write!(f, "generic"),
        }
    }
}

/// Classified failure of a fetch/extract cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrlError),

    #[error("invalid credentials (HTTP {status})")]
    Authentication { status: u16 },

    #[error("{message}")]
    Communication {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("failed to extract price data")]
    Extraction(#[from] ExtractionError),

    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl FetchError {
    pub(crate) fn communication(message: impl Into<String>, source: Option<BoxError>) -> Self {
        FetchError::Communication { message: message.into(), status: None, source }
    }

    pub(crate) fn generic(message: impl Into<String>, source: Option<BoxError>) -> Self {
        FetchError::Generic { message: message.into(), source }
    }

    /// Returns the category of this error. Extraction failures are generic.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            FetchError::Authentication { .. } => ErrorKind::Authentication,
            FetchError::Communication { .. } => ErrorKind::Communication,
            FetchError::Extraction(_) | FetchError::Generic { .. } => ErrorKind::Generic,
        }
    }

    /// Whether the next scheduled tick may succeed without reconfiguration.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Communication | ErrorKind::Generic)
    }

    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Authentication { status } => Some(*status),
            FetchError::Communication { status, .. } => *status,
            _ => None,
        }
    }

    /// Short code shown when validating a target during setup.
    pub fn setup_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::Authentication => "auth",
            ErrorKind::Communication => "connection",
            ErrorKind::Generic => "unknown",
        }
    }

    /// Renders the error followed by every `source()` in its chain.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            current = cause.source();
        }
        out
    }
}
