//! Error types for the lookup collaborators.

use thiserror::Error;

/// Errors raised while searching for a candidate or fetching its details.
///
/// Every variant is recoverable from the pipeline's point of view: the
/// candidate is counted as a failure and the sweep moves on.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// A configured selector could not be compiled
    #[error("invalid selector '{selector}': {reason}")]
    Selector {
        /// Selector source text
        selector: String,
        /// Parser message
        reason: String,
    },

    /// The detail page did not contain a required field
    #[error("detail page is missing field: {0}")]
    MissingField(&'static str),

    /// The detail link could not be turned into a URL
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Writing an artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an artifact failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LookupError {
    /// Whether the request gave up because it ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;
