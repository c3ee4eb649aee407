//! Collaborator traits the pipeline dispatches to.
//!
//! A sweep needs two remote operations: a token-gated search that turns a
//! candidate into a detail locator (or a negative answer), and a detail fetch
//! that turns a locator into record fields. Both are traits so the pipeline
//! can be driven by the HTTP client in production and by fakes in tests.

use crate::error::{LookupError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use sweep_core::Candidate;
use url::Url;

/// Opaque, single-use credential required to submit a search.
///
/// The value is never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value, for placing into a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} chars>)", self.0.len())
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Absolute URL of a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator(String);

impl Locator {
    /// Resolve `href` against `base_url`.
    ///
    /// Absolute hrefs are kept as they are; relative ones are appended to the
    /// base origin.
    pub fn resolve(base_url: &str, href: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| LookupError::InvalidLocator(format!("base url '{base_url}': {e}")))?;
        let url = base
            .join(href)
            .map_err(|e| LookupError::InvalidLocator(format!("href '{href}': {e}")))?;
        Ok(Self(url.into()))
    }

    /// The URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-decoded `id` query parameter, or an empty string.
    #[must_use]
    pub fn external_id(&self) -> String {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "id")
                    .map(|(_, value)| value.into_owned())
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answer of a search for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The candidate exists; its details live at the locator.
    Found(Locator),
    /// The service answered but has no record for the candidate.
    NotFound,
}

/// Fields read from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetails {
    /// Display name
    pub name: String,
    /// Company or firm
    pub company: String,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone: String,
    /// Unique permit number, used as the storage key
    pub permit_number: String,
}

/// Token-gated search for a single candidate.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Submit `candidate` using `token`.
    ///
    /// Returns `Ok(SearchOutcome::NotFound)` for an expected negative answer
    /// and `Err` for anything that prevented a definite answer.
    async fn search(&self, candidate: &Candidate, token: &AccessToken) -> Result<SearchOutcome>;
}

/// Fetch of a detail page behind a locator.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// Read the record fields at `locator`.
    async fn fetch(&self, locator: &Locator) -> Result<RecordDetails>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = AccessToken::new("03AFcWeA-secret");
        assert_eq!(token.to_string(), "<redacted>");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.expose(), "03AFcWeA-secret");
    }

    #[test]
    fn test_resolve_relative_locator() {
        let locator = Locator::resolve(
            "https://cpaquebec.ca",
            "/en/find-a-cpa/cpa-directory/profile/?id=a%2Fb%20c",
        )
        .expect("resolve locator");

        assert_eq!(
            locator.as_str(),
            "https://cpaquebec.ca/en/find-a-cpa/cpa-directory/profile/?id=a%2Fb%20c"
        );
        assert_eq!(locator.external_id(), "a/b c");
    }

    #[test]
    fn test_resolve_absolute_locator() {
        let locator = Locator::resolve("https://cpaquebec.ca", "https://other.example/p?id=7")
            .expect("resolve locator");
        assert_eq!(locator.as_str(), "https://other.example/p?id=7");
        assert_eq!(locator.external_id(), "7");
    }

    #[test]
    fn test_external_id_absent() {
        let locator =
            Locator::resolve("https://example.com", "/profile/42").expect("resolve locator");
        assert_eq!(locator.external_id(), "");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = Locator::resolve("not a url", "/profile");
        assert!(matches!(result, Err(LookupError::InvalidLocator(_))));
    }

    #[test]
    fn test_details_serialize_camel_case() {
        let details = RecordDetails {
            permit_number: "A100001".to_string(),
            ..RecordDetails::default()
        };
        let json = serde_json::to_string(&details).expect("serialize details");
        assert!(json.contains("\"permitNumber\":\"A100001\""));
    }
}
