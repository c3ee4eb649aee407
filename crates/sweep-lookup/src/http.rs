//! HTTP implementation of the lookup collaborators.

use crate::artifacts::ArtifactWriter;
use crate::error::{LookupError, Result};
use crate::parser::PageParser;
use crate::provider::{AccessToken, DetailFetcher, Locator, RecordDetails, SearchClient, SearchOutcome};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use sweep_core::{Candidate, LookupConfig, OutputConfig};

/// Talks to the directory service over HTTP.
///
/// Searches are form posts carrying the candidate and its access token;
/// detail pages are plain GETs. Both responses are read as HTML.
pub struct HttpLookupClient {
    client: Client,
    config: LookupConfig,
    parser: PageParser,
    artifacts: ArtifactWriter,
}

impl HttpLookupClient {
    /// Build a client from the lookup and output configuration.
    ///
    /// # Errors
    /// Returns error if a selector does not compile or the HTTP client
    /// cannot be created.
    pub fn new(config: &LookupConfig, output: &OutputConfig) -> Result<Self> {
        let parser = PageParser::new(&config.selectors)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            parser,
            artifacts: ArtifactWriter::new(output),
        })
    }
}

/// Form fields of a search request, in submission order.
fn search_form(
    config: &LookupConfig,
    candidate: &Candidate,
    token: &AccessToken,
) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = config
        .extra_fields
        .iter()
        .filter(|(name, _)| **name != config.permit_field && **name != config.token_field)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    fields.push((config.permit_field.clone(), candidate.as_str().to_string()));
    fields.push((config.token_field.clone(), token.expose().to_string()));
    fields
}

#[async_trait]
impl SearchClient for HttpLookupClient {
    async fn search(&self, candidate: &Candidate, token: &AccessToken) -> Result<SearchOutcome> {
        let form = search_form(&self.config, candidate, token);

        let response = self
            .client
            .post(&self.config.search_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            self.artifacts.write_error_page(candidate.as_str(), &body).await;
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: self.config.search_url.clone(),
            });
        }

        match self.parser.search_link(&body) {
            Some(href) => {
                let locator = Locator::resolve(&self.config.base_url, &href)?;
                tracing::debug!(candidate = %candidate, locator = %locator, "Search hit");
                Ok(SearchOutcome::Found(locator))
            }
            None => Ok(SearchOutcome::NotFound),
        }
    }
}

#[async_trait]
impl DetailFetcher for HttpLookupClient {
    async fn fetch(&self, locator: &Locator) -> Result<RecordDetails> {
        let response = self.client.get(locator.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: locator.to_string(),
            });
        }

        let body = response.text().await?;
        let details = self.parser.details(&body)?;
        self.artifacts.write_record(&details).await;

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_core::CandidateRange;

    #[test]
    fn test_search_form_fields() {
        let config = LookupConfig::default();
        let range = CandidateRange::new("A", 100_000, 151_000, 0).expect("valid range");
        let candidate = range.first().expect("non-empty range");
        let token = AccessToken::new("tok");

        let form = search_form(&config, &candidate, &token);

        assert_eq!(
            form,
            vec![
                ("FirstName".to_string(), String::new()),
                ("LastName".to_string(), String::new()),
                ("PermitNumber".to_string(), "A100000".to_string()),
                ("g-recaptcha-response".to_string(), "tok".to_string()),
            ]
        );
    }

    #[test]
    fn test_extra_fields_cannot_shadow_candidate() {
        let mut config = LookupConfig::default();
        config
            .extra_fields
            .insert("PermitNumber".to_string(), "override".to_string());
        let range = CandidateRange::new("A", 5, 6, 0).expect("valid range");
        let candidate = range.first().expect("non-empty range");

        let form = search_form(&config, &candidate, &AccessToken::new("t"));

        let permits: Vec<&str> = form
            .iter()
            .filter(|(name, _)| name == "PermitNumber")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(permits, vec!["A5"]);
    }

    #[test]
    fn test_client_rejects_bad_selector() {
        let mut config = LookupConfig::default();
        config.selectors.search_link = "a[".to_string();
        let result = HttpLookupClient::new(&config, &OutputConfig::default());
        assert!(matches!(result, Err(LookupError::Selector { .. })));
    }
}
