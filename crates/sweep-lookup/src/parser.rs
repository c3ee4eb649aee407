//! HTML extraction for search result and detail pages.

use crate::error::{LookupError, Result};
use crate::provider::RecordDetails;
use scraper::{Html, Selector};
use sweep_core::SelectorConfig;

/// Compiled selectors for the two page kinds a sweep reads.
#[derive(Debug)]
pub struct PageParser {
    search_link: Selector,
    name: Selector,
    company: Selector,
    address: Selector,
    labelled_value: Selector,
    phone_label: String,
    permit_label: String,
}

impl PageParser {
    /// Compile the configured selectors.
    ///
    /// # Errors
    /// Returns `LookupError::Selector` for the first selector that fails to parse.
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            search_link: compile(&config.search_link)?,
            name: compile(&config.name)?,
            company: compile(&config.company)?,
            address: compile(&config.address)?,
            labelled_value: compile(&config.labelled_value)?,
            phone_label: config.phone_label.clone(),
            permit_label: config.permit_label.clone(),
        })
    }

    /// `href` of the first search hit, or `None` when the page has no hit.
    #[must_use]
    pub fn search_link(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.search_link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    }

    /// Read the record fields from a detail page.
    ///
    /// Text of every element matching a field's selector is concatenated and
    /// trimmed. Labelled values keep only the text after the label.
    ///
    /// # Errors
    /// Returns `LookupError::MissingField` when no permit number is present,
    /// since a record cannot be stored without its key.
    pub fn details(&self, html: &str) -> Result<RecordDetails> {
        let document = Html::parse_document(html);

        let details = RecordDetails {
            name: joined_text(&document, &self.name),
            company: joined_text(&document, &self.company),
            address: joined_text(&document, &self.address),
            phone: self.labelled(&document, &self.phone_label),
            permit_number: self.labelled(&document, &self.permit_label),
        };

        if details.permit_number.is_empty() {
            return Err(LookupError::MissingField("permit_number"));
        }

        Ok(details)
    }

    fn labelled(&self, document: &Html, label: &str) -> String {
        let text: String = document
            .select(&self.labelled_value)
            .map(|el| el.text().collect::<String>())
            .filter(|text| text.contains(label))
            .collect();

        text.replace(label, "").trim().to_string()
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| LookupError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn joined_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_HIT: &str = r#"
        <div class="results">
            <ul class="vcard">
                <li class="fn"><a href="/en/find-a-cpa/cpa-directory/profile/?id=abc%3D%3D">Marie Tremblay</a></li>
                <li class="fn"><a href="/second">Someone Else</a></li>
            </ul>
        </div>
    "#;

    const SEARCH_MISS: &str = r#"
        <div class="results">
            <p class="no-results">No member matches your search.</p>
        </div>
    "#;

    const DETAIL: &str = r#"
        <div class="vcard">
            <h3> Marie Tremblay, CPA </h3>
            <ul>
                <li><strong>Tremblay &amp; Associés</strong></li>
                <li class="street-address"><p> 1 Rue Principale, Montréal </p></li>
                <li><p>Phone: 514-555-0100</p></li>
                <li><p>Public accountancy permit number: A145869 </p></li>
            </ul>
        </div>
    "#;

    fn parser() -> PageParser {
        PageParser::new(&SelectorConfig::default()).expect("default selectors compile")
    }

    #[test]
    fn test_search_link_takes_first_hit() {
        assert_eq!(
            parser().search_link(SEARCH_HIT),
            Some("/en/find-a-cpa/cpa-directory/profile/?id=abc%3D%3D".to_string())
        );
    }

    #[test]
    fn test_search_link_absent() {
        assert_eq!(parser().search_link(SEARCH_MISS), None);
    }

    #[test]
    fn test_search_link_ignores_empty_href() {
        let html = r#"<ul class="vcard"><li class="fn"><a href="  ">x</a></li></ul>"#;
        assert_eq!(parser().search_link(html), None);
    }

    #[test]
    fn test_details_extraction() {
        let details = parser().details(DETAIL).expect("parse details");

        assert_eq!(details.name, "Marie Tremblay, CPA");
        assert_eq!(details.company, "Tremblay & Associés");
        assert_eq!(details.address, "1 Rue Principale, Montréal");
        assert_eq!(details.phone, "514-555-0100");
        assert_eq!(details.permit_number, "A145869");
    }

    #[test]
    fn test_details_without_permit_number() {
        let html = r#"<div class="vcard"><h3>Nobody</h3></div>"#;
        let result = parser().details(html);
        assert!(matches!(
            result,
            Err(LookupError::MissingField("permit_number"))
        ));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = SelectorConfig {
            name: "h3[".to_string(),
            ..SelectorConfig::default()
        };
        let err = PageParser::new(&config).expect_err("bad selector");
        assert!(matches!(err, LookupError::Selector { .. }));
    }
}
