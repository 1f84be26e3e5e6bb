//! Listing-page extraction
//!
//! Finds job links on a rendered results page and classifies each listing
//! from the metadata text on its card.

use crate::extract::{DiscoveredListing, ListingExtractor};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Anchor that links a job card to its detail page
const CARD_LINK_SELECTOR: &str = "a.job-card-list__title--link";

/// Metadata list inside a job card; its text carries the parenthesized type
const CARD_METADATA_SELECTOR: &str = "ul.job-card-container__metadata-wrapper";

/// Extractor for job-search results pages
pub struct JobCardExtractor {
    type_re: Option<Regex>,
}

impl JobCardExtractor {
    pub fn new() -> Self {
        Self {
            type_re: Regex::new(r"\((.*?)\)").ok(),
        }
    }

    /// Pulls the parenthesized type out of a card's metadata text.
    ///
    /// A missing or malformed classifier never aborts the listing; it just
    /// degrades to "Unknown".
    fn classify(&self, metadata_text: &str) -> String {
        self.type_re
            .as_ref()
            .and_then(|re| re.captures(metadata_text.trim()))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Walks up from the link anchor to find the card's metadata text
    fn metadata_text(anchor: ElementRef<'_>, metadata_selector: &Selector) -> Option<String> {
        for ancestor in anchor.ancestors() {
            let Some(element) = ElementRef::wrap(ancestor) else {
                continue;
            };
            if let Some(metadata) = element.select(metadata_selector).next() {
                return Some(metadata.text().collect::<String>());
            }
        }
        None
    }
}

impl Default for JobCardExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingExtractor for JobCardExtractor {
    fn listings(&self, html: &str, base: &Url) -> Vec<DiscoveredListing> {
        let document = Html::parse_document(html);

        let Ok(link_selector) = Selector::parse(CARD_LINK_SELECTOR) else {
            return Vec::new();
        };
        let Ok(metadata_selector) = Selector::parse(CARD_METADATA_SELECTOR) else {
            return Vec::new();
        };

        let mut listings = Vec::new();
        for anchor in document.select(&link_selector) {
            let Some(href) = anchor.value().attr("href") else {
                tracing::debug!("Job card link without href, skipping");
                continue;
            };

            let url = match base.join(href.trim()) {
                Ok(resolved) => resolved.to_string(),
                Err(e) => {
                    tracing::debug!("Failed to resolve job link {}: {}", href, e);
                    continue;
                }
            };

            let type_hint = Self::metadata_text(anchor, &metadata_selector)
                .map(|text| self.classify(&text))
                .unwrap_or_else(|| "Unknown".to_string());

            listings.push(DiscoveredListing { url, type_hint });
        }

        listings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/jobs/search/").unwrap()
    }

    fn card(href: &str, metadata: &str) -> String {
        format!(
            r#"<div class="job-card-container">
                 <div class="artdeco-entity-lockup__content">
                   <a class="job-card-list__title--link" href="{}">Job</a>
                   <ul class="job-card-container__metadata-wrapper"><li>{}</li></ul>
                 </div>
               </div>"#,
            href, metadata
        )
    }

    #[test]
    fn test_extracts_link_and_type() {
        let html = format!(
            "<html><body>{}</body></html>",
            card("https://example.com/jobs/view/1/", "Bengaluru, India (Remote)")
        );
        let listings = JobCardExtractor::new().listings(&html, &base_url());

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].url, "https://example.com/jobs/view/1/");
        assert_eq!(listings[0].type_hint, "Remote");
    }

    #[test]
    fn test_resolves_relative_link() {
        let html = format!(
            "<html><body>{}</body></html>",
            card("/jobs/view/7/", "Pune (Hybrid)")
        );
        let listings = JobCardExtractor::new().listings(&html, &base_url());

        assert_eq!(listings[0].url, "https://example.com/jobs/view/7/");
    }

    #[test]
    fn test_missing_metadata_falls_back_to_unknown() {
        let html = r#"<html><body>
            <a class="job-card-list__title--link" href="https://example.com/jobs/view/2/">Job</a>
        </body></html>"#;
        let listings = JobCardExtractor::new().listings(html, &base_url());

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].type_hint, "Unknown");
    }

    #[test]
    fn test_metadata_without_parentheses_is_unknown() {
        let html = format!(
            "<html><body>{}</body></html>",
            card("https://example.com/jobs/view/3/", "Mumbai, India")
        );
        let listings = JobCardExtractor::new().listings(&html, &base_url());

        assert_eq!(listings[0].type_hint, "Unknown");
    }

    #[test]
    fn test_multiple_cards() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            card("https://example.com/jobs/view/1/", "(On-site)"),
            card("https://example.com/jobs/view/2/", "(Remote)")
        );
        let listings = JobCardExtractor::new().listings(&html, &base_url());

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].type_hint, "On-site");
        assert_eq!(listings[1].type_hint, "Remote");
    }

    #[test]
    fn test_empty_page_yields_no_listings() {
        let listings = JobCardExtractor::new().listings("<html><body></body></html>", &base_url());
        assert!(listings.is_empty());
    }
}
