//! Extraction module
//!
//! This module contains the HTML-to-field extraction rules:
//! - Listing pages: discovering per-job links and a type classifier
//! - Detail pages: populating a structured job record field by field
//! - Relative post-time normalization

mod detail;
mod listing;
mod timeparse;

pub use detail::JobDetailExtractor;
pub use listing::JobCardExtractor;
pub use timeparse::normalize_relative_time;

use url::Url;

/// Placeholder for any field that could not be extracted.
///
/// Distinct from absence: a stored record carries this value for every field
/// the page did not mention.
pub const NOT_MENTIONED: &str = "Not Mentioned";

/// A listing discovered on a results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredListing {
    /// Absolute URL of the detail page
    pub url: String,

    /// Best-effort type classifier (e.g. "Remote"), "Unknown" if absent
    pub type_hint: String,
}

/// Result of parsing a rendered detail page
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Whether the page's required anchor elements were present
    pub ready: bool,

    /// Extracted fields in presentation order
    pub fields: Vec<(String, String)>,
}

/// Extracts listings from a rendered results page
pub trait ListingExtractor: Send + Sync {
    fn listings(&self, html: &str, base: &Url) -> Vec<DiscoveredListing>;
}

/// Extracts a structured record from a rendered detail page
pub trait DetailExtractor: Send + Sync {
    fn parse(&self, html: &str) -> ParseOutcome;
}

/// Derives the stable identity key for a detail URL.
///
/// The key is the last non-empty path segment, with query parameters
/// stripped. It is content-independent, so re-scraping the same listing
/// always maps to the same key.
pub fn identity_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.to_string())
}
