//! Detail-page extraction
//!
//! Populates a job record from a rendered detail page. Every field is
//! extracted in isolation: a selector that fails to match (or to parse)
//! substitutes the "Not Mentioned" sentinel without touching the others.

use crate::extract::{DetailExtractor, ParseOutcome, NOT_MENTIONED};
use scraper::{ElementRef, Html, Selector};

/// Readiness anchors: a loaded detail page has a title heading and a
/// top-card subheader. This is a loaded-page heuristic, not a promise that
/// every field is present.
const TITLE_SELECTOR: &str = "h1";
const TOPCARD_SELECTORS: [&str; 2] = ["h1 + h4", "section.top-card-layout h4"];

/// Extractor for job detail pages
pub struct JobDetailExtractor;

impl JobDetailExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First match's text within `scope`, trimmed; sentinel if absent
    fn field_in<'a>(scope: ElementRef<'a>, selector: &str) -> String {
        Self::text_in(scope, selector).unwrap_or_else(|| NOT_MENTIONED.to_string())
    }

    fn text_in<'a>(scope: ElementRef<'a>, selector: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        scope
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn attr_in<'a>(scope: ElementRef<'a>, selector: &str, attr: &str) -> String {
        let parsed = match Selector::parse(selector) {
            Ok(sel) => scope
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            Err(_) => None,
        };
        parsed.unwrap_or_else(|| NOT_MENTIONED.to_string())
    }

    /// Locates the top-card subheader the company fields live under
    fn topcard<'a>(root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        for selector in TOPCARD_SELECTORS {
            let Ok(sel) = Selector::parse(selector) else {
                continue;
            };
            if let Some(el) = root.select(&sel).next() {
                return Some(el);
            }
        }
        None
    }

    /// Extracts dynamic criteria pairs (seniority, employment type, ...)
    fn criteria(root: ElementRef<'_>, fields: &mut Vec<(String, String)>) {
        let Ok(item_sel) = Selector::parse("ul.description__job-criteria-list li") else {
            return;
        };

        for item in root.select(&item_sel) {
            let heading = Self::text_in(item, "h3.description__job-criteria-subheader");
            let value = Self::text_in(item, "span.description__job-criteria-text");
            if let (Some(heading), Some(value)) = (heading, value) {
                fields.push((heading, value));
            }
        }
    }
}

impl Default for JobDetailExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailExtractor for JobDetailExtractor {
    fn parse(&self, html: &str) -> ParseOutcome {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let title = Self::text_in(root, TITLE_SELECTOR);
        let topcard = Self::topcard(root);

        // Both anchors must be present for the page to count as loaded.
        if title.is_none() || topcard.is_none() {
            return ParseOutcome {
                ready: false,
                fields: Vec::new(),
            };
        }

        let mut fields = Vec::new();
        fields.push((
            "Job Title".to_string(),
            title.unwrap_or_else(|| NOT_MENTIONED.to_string()),
        ));
        fields.push((
            "Job Description".to_string(),
            Self::field_in(root, "div.description__text, section.description"),
        ));

        Self::criteria(root, &mut fields);

        if let Some(topcard) = topcard {
            fields.push((
                "Company Name".to_string(),
                Self::field_in(topcard, "a.topcard__org-name-link"),
            ));
            fields.push((
                "Company Link".to_string(),
                Self::attr_in(topcard, "a.topcard__org-name-link", "href"),
            ));
            fields.push((
                "Company Location".to_string(),
                Self::field_in(topcard, "span.topcard__flavor--bullet"),
            ));
            fields.push((
                "Post Time".to_string(),
                Self::field_in(topcard, "span.posted-time-ago__text"),
            ));

            let applicants = Self::text_in(topcard, "figcaption")
                .or_else(|| Self::text_in(topcard, "span.num-applicants__caption"))
                .unwrap_or_else(|| NOT_MENTIONED.to_string());
            fields.push(("Applicants Apply".to_string(), applicants));
        }

        fields.push((
            "Salary Description".to_string(),
            Self::field_in(root, "p.compensation__description"),
        ));
        fields.push((
            "Salary Range".to_string(),
            Self::field_in(root, "div.salary"),
        ));

        ParseOutcome {
            ready: true,
            fields,
        }
    }
}
