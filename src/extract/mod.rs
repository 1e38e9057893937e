//! HTML field extraction
//!
//! Extraction is best-effort and side-effect free: every operation takes a
//! parsed document and returns a value or `None`. Each field is resolved by
//! an ordered list of strategies (CSS selector, label/value block, regex)
//! tried until one yields a value that passes the field's validation.

mod avature;
pub mod listing;
mod strategy;

pub use avature::AvatureExtractor;
pub use listing::{
    count_result_containers, parse_listing_page, parse_total_job_count, ContainerStrategy,
    ListingPage,
};
pub use strategy::{element_text, first_valid, labeled_fields, page_text, Strategy};

use scraper::Html;
use url::Url;

/// Optional metadata fields of a posting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobMetadata {
    pub date_posted: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
}

/// Extracts posting fields from a detail page
///
/// Title is the only mandatory field; the detail fetcher turns a missing
/// title into a `missing_title` failure.
pub trait FieldExtractor: Send + Sync {
    fn extract_title(&self, document: &Html) -> Option<String>;

    /// Always returns a value; "Not specified" when nothing was found
    fn extract_location(&self, document: &Html) -> String;

    fn extract_description(&self, document: &Html) -> Option<String>;

    fn extract_metadata(&self, document: &Html) -> JobMetadata;

    /// Resolves the apply link against `base`
    fn extract_application_url(&self, document: &Html, base: &Url) -> Option<String>;
}
