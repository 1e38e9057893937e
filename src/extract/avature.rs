use crate::extract::strategy::{element_text, first_valid, labeled_fields, Strategy};
use crate::extract::{FieldExtractor, JobMetadata};
use crate::records::LOCATION_NOT_SPECIFIED;
use crate::url::resolve_link;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static WORK_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Work Location[:\s]*([^\n]+)").expect("hardcoded regex pattern is valid")
});

static CHROME_LINK_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Apply\s*Now|Back\s*to|Log\s*In|Save\s*this\s*Job")
        .expect("hardcoded regex pattern is valid")
});

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("hardcoded regex pattern is valid"));

static TITLE_STRATEGIES: &[Strategy] = &[
    Strategy::Css("h2.banner__text__title"),
    Strategy::Css(
        "div.article__content__view__field__value--font .article__content__view__field__value",
    ),
    Strategy::Css("h1.title"),
    Strategy::Css("h1"),
    Strategy::Css("h2"),
];

static LOCATION_STRATEGIES: &[Strategy] = &[
    Strategy::LabeledField(&["location"]),
    Strategy::Css("span.list-item-location"),
    Strategy::Css("span.location"),
    Strategy::Css("div.location"),
    Strategy::Css("p.location"),
    Strategy::Pattern(&WORK_LOCATION),
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "div.article__content__view__field.field--rich-text",
    "div.main__content",
    "div.article__body",
    "div.job-description",
    "div.description",
];

const DATE_POSTED_LABELS: &[&str] = &["posted date", "date posted"];
const EMPLOYMENT_TYPE_LABELS: &[&str] = &["employment type", "job type"];
const DEPARTMENT_LABELS: &[&str] = &["business area", "department", "division"];

static DATE_POSTED_FALLBACKS: &[Strategy] =
    &[Strategy::Css("time"), Strategy::Css("span.date-posted")];

static DEPARTMENT_FALLBACKS: &[Strategy] =
    &[Strategy::Css("span.department"), Strategy::Css("span.category")];

const APPLY_SELECTORS: &[&str] = &[
    "a.button.button--primary",
    r#"a[href*="Login?jobId"]"#,
    r#"a[href*="Apply"]"#,
    r#"a[data-map="apply-button"]"#,
    "a.apply-button",
];

const MIN_TITLE_LEN: usize = 3;
const MIN_DESCRIPTION_LEN: usize = 51;

/// Field extractor for the Avature career-site page family
#[derive(Debug, Clone, Copy, Default)]
pub struct AvatureExtractor;

impl AvatureExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FieldExtractor for AvatureExtractor {
    fn extract_title(&self, document: &Html) -> Option<String> {
        first_valid(document, TITLE_STRATEGIES, |title| {
            title.chars().count() >= MIN_TITLE_LEN
                && !title.to_lowercase().ends_with(" home page")
        })
    }

    fn extract_location(&self, document: &Html) -> String {
        first_valid(document, LOCATION_STRATEGIES, |_| true)
            .unwrap_or_else(|| LOCATION_NOT_SPECIFIED.to_string())
    }

    fn extract_description(&self, document: &Html) -> Option<String> {
        DESCRIPTION_SELECTORS.iter().find_map(|css| {
            let selector = Selector::parse(css).ok()?;
            let element = document.select(&selector).next()?;

            let mut parts = Vec::new();
            collect_content_text(element, &mut parts);
            let text = EXCESS_NEWLINES
                .replace_all(&parts.join("\n"), "\n\n")
                .into_owned();

            (text.chars().count() >= MIN_DESCRIPTION_LEN).then_some(text)
        })
    }

    fn extract_metadata(&self, document: &Html) -> JobMetadata {
        // one pass over the label/value blocks covers the common case
        let fields = labeled_fields(document);
        let from_fields = |keywords: &[&str]| {
            fields
                .iter()
                .find(|(label, _)| keywords.iter().any(|k| label.contains(k)))
                .map(|(_, value)| value.clone())
        };

        JobMetadata {
            date_posted: from_fields(DATE_POSTED_LABELS)
                .or_else(|| first_valid(document, DATE_POSTED_FALLBACKS, |_| true)),
            employment_type: from_fields(EMPLOYMENT_TYPE_LABELS),
            department: from_fields(DEPARTMENT_LABELS)
                .or_else(|| first_valid(document, DEPARTMENT_FALLBACKS, |_| true)),
        }
    }

    fn extract_application_url(&self, document: &Html, base: &Url) -> Option<String> {
        APPLY_SELECTORS.iter().find_map(|css| {
            let selector = Selector::parse(css).ok()?;
            let href = document.select(&selector).next()?.value().attr("href")?;
            let lowered = href.to_lowercase();
            if ["apply", "login?jobid", "application"]
                .iter()
                .any(|k| lowered.contains(k))
            {
                resolve_link(base, href).map(|url| url.to_string())
            } else {
                None
            }
        })
    }
}

/// Collects text of an element, skipping page chrome
fn collect_content_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_chrome(child) {
                        collect_content_text(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Navigation blocks, scripts and apply/back/login/save buttons
fn is_chrome(element: ElementRef<'_>) -> bool {
    let el = element.value();
    match el.name() {
        "nav" | "header" | "footer" | "script" | "style" => true,
        "a" | "button" => {
            el.classes().any(|c| c.contains("button"))
                || CHROME_LINK_TEXT.is_match(&element_text(element))
        }
        _ => false,
    }
}
