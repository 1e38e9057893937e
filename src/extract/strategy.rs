//! Ordered extraction strategies
//!
//! A field is extracted by trying a list of [`Strategy`] values in order and
//! keeping the first result that passes the field's validation.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Container and parts of the label/value blocks used on posting pages
const FIELD_SELECTOR: &str = "div.article__content__view__field";
const FIELD_LABEL_SELECTOR: &str = "div.article__content__view__field__label";
const FIELD_VALUE_SELECTOR: &str = "div.article__content__view__field__value";

/// One way of pulling a text value out of a document
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Text of the first element matching a CSS selector
    Css(&'static str),

    /// Value of the first label/value block whose label contains a keyword
    LabeledField(&'static [&'static str]),

    /// First capture group of a regex run over the page text
    Pattern(&'static LazyLock<Regex>),
}

impl Strategy {
    /// Applies this strategy, returning a trimmed non-empty value
    pub fn apply(&self, document: &Html) -> Option<String> {
        let value = match self {
            Self::Css(css) => {
                let selector = Selector::parse(css).ok()?;
                document.select(&selector).next().map(element_text)
            }
            Self::LabeledField(keywords) => labeled_fields(document)
                .into_iter()
                .find(|(label, _)| keywords.iter().any(|k| label.contains(k)))
                .map(|(_, value)| value),
            Self::Pattern(regex) => regex
                .captures(&page_text(document))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        }?;

        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Runs strategies in order and returns the first value accepted by `accept`
pub fn first_valid<F>(document: &Html, strategies: &[Strategy], accept: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    strategies
        .iter()
        .filter_map(|strategy| strategy.apply(document))
        .find(|value| accept(value))
}

/// Stripped text of an element, with runs of whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// All text nodes of the document joined by newlines
pub fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Label/value pairs of the posting's field blocks, labels lowercased
pub fn labeled_fields(document: &Html) -> Vec<(String, String)> {
    let (Ok(field), Ok(label), Ok(value)) = (
        Selector::parse(FIELD_SELECTOR),
        Selector::parse(FIELD_LABEL_SELECTOR),
        Selector::parse(FIELD_VALUE_SELECTOR),
    ) else {
        return Vec::new();
    };

    document
        .select(&field)
        .filter_map(|block| {
            let label_text = block.select(&label).next().map(element_text)?;
            let value_text = block.select(&value).next().map(element_text)?;
            Some((label_text.to_lowercase(), value_text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    static NUMBER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"Ref[:\s]*(\d+)").expect("hardcoded regex pattern is valid"));

    const PAGE: &str = r#"<html><body>
        <h1>  Senior   Engineer </h1>
        <div class="article__content__view__field">
            <div class="article__content__view__field__label">Work Location</div>
            <div class="article__content__view__field__value">Boston, MA</div>
        </div>
        <p>Ref: 991</p>
    </body></html>"#;

    #[test]
    fn test_css_strategy() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            Strategy::Css("h1").apply(&doc),
            Some("Senior Engineer".to_string())
        );
        assert_eq!(Strategy::Css("h2").apply(&doc), None);
    }

    #[test]
    fn test_labeled_field_strategy() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(
            Strategy::LabeledField(&["location"]).apply(&doc),
            Some("Boston, MA".to_string())
        );
        assert_eq!(Strategy::LabeledField(&["department"]).apply(&doc), None);
    }

    #[test]
    fn test_pattern_strategy() {
        let doc = Html::parse_document(PAGE);
        assert_eq!(Strategy::Pattern(&NUMBER).apply(&doc), Some("991".to_string()));
    }

    #[test]
    fn test_first_valid_skips_rejected_values() {
        let doc = Html::parse_document(PAGE);
        let strategies = [Strategy::Css("p"), Strategy::Css("h1")];
        let value = first_valid(&doc, &strategies, |v| !v.starts_with("Ref"));
        assert_eq!(value, Some("Senior Engineer".to_string()));
    }
}
