//! Listing-page parsing: result containers, job links and the results legend

use crate::extract::strategy::element_text;
use crate::url::{is_job_detail_url, resolve_link};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static DETAIL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(JobDetail|FolderDetail|PipelineDetail)/").expect("hardcoded regex pattern is valid")
});

/// Legend patterns, most specific first
static COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Showing\s+\d+-\d+\s+of\s+(\d+)\+?",
        r"(?i)There\s+are\s+(\d+)\+?\s+jobs\s+matching",
        r"(?i)of\s+(\d+)\+?\s+results",
        r"(?i)of\s+(\d+)\+?",
        r"(?i)(\d+)\+?\s+results",
        r"(?i)(\d+)\+?\s+jobs",
        r"^(\d+)\+$",
        r"(\d+)\+",
        r"(?i)(\d+)\s*available\s*positions?",
        r"(?i)(\d+)\s*open\s*positions?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("hardcoded regex pattern is valid"))
    .collect()
});

const LEGEND_SELECTORS: &[&str] = &[
    "div.list-controls__legend",
    "div.list-controls__text__legend",
    ".list-controls__legend",
    ".search__panel__count--span",
    ".pagination__legend",
    ".legend",
    ".section__title--3",
];

/// Shapes a listing's result rows can take, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStrategy {
    /// `<article class="article--result">`
    ResultArticle,
    /// `<li>` holding a detail link
    ListItemWithLink,
    /// `<tr class="card--box">`
    CardRow,
    /// Any `<tr>` holding a detail link
    TableRowWithLink,
    /// `<div>` with "job" in its class
    JobClassDiv,
}

impl ContainerStrategy {
    pub const ORDER: [ContainerStrategy; 5] = [
        Self::ResultArticle,
        Self::ListItemWithLink,
        Self::CardRow,
        Self::TableRowWithLink,
        Self::JobClassDiv,
    ];

    fn find<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let css = match self {
            Self::ResultArticle => "article.article--result",
            Self::ListItemWithLink => "li",
            Self::CardRow => "tr.card--box",
            Self::TableRowWithLink => "tr",
            Self::JobClassDiv => "div[class]",
        };
        let Ok(selector) = Selector::parse(css) else {
            return Vec::new();
        };

        document
            .select(&selector)
            .filter(|element| match self {
                Self::ListItemWithLink | Self::TableRowWithLink => detail_link(*element).is_some(),
                Self::JobClassDiv => element
                    .value()
                    .classes()
                    .any(|c| c.to_lowercase().contains("job")),
                Self::ResultArticle | Self::CardRow => true,
            })
            .collect()
    }
}

/// What one listing page yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Number of result containers found
    pub container_count: usize,
    /// Strategy that found them
    pub strategy: Option<ContainerStrategy>,
    /// Absolute job-detail URLs, one per container, page order, no repeats
    pub job_urls: Vec<String>,
}

impl ListingPage {
    /// A page with no result containers marks the end of the listing
    pub fn is_empty(&self) -> bool {
        self.container_count == 0
    }
}

/// Finds result containers using the first strategy that matches anything
pub fn find_result_containers(document: &Html) -> (Option<ContainerStrategy>, Vec<ElementRef<'_>>) {
    for strategy in ContainerStrategy::ORDER {
        let containers = strategy.find(document);
        if !containers.is_empty() {
            return (Some(strategy), containers);
        }
    }
    (None, Vec::new())
}

/// Parses one listing page into its job links
///
/// # Arguments
///
/// * `html` - Raw listing HTML
/// * `page_url` - URL the page was fetched from, for resolving relative links
pub fn parse_listing_page(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let (strategy, containers) = find_result_containers(&document);

    let mut seen = HashSet::new();
    let job_urls = containers
        .iter()
        .filter_map(|container| detail_link(*container))
        .filter_map(|href| resolve_link(page_url, href))
        .map(|url| url.to_string())
        .filter(|url| is_job_detail_url(url))
        .filter(|url| seen.insert(url.clone()))
        .collect();

    ListingPage {
        container_count: containers.len(),
        strategy,
        job_urls,
    }
}

/// Counts result containers on a page; used to detect the site's page size
pub fn count_result_containers(html: &str) -> usize {
    let document = Html::parse_document(html);
    find_result_containers(&document).1.len()
}

/// Reads the advertised total number of postings from the results legend
///
/// Only the first legend element found is examined.
pub fn parse_total_job_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);

    let legend = LEGEND_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).next().map(element_text)
    })?;

    COUNT_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&legend)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// First link inside an element whose href points at a detail page
fn detail_link(element: ElementRef<'_>) -> Option<&str> {
    let selector = Selector::parse("a[href]").ok()?;
    element
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| DETAIL_LINK.is_match(href))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://acme.avature.net/careers/SearchJobs/?jobOffset=0").unwrap()
    }

    #[test]
    fn test_article_containers() {
        let html = r#"
            <article class="article article--result"><a href="/careers/JobDetail/A/1">A</a></article>
            <article class="article article--result"><a href="/careers/JobDetail/B/2">B</a></article>
        "#;
        let page = parse_listing_page(html, &page_url());
        assert_eq!(page.container_count, 2);
        assert_eq!(page.strategy, Some(ContainerStrategy::ResultArticle));
        assert_eq!(
            page.job_urls,
            vec![
                "https://acme.avature.net/careers/JobDetail/A/1".to_string(),
                "https://acme.avature.net/careers/JobDetail/B/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_item_containers_ignore_plain_lis() {
        let html = r#"<ul>
            <li><a href="/careers/about">About</a></li>
            <li><a href="/careers/FolderDetail/Pool/7">Pool</a></li>
        </ul>"#;
        let page = parse_listing_page(html, &page_url());
        assert_eq!(page.strategy, Some(ContainerStrategy::ListItemWithLink));
        assert_eq!(page.container_count, 1);
        assert!(page.job_urls[0].ends_with("/FolderDetail/Pool/7"));
    }

    #[test]
    fn test_table_row_containers() {
        let html = r#"<table>
            <tr class="card--box"><td><a href="/careers/JobDetail/A/1">A</a></td></tr>
            <tr class="card--box"><td>no link</td></tr>
        </table>"#;
        let page = parse_listing_page(html, &page_url());
        assert_eq!(page.strategy, Some(ContainerStrategy::CardRow));
        assert_eq!(page.container_count, 2);
        assert_eq!(page.job_urls.len(), 1);
    }

    #[test]
    fn test_empty_page() {
        let page = parse_listing_page("<html><body><p>No results</p></body></html>", &page_url());
        assert!(page.is_empty());
        assert!(page.job_urls.is_empty());
    }

    #[test]
    fn test_count_result_containers() {
        let html: String = (0..12)
            .map(|i| format!(r#"<article class="article--result"><a href="/careers/JobDetail/x/{i}">x</a></article>"#))
            .collect();
        assert_eq!(count_result_containers(&html), 12);
        assert_eq!(count_result_containers("<p></p>"), 0);
    }

    #[test]
    fn test_parse_total_job_count() {
        let html = r#"<div class="list-controls__legend">Showing 1-6 of 106 results</div>"#;
        assert_eq!(parse_total_job_count(html), Some(106));

        let html = r#"<div class="legend">There are 80 jobs matching your search</div>"#;
        assert_eq!(parse_total_job_count(html), Some(80));

        let html = r#"<h3 class="section__title--3">999+</h3>"#;
        assert_eq!(parse_total_job_count(html), Some(999));

        assert_eq!(parse_total_job_count("<p>Showing 1-6 of 10</p>"), None);
    }
}
