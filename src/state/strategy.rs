use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of discovery for one company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    /// Sitemap found postings and the listing sample showed nothing new
    SitemapOnly,
    /// Sitemap was empty or unusable; full listing pagination was used
    HtmlOnly,
    /// Sitemap was incomplete; listing pagination filled the gap
    SitemapPlusHtml,
    /// The base URL resolved outside the trusted hosting domain
    ExternalRedirectDetected,
}

impl DiscoveryOutcome {
    /// Returns true if discovery produced a usable URL set
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::ExternalRedirectDetected)
    }

    /// Returns true if the listing was paginated to exhaustion
    pub fn used_pagination(&self) -> bool {
        matches!(self, Self::HtmlOnly | Self::SitemapPlusHtml)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SitemapOnly => "sitemap_only",
            Self::HtmlOnly => "html_only",
            Self::SitemapPlusHtml => "sitemap_plus_html",
            Self::ExternalRedirectDetected => "external_redirect_detected",
        }
    }
}

impl fmt::Display for DiscoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a job URL was first discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Sitemap,
    Rss,
    Html,
    /// Supplied directly in a URL input file
    UrlList,
}

impl SourceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitemap => "sitemap",
            Self::Rss => "rss",
            Self::Html => "html",
            Self::UrlList => "url_list",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
