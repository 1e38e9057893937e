//! Avature Harvester: job-posting discovery and extraction for hosted career sites
//!
//! This crate discovers job-detail URLs across many Avature tenants (sitemap,
//! RSS probe and paginated HTML listings), fetches each posting under an
//! adaptive rate limit, and classifies every failure so it can be retried later.
//! Tenant lists themselves can be built from raw URL dumps: names are
//! extracted, then each tenant's career site is located by trying candidate
//! base URLs.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod input;
pub mod output;
pub mod records;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection error for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Redirect from {from} leaves the trusted domain: {to}")]
    ExternalRedirect { from: String, to: String },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Input error: {0}")]
    Input(#[from] input::InputError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Challenge error: {0}")]
    Challenge(#[from] crawler::ChallengeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for network-level failures worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connect { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Not a job detail URL: {0}")]
    NotJobDetail(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{CompanyContext, DiscoveredUrlSet, FailureRecord, JobRecord};
pub use state::{DiscoveryOutcome, ErrorType, SourceMethod};
pub use url::{extract_job_id, is_job_detail_url, is_trusted_host};
