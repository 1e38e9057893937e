use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub throttle: ThrottleConfig,
    pub discovery: DiscoveryConfig,
    pub extraction: ExtractionConfig,
    pub challenge: ChallengeConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Base request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// TCP connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Extra timeout granted on each retry attempt (milliseconds)
    #[serde(rename = "timeout-step-ms")]
    pub timeout_step_ms: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Timeout for a given zero-based attempt
    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms + self.timeout_step_ms * u64::from(attempt),
        )
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            request_timeout_ms: 25_000,
            connect_timeout_ms: 10_000,
            timeout_step_ms: 10_000,
        }
    }
}

/// Adaptive request throttling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Fixed base delay between consecutive requests (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Ceiling for the adaptive delay (milliseconds)
    #[serde(rename = "max-adaptive-delay-ms")]
    pub max_adaptive_delay_ms: u64,

    /// Number of clean responses between violation-count decays
    #[serde(rename = "decay-interval")]
    pub decay_interval: u32,

    /// How much the violation count drops at each decay
    #[serde(rename = "decay-amount")]
    pub decay_amount: u32,
}

impl ThrottleConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn max_adaptive_delay(&self) -> Duration {
        Duration::from_millis(self.max_adaptive_delay_ms)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            max_adaptive_delay_ms: 5_000,
            decay_interval: 100,
            decay_amount: 2,
        }
    }
}

/// URL discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Hosting domains a tenant may resolve to (e.g., "*.avature.net")
    #[serde(rename = "trusted-domains")]
    pub trusted_domains: Vec<String>,

    /// Listing pages sampled during gap detection
    #[serde(rename = "sample-pages")]
    pub sample_pages: u32,

    /// Page size used when container counting fails
    #[serde(rename = "default-page-size")]
    pub default_page_size: u32,

    /// Pause between sampled listing pages (milliseconds)
    #[serde(rename = "sample-delay-ms")]
    pub sample_delay_ms: u64,

    /// Pause between full pagination pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Attempts per listing page on 406/429 before pagination halts
    #[serde(rename = "max-listing-retries")]
    pub max_listing_retries: u32,

    /// First listing backoff step (milliseconds)
    #[serde(rename = "listing-backoff-base-ms")]
    pub listing_backoff_base_ms: u64,

    /// Listing backoff ceiling (milliseconds)
    #[serde(rename = "listing-backoff-cap-ms")]
    pub listing_backoff_cap_ms: u64,

    /// Redirect hops followed while resolving a base URL
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Probe RSS feeds for availability
    #[serde(rename = "check-rss")]
    pub check_rss: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            trusted_domains: vec!["*.avature.net".to_string()],
            sample_pages: 3,
            default_page_size: 10,
            sample_delay_ms: 500,
            page_delay_ms: 3_000,
            max_listing_retries: 5,
            listing_backoff_base_ms: 60_000,
            listing_backoff_cap_ms: 300_000,
            max_redirects: 10,
            check_rss: true,
        }
    }
}

/// Job detail extraction configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Size of the worker pool
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Exponential base for retry backoff
    #[serde(rename = "retry-base")]
    pub retry_base: u32,

    /// Length of one backoff unit (milliseconds)
    #[serde(rename = "retry-unit-ms")]
    pub retry_unit_ms: u64,

    /// Backoff ceiling (milliseconds)
    #[serde(rename = "retry-cap-ms")]
    pub retry_cap_ms: u64,

    /// Base pause inserted after each full round of submissions (milliseconds)
    #[serde(rename = "stagger-base-ms")]
    pub stagger_base_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            max_retries: 3,
            retry_base: 3,
            retry_unit_ms: 1_000,
            retry_cap_ms: 30_000,
            stagger_base_ms: 200,
        }
    }
}

/// Browser challenge handling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Whether challenge solving runs at all
    pub enabled: bool,

    /// Tenants known to sit behind a challenge
    #[serde(rename = "known-protected")]
    pub known_protected: Vec<String>,

    /// Pause after the page settles, before reading cookies (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Prefer the headless browser when it is compiled in
    #[serde(rename = "use-headless")]
    pub use_headless: bool,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            known_protected: vec!["koch".to_string(), "sandboxlululemoninc".to_string()],
            settle_delay_ms: 5_000,
            use_headless: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving all run artifacts
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
        }
    }
}

/// Retry queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts after which a retryable failure is considered permanent
    #[serde(rename = "max-retry-attempts")]
    pub max_retry_attempts: u32,

    /// Delay before the next retry, indexed by retry count (seconds)
    #[serde(rename = "retry-delays-secs")]
    pub retry_delays_secs: Vec<u64>,

    /// Cooldown before retrying rate-limited failures (seconds)
    #[serde(rename = "rate-limit-cooldown-secs")]
    pub rate_limit_cooldown_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 5,
            retry_delays_secs: vec![300, 600, 1200, 2400, 4800],
            rate_limit_cooldown_secs: 1800,
        }
    }
}
