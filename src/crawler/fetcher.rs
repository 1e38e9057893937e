//! Rate-limited HTTP client
//!
//! This module issues every request the harvester makes:
//! - Building reqwest clients that share one cookie jar
//! - Spacing requests by `base_delay + adaptive_delay`
//! - Widening the spacing on 406/429 responses and relaxing it as clean
//!   responses accumulate
//! - Classifying network errors into timeouts and connection failures
//!
//! There is no retry here; callers decide what to do with a response.

use crate::config::{HttpConfig, ThrottleConfig};
use crate::crawler::challenge::SessionCookie;
use crate::state::ThrottleState;
use crate::HarvestError;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use url::Url;

/// Statuses the server uses to push back on automated clients
const VIOLATION_STATUSES: [u16; 2] = [406, 429];

/// A response with its body read
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Final URL after any redirects the client followed
    pub final_url: Url,

    /// Response headers
    pub headers: HeaderMap,

    /// Body text (empty for redirects)
    pub body: String,
}

impl FetchedPage {
    /// 200 OK
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// 200, or the 202 some challenge-fronted sites answer with
    pub fn is_accepted(&self) -> bool {
        self.status == 200 || self.status == 202
    }

    /// 3xx
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Anti-bot pushback (406 or 429)
    pub fn is_violation(&self) -> bool {
        VIOLATION_STATUSES.contains(&self.status)
    }

    /// Header value as text, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Location header resolved against the request URL
    pub fn location(&self) -> Option<Url> {
        let raw = self.headers.get(LOCATION)?.to_str().ok()?;
        self.final_url.join(raw).ok()
    }

    /// Content-Type header, lowercased
    pub fn content_type(&self) -> String {
        self.header("content-type").unwrap_or("").to_lowercase()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - HTTP settings (user agent, timeouts)
/// * `jar` - Cookie jar shared with the other client of the same harvester
/// * `redirect` - Redirect policy; `Policy::none()` for manual resolution
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &HttpConfig,
    jar: Arc<Jar>,
    redirect: Policy,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .cookie_provider(jar)
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP client that enforces adaptive spacing between requests
///
/// One instance is shared (behind an `Arc`) by discovery and by every detail
/// worker, so all of them draw from the same throttle and cookie jar.
pub struct RateLimitedClient {
    client: Client,
    no_redirect: Client,
    jar: Arc<Jar>,
    throttle: Mutex<ThrottleState>,
    default_timeout: Duration,
}

impl RateLimitedClient {
    /// Creates a client from the HTTP and throttle configuration
    pub fn new(http: &HttpConfig, throttle: &ThrottleConfig) -> Result<Self, HarvestError> {
        let jar = Arc::new(Jar::default());
        Ok(Self {
            client: build_http_client(http, jar.clone(), Policy::limited(10))?,
            no_redirect: build_http_client(http, jar.clone(), Policy::none())?,
            jar,
            throttle: Mutex::new(ThrottleState::new(throttle)),
            default_timeout: http.request_timeout(),
        })
    }

    /// Fetches a URL, following redirects
    ///
    /// Waits for the throttle first. A 406 or 429 widens the spacing for
    /// every later request; any other status counts as a clean response.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A response arrived, whatever its status
    /// * `Err(HarvestError::Timeout)` - The request timed out
    /// * `Err(HarvestError::Connect)` - The connection failed
    pub async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, HarvestError> {
        self.send(&self.client, url, timeout).await
    }

    /// Fetches with the configured default timeout
    pub async fn get(&self, url: &Url) -> Result<FetchedPage, HarvestError> {
        self.fetch(url, self.default_timeout).await
    }

    /// Issues a single request without following redirects
    ///
    /// Used to walk redirect chains hop by hop so each target can be vetted
    /// before it is contacted.
    pub async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, HarvestError> {
        self.send(&self.no_redirect, url, self.default_timeout).await
    }

    async fn send(
        &self,
        client: &Client,
        url: &Url,
        timeout: Duration,
    ) -> Result<FetchedPage, HarvestError> {
        self.wait_turn().await;
        tracing::debug!("GET {}", url);

        let response = client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        if VIOLATION_STATUSES.contains(&status) {
            tracing::warn!("HTTP {} from {}, widening request spacing", status, url);
            self.record_violation();
        } else {
            self.lock_throttle().record_success();
        }

        let body = if (300..400).contains(&status) {
            String::new()
        } else {
            response
                .text()
                .await
                .map_err(|e| classify_reqwest_error(url, e))?
        };

        Ok(FetchedPage {
            status,
            final_url,
            headers,
            body,
        })
    }

    /// Waits until the throttle admits a request, then claims the slot
    ///
    /// Checking and claiming happen under one lock, so concurrent callers
    /// are serialized onto distinct slots.
    async fn wait_turn(&self) {
        loop {
            let wait = {
                let mut state = self.lock_throttle();
                let now = Instant::now();
                match state.time_until_next_request(now) {
                    Some(wait) => wait,
                    None => {
                        state.record_request(now);
                        return;
                    }
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Records an anti-bot response observed outside `fetch`
    pub fn record_violation(&self) {
        self.lock_throttle().record_violation();
    }

    /// Snapshot of the throttle
    pub fn throttle(&self) -> ThrottleState {
        self.lock_throttle().clone()
    }

    pub fn has_recent_violations(&self) -> bool {
        self.lock_throttle().has_recent_violations()
    }

    pub fn adaptive_delay(&self) -> Duration {
        self.lock_throttle().adaptive_delay
    }

    /// Injects session cookies for the host of `url`
    pub fn add_cookies(&self, cookies: &[SessionCookie], url: &Url) {
        for cookie in cookies {
            let mut header = format!("{}={}; Path=/", cookie.name, cookie.value);
            if let Some(domain) = cookie.domain.as_deref().filter(|d| !d.is_empty()) {
                header.push_str("; Domain=");
                header.push_str(domain);
            }
            self.jar.add_cookie_str(&header, url);
        }
        tracing::debug!("Added {} session cookies for {}", cookies.len(), url);
    }

    /// Throttle state tolerates a poisoned lock; it is advisory
    fn lock_throttle(&self) -> MutexGuard<'_, ThrottleState> {
        self.throttle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Maps a reqwest failure onto the harvester's network error kinds
fn classify_reqwest_error(url: &Url, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        HarvestError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
