//! Locating a tenant's career site from its bare name
//!
//! Candidate base URLs are tried in order until one settles the question:
//!
//! | Final response | Status |
//! |----------------|--------|
//! | 200 that looks like a hosted career site | valid |
//! | 406 / 429, or 202 with a WAF action header | valid_blocked |
//! | Redirect hop off the trusted domains | redirected |
//! | Anything else | try the next candidate |
//!
//! Redirects are walked hop by hop like base-URL resolution in discovery, so an
//! off-platform target is recorded but never contacted.

use crate::config::DiscoveryConfig;
use crate::crawler::challenge::WAF_ACTION_HEADER;
use crate::crawler::fetcher::{FetchedPage, RateLimitedClient};
use crate::extract::parse_total_job_count;
use crate::input::Tenant;
use crate::url::{is_trusted_host, is_trusted_url};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Domain every tenant is hosted under
pub const HOSTING_DOMAIN: &str = "avature.net";

/// Candidate paths, most common first
const CANDIDATE_PATHS: [&str; 13] = [
    "/careers",
    "/Careers",
    "/talent",
    "/jobs",
    "/SearchJobs",
    "/en_US/jobs",
    "/en_US/careers",
    "/fr_CA/jobs",
    "/fr_CA/careers",
    "/en/careers",
    "/de/careers",
    "/es/careers",
    "/fr/careers",
];

/// Lowercased markers of the hosting platform's page templates
const PLATFORM_SIGNATURES: [&str; 5] = [
    "avature",
    "portal/jquery",
    "/asset/portal/",
    "eventmanager.getinstance()",
    "wizard/portal/",
];

const MIN_SIGNATURES: usize = 3;

/// How the search for a tenant's career site ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    Valid,
    /// The site answered with anti-bot pushback; very likely real
    ValidBlocked,
    /// The tenant now forwards to another applicant tracking system
    Redirected,
    NoValidUrls,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::ValidBlocked => "valid_blocked",
            Self::Redirected => "redirected",
            Self::NoValidUrls => "no_valid_urls",
        }
    }

    /// Whether the tenant should go on to discovery
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Valid | Self::ValidBlocked)
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of the search for one tenant
#[derive(Debug, Clone, Serialize)]
pub struct BoardMatch {
    pub tenant: String,
    pub status: BoardStatus,
    /// Candidate that settled the search
    pub url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_to: Option<Url>,
    pub job_count: u32,
    /// Candidates tried, the deciding one included
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BoardMatch {
    /// The tenant entry for discovery, when the site is usable
    pub fn to_tenant(&self) -> Option<Tenant> {
        if !self.status.is_usable() {
            return None;
        }
        self.url.as_ref().map(|url| Tenant {
            company: self.tenant.clone(),
            base_url: url.clone(),
        })
    }
}

/// What one candidate URL turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
enum CandidateCheck {
    Valid { job_count: u32 },
    Blocked { status: u16 },
    Redirected(Url),
    Invalid(String),
}

/// Root URL of a tenant, `https://<tenant>.avature.net`
pub fn tenant_root(tenant: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("https://{}.{}", tenant, HOSTING_DOMAIN))
}

/// Candidate base URLs under `root`, in the order they are tried
///
/// # Examples
///
/// ```
/// use avature_harvester::crawler::{candidate_urls, tenant_root};
///
/// let root = tenant_root("acme").unwrap();
/// let candidates = candidate_urls(&root);
/// assert_eq!(candidates[0].as_str(), "https://acme.avature.net/careers");
/// assert_eq!(candidates[1].as_str(), "https://acme.avature.net/Careers");
/// ```
pub fn candidate_urls(root: &Url) -> Vec<Url> {
    CANDIDATE_PATHS
        .iter()
        .filter_map(|path| root.join(path).ok())
        .collect()
}

/// Whether a page is served by the hosting platform
///
/// A host under the hosting domain is enough; otherwise the body must carry
/// at least three template signatures.
pub fn looks_like_platform(url: &Url, body: &str) -> bool {
    let hosted = url
        .host_str()
        .map(|host| is_trusted_host(host, &[format!("*.{}", HOSTING_DOMAIN)]))
        .unwrap_or(false);
    if hosted {
        return true;
    }

    let lowered = body.to_lowercase();
    PLATFORM_SIGNATURES
        .iter()
        .filter(|signature| lowered.contains(*signature))
        .count()
        >= MIN_SIGNATURES
}

fn classify_final(page: &FetchedPage) -> CandidateCheck {
    let waf = page.status == 202 && page.header(WAF_ACTION_HEADER).is_some();
    if page.is_violation() || waf {
        return CandidateCheck::Blocked {
            status: page.status,
        };
    }
    if !page.is_ok() {
        return CandidateCheck::Invalid(format!("HTTP {}", page.status));
    }
    if !looks_like_platform(&page.final_url, &page.body) {
        return CandidateCheck::Invalid("Not a hosted career site".to_string());
    }
    CandidateCheck::Valid {
        job_count: parse_total_job_count(&page.body).unwrap_or(0),
    }
}

/// Finds each tenant's career site on the shared client
pub struct BoardFinder {
    client: Arc<RateLimitedClient>,
    trusted: Vec<String>,
    max_redirects: u32,
}

impl BoardFinder {
    pub fn new(client: Arc<RateLimitedClient>, config: &DiscoveryConfig) -> Self {
        Self {
            client,
            trusted: config.trusted_domains.clone(),
            max_redirects: config.max_redirects,
        }
    }

    /// Searches the candidates under the tenant's hosted root
    pub async fn find(&self, tenant: &str) -> BoardMatch {
        match tenant_root(tenant) {
            Ok(root) => self.find_at(tenant, &root).await,
            Err(e) => BoardMatch {
                tenant: tenant.to_string(),
                status: BoardStatus::NoValidUrls,
                url: None,
                redirected_to: None,
                job_count: 0,
                attempts: 0,
                reason: Some(format!("Invalid tenant name: {}", e)),
            },
        }
    }

    /// Searches the candidates under an explicit root URL
    ///
    /// # Arguments
    ///
    /// * `tenant` - Tenant name recorded in the result
    /// * `root` - Scheme and host the candidate paths are joined onto
    ///
    /// # Returns
    ///
    /// The first candidate that is valid, blocked or redirected, or
    /// `no_valid_urls` once every candidate has been tried.
    pub async fn find_at(&self, tenant: &str, root: &Url) -> BoardMatch {
        let candidates = candidate_urls(root);
        let mut result = BoardMatch {
            tenant: tenant.to_string(),
            status: BoardStatus::NoValidUrls,
            url: None,
            redirected_to: None,
            job_count: 0,
            attempts: 0,
            reason: None,
        };

        for url in &candidates {
            result.attempts += 1;
            let check = self.check_candidate(url).await;
            tracing::debug!("{}: {} -> {:?}", tenant, url, check);

            match check {
                CandidateCheck::Valid { job_count } => {
                    result.status = BoardStatus::Valid;
                    result.job_count = job_count;
                }
                CandidateCheck::Blocked { status } => {
                    result.status = BoardStatus::ValidBlocked;
                    result.reason = Some(format!("HTTP {} (site is blocking automated access)", status));
                }
                CandidateCheck::Redirected(target) => {
                    result.status = BoardStatus::Redirected;
                    result.reason = Some("Redirected off the hosting platform".to_string());
                    result.redirected_to = Some(target);
                }
                CandidateCheck::Invalid(_) => continue,
            }
            result.url = Some(url.clone());
            tracing::info!("{}: {} at {}", tenant, result.status, url);
            return result;
        }

        result.reason = Some(format!(
            "No valid URLs found after testing {} candidates",
            candidates.len()
        ));
        tracing::info!("{}: no valid URLs", tenant);
        result
    }

    /// Fetches one candidate, vetting every redirect hop
    async fn check_candidate(&self, url: &Url) -> CandidateCheck {
        let mut current = url.clone();
        let mut visited = HashSet::from([current.to_string()]);

        for _ in 0..=self.max_redirects {
            let page = match self.client.fetch_once(&current).await {
                Ok(page) => page,
                Err(e) => return CandidateCheck::Invalid(e.to_string()),
            };

            if !page.is_redirect() {
                return classify_final(&page);
            }

            let Some(next) = page.location() else {
                return CandidateCheck::Invalid(format!("HTTP {} without a Location", page.status));
            };
            if !is_trusted_url(&next, &self.trusted) {
                return CandidateCheck::Redirected(next);
            }
            if !visited.insert(next.to_string()) {
                return CandidateCheck::Invalid(format!("Redirect loop at {}", next));
            }
            current = next;
        }

        CandidateCheck::Invalid("Too many redirects".to_string())
    }
}
