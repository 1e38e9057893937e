//! Per-company URL discovery
//!
//! # Flow
//!
//! 1. Resolve the tenant's base URL hop by hop. A hop that leaves the trusted
//!    hosting domains aborts the company (`external_redirect_detected`).
//! 2. Solve a browser challenge if the site is known or detected to need one.
//! 3. Informational probes: advertised job count and RSS feed availability.
//! 4. Sitemap. With no job URLs in it the whole company falls back to HTML
//!    pagination (`html_only`).
//! 5. Otherwise sample the first listing pages. No unseen job id means the
//!    sitemap is taken as complete (`sitemap_only`); any unseen id triggers a
//!    full pagination merged behind the sitemap (`sitemap_plus_html`).

use crate::config::{ChallengeConfig, DiscoveryConfig};
use crate::crawler::challenge::{is_known_protected, ChallengeSolver, WAF_ACTION_HEADER};
use crate::crawler::fetcher::RateLimitedClient;
use crate::crawler::listing::{ListingCrawler, PaginationHalt};
use crate::crawler::sitemap::{count_feed_items, job_urls_from_sitemap};
use crate::extract::parse_total_job_count;
use crate::records::{CompanyContext, DiscoveredUrlSet, FailureRecord};
use crate::state::{DiscoveryOutcome, ErrorType, SourceMethod};
use crate::url::{is_trusted_url, job_count_url, rss_feed_urls, sitemap_url};
use crate::HarvestError;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Per-company discovery counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyStats {
    pub urls_found: usize,
    pub successes: usize,
    pub retries: u32,
    pub failures: usize,
    pub time_seconds: f64,
    pub urls_per_second: f64,
    pub strategy_used: Option<DiscoveryOutcome>,
    pub rss_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_total: Option<u32>,
}

/// Everything discovery produced for one company
#[derive(Debug, Clone)]
pub struct CompanyDiscovery {
    pub context: CompanyContext,
    pub outcome: DiscoveryOutcome,
    pub urls: DiscoveredUrlSet,
    pub stats: CompanyStats,
    pub failures: Vec<FailureRecord>,
}

/// Final location of a base URL after redirect resolution
#[derive(Debug, Clone)]
pub struct ResolvedBase {
    pub url: Url,
    pub status: u16,
    /// 202 carrying a WAF action header
    pub waf_challenge: bool,
}

/// Runs the discovery state machine for one company at a time
pub struct DiscoveryEngine {
    client: Arc<RateLimitedClient>,
    config: DiscoveryConfig,
    challenge: ChallengeConfig,
    solver: Box<dyn ChallengeSolver>,
}

impl DiscoveryEngine {
    pub fn new(
        client: Arc<RateLimitedClient>,
        config: DiscoveryConfig,
        challenge: ChallengeConfig,
        solver: Box<dyn ChallengeSolver>,
    ) -> Self {
        Self {
            client,
            config,
            challenge,
            solver,
        }
    }

    /// Discovers every job-detail URL of one company
    ///
    /// Never fails: problems become failure records and, for redirects off
    /// the trusted domains, the `external_redirect_detected` outcome.
    pub async fn discover(&self, company: &str, base_url: Url) -> CompanyDiscovery {
        let started = Instant::now();
        let mut failures = Vec::new();
        let mut stats = CompanyStats::default();

        tracing::info!("Starting discovery for {} at {}", company, base_url);

        let mut context = CompanyContext::new(company, base_url.clone());
        let mut waf_challenge = false;
        match self.resolve_base_url(&base_url).await {
            Ok(resolved) if resolved.status == 200 || resolved.status == 202 => {
                waf_challenge = resolved.waf_challenge;
                context = match context.with_resolved(resolved.url, &self.config.trusted_domains) {
                    Ok(context) => context,
                    Err(e) => return self.abort_external(company, &base_url, e, started),
                };
                if context.was_redirected() {
                    tracing::info!("{} resolved to {}", company, context.resolved_base_url());
                }
            }
            Ok(resolved) => {
                tracing::warn!(
                    "Base URL for {} answered HTTP {}, continuing with original URL",
                    company,
                    resolved.status
                );
            }
            Err(e @ HarvestError::ExternalRedirect { .. }) => {
                return self.abort_external(company, &base_url, e, started);
            }
            Err(e) => {
                tracing::warn!("Could not resolve {} ({}), continuing with original URL", company, e);
            }
        }
        let base = context.resolved_base_url().clone();

        if self.challenge.enabled && (waf_challenge || is_known_protected(company, &self.challenge)) {
            self.solve_challenge(company, &base).await;
        }

        stats.expected_total = self.expected_job_count(&base).await;
        if self.config.check_rss {
            stats.rss_items = self.probe_rss(&base).await;
            stats.rss_available = stats.rss_items.is_some();
        }

        let mut urls = DiscoveredUrlSet::new();
        let sitemap_urls = self.sitemap_job_urls(company, &base, &mut failures).await;
        urls.extend(sitemap_urls.iter().map(String::as_str), SourceMethod::Sitemap);
        tracing::info!("Sitemap for {}: {} job URLs", company, urls.len());

        let listing = ListingCrawler::new(&self.client, &self.config, company);
        let outcome = if urls.is_empty() {
            tracing::info!("No sitemap jobs for {}, using HTML pagination", company);
            let probe = listing.probe(&base).await;
            let result = listing.paginate(&base, probe).await;
            urls.extend(result.urls.iter().map(String::as_str), SourceMethod::Html);
            stats.retries += result.retries;
            log_halt(company, &result.halt);
            failures.extend(result.failures);
            DiscoveryOutcome::HtmlOnly
        } else {
            let probe = listing.probe(&base).await;
            let known: HashSet<String> = urls.ids().clone();
            let unseen = listing.sample(&base, probe, &known).await;

            if unseen.is_empty() {
                tracing::info!("No gaps detected for {}, sitemap appears complete", company);
                DiscoveryOutcome::SitemapOnly
            } else {
                tracing::info!(
                    "{} job(s) missing from sitemap for {}, running full pagination",
                    unseen.len(),
                    company
                );
                let result = listing.paginate(&base, probe).await;
                let mut html = DiscoveredUrlSet::new();
                html.extend(result.urls.iter().map(String::as_str), SourceMethod::Html);
                let added = urls.merge(html);
                tracing::info!("Pagination added {} job URLs for {}", added, company);
                stats.retries += result.retries;
                log_halt(company, &result.halt);
                failures.extend(result.failures);
                DiscoveryOutcome::SitemapPlusHtml
            }
        };

        if let Some(expected) = stats.expected_total {
            tracing::info!(
                "{}: found {} of {} advertised jobs",
                company,
                urls.len(),
                expected
            );
        }

        finish_stats(&mut stats, outcome, urls.len(), failures.len(), started);
        tracing::info!(
            "Discovery for {} finished: {} ({} URLs)",
            company,
            outcome,
            urls.len()
        );

        CompanyDiscovery {
            context,
            outcome,
            urls,
            stats,
            failures,
        }
    }

    fn abort_external(
        &self,
        company: &str,
        base_url: &Url,
        error: HarvestError,
        started: Instant,
    ) -> CompanyDiscovery {
        tracing::error!("Redirect failure for {}: {}", company, error);
        let failure = FailureRecord::new(
            base_url.as_str(),
            company,
            ErrorType::ExternalRedirect,
            error.to_string(),
            None,
        );
        let outcome = DiscoveryOutcome::ExternalRedirectDetected;
        let mut stats = CompanyStats::default();
        finish_stats(&mut stats, outcome, 0, 1, started);

        CompanyDiscovery {
            context: CompanyContext::new(company, base_url.clone()),
            outcome,
            urls: DiscoveredUrlSet::new(),
            stats,
            failures: vec![failure],
        }
    }

    /// Follows redirects one hop at a time
    ///
    /// Every Location is vetted against the trusted domains before it is
    /// requested, so an off-platform host is never contacted.
    ///
    /// # Returns
    ///
    /// * `Ok(ResolvedBase)` - The chain ended on a non-redirect response
    /// * `Err(HarvestError::ExternalRedirect)` - A hop left the trusted domains
    /// * `Err(HarvestError::RedirectLoop)` - A URL repeated in the chain
    /// * `Err(HarvestError::RedirectLimit)` - More than `max-redirects` hops
    pub async fn resolve_base_url(&self, base: &Url) -> Result<ResolvedBase, HarvestError> {
        let mut current = base.clone();
        let mut visited = HashSet::from([current.to_string()]);

        for _ in 0..=self.config.max_redirects {
            let page = self.client.fetch_once(&current).await?;

            if !page.is_redirect() {
                let waf_challenge = page.status == 202 && page.header(WAF_ACTION_HEADER).is_some();
                return Ok(ResolvedBase {
                    url: current,
                    status: page.status,
                    waf_challenge,
                });
            }

            let Some(next) = page.location() else {
                // redirect without a usable Location: treat as final
                return Ok(ResolvedBase {
                    url: current,
                    status: page.status,
                    waf_challenge: false,
                });
            };

            if !is_trusted_url(&next, &self.config.trusted_domains) {
                return Err(HarvestError::ExternalRedirect {
                    from: base.to_string(),
                    to: next.to_string(),
                });
            }
            if !visited.insert(next.to_string()) {
                return Err(HarvestError::RedirectLoop {
                    url: next.to_string(),
                });
            }

            tracing::debug!("Redirect {} -> {}", current, next);
            current = next;
        }

        Err(HarvestError::RedirectLimit {
            url: base.to_string(),
        })
    }

    async fn solve_challenge(&self, company: &str, base: &Url) {
        tracing::info!("{} is challenge-protected, solving with {}", company, self.solver.name());
        match self.solver.solve_challenge(base).await {
            Ok(cookies) if !cookies.is_empty() => self.client.add_cookies(&cookies, base),
            Ok(_) => tracing::debug!("No challenge cookies for {}", company),
            Err(e) => tracing::warn!("Challenge solving failed for {}: {}", company, e),
        }
    }

    /// Total postings advertised by the listing legend
    async fn expected_job_count(&self, base: &Url) -> Option<u32> {
        let url = job_count_url(base).ok()?;
        match self.client.get(&url).await {
            Ok(page) if page.is_accepted() => parse_total_job_count(&page.body),
            Ok(page) => {
                tracing::debug!("Job count probe answered HTTP {}", page.status);
                None
            }
            Err(e) => {
                tracing::debug!("Job count probe failed: {}", e);
                None
            }
        }
    }

    /// Item count of the first RSS feed that answers with XML
    async fn probe_rss(&self, base: &Url) -> Option<usize> {
        for feed in rss_feed_urls(base).ok()? {
            match self.client.get(&feed).await {
                Ok(page) if page.is_ok() && page.content_type().contains("xml") => {
                    let items = count_feed_items(page.body.as_bytes());
                    tracing::info!("RSS feed available at {}: {} items (not used)", feed, items);
                    return Some(items);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("RSS probe {} failed: {}", feed, e),
            }
        }
        None
    }

    async fn sitemap_job_urls(
        &self,
        company: &str,
        base: &Url,
        failures: &mut Vec<FailureRecord>,
    ) -> Vec<String> {
        let url = match sitemap_url(base) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("No sitemap URL for {}: {}", company, e);
                return Vec::new();
            }
        };

        match self.client.get(&url).await {
            Ok(page) if page.is_ok() => job_urls_from_sitemap(page.body.as_bytes()),
            Ok(page) => {
                tracing::info!("Sitemap for {} answered HTTP {}", company, page.status);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Sitemap fetch for {} failed: {}", company, e);
                let error_type = if matches!(e, HarvestError::Timeout { .. }) {
                    ErrorType::Timeout
                } else {
                    ErrorType::ConnectionError
                };
                failures.push(FailureRecord::new(url.as_str(), company, error_type, e.to_string(), None));
                Vec::new()
            }
        }
    }
}

fn log_halt(company: &str, halt: &PaginationHalt) {
    match halt {
        PaginationHalt::EmptyPage | PaginationHalt::NoNewJobs => {
            tracing::debug!("Pagination for {} complete: {:?}", company, halt)
        }
        PaginationHalt::RateLimited { offset, attempts } => tracing::warn!(
            "Pagination for {} abandoned at offset {} after {} rate-limited attempts",
            company,
            offset,
            attempts
        ),
        PaginationHalt::HttpStatus { offset, status } => tracing::warn!(
            "Pagination for {} stopped at offset {}: HTTP {}",
            company,
            offset,
            status
        ),
        PaginationHalt::Network { offset, message } => tracing::warn!(
            "Pagination for {} stopped at offset {}: {}",
            company,
            offset,
            message
        ),
    }
}

fn finish_stats(
    stats: &mut CompanyStats,
    outcome: DiscoveryOutcome,
    found: usize,
    failures: usize,
    started: Instant,
) {
    let elapsed = started.elapsed().as_secs_f64();
    stats.urls_found = found;
    stats.successes = found;
    stats.failures = failures;
    stats.time_seconds = elapsed;
    stats.urls_per_second = if elapsed > 0.0 { found as f64 / elapsed } else { 0.0 };
    stats.strategy_used = Some(outcome);
}
