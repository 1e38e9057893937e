//! Paginated HTML listing: page-size probing, gap sampling and full pagination
//!
//! Pagination is strictly sequential: whether the next page is worth fetching
//! depends on what the previous one yielded.

use crate::config::DiscoveryConfig;
use crate::crawler::fetcher::RateLimitedClient;
use crate::extract::{count_result_containers, parse_listing_page};
use crate::records::FailureRecord;
use crate::state::ErrorType;
use crate::url::{extract_job_id, listing_url, paginated_listing_url, ListingParams};
use crate::HarvestError;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Delay before retry number `attempt` (1-based) of a rate-limited listing page
///
/// `min(base * 2^(attempt-1), cap)`
pub fn listing_backoff(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}

/// What the unpaginated listing revealed about the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingProbe {
    pub page_size: u32,
    pub params: ListingParams,
}

/// Why full pagination stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationHalt {
    /// A page had no result containers
    EmptyPage,
    /// A page repeated only job ids from earlier pages
    NoNewJobs,
    /// 406/429 persisted through every retry of one page
    RateLimited { offset: u32, attempts: u32 },
    /// A page answered with an unexpected status
    HttpStatus { offset: u32, status: u16 },
    /// A page could not be fetched at all
    Network { offset: u32, message: String },
}

impl PaginationHalt {
    /// Returns true if the listing ran to its natural end
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::EmptyPage | Self::NoNewJobs)
    }
}

/// Outcome of a full pagination run
#[derive(Debug, Clone)]
pub struct PaginationResult {
    /// Newly found job URLs, in page order
    pub urls: Vec<String>,
    /// Page requests issued, retries included
    pub requests: u32,
    /// Retries caused by 406/429
    pub retries: u32,
    pub halt: PaginationHalt,
    pub failures: Vec<FailureRecord>,
}

/// Walks one company's listing pages
pub struct ListingCrawler<'a> {
    client: &'a RateLimitedClient,
    config: &'a DiscoveryConfig,
    company: &'a str,
}

impl<'a> ListingCrawler<'a> {
    pub fn new(client: &'a RateLimitedClient, config: &'a DiscoveryConfig, company: &'a str) -> Self {
        Self {
            client,
            config,
            company,
        }
    }

    /// Fetches the unpaginated listing to learn page size and parameter names
    ///
    /// Falls back to the configured default page size and the `job*`
    /// parameters if the listing cannot be read or shows no results.
    pub async fn probe(&self, base: &Url) -> ListingProbe {
        let default = ListingProbe {
            page_size: self.config.default_page_size,
            params: ListingParams::default(),
        };

        let page = match listing_url(base) {
            Ok(url) => self.client.get(&url).await,
            Err(e) => return self.log_probe_fallback(default, &e.to_string()),
        };

        match page {
            Ok(page) if page.is_accepted() => {
                let counted = count_result_containers(&page.body) as u32;
                let probe = ListingProbe {
                    page_size: if counted == 0 { default.page_size } else { counted },
                    params: ListingParams::detect(&page.body),
                };
                tracing::debug!(
                    "Listing probe for {}: page size {}, params {}/{}",
                    self.company,
                    probe.page_size,
                    probe.params.page_size_key,
                    probe.params.offset_key
                );
                probe
            }
            Ok(page) => self.log_probe_fallback(default, &format!("HTTP {}", page.status)),
            Err(e) => self.log_probe_fallback(default, &e.to_string()),
        }
    }

    fn log_probe_fallback(&self, default: ListingProbe, reason: &str) -> ListingProbe {
        tracing::debug!(
            "Listing probe for {} failed ({}), using page size {}",
            self.company,
            reason,
            default.page_size
        );
        default
    }

    /// Samples the first listing pages for job ids missing from `known`
    ///
    /// Sampling is best-effort: a 429, any status other than 200/202, an
    /// empty page or a network error ends it early. Only a bounded prefix of
    /// the listing is examined, so gaps further in go unnoticed.
    ///
    /// # Returns
    ///
    /// Job URLs whose ids are not in `known`, in page order
    pub async fn sample(&self, base: &Url, probe: ListingProbe, known: &HashSet<String>) -> Vec<String> {
        let mut unseen = Vec::new();
        let mut unseen_ids = HashSet::new();

        for page_index in 0..self.config.sample_pages {
            if page_index > 0 {
                pause(self.config.sample_delay_ms).await;
            }

            let offset = page_index * probe.page_size;
            let Ok(url) = paginated_listing_url(base, probe.params, offset, probe.page_size) else {
                break;
            };

            let page = match self.client.get(&url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::debug!("Sample page {} for {} failed: {}", page_index + 1, self.company, e);
                    break;
                }
            };

            if page.status == 429 || !page.is_accepted() {
                tracing::debug!(
                    "HTTP {} during sample of page {} for {}",
                    page.status,
                    page_index + 1,
                    self.company
                );
                break;
            }

            let listing = parse_listing_page(&page.body, &page.final_url);
            if listing.is_empty() {
                break;
            }

            for job_url in listing.job_urls {
                if let Some(id) = extract_job_id(&job_url) {
                    if !known.contains(&id) && unseen_ids.insert(id) {
                        unseen.push(job_url);
                    }
                }
            }
        }

        tracing::info!(
            "Sampled {} listing pages for {}: {} job(s) not in sitemap",
            self.config.sample_pages,
            self.company,
            unseen.len()
        );
        unseen
    }

    /// Paginates the whole listing
    ///
    /// Stops on an empty page or on a page that adds no job id not already
    /// seen earlier in this run; a short page is not a stop signal. A 406/429
    /// retries the same page with [`listing_backoff`]. Once retries run out
    /// pagination halts without error and whatever was collected is kept.
    pub async fn paginate(
        &self,
        base: &Url,
        probe: ListingProbe,
    ) -> PaginationResult {
        let mut seen = HashSet::new();
        let mut result = PaginationResult {
            urls: Vec::new(),
            requests: 0,
            retries: 0,
            halt: PaginationHalt::EmptyPage,
            failures: Vec::new(),
        };

        let mut offset = 0;
        let mut page_number = 1;
        loop {
            let url = match paginated_listing_url(base, probe.params, offset, probe.page_size) {
                Ok(url) => url,
                Err(e) => {
                    result.halt = PaginationHalt::Network {
                        offset,
                        message: e.to_string(),
                    };
                    break;
                }
            };

            let (html, page_url) = match self.fetch_page(&url, offset, page_number, &mut result).await {
                Ok(fetched) => fetched,
                Err(halt) => {
                    result.halt = halt;
                    break;
                }
            };

            let listing = parse_listing_page(&html, &page_url);
            if listing.is_empty() {
                tracing::info!("No more jobs on page {} for {}", page_number, self.company);
                result.halt = PaginationHalt::EmptyPage;
                break;
            }

            let mut new_count = 0;
            for job_url in listing.job_urls {
                if let Some(id) = extract_job_id(&job_url) {
                    if seen.insert(id) {
                        result.urls.push(job_url);
                        new_count += 1;
                    }
                }
            }

            tracing::info!(
                "Page {} for {}: {} containers, {} new job URLs",
                page_number,
                self.company,
                listing.container_count,
                new_count
            );

            if new_count == 0 {
                result.halt = PaginationHalt::NoNewJobs;
                break;
            }

            offset += probe.page_size;
            page_number += 1;
            pause(self.config.page_delay_ms).await;
        }

        result
    }

    /// Fetches one listing page, retrying it on 406/429
    ///
    /// Returns the body and final URL, or the reason pagination must stop.
    async fn fetch_page(
        &self,
        url: &Url,
        offset: u32,
        page_number: u32,
        result: &mut PaginationResult,
    ) -> Result<(String, Url), PaginationHalt> {
        let base_delay = Duration::from_millis(self.config.listing_backoff_base_ms);
        let cap = Duration::from_millis(self.config.listing_backoff_cap_ms);
        let mut attempt = 0;

        loop {
            result.requests += 1;
            let page = match self.client.get(url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Listing page {} for {} failed: {}", page_number, self.company, e);
                    let error_type = match e {
                        HarvestError::Timeout { .. } => ErrorType::Timeout,
                        _ => ErrorType::ConnectionError,
                    };
                    result.failures.push(FailureRecord::new(
                        url.as_str(),
                        self.company,
                        error_type,
                        e.to_string(),
                        None,
                    ));
                    return Err(PaginationHalt::Network {
                        offset,
                        message: e.to_string(),
                    });
                }
            };

            if page.is_violation() {
                attempt += 1;
                if attempt > self.config.max_listing_retries {
                    tracing::error!(
                        "Retries exhausted for listing page {} of {}, halting pagination",
                        page_number,
                        self.company
                    );
                    result.failures.push(FailureRecord::new(
                        url.as_str(),
                        self.company,
                        ErrorType::RateLimited,
                        format!("HTTP {} after {} retries", page.status, attempt - 1),
                        Some(page.status),
                    ));
                    return Err(PaginationHalt::RateLimited {
                        offset,
                        attempts: attempt,
                    });
                }

                let delay = listing_backoff(attempt, base_delay, cap);
                tracing::warn!(
                    "HTTP {} on listing page {} for {} (attempt {}), waiting {:?}",
                    page.status,
                    page_number,
                    self.company,
                    attempt,
                    delay
                );
                result.retries += 1;
                tokio::time::sleep(delay).await;
                continue;
            }

            if !page.is_accepted() {
                tracing::warn!("HTTP {} on listing page {} for {}", page.status, page_number, self.company);
                result.failures.push(FailureRecord::new(
                    url.as_str(),
                    self.company,
                    ErrorType::HttpError,
                    format!("HTTP {}", page.status),
                    Some(page.status),
                ));
                return Err(PaginationHalt::HttpStatus {
                    offset,
                    status: page.status,
                });
            }

            return Ok((page.body, page.final_url));
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
