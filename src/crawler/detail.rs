//! Job-detail fetching with retry, backoff and failure classification
//!
//! # Retry Logic
//!
//! | Condition | Error type | Action |
//! |-----------|------------|--------|
//! | Timeout | timeout | Retry with backoff |
//! | Connection failure | connection_error | Retry with backoff |
//! | HTTP 404 | not_found | Immediate failure |
//! | HTTP 403 | access_forbidden | Immediate failure |
//! | HTTP 406 / 429 | rate_limited | Retry, throttle widened |
//! | HTTP 5xx | server_error | Retry with backoff |
//! | Other non-200 | http_error | Immediate failure |
//! | "Gone" phrase on page | position_filled / applications_closed / job_expired | Immediate failure |
//! | No title | missing_title | Immediate failure |
//!
//! A retryable failure on the last attempt becomes `retry_exhausted`.

use crate::config::{ExtractionConfig, HttpConfig};
use crate::crawler::fetcher::{FetchedPage, RateLimitedClient};
use crate::extract::FieldExtractor;
use crate::input::JobInput;
use crate::records::{FailureRecord, JobRecord};
use crate::state::ErrorType;
use crate::url::{extract_job_id, parse_http_url};
use crate::HarvestError;
use chrono::Utc;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;

/// Phrases marking a posting that no longer exists, checked case-insensitively
const CONTENT_STATE_SENTINELS: [(&str, ErrorType, &str); 3] = [
    (
        "position has been filled",
        ErrorType::PositionFilled,
        "Job page indicates position has been filled",
    ),
    (
        "no longer accepting applications",
        ErrorType::ApplicationsClosed,
        "Job page indicates applications are no longer accepted",
    ),
    (
        "this job posting has expired",
        ErrorType::JobExpired,
        "Job posting has expired",
    ),
];

/// Result of processing one job URL
#[derive(Debug, Clone)]
pub enum DetailOutcome {
    Success(JobRecord),
    Failure(FailureRecord),
}

impl DetailOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Backoff before retry `retry` (1-based) of a detail page
///
/// `min(base^retry, cap)` units; with recent anti-bot responses both the
/// delay and the cap are doubled.
pub fn detail_backoff(
    retry: u32,
    base: u32,
    unit: Duration,
    cap: Duration,
    recent_violations: bool,
) -> Duration {
    let units = base.saturating_pow(retry.min(16));
    let (delay, cap) = if recent_violations {
        (unit.saturating_mul(units).saturating_mul(2), cap.saturating_mul(2))
    } else {
        (unit.saturating_mul(units), cap)
    };
    delay.min(cap)
}

/// Fetches job-detail pages and turns them into records
pub struct DetailFetcher {
    client: Arc<RateLimitedClient>,
    extractor: Arc<dyn FieldExtractor>,
    http: HttpConfig,
    config: ExtractionConfig,
}

impl DetailFetcher {
    pub fn new(
        client: Arc<RateLimitedClient>,
        extractor: Arc<dyn FieldExtractor>,
        http: HttpConfig,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            client,
            extractor,
            http,
            config,
        }
    }

    pub fn client(&self) -> &RateLimitedClient {
        &self.client
    }

    /// Fetches one job URL, retrying transient failures
    ///
    /// Makes at most `max_retries + 1` attempts. Each attempt gets a longer
    /// timeout than the one before.
    pub async fn fetch(&self, job: &JobInput) -> DetailOutcome {
        let mut last_failure = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = detail_backoff(
                    attempt,
                    self.config.retry_base,
                    Duration::from_millis(self.config.retry_unit_ms),
                    Duration::from_millis(self.config.retry_cap_ms),
                    self.client.has_recent_violations(),
                );
                tracing::debug!("Retry {} for {} after {:?}", attempt, job.url, delay);
                tokio::time::sleep(delay).await;
            }

            let timeout = self.http.timeout_for_attempt(attempt);
            let failure = match self.attempt(job, timeout).await {
                Ok(record) => return DetailOutcome::Success(record),
                Err(failure) => failure.with_retry_count(job.retry_count + attempt),
            };

            if !failure.is_retryable() {
                return DetailOutcome::Failure(failure);
            }

            tracing::debug!(
                "Attempt {} for {} failed: {} ({})",
                attempt + 1,
                job.url,
                failure.error_type(),
                failure.error_message()
            );
            last_failure = Some(failure);
        }

        let attempts = self.config.max_retries + 1;
        let (message, status) = match &last_failure {
            Some(last) => (
                format!(
                    "All {} attempts failed. Last error: {}: {}",
                    attempts,
                    last.error_type(),
                    last.error_message()
                ),
                last.http_status(),
            ),
            None => (format!("Failed after {} attempts", attempts), None),
        };

        DetailOutcome::Failure(
            FailureRecord::new(&job.url, &job.company, ErrorType::RetryExhausted, message, status)
                .with_retry_count(job.retry_count + self.config.max_retries),
        )
    }

    /// One fetch-and-parse attempt
    async fn attempt(&self, job: &JobInput, timeout: Duration) -> Result<JobRecord, FailureRecord> {
        let fail = |error_type, message: String, status| {
            FailureRecord::new(&job.url, &job.company, error_type, message, status)
        };

        let url = parse_http_url(&job.url)
            .map_err(|e| fail(ErrorType::ParseError, format!("Invalid URL: {}", e), None))?;

        let page = match self.client.fetch(&url, timeout).await {
            Ok(page) => page,
            Err(HarvestError::Timeout { .. }) => {
                return Err(fail(
                    ErrorType::Timeout,
                    format!("Request timed out after {:?}", timeout),
                    None,
                ))
            }
            Err(HarvestError::Connect { message, .. }) => {
                return Err(fail(
                    ErrorType::ConnectionError,
                    format!("Failed to connect to server: {}", message),
                    None,
                ))
            }
            Err(e) => return Err(fail(ErrorType::ParseError, format!("Unexpected error: {}", e), None)),
        };

        if !page.is_ok() {
            return Err(status_failure(job, &page));
        }

        parse_detail_page(self.extractor.as_ref(), job, &page)
    }
}

fn status_failure(job: &JobInput, page: &FetchedPage) -> FailureRecord {
    let error_type = ErrorType::from_status(page.status);
    let message = match page.status {
        404 => "Job page returned 404 (likely removed)".to_string(),
        403 => "Job page returned 403 (access denied)".to_string(),
        406 => "Rate limited (406) - not acceptable".to_string(),
        429 => "Rate limited (429) - too many requests".to_string(),
        s if s >= 500 => format!("Server error {}", s),
        s => format!("HTTP status {}", s),
    };
    FailureRecord::new(&job.url, &job.company, error_type, message, Some(page.status))
}

/// Turns a 200 response into a record, or a content-state/extraction failure
pub fn parse_detail_page(
    extractor: &dyn FieldExtractor,
    job: &JobInput,
    page: &FetchedPage,
) -> Result<JobRecord, FailureRecord> {
    let lowered = page.body.to_lowercase();
    if let Some((_, error_type, message)) = CONTENT_STATE_SENTINELS
        .iter()
        .find(|(phrase, _, _)| lowered.contains(phrase))
    {
        return Err(FailureRecord::new(
            &job.url,
            &job.company,
            *error_type,
            *message,
            Some(page.status),
        ));
    }

    let document = Html::parse_document(&page.body);
    let Some(title) = extractor.extract_title(&document) else {
        return Err(FailureRecord::new(
            &job.url,
            &job.company,
            ErrorType::MissingTitle,
            "Could not extract job title from page",
            Some(page.status),
        ));
    };

    let metadata = extractor.extract_metadata(&document);
    Ok(JobRecord {
        job_id: extract_job_id(&job.url).unwrap_or_default(),
        title,
        url: job.url.clone(),
        location: extractor.extract_location(&document),
        company: job.company.clone(),
        source_method: job.source_method,
        description: extractor.extract_description(&document),
        date_posted: metadata.date_posted,
        department: metadata.department,
        employment_type: metadata.employment_type,
        application_url: extractor.extract_application_url(&document, &page.final_url),
        scraped_at: Utc::now(),
    })
}
