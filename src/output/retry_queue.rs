//! Retry queues
//!
//! Failures of a run are split into three files:
//!
//! | Bucket | Rule | `next_retry_time` |
//! |--------|------|-------------------|
//! | `rate_limited` | error type rate_limited, or HTTP 406/429 | now + cooldown |
//! | `general` | retryable or retry_exhausted, retry_count below the limit | now + delay for the highest retry count |
//! | `permanent` | everything else | none |
//!
//! The general and rate-limited files are valid job-URL input and carry each
//! item's retry count forward.

use crate::config::RetryConfig;
use crate::output::{write_file, OutputError, OutputResult};
use crate::records::FailureRecord;
use crate::state::ErrorType;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which retry file a failure belongs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryQueueKind {
    General,
    RateLimited,
    Permanent,
}

impl RetryQueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::RateLimited => "rate_limited",
            Self::Permanent => "permanent",
        }
    }

    /// Picks the bucket for one failure
    pub fn for_failure(failure: &FailureRecord, max_attempts: u32) -> Self {
        if failure.error_type() == ErrorType::RateLimited
            || matches!(failure.http_status(), Some(406 | 429))
        {
            return Self::RateLimited;
        }
        let retryable =
            failure.is_retryable() || failure.error_type() == ErrorType::RetryExhausted;
        if retryable && failure.retry_count() < max_attempts {
            Self::General
        } else {
            Self::Permanent
        }
    }

    fn file_name(&self, stamp: &str) -> String {
        match self {
            Self::General => format!("retry_queue_general_{}.json", stamp),
            Self::RateLimited => format!("retry_queue_rate_limited_{}.json", stamp),
            Self::Permanent => format!("permanent_failures_{}.json", stamp),
        }
    }
}

/// Failures of one run split by retry bucket
#[derive(Debug, Clone, Default)]
pub struct RetryBuckets {
    pub general: Vec<FailureRecord>,
    pub rate_limited: Vec<FailureRecord>,
    pub permanent: Vec<FailureRecord>,
}

impl RetryBuckets {
    pub fn partition(failures: &[FailureRecord], max_attempts: u32) -> Self {
        let mut buckets = Self::default();
        for failure in failures {
            let bucket = match RetryQueueKind::for_failure(failure, max_attempts) {
                RetryQueueKind::General => &mut buckets.general,
                RetryQueueKind::RateLimited => &mut buckets.rate_limited,
                RetryQueueKind::Permanent => &mut buckets.permanent,
            };
            bucket.push(failure.clone());
        }
        buckets
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.rate_limited.is_empty() && self.permanent.is_empty()
    }
}

/// Delay before the next retry of an item that has been retried `retry_count` times
pub fn retry_delay_secs(retry_count: u32, config: &RetryConfig) -> u64 {
    let index = (retry_count as usize).min(config.retry_delays_secs.len().saturating_sub(1));
    config.retry_delays_secs.get(index).copied().unwrap_or(0)
}

/// Earliest time a queue of `kind` should be retried
pub fn next_retry_time(
    kind: RetryQueueKind,
    failures: &[FailureRecord],
    config: &RetryConfig,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let delay = match kind {
        RetryQueueKind::General => {
            let highest = failures.iter().map(|f| f.retry_count()).max().unwrap_or(0);
            retry_delay_secs(highest, config)
        }
        RetryQueueKind::RateLimited => config.rate_limit_cooldown_secs,
        RetryQueueKind::Permanent => return None,
    };
    Some(now + ChronoDuration::seconds(delay as i64))
}

#[derive(Debug, Serialize)]
struct RecommendedSettings {
    max_workers: u32,
    request_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct RetryInstructions {
    when_to_retry: String,
    recommended_settings: RecommendedSettings,
    command_example: String,
}

#[derive(Debug, Serialize)]
struct QueueMetadata {
    created_at: DateTime<Utc>,
    retry_type: RetryQueueKind,
    total_items: usize,
    next_retry_time: Option<DateTime<Utc>>,
    retry_instructions: RetryInstructions,
}

#[derive(Debug, Serialize)]
struct RetryMetadata {
    original_failure_time: DateTime<Utc>,
    retry_attempt: u32,
    max_retries: u32,
    recommended_delay: u64,
    retry_strategy: &'static str,
}

#[derive(Debug, Serialize)]
struct QueueItem<'a> {
    #[serde(flatten)]
    failure: &'a FailureRecord,
    retry_metadata: RetryMetadata,
}

#[derive(Debug, Serialize)]
struct RetryQueueDocument<'a> {
    metadata: QueueMetadata,
    failures: Vec<QueueItem<'a>>,
}

#[derive(Debug, Serialize)]
struct PermanentMetadata {
    created_at: DateTime<Utc>,
    retry_type: RetryQueueKind,
    total_items: usize,
    failure_summary: BTreeMap<ErrorType, usize>,
}

#[derive(Debug, Serialize)]
struct PermanentDocument<'a> {
    metadata: PermanentMetadata,
    failures: &'a [FailureRecord],
}

fn retry_queue_document(
    kind: RetryQueueKind,
    failures: &[FailureRecord],
    config: &RetryConfig,
    now: DateTime<Utc>,
    file_name: &str,
) -> Result<String, serde_json::Error> {
    let next = next_retry_time(kind, failures, config, now);
    let (settings, strategy) = match kind {
        RetryQueueKind::RateLimited => (
            RecommendedSettings {
                max_workers: 1,
                request_delay_ms: 2_000,
            },
            "cooldown",
        ),
        _ => (
            RecommendedSettings {
                max_workers: 3,
                request_delay_ms: 1_000,
            },
            "exponential_backoff",
        ),
    };

    let when_to_retry = match next {
        Some(at) => format!("After {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => "Not retryable".to_string(),
    };
    let command_example = format!(
        "avature-harvester extract {} --workers {}",
        file_name, settings.max_workers
    );

    let items = failures
        .iter()
        .map(|failure| QueueItem {
            failure,
            retry_metadata: RetryMetadata {
                original_failure_time: failure.timestamp(),
                retry_attempt: failure.retry_count() + 1,
                max_retries: config.max_retry_attempts,
                recommended_delay: match kind {
                    RetryQueueKind::RateLimited => config.rate_limit_cooldown_secs,
                    _ => retry_delay_secs(failure.retry_count(), config),
                },
                retry_strategy: strategy,
            },
        })
        .collect();

    serde_json::to_string_pretty(&RetryQueueDocument {
        metadata: QueueMetadata {
            created_at: now,
            retry_type: kind,
            total_items: failures.len(),
            next_retry_time: next,
            retry_instructions: RetryInstructions {
                when_to_retry,
                recommended_settings: settings,
                command_example,
            },
        },
        failures: items,
    })
}

fn permanent_document(
    failures: &[FailureRecord],
    now: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let mut failure_summary: BTreeMap<ErrorType, usize> = BTreeMap::new();
    for failure in failures {
        *failure_summary.entry(failure.error_type()).or_default() += 1;
    }
    serde_json::to_string_pretty(&PermanentDocument {
        metadata: PermanentMetadata {
            created_at: now,
            retry_type: RetryQueueKind::Permanent,
            total_items: failures.len(),
            failure_summary,
        },
        failures,
    })
}

/// Writes the non-empty retry buckets into `directory`
///
/// # Returns
///
/// The paths written, general first, then rate-limited, then permanent
pub fn write_retry_queues(
    directory: &Path,
    stamp: &str,
    buckets: &RetryBuckets,
    config: &RetryConfig,
    now: DateTime<Utc>,
) -> OutputResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (kind, failures) in [
        (RetryQueueKind::General, &buckets.general),
        (RetryQueueKind::RateLimited, &buckets.rate_limited),
    ] {
        if failures.is_empty() {
            continue;
        }
        let file_name = kind.file_name(stamp);
        let path = directory.join(&file_name);
        let document = retry_queue_document(kind, failures, config, now, &file_name)?;
        write_file(&path, &document)?;
        tracing::info!("Wrote {} {} retry items to {}", failures.len(), kind.as_str(), path.display());
        written.push(path);
    }

    if !buckets.permanent.is_empty() {
        let path = directory.join(RetryQueueKind::Permanent.file_name(stamp));
        write_file(&path, &permanent_document(&buckets.permanent, now)?)?;
        tracing::info!("Wrote {} permanent failures to {}", buckets.permanent.len(), path.display());
        written.push(path);
    }

    Ok(written)
}

/// Whether a retry queue can be run yet
#[derive(Debug, Clone, PartialEq)]
pub struct RetryReadiness {
    pub retry_type: RetryQueueKind,
    pub total_items: usize,
    pub next_retry_time: Option<DateTime<Utc>>,
    pub ready: bool,
    pub seconds_remaining: i64,
}

#[derive(Debug, Deserialize)]
struct QueueHeader {
    metadata: QueueHeaderMetadata,
}

#[derive(Debug, Deserialize)]
struct QueueHeaderMetadata {
    retry_type: RetryQueueKind,
    #[serde(default)]
    total_items: usize,
    #[serde(default)]
    next_retry_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct QueueBody {
    failures: Vec<FailureRecord>,
}

fn read_queue(path: &Path) -> OutputResult<String> {
    std::fs::read_to_string(path).map_err(|source| OutputError::File {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, e: serde_json::Error) -> OutputError {
    OutputError::InvalidQueue {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Reports whether the queue at `path` is due at `now`
///
/// Permanent-failure files are never ready.
pub fn check_retry_readiness(path: &Path, now: DateTime<Utc>) -> OutputResult<RetryReadiness> {
    let header: QueueHeader =
        serde_json::from_str(&read_queue(path)?).map_err(|e| invalid(path, e))?;
    let metadata = header.metadata;

    let (ready, seconds_remaining) = match metadata.next_retry_time {
        Some(at) if metadata.retry_type != RetryQueueKind::Permanent => {
            let remaining = (at - now).num_seconds();
            (remaining <= 0, remaining.max(0))
        }
        _ => (false, 0),
    };

    Ok(RetryReadiness {
        retry_type: metadata.retry_type,
        total_items: metadata.total_items,
        next_retry_time: metadata.next_retry_time,
        ready,
        seconds_remaining,
    })
}

/// Reads the failures back out of a retry queue or permanent-failure file
pub fn load_retry_queue(path: &Path) -> OutputResult<Vec<FailureRecord>> {
    let body: QueueBody = serde_json::from_str(&read_queue(path)?).map_err(|e| invalid(path, e))?;
    Ok(body.failures)
}
