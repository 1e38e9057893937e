//! Output module for run artifacts
//!
//! This module handles:
//! - Streaming job records to JSONL through an [`OutputSink`]
//! - Failure analysis, run statistics and the plain-text report
//! - Retry queues that can be fed back in as input
//! - Discovery batch artifacts (per-company URL lists, combined JSONL, summary)
//! - Job-board finder lists and summary

mod boards;
mod discovery;
pub mod failures;
mod report;
pub mod retry_queue;
mod sink;
pub mod stats;
mod traits;

pub use boards::{board_summary, write_board_outputs};
pub use discovery::{combined_urls_jsonl, discovery_summary, write_company_urls, write_discovery_outputs};
pub use failures::{failures_document, FailureAnalysis};
pub use report::format_report;
pub use retry_queue::{
    check_retry_readiness, load_retry_queue, next_retry_time, write_retry_queues, RetryBuckets,
    RetryQueueKind, RetryReadiness,
};
pub use sink::{job_line, FileSink, MemorySink, EXTRACTOR_VERSION};
pub use stats::{RunStats, StatsReport};
pub use traits::{OutputError, OutputResult, OutputSink, RunArtifacts};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Timestamp used in artifact file names
pub fn run_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`
///
/// # Examples
///
/// ```
/// use avature_harvester::output::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Acme Corp/EU"), "Acme_Corp_EU");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Writes a whole file, attaching the path to any error
pub(crate) fn write_file(path: &Path, contents: &str) -> OutputResult<()> {
    std::fs::write(path, contents).map_err(|source| OutputError::File {
        path: path.to_path_buf(),
        source,
    })
}
