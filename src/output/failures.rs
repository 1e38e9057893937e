//! Failure analysis and the failures document
//!
//! The failures document is an object with a `metadata` block and a
//! `failures` array, so it loads back as job-URL input like a retry queue.

use crate::records::FailureRecord;
use crate::state::ErrorType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Breakdown of a run's failures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FailureAnalysis {
    pub by_error_type: BTreeMap<ErrorType, usize>,
    pub by_http_status: BTreeMap<String, usize>,
    pub by_company: BTreeMap<String, usize>,
    pub retryable_count: usize,
    pub permanent_count: usize,
    pub common_patterns: Vec<String>,
}

impl FailureAnalysis {
    pub fn from_failures(failures: &[FailureRecord]) -> Self {
        let mut analysis = Self::default();

        for failure in failures {
            *analysis.by_error_type.entry(failure.error_type()).or_default() += 1;
            if let Some(status) = failure.http_status() {
                *analysis.by_http_status.entry(status.to_string()).or_default() += 1;
            }
            *analysis
                .by_company
                .entry(failure.company().to_string())
                .or_default() += 1;
            if failure.is_retryable() {
                analysis.retryable_count += 1;
            } else {
                analysis.permanent_count += 1;
            }
        }

        analysis.common_patterns = common_patterns(&analysis, failures.len());
        analysis
    }

    pub fn total(&self) -> usize {
        self.retryable_count + self.permanent_count
    }

    /// Error types ordered by descending count
    pub fn top_error_types(&self) -> Vec<(ErrorType, usize)> {
        let mut counts: Vec<_> = self.by_error_type.iter().map(|(t, c)| (*t, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

fn common_patterns(analysis: &FailureAnalysis, total: usize) -> Vec<String> {
    let mut patterns = Vec::new();
    if total == 0 {
        return patterns;
    }

    let share = |count: usize| count as f64 / total as f64;
    let count_of = |error_type: ErrorType| analysis.by_error_type.get(&error_type).copied().unwrap_or(0);

    if share(count_of(ErrorType::NotFound)) > 0.3 {
        patterns.push("High rate of 404 errors - many jobs may have been removed".to_string());
    }
    if share(count_of(ErrorType::AccessForbidden)) > 0.2 {
        patterns.push("High rate of 403 errors - possible access restrictions".to_string());
    }
    if share(count_of(ErrorType::Timeout)) > 0.1 {
        patterns.push("Frequent timeouts - consider fewer workers or longer timeouts".to_string());
    }
    patterns
}

#[derive(Debug, Serialize)]
struct FailuresMetadata<'a> {
    generated_at: DateTime<Utc>,
    total_failures: usize,
    analysis: &'a FailureAnalysis,
}

#[derive(Debug, Serialize)]
struct FailuresDocument<'a> {
    metadata: FailuresMetadata<'a>,
    failures: &'a [FailureRecord],
}

/// Renders the failures document
pub fn failures_document(
    failures: &[FailureRecord],
    analysis: &FailureAnalysis,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&FailuresDocument {
        metadata: FailuresMetadata {
            generated_at: Utc::now(),
            total_failures: failures.len(),
            analysis,
        },
        failures,
    })
}
