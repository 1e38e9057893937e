//! Run statistics
//!
//! [`RunStats`] is fed every record as it is written and renders the
//! statistics document at the end of the run.

use crate::records::{FailureRecord, JobRecord};
use crate::state::ErrorType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Fields whose extraction rate is tracked
pub const OPTIONAL_FIELDS: [&str; 6] = [
    "location",
    "description",
    "date_posted",
    "department",
    "employment_type",
    "application_url",
];

/// Per-company success and failure counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCounts {
    pub successful: usize,
    pub failed: usize,
}

/// Headline numbers of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate_percent: f64,
    pub throughput_per_second: f64,
    pub duration_seconds: f64,
}

/// Extraction rate of one optional field over the successful jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub extracted: usize,
    pub missing: usize,
    pub extraction_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub rate_limit_incidents: usize,
    pub average_time_per_url_seconds: f64,
}

/// The statistics document written at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub generated_at: DateTime<Utc>,
    pub summary: SummaryStats,
    pub field_analysis: BTreeMap<String, FieldStats>,
    pub failure_breakdown: BTreeMap<ErrorType, usize>,
    pub company_breakdown: BTreeMap<String, CompanyCounts>,
    pub performance_metrics: PerformanceMetrics,
}

/// Running counters for one extraction run
#[derive(Debug, Clone)]
pub struct RunStats {
    started: Instant,
    successful: usize,
    failed: usize,
    field_counts: BTreeMap<&'static str, usize>,
    failures_by_type: BTreeMap<ErrorType, usize>,
    companies: BTreeMap<String, CompanyCounts>,
    rate_limit_incidents: usize,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            successful: 0,
            failed: 0,
            field_counts: BTreeMap::new(),
            failures_by_type: BTreeMap::new(),
            companies: BTreeMap::new(),
            rate_limit_incidents: 0,
        }
    }

    pub fn record_job(&mut self, job: &JobRecord) {
        self.successful += 1;
        self.companies.entry(job.company.clone()).or_default().successful += 1;
        for field in job.fields_extracted() {
            if OPTIONAL_FIELDS.contains(&field) {
                *self.field_counts.entry(field).or_default() += 1;
            }
        }
    }

    pub fn record_failure(&mut self, failure: &FailureRecord) {
        self.failed += 1;
        self.companies
            .entry(failure.company().to_string())
            .or_default()
            .failed += 1;
        *self.failures_by_type.entry(failure.error_type()).or_default() += 1;
        if failure.error_type() == ErrorType::RateLimited
            || matches!(failure.http_status(), Some(406 | 429))
        {
            self.rate_limit_incidents += 1;
        }
    }

    pub fn processed(&self) -> usize {
        self.successful + self.failed
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Renders the statistics document using the time elapsed so far
    pub fn report(&self) -> StatsReport {
        self.report_for(self.started.elapsed())
    }

    /// Renders the statistics document for a given run duration
    pub fn report_for(&self, duration: Duration) -> StatsReport {
        let total = self.processed();
        let secs = duration.as_secs_f64();

        let field_analysis = OPTIONAL_FIELDS
            .iter()
            .map(|&field| {
                let extracted = self.field_counts.get(field).copied().unwrap_or(0);
                let stats = FieldStats {
                    extracted,
                    missing: self.successful - extracted,
                    extraction_rate: percent(extracted, self.successful),
                };
                (field.to_string(), stats)
            })
            .collect();

        StatsReport {
            generated_at: Utc::now(),
            summary: SummaryStats {
                total_processed: total,
                successful: self.successful,
                failed: self.failed,
                success_rate_percent: percent(self.successful, total),
                throughput_per_second: if secs > 0.0 { total as f64 / secs } else { 0.0 },
                duration_seconds: secs,
            },
            field_analysis,
            failure_breakdown: self.failures_by_type.clone(),
            company_breakdown: self.companies.clone(),
            performance_metrics: PerformanceMetrics {
                rate_limit_incidents: self.rate_limit_incidents,
                average_time_per_url_seconds: if total > 0 { secs / total as f64 } else { 0.0 },
            },
        }
    }
}

/// `part / whole` as a percentage rounded to two decimals; 0 for an empty whole
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LOCATION_NOT_SPECIFIED;
    use crate::state::SourceMethod;

    fn job(company: &str, location: &str, description: Option<&str>) -> JobRecord {
        JobRecord {
            job_id: "1".to_string(),
            title: "Engineer".to_string(),
            url: "https://acme.avature.net/careers/JobDetail/Engineer/1".to_string(),
            location: location.to_string(),
            company: company.to_string(),
            source_method: SourceMethod::Sitemap,
            description: description.map(str::to_string),
            date_posted: None,
            department: None,
            employment_type: None,
            application_url: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_field_analysis_counts_placeholder_location_as_missing() {
        let mut stats = RunStats::new();
        stats.record_job(&job("acme", "Austin, TX", Some("text")));
        stats.record_job(&job("acme", LOCATION_NOT_SPECIFIED, None));

        let report = stats.report_for(Duration::from_secs(2));
        let location = report.field_analysis["location"];
        assert_eq!(location.extracted, 1);
        assert_eq!(location.missing, 1);
        assert_eq!(location.extraction_rate, 50.0);
        assert_eq!(report.field_analysis["department"].extracted, 0);
    }

    #[test]
    fn test_summary_and_breakdowns() {
        let mut stats = RunStats::new();
        stats.record_job(&job("acme", "Austin, TX", None));
        stats.record_failure(&FailureRecord::new(
            "https://globex.avature.net/careers/JobDetail/X/2",
            "globex",
            ErrorType::RateLimited,
            "Rate limited (429) - too many requests",
            Some(429),
        ));
        stats.record_failure(&FailureRecord::new(
            "https://globex.avature.net/careers/JobDetail/X/3",
            "globex",
            ErrorType::NotFound,
            "gone",
            Some(404),
        ));

        let report = stats.report_for(Duration::from_secs(3));
        assert_eq!(report.summary.total_processed, 3);
        assert_eq!(report.summary.success_rate_percent, 33.33);
        assert!((report.summary.throughput_per_second - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.failure_breakdown[&ErrorType::NotFound], 1);
        assert_eq!(report.company_breakdown["globex"].failed, 2);
        assert_eq!(report.performance_metrics.rate_limit_incidents, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failure_breakdown"]["rate_limited"], 1);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
