//! Plain-text run report
//!
//! Human-readable companion to the statistics and failures documents:
//! totals, rates, the most common failure types and recommendations.

use crate::output::failures::FailureAnalysis;
use crate::output::stats::StatsReport;
use crate::state::ErrorType;

/// Failure types listed in the report
const TOP_FAILURE_TYPES: usize = 5;

/// Formats the run report
///
/// # Arguments
///
/// * `stats` - Final statistics of the run
/// * `analysis` - Breakdown of the run's failures
///
/// # Returns
///
/// The report text
pub fn format_report(stats: &StatsReport, analysis: &FailureAnalysis) -> String {
    let summary = &stats.summary;
    let mut out = String::new();

    out.push_str("AVATURE HARVEST REPORT\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!(
        "Generated: {}\n\n",
        stats.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("Summary\n-------\n");
    out.push_str(&format!("  Total processed:  {}\n", summary.total_processed));
    out.push_str(&format!("  Successful:       {}\n", summary.successful));
    out.push_str(&format!("  Failed:           {}\n", summary.failed));
    out.push_str(&format!("  Success rate:     {:.1}%\n", summary.success_rate_percent));
    out.push_str(&format!(
        "  Duration:         {:.1}s ({:.2} URLs/sec)\n\n",
        summary.duration_seconds, summary.throughput_per_second
    ));

    if summary.successful > 0 {
        out.push_str("Field extraction\n----------------\n");
        for (field, field_stats) in &stats.field_analysis {
            out.push_str(&format!(
                "  {:<16} {:>6.1}% ({} / {})\n",
                field,
                field_stats.extraction_rate,
                field_stats.extracted,
                summary.successful
            ));
        }
        out.push('\n');
    }

    if analysis.total() > 0 {
        out.push_str("Top failure types\n-----------------\n");
        for (error_type, count) in analysis.top_error_types().into_iter().take(TOP_FAILURE_TYPES) {
            out.push_str(&format!("  {:<20} {}\n", error_type.as_str(), count));
        }
        out.push_str(&format!(
            "  Retryable: {}  Permanent: {}\n\n",
            analysis.retryable_count, analysis.permanent_count
        ));
    }

    let recommendations = recommendations(stats, analysis);
    if !recommendations.is_empty() {
        out.push_str("Recommendations\n---------------\n");
        for line in recommendations {
            out.push_str(&format!("  - {}\n", line));
        }
    }

    out
}

fn recommendations(stats: &StatsReport, analysis: &FailureAnalysis) -> Vec<String> {
    let mut lines = analysis.common_patterns.clone();

    if stats.performance_metrics.rate_limit_incidents > 0 {
        lines.push(format!(
            "{} rate-limit responses seen; rerun the rate-limited queue with a single worker",
            stats.performance_metrics.rate_limit_incidents
        ));
    }
    if analysis.retryable_count > 0 {
        lines.push(format!(
            "{} failures are retryable; check the general retry queue before rerunning",
            analysis.retryable_count
        ));
    }
    if analysis
        .by_error_type
        .get(&ErrorType::MissingTitle)
        .is_some_and(|&count| count > 0)
    {
        lines.push("Some pages had no recognizable title; the page layout may have changed".to_string());
    }
    if stats.summary.total_processed > 0 && stats.summary.success_rate_percent < 50.0 {
        lines.push("Success rate is below 50%; review the failures file".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::stats::RunStats;
    use crate::records::FailureRecord;
    use std::time::Duration;

    #[test]
    fn test_report_sections() {
        let mut stats = RunStats::new();
        let failures = vec![
            FailureRecord::new(
                "https://acme.avature.net/careers/JobDetail/A/1",
                "acme",
                ErrorType::RateLimited,
                "Rate limited (406) - not acceptable",
                Some(406),
            ),
            FailureRecord::new(
                "https://acme.avature.net/careers/JobDetail/A/2",
                "acme",
                ErrorType::MissingTitle,
                "Could not extract job title from page",
                Some(200),
            ),
        ];
        for failure in &failures {
            stats.record_failure(failure);
        }
        let analysis = FailureAnalysis::from_failures(&failures);
        let report = format_report(&stats.report_for(Duration::from_secs(1)), &analysis);

        assert!(report.contains("Total processed:  2"));
        assert!(report.contains("rate_limited"));
        assert!(report.contains("missing_title"));
        assert!(report.contains("single worker"));
        assert!(report.contains("below 50%"));
        assert!(!report.contains("Field extraction"));
    }

    #[test]
    fn test_clean_run_has_no_recommendations() {
        let report = format_report(
            &RunStats::new().report_for(Duration::from_secs(1)),
            &FailureAnalysis::default(),
        );
        assert!(!report.contains("Recommendations"));
    }
}
