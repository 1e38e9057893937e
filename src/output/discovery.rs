//! Discovery run artifacts
//!
//! - One `{company}_urls.txt` per company (one URL per line)
//! - A combined JSONL of every discovered URL with its company and source
//! - A JSON run summary with per-company outcome and counters

use crate::crawler::{CompanyDiscovery, CompanyStats};
use crate::output::{sanitize_filename, write_file, OutputResult};
use crate::records::DiscoveredUrlSet;
use crate::state::{DiscoveryOutcome, SourceMethod};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct DiscoveredLine<'a> {
    url: &'a str,
    job_id: &'a str,
    company: &'a str,
    source_method: SourceMethod,
}

#[derive(Debug, Serialize)]
struct CompanySummary<'a> {
    outcome: DiscoveryOutcome,
    base_url: &'a str,
    resolved_base_url: &'a str,
    urls_file: Option<String>,
    #[serde(flatten)]
    stats: &'a CompanyStats,
}

#[derive(Debug, Serialize)]
struct DiscoverySummary<'a> {
    generated_at: DateTime<Utc>,
    total_companies: usize,
    total_urls: usize,
    total_failures: usize,
    outcomes: BTreeMap<&'static str, usize>,
    companies: BTreeMap<&'a str, CompanySummary<'a>>,
}

/// Writes one company's URLs, one per line
pub fn write_company_urls(directory: &Path, company: &str, urls: &DiscoveredUrlSet) -> OutputResult<PathBuf> {
    let path = directory.join(format!("{}_urls.txt", sanitize_filename(company)));
    let mut content = String::new();
    for entry in urls.iter() {
        content.push_str(&entry.url);
        content.push('\n');
    }
    write_file(&path, &content)?;
    Ok(path)
}

/// Renders every discovered URL of the run as JSONL
pub fn combined_urls_jsonl(results: &[CompanyDiscovery]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for result in results {
        for entry in result.urls.iter() {
            out.push_str(&serde_json::to_string(&DiscoveredLine {
                url: &entry.url,
                job_id: &entry.job_id,
                company: &result.context.company_name,
                source_method: entry.source,
            })?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Renders the run summary document
pub fn discovery_summary(
    results: &[CompanyDiscovery],
    url_files: &BTreeMap<String, PathBuf>,
) -> Result<String, serde_json::Error> {
    let mut outcomes = BTreeMap::new();
    let mut companies = BTreeMap::new();

    for result in results {
        *outcomes.entry(result.outcome.as_str()).or_insert(0usize) += 1;
        let name = result.context.company_name.as_str();
        companies.insert(
            name,
            CompanySummary {
                outcome: result.outcome,
                base_url: result.context.base_url().as_str(),
                resolved_base_url: result.context.resolved_base_url().as_str(),
                urls_file: url_files.get(name).map(|path| path.display().to_string()),
                stats: &result.stats,
            },
        );
    }

    serde_json::to_string_pretty(&DiscoverySummary {
        generated_at: Utc::now(),
        total_companies: results.len(),
        total_urls: results.iter().map(|r| r.urls.len()).sum(),
        total_failures: results.iter().map(|r| r.failures.len()).sum(),
        outcomes,
        companies,
    })
}

/// Writes all discovery artifacts for a batch
///
/// # Returns
///
/// The paths written: per-company URL files, then the combined JSONL, then
/// the summary
pub fn write_discovery_outputs(
    directory: &Path,
    stamp: &str,
    results: &[CompanyDiscovery],
) -> OutputResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut url_files = BTreeMap::new();

    for result in results.iter().filter(|r| !r.urls.is_empty()) {
        let path = write_company_urls(directory, &result.context.company_name, &result.urls)?;
        url_files.insert(result.context.company_name.clone(), path.clone());
        written.push(path);
    }

    let combined = directory.join(format!("all_discovered_urls_{}.jsonl", stamp));
    write_file(&combined, &combined_urls_jsonl(results)?)?;
    written.push(combined);

    let summary = directory.join(format!("discovery_summary_{}.json", stamp));
    write_file(&summary, &discovery_summary(results, &url_files)?)?;
    written.push(summary);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CompanyContext;
    use tempfile::TempDir;
    use url::Url;

    fn discovery(company: &str, ids: &[u32], outcome: DiscoveryOutcome) -> CompanyDiscovery {
        let base = Url::parse(&format!("https://{company}.avature.net/careers")).unwrap();
        let mut urls = DiscoveredUrlSet::new();
        for id in ids {
            urls.insert(
                &format!("https://{company}.avature.net/careers/JobDetail/Role/{id}"),
                SourceMethod::Sitemap,
            );
        }
        CompanyDiscovery {
            context: CompanyContext::new(company, base),
            outcome,
            urls,
            stats: CompanyStats::default(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_write_discovery_outputs() {
        let dir = TempDir::new().unwrap();
        let results = vec![
            discovery("acme", &[1, 2], DiscoveryOutcome::SitemapOnly),
            discovery("globex", &[], DiscoveryOutcome::ExternalRedirectDetected),
        ];
        let written = write_discovery_outputs(dir.path(), "20240501_120000", &results).unwrap();
        assert_eq!(written.len(), 3);

        let urls = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(urls.lines().count(), 2);
        assert!(written[0].ends_with("acme_urls.txt"));

        let combined = std::fs::read_to_string(&written[1]).unwrap();
        let first: serde_json::Value = serde_json::from_str(combined.lines().next().unwrap()).unwrap();
        assert_eq!(first["company"], "acme");
        assert_eq!(first["source_method"], "sitemap");

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[2]).unwrap()).unwrap();
        assert_eq!(summary["total_urls"], 2);
        assert_eq!(summary["outcomes"]["external_redirect_detected"], 1);
        assert!(summary["companies"]["globex"]["urls_file"].is_null());
    }
}
