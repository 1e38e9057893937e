//! Job-board finder artifacts
//!
//! - `success_urls_<stamp>.txt`: usable base URLs, one per line (a tenant list)
//! - `failed_tenants_<stamp>.txt`: tenants with no usable candidate
//! - `redirected_tenants_<stamp>.txt`: `tenant -> target` lines
//! - `board_finder_<stamp>.json`: per-tenant results with a status count

use crate::crawler::{BoardMatch, BoardStatus};
use crate::output::{write_file, OutputResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct BoardSummary<'a> {
    generated_at: DateTime<Utc>,
    total_tenants: usize,
    total_jobs: u64,
    statuses: BTreeMap<&'static str, usize>,
    tenants: &'a [BoardMatch],
}

/// Renders the finder summary document
pub fn board_summary(results: &[BoardMatch]) -> Result<String, serde_json::Error> {
    let mut statuses = BTreeMap::new();
    for result in results {
        *statuses.entry(result.status.as_str()).or_insert(0usize) += 1;
    }
    serde_json::to_string_pretty(&BoardSummary {
        generated_at: Utc::now(),
        total_tenants: results.len(),
        total_jobs: results.iter().map(|r| u64::from(r.job_count)).sum(),
        statuses,
        tenants: results,
    })
}

/// Writes all finder artifacts for a batch
///
/// # Returns
///
/// The paths written: success list, failed list, redirected list, summary
pub fn write_board_outputs(directory: &Path, stamp: &str, results: &[BoardMatch]) -> OutputResult<Vec<PathBuf>> {
    let mut success = String::new();
    let mut failed = String::new();
    let mut redirected = String::new();

    for result in results {
        match (result.status, &result.url) {
            (status, Some(url)) if status.is_usable() => {
                success.push_str(url.as_str());
                success.push('\n');
            }
            (BoardStatus::Redirected, _) => {
                let target = result
                    .redirected_to
                    .as_ref()
                    .map(|u| u.as_str())
                    .unwrap_or("");
                redirected.push_str(&format!("{} -> {}\n", result.tenant, target));
            }
            _ => {
                failed.push_str(&result.tenant);
                failed.push('\n');
            }
        }
    }

    let files = [
        (format!("success_urls_{}.txt", stamp), success),
        (format!("failed_tenants_{}.txt", stamp), failed),
        (format!("redirected_tenants_{}.txt", stamp), redirected),
        (format!("board_finder_{}.json", stamp), board_summary(results)?),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = directory.join(name);
        write_file(&path, &content)?;
        written.push(path);
    }
    Ok(written)
}
