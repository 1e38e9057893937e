use crate::input::{InputError, JobInput};
use crate::state::SourceMethod;
use crate::url::{company_from_url, is_job_detail_url, is_trusted_url, parse_http_url};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Object keys that may hold a job URL, in lookup order
const URL_KEYS: &[&str] = &["url", "job_url", "link", "href", "job_link"];

const UNKNOWN_COMPANY: &str = "unknown";

/// Layout of a job-URL input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One URL per line, `#` comments
    Text,
    /// One JSON object per line
    Jsonl,
    /// A single JSON document: array of strings or objects, or a retry file
    Json,
}

impl InputFormat {
    /// Picks the format from the extension, sniffing JSON content
    ///
    /// For `.json`/`.jsonl` files the content decides: a document that parses
    /// as a whole is JSON, anything else is read line by line.
    pub fn detect(path: &Path, content: &str) -> Result<Self, InputError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(Self::Text),
            "json" | "jsonl" => Ok(Self::sniff_json(content)),
            other => Err(InputError::UnsupportedFormat(other.to_string())),
        }
    }

    fn sniff_json(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('[') => Self::Json,
            Some('{') if serde_json::from_str::<Value>(content).is_ok() => Self::Json,
            _ => Self::Jsonl,
        }
    }
}

/// Counts over a set of loaded job URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlStatistics {
    pub total_urls: usize,
    pub unique_urls: usize,
    pub duplicate_urls: usize,
    pub companies: BTreeMap<String, usize>,
}

impl UrlStatistics {
    pub fn from_inputs(inputs: &[JobInput]) -> Self {
        let mut seen = HashSet::new();
        let mut stats = Self::default();
        for input in inputs {
            stats.total_urls += 1;
            if !seen.insert(input.url.as_str()) {
                stats.duplicate_urls += 1;
            }
            *stats.companies.entry(input.company.clone()).or_insert(0) += 1;
        }
        stats.unique_urls = seen.len();
        stats
    }
}

/// Result of loading an input file
#[derive(Debug, Clone, Default)]
pub struct LoadedInput {
    /// Valid rows, in file order
    pub jobs: Vec<JobInput>,
    /// Rows dropped by validation
    pub invalid: usize,
    pub statistics: UrlStatistics,
}

impl LoadedInput {
    /// Valid rows with exact-URL repeats removed, first occurrence kept
    pub fn unique_jobs(&self) -> Vec<JobInput> {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .filter(|job| seen.insert(job.url.as_str()))
            .cloned()
            .collect()
    }
}

/// Loads and validates job-URL input files
#[derive(Debug, Clone)]
pub struct InputProcessor {
    trusted_domains: Vec<String>,
}

impl InputProcessor {
    pub fn new(trusted_domains: Vec<String>) -> Self {
        Self { trusted_domains }
    }

    /// Reads a job-URL file, validates every row and applies the filters
    ///
    /// # Arguments
    ///
    /// * `path` - `.txt`, `.jsonl` or `.json` file
    /// * `company_filter` - Keep rows whose company contains this text (case-insensitive)
    /// * `limit` - Keep at most this many valid rows
    pub fn load(
        &self,
        path: &Path,
        company_filter: Option<&str>,
        limit: Option<usize>,
    ) -> Result<LoadedInput, InputError> {
        let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = InputFormat::detect(path, &content)?;
        let rows = self.parse(&content, format).map_err(|source| InputError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Read {} URLs from {} ({:?})", rows.len(), path.display(), format);

        let mut rows = match company_filter {
            Some(filter) => {
                let filter = filter.to_lowercase();
                let kept: Vec<JobInput> = rows
                    .into_iter()
                    .filter(|row| row.company.to_lowercase().contains(&filter))
                    .collect();
                tracing::info!("Filtered to {} URLs for company {}", kept.len(), filter);
                kept
            }
            None => rows,
        };

        let before = rows.len();
        rows.retain(|row| self.is_valid(&row.url));
        let invalid = before - rows.len();
        if invalid > 0 {
            tracing::info!("Filtered out {} invalid URLs", invalid);
        }

        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        let statistics = UrlStatistics::from_inputs(&rows);
        Ok(LoadedInput {
            jobs: rows,
            invalid,
            statistics,
        })
    }

    /// Parses file content into unvalidated rows
    pub fn parse(&self, content: &str, format: InputFormat) -> Result<Vec<JobInput>, serde_json::Error> {
        match format {
            InputFormat::Text => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(|line| JobInput::new(line, company_for(line), SourceMethod::UrlList))
                .collect()),
            InputFormat::Jsonl => Ok(parse_jsonl(content)),
            InputFormat::Json => {
                let document: Value = serde_json::from_str(content)?;
                Ok(parse_json_document(&document))
            }
        }
    }

    /// Scheme and host present, trusted host, job-detail path
    pub fn is_valid(&self, url: &str) -> bool {
        let Ok(parsed) = parse_http_url(url) else {
            tracing::debug!("Invalid URL format: {}", url);
            return false;
        };
        if !is_trusted_url(&parsed, &self.trusted_domains) {
            tracing::debug!("Untrusted host: {}", url);
            return false;
        }
        if !is_job_detail_url(url) {
            tracing::debug!("Not a job detail URL: {}", url);
            return false;
        }
        true
    }
}

fn parse_jsonl(content: &str) -> Vec<JobInput> {
    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object)) => rows.extend(row_from_object(&object)),
            Ok(Value::String(url)) => {
                let company = company_for(&url);
                rows.push(JobInput::new(url, company, SourceMethod::UrlList));
            }
            Ok(_) => tracing::debug!("Skipping non-object JSON on line {}", index + 1),
            Err(e) => tracing::warn!("Invalid JSON on line {}: {}", index + 1, e),
        }
    }
    rows
}

fn parse_json_document(document: &Value) -> Vec<JobInput> {
    match document {
        Value::Array(items) => rows_from_array(items),
        Value::Object(object) => {
            if let Some(Value::Array(failures)) = object.get("failures") {
                failures
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(retry_row)
                    .collect()
            } else {
                // any array field of URLs or URL objects, e.g. {"urls": [...]}
                object
                    .values()
                    .filter_map(Value::as_array)
                    .flat_map(|items| rows_from_array(items))
                    .collect()
            }
        }
        _ => Vec::new(),
    }
}

fn rows_from_array(items: &[Value]) -> Vec<JobInput> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(JobInput::new(url.clone(), company_for(url), SourceMethod::UrlList)),
            Value::Object(object) => row_from_object(object),
            _ => None,
        })
        .collect()
}

fn row_from_object(object: &Map<String, Value>) -> Option<JobInput> {
    let url = URL_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|url| !url.is_empty())?;

    let company = ["company", "company_name"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| company_for(url));

    let source = ["source_method", "source"]
        .iter()
        .find_map(|key| object.get(*key).cloned())
        .and_then(|value| serde_json::from_value::<SourceMethod>(value).ok())
        .unwrap_or(SourceMethod::UrlList);

    let retry_count = object
        .get("retry_count")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(0);

    Some(JobInput::new(url, company, source).with_retry_count(retry_count))
}

/// A retry-queue item; `retry_count` wins over `retry_metadata.retry_attempt`
fn retry_row(object: &Map<String, Value>) -> Option<JobInput> {
    let row = row_from_object(object)?;
    if object.contains_key("retry_count") {
        return Some(row);
    }
    let attempt = object
        .get("retry_metadata")
        .and_then(|meta| meta.get("retry_attempt"))
        .and_then(Value::as_u64)
        .map(|n| n.saturating_sub(1) as u32)
        .unwrap_or(0);
    Some(row.with_retry_count(attempt))
}

fn company_for(url: &str) -> String {
    parse_http_url(url)
        .ok()
        .and_then(|parsed| company_from_url(&parsed))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const JOB_A: &str = "https://acme.avature.net/careers/JobDetail/Engineer/1";
    const JOB_B: &str = "https://globex.avature.net/careers/JobDetail/Analyst/2";

    fn processor() -> InputProcessor {
        InputProcessor::new(vec!["*.avature.net".to_string()])
    }

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_text_input() {
        let file = write_temp(
            ".txt",
            &format!("# urls\n{JOB_A}\n\n{JOB_B}\nhttps://acme.avature.net/careers/SearchJobs\n{JOB_A}\n"),
        );
        let loaded = processor().load(file.path(), None, None).unwrap();
        assert_eq!(loaded.jobs.len(), 3);
        assert_eq!(loaded.invalid, 1);
        assert_eq!(loaded.jobs[0].company, "acme");
        assert_eq!(loaded.jobs[0].source_method, SourceMethod::UrlList);
        assert_eq!(loaded.statistics.duplicate_urls, 1);
        assert_eq!(loaded.statistics.unique_urls, 2);
        assert_eq!(loaded.unique_jobs().len(), 2);
    }

    #[test]
    fn test_jsonl_input_with_alternate_keys() {
        let content = format!(
            "{{\"job_url\": \"{JOB_A}\", \"company_name\": \"Acme Corp\", \"source\": \"sitemap\"}}\n\
             not json\n\
             {{\"link\": \"{JOB_B}\"}}\n\
             {{\"title\": \"no url\"}}\n"
        );
        let file = write_temp(".jsonl", &content);
        let loaded = processor().load(file.path(), None, None).unwrap();
        assert_eq!(loaded.jobs.len(), 2);
        assert_eq!(loaded.jobs[0].company, "Acme Corp");
        assert_eq!(loaded.jobs[0].source_method, SourceMethod::Sitemap);
        assert_eq!(loaded.jobs[1].company, "globex");
    }

    #[test]
    fn test_json_array_of_strings() {
        let file = write_temp(".json", &format!("[\"{JOB_A}\", \"{JOB_B}\"]"));
        let loaded = processor().load(file.path(), None, None).unwrap();
        assert_eq!(loaded.jobs.len(), 2);
    }

    #[test]
    fn test_retry_file_carries_retry_count() {
        let content = format!(
            r#"{{
                "metadata": {{"retry_type": "general"}},
                "failures": [
                    {{"url": "{JOB_A}", "company": "acme", "error_type": "timeout", "retry_count": 2}},
                    {{"url": "{JOB_B}", "retry_metadata": {{"retry_attempt": 4}}}}
                ]
            }}"#
        );
        let file = write_temp(".json", &content);
        let loaded = processor().load(file.path(), None, None).unwrap();
        assert_eq!(loaded.jobs.len(), 2);
        assert_eq!(loaded.jobs[0].retry_count, 2);
        assert_eq!(loaded.jobs[1].retry_count, 3);
    }

    #[test]
    fn test_company_filter_and_limit() {
        let file = write_temp(".txt", &format!("{JOB_A}\n{JOB_B}\n{JOB_A}?x=1\n"));
        let loaded = processor().load(file.path(), Some("ACME"), Some(1)).unwrap();
        assert_eq!(loaded.jobs.len(), 1);
        assert_eq!(loaded.jobs[0].company, "acme");
    }

    #[test]
    fn test_untrusted_rows_are_invalid() {
        let file = write_temp(".txt", "https://acme.avature.net.evil.com/JobDetail/x/1\nftp://acme.avature.net/JobDetail/x/2\n");
        let loaded = processor().load(file.path(), None, None).unwrap();
        assert!(loaded.jobs.is_empty());
        assert_eq!(loaded.invalid, 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".csv", JOB_A);
        let result = processor().load(file.path(), None, None);
        assert!(matches!(result, Err(InputError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_format_sniffing() {
        let path = Path::new("input.json");
        assert_eq!(InputFormat::detect(path, "[1]").unwrap(), InputFormat::Json);
        assert_eq!(InputFormat::detect(path, "{\"failures\": []}").unwrap(), InputFormat::Json);
        assert_eq!(
            InputFormat::detect(path, "{\"url\": \"a\"}\n{\"url\": \"b\"}").unwrap(),
            InputFormat::Jsonl
        );
    }
}
