use crate::state::{is_retryable, ErrorType};
use crate::url::extract_job_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A failed attempt to obtain one job posting
///
/// Identity is `(url, timestamp)`. `is_retryable` is derived from
/// `(error_type, http_status)` when the record is built and cannot be set
/// independently; fields are read-only and a retry produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FailureRecordData")]
pub struct FailureRecord {
    url: String,
    job_id: String,
    company: String,
    error_type: ErrorType,
    error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    timestamp: DateTime<Utc>,
    retry_count: u32,
    is_retryable: bool,
}

/// Wire shape accepted when reading failures back; `is_retryable` is ignored
/// and recomputed
#[derive(Debug, Deserialize)]
struct FailureRecordData {
    url: String,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    company: String,
    error_type: ErrorType,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    http_status: Option<u16>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    retry_count: u32,
}

impl From<FailureRecordData> for FailureRecord {
    fn from(data: FailureRecordData) -> Self {
        let mut record = FailureRecord::new(
            data.url,
            data.company,
            data.error_type,
            data.error_message,
            data.http_status,
        )
        .with_timestamp(data.timestamp)
        .with_retry_count(data.retry_count);
        if let Some(job_id) = data.job_id.filter(|id| !id.is_empty()) {
            record.job_id = job_id;
        }
        record
    }
}

impl FailureRecord {
    /// Creates a failure stamped with the current time and retry count 0
    pub fn new(
        url: impl Into<String>,
        company: impl Into<String>,
        error_type: ErrorType,
        error_message: impl Into<String>,
        http_status: Option<u16>,
    ) -> Self {
        let url = url.into();
        let job_id = extract_job_id(&url).unwrap_or_default();
        Self {
            url,
            job_id,
            company: company.into(),
            error_type,
            error_message: error_message.into(),
            http_status,
            timestamp: Utc::now(),
            retry_count: 0,
            is_retryable: is_retryable(error_type, http_status),
        }
    }

    /// Returns a copy carrying a different retry count
    pub fn with_retry_count(self, retry_count: u32) -> Self {
        Self {
            retry_count,
            ..self
        }
    }

    /// Returns a copy carrying a different timestamp
    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..self }
    }

    /// Builds the record for the next attempt at the same URL
    pub fn next_attempt(&self, error_type: ErrorType, message: &str, http_status: Option<u16>) -> Self {
        FailureRecord::new(
            self.url.clone(),
            self.company.clone(),
            error_type,
            message,
            http_status,
        )
        .with_retry_count(self.retry_count + 1)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }
}
