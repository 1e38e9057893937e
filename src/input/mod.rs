//! Input loading: tenant lists for discovery, job-URL files for extraction
//!
//! Tenant names can also be pulled out of a raw URL dump and written to a
//! name file, which the job-board finder turns into a tenant list.
//!
//! Job-URL files come in several shapes (plain text, JSONL, JSON arrays and
//! retry-queue documents); all of them load into the same [`JobInput`] rows.

mod processor;
mod tenant_names;
mod tenants;

pub use processor::{InputFormat, InputProcessor, LoadedInput, UrlStatistics};
pub use tenant_names::{
    extract_tenant_names, extract_tenant_names_from_file, load_tenant_names, write_tenant_names,
};
pub use tenants::{load_tenants, parse_tenants, Tenant};

use crate::state::SourceMethod;
use std::path::PathBuf;
use thiserror::Error;

/// Input loading errors
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

/// One job-detail URL to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    pub url: String,
    pub company: String,
    pub source_method: SourceMethod,
    /// Retries already spent on this URL in earlier runs
    pub retry_count: u32,
}

impl JobInput {
    pub fn new(url: impl Into<String>, company: impl Into<String>, source_method: SourceMethod) -> Self {
        Self {
            url: url.into(),
            company: company.into(),
            source_method,
            retry_count: 0,
        }
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        Self {
            retry_count,
            ..self
        }
    }
}
