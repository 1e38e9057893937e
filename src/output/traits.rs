//! Output sink trait and error types
//!
//! A sink receives every job record and failure record of an extraction run
//! as it is produced, then writes the run-level artifacts when finished.

use crate::output::stats::StatsReport;
use crate::records::{FailureRecord, JobRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid retry queue {path}: {message}")]
    InvalidQueue { path: PathBuf, message: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub stats: StatsReport,

    /// Files written, in creation order; empty for in-memory sinks
    pub files: Vec<PathBuf>,
}

/// Destination for extraction results
///
/// Records are append-only: each call writes exactly one record and never
/// revisits an earlier one.
pub trait OutputSink: Send {
    /// Records a successfully scraped posting
    fn write_job(&mut self, job: &JobRecord) -> OutputResult<()>;

    /// Records a failed URL
    fn write_failure(&mut self, failure: &FailureRecord) -> OutputResult<()>;

    /// Writes the run-level artifacts (statistics, failure analysis, retry
    /// queues, report)
    ///
    /// # Returns
    ///
    /// The final statistics and the list of files written
    fn finish(&mut self) -> OutputResult<RunArtifacts>;
}
