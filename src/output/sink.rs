use crate::config::RetryConfig;
use crate::output::failures::{failures_document, FailureAnalysis};
use crate::output::report::format_report;
use crate::output::retry_queue::{write_retry_queues, RetryBuckets};
use crate::output::stats::RunStats;
use crate::output::traits::{OutputError, OutputResult, OutputSink, RunArtifacts};
use crate::output::{run_stamp, write_file};
use crate::records::{FailureRecord, JobRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Version stamped into every job line
pub const EXTRACTOR_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize)]
struct ExtractionMetadata {
    extracted_at: DateTime<Utc>,
    extractor_version: &'static str,
    fields_extracted: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct JobLine<'a> {
    #[serde(flatten)]
    job: &'a JobRecord,
    extraction_metadata: ExtractionMetadata,
}

/// Renders one job as a JSONL line (without the trailing newline)
pub fn job_line(job: &JobRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(&JobLine {
        job,
        extraction_metadata: ExtractionMetadata {
            extracted_at: Utc::now(),
            extractor_version: EXTRACTOR_VERSION,
            fields_extracted: job.fields_extracted(),
        },
    })
}

/// Writes run artifacts as timestamped files in one directory
///
/// Jobs are streamed to the JSONL file as they arrive; failures are kept in
/// memory until [`OutputSink::finish`] writes the failures document and the
/// retry queues.
pub struct FileSink {
    directory: PathBuf,
    stamp: String,
    jobs_path: PathBuf,
    jobs: BufWriter<File>,
    failures: Vec<FailureRecord>,
    stats: RunStats,
    retry: RetryConfig,
}

impl FileSink {
    /// Creates the output directory and opens the job file
    ///
    /// # Arguments
    ///
    /// * `directory` - Where every artifact of the run goes
    /// * `retry` - Retry settings used to bucket failures
    pub fn create(directory: &Path, retry: RetryConfig) -> OutputResult<Self> {
        std::fs::create_dir_all(directory).map_err(|source| OutputError::File {
            path: directory.to_path_buf(),
            source,
        })?;

        let stamp = run_stamp(Utc::now());
        let jobs_path = directory.join(format!("job_details_{}.jsonl", stamp));
        let file = File::create(&jobs_path).map_err(|source| OutputError::File {
            path: jobs_path.clone(),
            source,
        })?;
        tracing::info!("Writing jobs to {}", jobs_path.display());

        Ok(Self {
            directory: directory.to_path_buf(),
            stamp,
            jobs_path,
            jobs: BufWriter::new(file),
            failures: Vec::new(),
            stats: RunStats::new(),
            retry,
        })
    }

    pub fn jobs_path(&self) -> &Path {
        &self.jobs_path
    }

    fn artifact(&self, prefix: &str, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{}_{}.{}", prefix, self.stamp, extension))
    }
}

impl OutputSink for FileSink {
    fn write_job(&mut self, job: &JobRecord) -> OutputResult<()> {
        let line = job_line(job)?;
        writeln!(self.jobs, "{}", line)?;
        self.stats.record_job(job);
        Ok(())
    }

    fn write_failure(&mut self, failure: &FailureRecord) -> OutputResult<()> {
        self.stats.record_failure(failure);
        self.failures.push(failure.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<RunArtifacts> {
        self.jobs.flush()?;
        let mut files = vec![self.jobs_path.clone()];

        let stats = self.stats.report();
        let analysis = FailureAnalysis::from_failures(&self.failures);

        if !self.failures.is_empty() {
            let path = self.artifact("failures", "json");
            write_file(&path, &failures_document(&self.failures, &analysis)?)?;
            files.push(path);

            let buckets = RetryBuckets::partition(&self.failures, self.retry.max_retry_attempts);
            files.extend(write_retry_queues(
                &self.directory,
                &self.stamp,
                &buckets,
                &self.retry,
                Utc::now(),
            )?);
        }

        let path = self.artifact("stats", "json");
        write_file(&path, &serde_json::to_string_pretty(&stats)?)?;
        files.push(path);

        let path = self.artifact("report", "txt");
        write_file(&path, &format_report(&stats, &analysis))?;
        files.push(path);

        tracing::info!("Wrote {} output files to {}", files.len(), self.directory.display());
        Ok(RunArtifacts { stats, files })
    }
}

/// Keeps everything in memory; used by tests and library callers that do
/// their own persistence
#[derive(Debug, Default)]
pub struct MemorySink {
    pub jobs: Vec<JobRecord>,
    pub failures: Vec<FailureRecord>,
    stats: RunStats,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn write_job(&mut self, job: &JobRecord) -> OutputResult<()> {
        self.stats.record_job(job);
        self.jobs.push(job.clone());
        Ok(())
    }

    fn write_failure(&mut self, failure: &FailureRecord) -> OutputResult<()> {
        self.stats.record_failure(failure);
        self.failures.push(failure.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<RunArtifacts> {
        Ok(RunArtifacts {
            stats: self.stats.report(),
            files: Vec::new(),
        })
    }
}
