//! Bounded worker pool for job-detail fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Staggered submission so the pool does not burst the origin when it fills
//! - Turning a crashed worker into a `processing_error` record for its URL
//! - Progress reporting

use crate::config::ExtractionConfig;
use crate::crawler::detail::{DetailFetcher, DetailOutcome};
use crate::input::JobInput;
use crate::records::FailureRecord;
use crate::state::ErrorType;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Completed results between progress lines
const PROGRESS_INTERVAL: usize = 50;

/// Totals of one pool run
#[derive(Debug, Clone, Default)]
pub struct PoolSummary {
    pub processed: usize,
    pub successes: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

impl PoolSummary {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs detail fetches for a fixed list of URLs with at most `max_workers`
/// in flight
pub struct WorkerPool {
    fetcher: Arc<DetailFetcher>,
    semaphore: Arc<Semaphore>,
    config: ExtractionConfig,
}

impl WorkerPool {
    /// Creates a new pool
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared detail fetcher (and through it the shared throttle)
    /// * `config` - Extraction settings; `max_workers` bounds concurrency
    pub fn new(fetcher: Arc<DetailFetcher>, config: ExtractionConfig) -> Self {
        let workers = config.max_workers.max(1) as usize;
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers)),
            config,
        }
    }

    /// Pause inserted after each full round of submissions
    fn stagger_delay(&self) -> Duration {
        Duration::from_millis(self.config.stagger_base_ms) + self.fetcher.client().adaptive_delay() / 2
    }

    /// Processes every job and hands each outcome to `on_result` as it completes
    ///
    /// Outcomes arrive in completion order. The pool always runs to the end of
    /// the list unless `on_result` itself fails, in which case outstanding
    /// tasks are aborted and the error is returned.
    ///
    /// # Arguments
    ///
    /// * `jobs` - URLs to fetch
    /// * `on_result` - Consumer for each outcome
    ///
    /// # Returns
    ///
    /// * `Ok(PoolSummary)` - All jobs processed
    /// * `Err(E)` - The consumer failed
    pub async fn run<F, E>(&self, jobs: Vec<JobInput>, mut on_result: F) -> Result<PoolSummary, E>
    where
        F: FnMut(DetailOutcome) -> Result<(), E>,
    {
        let total = jobs.len();
        let round = self.config.max_workers.max(1) as usize;
        let started = Instant::now();
        let mut summary = PoolSummary::default();
        let mut tasks: JoinSet<DetailOutcome> = JoinSet::new();
        let mut pending = jobs.into_iter();
        let mut submitted = 0usize;
        let mut next_job = pending.next();

        tracing::info!("Processing {} URLs with {} workers", total, round);

        loop {
            tokio::select! {
                biased;

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let outcome = match joined {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            // the worker wrapper never panics; only aborts land here
                            tracing::error!("Worker wrapper failed: {}", e);
                            continue;
                        }
                    };

                    summary.processed += 1;
                    if outcome.is_success() {
                        summary.successes += 1;
                    } else {
                        summary.failures += 1;
                    }

                    if let Err(e) = on_result(outcome) {
                        tasks.abort_all();
                        return Err(e);
                    }

                    if summary.processed % PROGRESS_INTERVAL == 0 {
                        let elapsed = started.elapsed().as_secs_f64();
                        tracing::info!(
                            "Progress: {}/{} ({} ok, {} failed), {:.2} URLs/sec",
                            summary.processed,
                            total,
                            summary.successes,
                            summary.failures,
                            summary.processed as f64 / elapsed.max(f64::EPSILON)
                        );
                    }
                }

                permit = self.semaphore.clone().acquire_owned(), if next_job.is_some() => {
                    let Ok(permit) = permit else {
                        break;
                    };
                    let Some(job) = next_job.take() else {
                        continue;
                    };

                    let fetcher = Arc::clone(&self.fetcher);
                    tasks.spawn(async move {
                        let _permit = permit;
                        process_job(fetcher, job).await
                    });

                    submitted += 1;
                    next_job = pending.next();
                    if submitted % round == 0 && next_job.is_some() {
                        tokio::time::sleep(self.stagger_delay()).await;
                    }
                }

                else => break,
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            "Processed {} URLs in {:.1}s ({} ok, {} failed)",
            summary.processed,
            summary.elapsed.as_secs_f64(),
            summary.successes,
            summary.failures
        );
        Ok(summary)
    }
}

/// Runs one fetch in its own task so a panic is contained to that URL
async fn process_job(fetcher: Arc<DetailFetcher>, job: JobInput) -> DetailOutcome {
    let url = job.url.clone();
    let company = job.company.clone();

    match tokio::spawn(async move { fetcher.fetch(&job).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Worker crashed on {}: {}", url, e);
            DetailOutcome::Failure(FailureRecord::new(
                url,
                company,
                ErrorType::ProcessingError,
                format!("Worker task failed: {}", e),
                None,
            ))
        }
    }
}
