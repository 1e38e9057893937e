//! Harvest coordinator - top-level orchestration of both pipelines
//!
//! This module wires configuration, the shared rate-limited client, the
//! discovery engine, the worker pool and the output layer together:
//! - Discovery: tenants are processed one at a time; per-company results are
//!   collected and written as URL lists plus a run summary
//! - Extraction: job URLs are loaded, deduplicated, fetched by the worker pool
//!   and streamed into an output sink
//! - Board finding: tenant names are resolved to career-site base URLs, one
//!   tenant at a time

use crate::config::Config;
use crate::crawler::challenge::solver_from_config;
use crate::crawler::detail::{DetailFetcher, DetailOutcome};
use crate::crawler::discovery::{CompanyDiscovery, DiscoveryEngine};
use crate::crawler::fetcher::RateLimitedClient;
use crate::crawler::finder::{BoardFinder, BoardMatch, BoardStatus};
use crate::crawler::scheduler::{PoolSummary, WorkerPool};
use crate::extract::{AvatureExtractor, FieldExtractor};
use crate::input::{load_tenant_names, load_tenants, InputProcessor, JobInput, Tenant, UrlStatistics};
use crate::output::{run_stamp, write_board_outputs, write_discovery_outputs, FileSink, OutputSink, RunArtifacts};
use crate::HarvestError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Result of a discovery batch
#[derive(Debug)]
pub struct DiscoveryBatch {
    pub results: Vec<CompanyDiscovery>,
    pub files: Vec<PathBuf>,
}

impl DiscoveryBatch {
    pub fn total_urls(&self) -> usize {
        self.results.iter().map(|r| r.urls.len()).sum()
    }
}

/// Result of a job-board finder batch
#[derive(Debug)]
pub struct BoardBatch {
    pub results: Vec<BoardMatch>,
    pub files: Vec<PathBuf>,
}

impl BoardBatch {
    /// Tenants whose career site is usable for discovery
    pub fn usable(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_usable()).count()
    }
}

/// Options for an extraction run from a file
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    /// Case-insensitive substring filter on the company name
    pub company: Option<String>,
    pub limit: Option<usize>,
    /// Overrides `extraction.max-workers`
    pub workers: Option<u32>,
}

/// Result of an extraction run
#[derive(Debug)]
pub struct ExtractionRun {
    pub input: UrlStatistics,
    pub invalid: usize,
    pub pool: PoolSummary,
    pub artifacts: RunArtifacts,
}

/// Owns the configuration and the HTTP client shared by every component
pub struct Harvester {
    config: Config,
    client: Arc<RateLimitedClient>,
}

impl Harvester {
    /// Creates a new harvester
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Client built successfully
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let client = RateLimitedClient::new(&config.http, &config.throttle)?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &Arc<RateLimitedClient> {
        &self.client
    }

    /// Builds a discovery engine on the shared client
    pub fn discovery_engine(&self) -> DiscoveryEngine {
        DiscoveryEngine::new(
            Arc::clone(&self.client),
            self.config.discovery.clone(),
            self.config.challenge.clone(),
            solver_from_config(&self.config.challenge, &self.config.http.user_agent),
        )
    }

    /// Runs discovery for every tenant, sequentially
    pub async fn discover_all(&self, tenants: &[Tenant]) -> Vec<CompanyDiscovery> {
        let engine = self.discovery_engine();
        let started = Instant::now();
        let mut results = Vec::with_capacity(tenants.len());

        for (index, tenant) in tenants.iter().enumerate() {
            tracing::info!(
                "[{}/{}] Discovering {}",
                index + 1,
                tenants.len(),
                tenant.company
            );
            let result = engine.discover(&tenant.company, tenant.base_url.clone()).await;
            tracing::info!(
                "{}: {} URLs via {} in {:.1}s",
                tenant.company,
                result.urls.len(),
                result.outcome,
                result.stats.time_seconds
            );
            results.push(result);
        }

        tracing::info!(
            "Discovery finished: {} companies, {} URLs in {:.1}s",
            results.len(),
            results.iter().map(|r| r.urls.len()).sum::<usize>(),
            started.elapsed().as_secs_f64()
        );
        results
    }

    /// Runs discovery and writes the batch artifacts to `output_dir`
    pub async fn run_discovery_batch(
        &self,
        tenants: &[Tenant],
        output_dir: &Path,
    ) -> Result<DiscoveryBatch, HarvestError> {
        let results = self.discover_all(tenants).await;
        std::fs::create_dir_all(output_dir)?;
        let files = write_discovery_outputs(output_dir, &run_stamp(Utc::now()), &results)?;
        Ok(DiscoveryBatch { results, files })
    }

    /// Builds a job-board finder on the shared client
    pub fn board_finder(&self) -> BoardFinder {
        BoardFinder::new(Arc::clone(&self.client), &self.config.discovery)
    }

    /// Finds the career site of every tenant, sequentially
    pub async fn find_all_boards(&self, names: &[String]) -> Vec<BoardMatch> {
        let finder = self.board_finder();
        let mut results = Vec::with_capacity(names.len());

        for (index, name) in names.iter().enumerate() {
            tracing::info!("[{}/{}] Finding career site for {}", index + 1, names.len(), name);
            results.push(finder.find(name).await);
        }

        let found = results.iter().filter(|r| r.status == BoardStatus::Valid).count();
        tracing::info!("Board finding finished: {} of {} tenants valid", found, results.len());
        results
    }

    /// Builds the detail fetcher used by the worker pool
    pub fn detail_fetcher(&self, extractor: Arc<dyn FieldExtractor>) -> DetailFetcher {
        DetailFetcher::new(
            Arc::clone(&self.client),
            extractor,
            self.config.http.clone(),
            self.config.extraction.clone(),
        )
    }

    /// Fetches every job and streams the outcomes into `sink`
    ///
    /// # Returns
    ///
    /// * `Ok((PoolSummary, RunArtifacts))` - All jobs processed and the sink finished
    /// * `Err(HarvestError)` - The sink failed to write
    pub async fn run_extraction(
        &self,
        jobs: Vec<JobInput>,
        sink: &mut dyn OutputSink,
    ) -> Result<(PoolSummary, RunArtifacts), HarvestError> {
        let fetcher = Arc::new(self.detail_fetcher(Arc::new(AvatureExtractor::new())));
        let pool = WorkerPool::new(fetcher, self.config.extraction.clone());

        let summary = pool
            .run(jobs, |outcome| match outcome {
                DetailOutcome::Success(job) => sink.write_job(&job),
                DetailOutcome::Failure(failure) => sink.write_failure(&failure),
            })
            .await?;

        let artifacts = sink.finish()?;
        Ok((summary, artifacts))
    }
}

/// Loads a tenant list and runs a discovery batch
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `tenants_path` - Newline-delimited tenant base URLs
/// * `limit` - Only process the first `limit` tenants
pub async fn run_discovery(
    config: Config,
    tenants_path: &Path,
    limit: Option<usize>,
) -> Result<DiscoveryBatch, HarvestError> {
    let mut tenants = load_tenants(tenants_path, &config.discovery.trusted_domains)?;
    if let Some(limit) = limit {
        tenants.truncate(limit);
    }

    let output_dir = PathBuf::from(&config.output.directory);
    let harvester = Harvester::new(config)?;
    harvester.run_discovery_batch(&tenants, &output_dir).await
}

/// Loads a tenant-name file and finds each tenant's career site
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `names_path` - Tenant names, one per line
/// * `limit` - Only process the first `limit` names
pub async fn find_boards(
    config: Config,
    names_path: &Path,
    limit: Option<usize>,
) -> Result<BoardBatch, HarvestError> {
    let mut names = load_tenant_names(names_path)?;
    if let Some(limit) = limit {
        names.truncate(limit);
    }

    let output_dir = PathBuf::from(&config.output.directory);
    let harvester = Harvester::new(config)?;
    let results = harvester.find_all_boards(&names).await;

    std::fs::create_dir_all(&output_dir)?;
    let files = write_board_outputs(&output_dir, &run_stamp(Utc::now()), &results)?;
    Ok(BoardBatch { results, files })
}

/// Loads a job-URL file and runs extraction into timestamped output files
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `input_path` - Job URLs in any supported input format
/// * `options` - Company filter, limit and worker override
pub async fn run_extraction(
    mut config: Config,
    input_path: &Path,
    options: ExtractionOptions,
) -> Result<ExtractionRun, HarvestError> {
    if let Some(workers) = options.workers {
        config.extraction.max_workers = workers.clamp(1, 50);
    }

    let processor = InputProcessor::new(config.discovery.trusted_domains.clone());
    let loaded = processor.load(input_path, options.company.as_deref(), options.limit)?;
    let jobs = loaded.unique_jobs();
    tracing::info!(
        "Loaded {} URLs ({} unique, {} invalid) from {}",
        loaded.statistics.total_urls,
        jobs.len(),
        loaded.invalid,
        input_path.display()
    );

    let mut sink = FileSink::create(Path::new(&config.output.directory), config.retry.clone())?;
    let harvester = Harvester::new(config)?;
    let (pool, artifacts) = harvester.run_extraction(jobs, &mut sink).await?;

    Ok(ExtractionRun {
        input: loaded.statistics,
        invalid: loaded.invalid,
        pool,
        artifacts,
    })
}
