//! Avature Harvester main entry point
//!
//! This is the command-line interface for discovering and extracting job
//! postings from hosted career sites.

use anyhow::Context;
use avature_harvester::config::{load_or_default, Config};
use avature_harvester::crawler::{find_boards, run_discovery, run_extraction, ExtractionOptions};
use avature_harvester::input::{extract_tenant_names_from_file, write_tenant_names};
use avature_harvester::output::{check_retry_readiness, RetryQueueKind};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Avature Harvester: job discovery and extraction for hosted career sites
///
/// Discovers job-detail URLs per tenant (sitemap, listing sample, pagination),
/// then fetches every posting under an adaptive rate limit and writes
/// classified failures to retry queues.
#[derive(Parser, Debug)]
#[command(name = "avature-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Job discovery and extraction for hosted career sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract unique tenant names from a dump of hosted-site URLs
    Tenants {
        /// One URL per line
        #[arg(value_name = "URLS")]
        urls: PathBuf,

        /// Write the names here instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the career site of every tenant in a name list
    FindBoards {
        /// Tenant names, one per line
        #[arg(value_name = "NAMES")]
        names: PathBuf,

        /// Only process the first N names
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Discover job-detail URLs for every tenant in a list
    Discover {
        /// Newline-delimited tenant base URLs
        #[arg(value_name = "TENANTS")]
        tenants: PathBuf,

        /// Only process the first N tenants
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fetch and extract job postings from a URL file
    Extract {
        /// Job URLs as .txt, .jsonl, .json or a retry queue
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Only process companies whose name contains this text
        #[arg(long)]
        company: Option<String>,

        /// Only process the first N valid URLs
        #[arg(long)]
        limit: Option<usize>,

        /// Worker pool size (overrides the configuration)
        #[arg(long)]
        workers: Option<u32>,
    },

    /// Show whether a retry queue is due
    RetryStatus {
        /// Retry queue JSON file
        #[arg(value_name = "QUEUE_FILE")]
        file: PathBuf,
    },

    /// Validate the configuration and print the effective settings
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) =
        load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Tenants { urls, output } => handle_tenants(urls, output),
        Command::FindBoards { names, limit } => handle_find_boards(config, names, limit).await,
        Command::Discover { tenants, limit } => handle_discover(config, tenants, limit).await,
        Command::Extract {
            input,
            company,
            limit,
            workers,
        } => {
            let options = ExtractionOptions {
                company,
                limit,
                workers,
            };
            handle_extract(config, input, options).await
        }
        Command::RetryStatus { file } => handle_retry_status(file),
        Command::ShowConfig => handle_show_config(&config, &config_hash),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("avature_harvester=info,warn"),
            1 => EnvFilter::new("avature_harvester=debug,info"),
            2 => EnvFilter::new("avature_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn handle_tenants(urls: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let names = extract_tenant_names_from_file(&urls)
        .with_context(|| format!("Could not read {}", urls.display()))?;

    match output {
        Some(path) => {
            write_tenant_names(&path, &names)
                .with_context(|| format!("Could not write {}", path.display()))?;
            println!("Wrote {} tenants to {}", names.len(), path.display());
        }
        None => {
            for name in &names {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

async fn handle_find_boards(config: Config, names: PathBuf, limit: Option<usize>) -> anyhow::Result<()> {
    let batch = find_boards(config, &names, limit)
        .await
        .with_context(|| format!("Board finding failed for {}", names.display()))?;

    println!("=== Board Finding Complete ===\n");
    println!("Tenants: {}", batch.results.len());
    println!("Usable:  {}", batch.usable());
    for result in &batch.results {
        let url = result.url.as_ref().map(|u| u.as_str()).unwrap_or("-");
        println!("  {:<30} {:<14} {}", result.tenant, result.status, url);
    }
    println!("\nFiles:");
    for path in &batch.files {
        println!("  {}", path.display());
    }
    Ok(())
}

async fn handle_discover(config: Config, tenants: PathBuf, limit: Option<usize>) -> anyhow::Result<()> {
    let batch = run_discovery(config, &tenants, limit)
        .await
        .with_context(|| format!("Discovery failed for {}", tenants.display()))?;

    println!("=== Discovery Complete ===\n");
    println!("Companies: {}", batch.results.len());
    println!("Job URLs:  {}", batch.total_urls());
    for result in &batch.results {
        println!(
            "  {:<30} {:>6} URLs  {}",
            result.context.company_name,
            result.urls.len(),
            result.outcome
        );
    }
    println!("\nFiles:");
    for path in &batch.files {
        println!("  {}", path.display());
    }
    Ok(())
}

async fn handle_extract(config: Config, input: PathBuf, options: ExtractionOptions) -> anyhow::Result<()> {
    let run = run_extraction(config, &input, options)
        .await
        .with_context(|| format!("Extraction failed for {}", input.display()))?;

    let summary = &run.artifacts.stats.summary;
    println!("=== Extraction Complete ===\n");
    println!(
        "Input:      {} URLs ({} unique, {} invalid)",
        run.input.total_urls, run.input.unique_urls, run.invalid
    );
    println!("Processed:  {}", summary.total_processed);
    println!("Successful: {}", summary.successful);
    println!("Failed:     {}", summary.failed);
    println!("Success rate: {:.1}%", summary.success_rate_percent);
    println!("Throughput:   {:.2} URLs/sec", run.pool.throughput());
    println!("\nFiles:");
    for path in &run.artifacts.files {
        println!("  {}", path.display());
    }
    Ok(())
}

fn handle_retry_status(file: PathBuf) -> anyhow::Result<()> {
    let readiness = check_retry_readiness(&file, Utc::now())
        .with_context(|| format!("Could not read retry queue {}", file.display()))?;

    println!("Queue:  {}", file.display());
    println!("Type:   {}", readiness.retry_type.as_str());
    println!("Items:  {}", readiness.total_items);
    match (readiness.retry_type, readiness.next_retry_time) {
        (RetryQueueKind::Permanent, _) | (_, None) => {
            println!("Status: not retryable");
        }
        (_, Some(at)) if readiness.ready => {
            println!("Status: ready (due since {})", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        (_, Some(at)) => {
            println!(
                "Status: waiting {} more seconds (due {})",
                readiness.seconds_remaining,
                at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}

fn handle_show_config(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("# Configuration hash: {}", config_hash);
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    Ok(())
}
