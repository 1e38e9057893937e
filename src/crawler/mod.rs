//! Crawler module for discovery and extraction
//!
//! This module contains the network-facing logic, including:
//! - The shared rate-limited HTTP client with adaptive throttling
//! - URL discovery (sitemap, RSS probe, listing sample and pagination)
//! - Finding each tenant's career site from its name
//! - Browser challenge solving
//! - Job-detail fetching with retry and failure classification
//! - The bounded worker pool and overall run coordination

mod challenge;
mod coordinator;
mod detail;
mod discovery;
mod fetcher;
mod finder;
mod listing;
mod scheduler;
mod sitemap;

pub use challenge::{
    is_known_protected, solver_from_config, ChallengeError, ChallengeSolver, FallbackSolver,
    NoopSolver, SessionCookie, StaticCookieSolver, CHALLENGE_TOKEN_COOKIE, WAF_ACTION_HEADER,
};
#[cfg(feature = "headless")]
pub use challenge::HeadlessSolver;
pub use coordinator::{
    find_boards, run_discovery, run_extraction, BoardBatch, DiscoveryBatch, ExtractionOptions,
    ExtractionRun, Harvester,
};
pub use detail::{detail_backoff, parse_detail_page, DetailFetcher, DetailOutcome};
pub use discovery::{CompanyDiscovery, CompanyStats, DiscoveryEngine, ResolvedBase};
pub use fetcher::{build_http_client, FetchedPage, RateLimitedClient};
pub use finder::{
    candidate_urls, looks_like_platform, tenant_root, BoardFinder, BoardMatch, BoardStatus,
    HOSTING_DOMAIN,
};
pub use listing::{listing_backoff, ListingCrawler, ListingProbe, PaginationHalt, PaginationResult};
pub use scheduler::{PoolSummary, WorkerPool};
pub use sitemap::{count_feed_items, job_urls_from_sitemap, parse_sitemap_locs};
