//! URL handling module for the harvester
//!
//! This module provides trust-domain checks, job-detail URL recognition,
//! job-id extraction and the fixed URL shapes of hosted career sites
//! (sitemap, listing, pagination, RSS feed).

mod domain;
mod matcher;
mod normalize;

pub use domain::{company_from_url, extract_domain, is_trusted_host, is_trusted_url};
pub use matcher::{is_job_detail_url, matches_wildcard};
pub use normalize::{
    extract_job_id, job_count_url, listing_url, paginated_listing_url, parse_http_url,
    resolve_link, rss_feed_urls, sitemap_url, ListingParams,
};
