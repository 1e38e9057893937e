//! Records produced during a harvest run
//!
//! - `JobRecord`: a scraped posting
//! - `FailureRecord`: a classified failure for one URL
//! - `CompanyContext`: a tenant's original and resolved base URL
//! - `DiscoveredUrlSet`: job URLs deduplicated by job id

mod company;
mod failure;
mod job;
mod url_set;

pub use company::CompanyContext;
pub use failure::FailureRecord;
pub use job::{JobRecord, LOCATION_NOT_SPECIFIED};
pub use url_set::{dedup_by_job_id, DiscoveredUrl, DiscoveredUrlSet};
