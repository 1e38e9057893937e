use regex::Regex;
use std::sync::LazyLock;

static JOBS_NUMERIC_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/\d+").expect("hardcoded regex pattern is valid"));

static JOB_SLUG_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/job/[a-zA-Z0-9-]+").expect("hardcoded regex pattern is valid")
});

static JOB_ID_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"jobId=\d+").expect("hardcoded regex pattern is valid"));

/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "avature.net" matches only "avature.net"
/// 2. Wildcard match: "*.avature.net" matches:
///    - "avature.net" (the bare domain)
///    - "acme.avature.net" (single subdomain)
///    - "eu.acme.avature.net" (nested subdomains)
///
/// Matching is done on label boundaries, so "*.avature.net" never matches
/// "avature.net.attacker.io" or "evilavature.net".
///
/// # Arguments
///
/// * `pattern` - The domain pattern, optionally starting with "*."
/// * `candidate` - The domain to check against the pattern
///
/// # Examples
///
/// ```
/// use avature_harvester::url::matches_wildcard;
///
/// assert!(matches_wildcard("avature.net", "avature.net"));
/// assert!(!matches_wildcard("avature.net", "acme.avature.net"));
///
/// assert!(matches_wildcard("*.avature.net", "avature.net"));
/// assert!(matches_wildcard("*.avature.net", "acme.avature.net"));
/// assert!(!matches_wildcard("*.avature.net", "avature.net.attacker.io"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Returns true if the URL text points at a single job posting
///
/// Recognized shapes:
/// - `/JobDetail/<slug>/<id>` (and the folder/pipeline detail variants)
/// - `/jobs/<digits>`
/// - `/job/<slug>`
/// - `jobId=<digits>` in the query
pub fn is_job_detail_url(url: &str) -> bool {
    url.contains("/JobDetail/")
        || url.contains("/FolderDetail/")
        || url.contains("/PipelineDetail/")
        || JOBS_NUMERIC_PATH.is_match(url)
        || JOB_SLUG_PATH.is_match(url)
        || JOB_ID_QUERY.is_match(url)
}
