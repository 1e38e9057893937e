use crate::url::matcher::matches_wildcard;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use avature_harvester::url::extract_domain;
///
/// let url = Url::parse("https://ACME.avature.net/careers").unwrap();
/// assert_eq!(extract_domain(&url), Some("acme.avature.net".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a host belongs to one of the trusted hosting domains
///
/// Each pattern is either an exact host or a `*.`-prefixed suffix pattern.
/// Comparison is case-insensitive and only ever matches whole labels.
///
/// # Arguments
///
/// * `host` - Host taken from a resolved URL
/// * `patterns` - Trusted domain patterns from the configuration
///
/// # Examples
///
/// ```
/// use avature_harvester::url::is_trusted_host;
///
/// let trusted = vec!["*.avature.net".to_string()];
/// assert!(is_trusted_host("acme.avature.net", &trusted));
/// assert!(!is_trusted_host("avature.net.attacker.net", &trusted));
/// ```
pub fn is_trusted_host(host: &str, patterns: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    patterns
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &host))
}

/// Same as [`is_trusted_host`] for a full URL; URLs without a host are untrusted
pub fn is_trusted_url(url: &Url, patterns: &[String]) -> bool {
    extract_domain(url)
        .map(|host| is_trusted_host(&host, patterns))
        .unwrap_or(false)
}

/// Derives the tenant name from a hosted career-site URL
///
/// The tenant is the left-most host label: `acme.avature.net` gives `acme`.
pub fn company_from_url(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    let label = host.split('.').next()?;
    if label.is_empty() || label == "www" {
        return None;
    }
    Some(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trusted(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_extract_domain_lowercases() {
        let url = Url::parse("https://Acme.Avature.NET/").unwrap();
        assert_eq!(extract_domain(&url), Some("acme.avature.net".to_string()));
    }

    #[test]
    fn test_trusted_subdomain() {
        let patterns = trusted(&["*.avature.net"]);
        assert!(is_trusted_host("acme.avature.net", &patterns));
        assert!(is_trusted_host("ACME.AVATURE.NET", &patterns));
        assert!(is_trusted_host("avature.net", &patterns));
    }

    #[test]
    fn test_substring_but_not_suffix_is_rejected() {
        let patterns = trusted(&["*.trusted-domain.com"]);
        assert!(!is_trusted_host("trusted-domain.com.attacker.net", &patterns));
        assert!(!is_trusted_host("eviltrusted-domain.com", &patterns));
        assert!(is_trusted_host("jobs.trusted-domain.com", &patterns));
    }

    #[test]
    fn test_trailing_dot_host() {
        let patterns = trusted(&["*.avature.net"]);
        assert!(is_trusted_host("acme.avature.net.", &patterns));
    }

    #[test]
    fn test_exact_pattern() {
        let patterns = trusted(&["127.0.0.1"]);
        assert!(is_trusted_host("127.0.0.1", &patterns));
        assert!(!is_trusted_host("localhost", &patterns));
    }

    #[test]
    fn test_is_trusted_url() {
        let patterns = trusted(&["*.avature.net"]);
        let good = Url::parse("https://acme.avature.net/careers").unwrap();
        let bad = Url::parse("https://acme.workday.com/careers").unwrap();
        assert!(is_trusted_url(&good, &patterns));
        assert!(!is_trusted_url(&bad, &patterns));
    }

    #[test]
    fn test_company_from_url() {
        let url = Url::parse("https://acme.avature.net/careers/JobDetail/x/1").unwrap();
        assert_eq!(company_from_url(&url), Some("acme".to_string()));

        let url = Url::parse("https://www.example.com/").unwrap();
        assert_eq!(company_from_url(&url), None);
    }
}
