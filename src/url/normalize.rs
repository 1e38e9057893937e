use crate::UrlError;
use url::Url;

/// Query parameter names that drive a listing's pagination
///
/// Career sites expose the same listing under one of three parameter
/// families, depending on whether the board lists jobs, talent folders or
/// pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingParams {
    /// Name of the page-size parameter (e.g., "jobRecordsPerPage")
    pub page_size_key: &'static str,
    /// Name of the offset parameter (e.g., "jobOffset")
    pub offset_key: &'static str,
}

impl ListingParams {
    pub const JOB: Self = Self {
        page_size_key: "jobRecordsPerPage",
        offset_key: "jobOffset",
    };

    pub const FOLDER: Self = Self {
        page_size_key: "folderRecordsPerPage",
        offset_key: "folderOffset",
    };

    pub const PIPELINE: Self = Self {
        page_size_key: "pipelineRecordsPerPage",
        offset_key: "pipelineOffset",
    };

    /// Detects the parameter family from a listing page's raw HTML
    ///
    /// Pipeline markers win over folder markers, which win over the default
    /// job family.
    pub fn detect(html: &str) -> Self {
        if html.contains("pipelineRecordsPerPage") || html.contains("PipelineDetail") {
            Self::PIPELINE
        } else if html.contains("folderRecordsPerPage") || html.contains("FolderDetail") {
            Self::FOLDER
        } else {
            Self::JOB
        }
    }
}

impl Default for ListingParams {
    fn default() -> Self {
        Self::JOB
    }
}

/// Parses a URL and rejects anything that is not HTTP(S) with a host
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Extracts the job identifier from a job-detail URL
///
/// The identifier is the last non-empty path segment, ignoring query string,
/// fragment and trailing slashes, so the same posting reached over a
/// different scheme or with any query parameters (`jobId` included) yields
/// the same id.
///
/// # Examples
///
/// ```
/// use avature_harvester::url::extract_job_id;
///
/// assert_eq!(
///     extract_job_id("https://acme.avature.net/careers/JobDetail/Engineer/1234?src=feed"),
///     Some("1234".to_string())
/// );
/// assert_eq!(
///     extract_job_id("http://acme.avature.net/careers/JobDetail/Engineer/1234/"),
///     Some("1234".to_string())
/// );
/// ```
pub fn extract_job_id(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string);
    }

    // Relative or malformed input: fall back to plain string slicing
    let without_query = url.split(['?', '#']).next().unwrap_or("");
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Base URL text with any trailing slash removed
fn root(base: &Url) -> String {
    base.as_str().trim_end_matches('/').to_string()
}

fn join_root(base: &Url, suffix: &str) -> Result<Url, UrlError> {
    let joined = format!("{}{}", root(base), suffix);
    Url::parse(&joined).map_err(|e| UrlError::Parse(e.to_string()))
}

/// `{base}/sitemap.xml`
pub fn sitemap_url(base: &Url) -> Result<Url, UrlError> {
    join_root(base, "/sitemap.xml")
}

/// `{base}/SearchJobs/`
pub fn listing_url(base: &Url) -> Result<Url, UrlError> {
    join_root(base, "/SearchJobs/")
}

/// Candidate RSS feed locations, in probing order
pub fn rss_feed_urls(base: &Url) -> Result<Vec<Url>, UrlError> {
    Ok(vec![
        join_root(base, "/SearchJobs/feed/")?,
        join_root(base, "/feed/")?,
    ])
}

/// Small listing page whose legend states the total number of postings
pub fn job_count_url(base: &Url) -> Result<Url, UrlError> {
    let mut url = listing_url(base)?;
    url.query_pairs_mut()
        .append_pair("listFilterMode", "1")
        .append_pair("jobRecordsPerPage", "6");
    Ok(url)
}

/// Builds one page of the paginated listing
///
/// # Arguments
///
/// * `base` - Resolved career-site base URL
/// * `params` - Detected pagination parameter family
/// * `offset` - Zero-based record offset
/// * `page_size` - Records per page
pub fn paginated_listing_url(
    base: &Url,
    params: ListingParams,
    offset: u32,
    page_size: u32,
) -> Result<Url, UrlError> {
    let mut url = listing_url(base)?;
    url.query_pairs_mut()
        .append_pair("listFilterMode", "1")
        .append_pair(params.page_size_key, &page_size.to_string())
        .append_pair(params.offset_key, &offset.to_string());
    Ok(url)
}

/// Resolves an href found on a page against that page's URL
///
/// Only HTTP(S) results are returned.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let joined = base.join(href).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://acme.avature.net/careers").unwrap()
    }

    #[test]
    fn test_extract_job_id_variants_agree() {
        let a = extract_job_id("https://acme.avature.net/careers/JobDetail/Engineer/1234");
        let b = extract_job_id("http://acme.avature.net/careers/JobDetail/Engineer/1234?x=1");
        let c = extract_job_id("https://acme.avature.net/careers/JobDetail/Engineer/1234/#top");
        assert_eq!(a, Some("1234".to_string()));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_extract_job_id_ignores_job_id_query() {
        assert_eq!(
            extract_job_id("https://acme.avature.net/careers/JobDetail/Engineer/1234?jobId=555"),
            Some("1234".to_string())
        );
    }

    #[test]
    fn test_extract_job_id_relative() {
        assert_eq!(
            extract_job_id("/careers/JobDetail/Engineer/42?src=x"),
            Some("42".to_string())
        );
        assert_eq!(extract_job_id(""), None);
    }

    #[test]
    fn test_detect_listing_params() {
        assert_eq!(ListingParams::detect("<a href='/JobDetail/x/1'>"), ListingParams::JOB);
        assert_eq!(
            ListingParams::detect("var q = 'folderRecordsPerPage=10'"),
            ListingParams::FOLDER
        );
        assert_eq!(
            ListingParams::detect("<a href='/PipelineDetail/x/1'> FolderDetail"),
            ListingParams::PIPELINE
        );
    }

    #[test]
    fn test_listing_urls() {
        assert_eq!(
            sitemap_url(&base()).unwrap().as_str(),
            "https://acme.avature.net/careers/sitemap.xml"
        );
        assert_eq!(
            listing_url(&base()).unwrap().as_str(),
            "https://acme.avature.net/careers/SearchJobs/"
        );

        let page = paginated_listing_url(&base(), ListingParams::FOLDER, 20, 10).unwrap();
        assert_eq!(
            page.as_str(),
            "https://acme.avature.net/careers/SearchJobs/?listFilterMode=1&folderRecordsPerPage=10&folderOffset=20"
        );
    }

    #[test]
    fn test_rss_feed_order() {
        let feeds = rss_feed_urls(&base()).unwrap();
        assert!(feeds[0].as_str().ends_with("/careers/SearchJobs/feed/"));
        assert!(feeds[1].as_str().ends_with("/careers/feed/"));
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://acme.avature.net/x").is_ok());
        assert!(matches!(
            parse_http_url("ftp://acme.avature.net/x"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_http_url("not a url"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_resolve_link() {
        let page = Url::parse("https://acme.avature.net/careers/SearchJobs/").unwrap();
        assert_eq!(
            resolve_link(&page, "/careers/JobDetail/x/1").unwrap().as_str(),
            "https://acme.avature.net/careers/JobDetail/x/1"
        );
        assert!(resolve_link(&page, "javascript:void(0)").is_none());
        assert!(resolve_link(&page, "mailto:hr@acme.com").is_none());
    }
}
