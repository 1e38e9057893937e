//! Integration tests for discovery
//!
//! These tests use wiremock to stand in for a hosted career site and drive
//! the discovery engine end-to-end: redirect vetting, sitemap parsing,
//! listing sampling and full pagination.

use avature_harvester::config::Config;
use avature_harvester::crawler::{
    Harvester, ListingCrawler, ListingProbe, PaginationHalt, RateLimitedClient,
};
use avature_harvester::input::Tenant;
use avature_harvester::state::{DiscoveryOutcome, ErrorType, SourceMethod};
use avature_harvester::url::ListingParams;
use std::collections::HashSet;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast configuration that trusts the local mock server
fn test_config() -> Config {
    let mut config = Config::default();
    config.http.request_timeout_ms = 2_000;
    config.throttle.request_delay_ms = 1;
    config.throttle.max_adaptive_delay_ms = 10;
    config.discovery.trusted_domains = vec!["127.0.0.1".to_string()];
    config.discovery.sample_delay_ms = 0;
    config.discovery.page_delay_ms = 0;
    config.discovery.listing_backoff_base_ms = 1;
    config.discovery.listing_backoff_cap_ms = 5;
    config.discovery.check_rss = false;
    config.challenge.enabled = false;
    config
}

fn sitemap(base: &str, ids: &[u32]) -> String {
    let urls: String = ids
        .iter()
        .map(|id| format!("<url><loc>{base}/JobDetail/Role-{id}/{id}</loc></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>{base}/SearchJobs/</loc></url>
{urls}
</urlset>"#
    )
}

fn listing_page(ids: &[u32]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<article class="article article--result">
                     <h3><a href="/careers/JobDetail/Role-{id}/{id}">Role {id}</a></h3>
                   </article>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"results\">{rows}</div></body></html>")
}

fn empty_listing() -> String {
    "<html><body><p>No results found</p></body></html>".to_string()
}

async fn mount_home(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Careers</body></html>"))
        .mount(server)
        .await;
}

async fn mount_listing_offset(server: &MockServer, offset: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/careers/SearchJobs/"))
        .and(query_param("jobOffset", offset.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .with_priority(1)
        .expect(expected)
        .mount(server)
        .await;
}

/// Unpaginated listing, also answers the job-count probe
async fn mount_listing_probe(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/careers/SearchJobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn ids_of(result: &avature_harvester::crawler::CompanyDiscovery) -> HashSet<String> {
    result.urls.ids().clone()
}

#[tokio::test]
async fn test_complete_sitemap_skips_pagination() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());

    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &[1, 2, 3])))
        .mount(&server)
        .await;
    // sample sees page 0, then stops on the empty page 1
    mount_listing_offset(&server, 0, listing_page(&[2, 3]), 1).await;
    mount_listing_offset(&server, 2, empty_listing(), 1).await;
    mount_listing_probe(&server, listing_page(&[2, 3])).await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&base).unwrap())
        .await;

    assert_eq!(result.outcome, DiscoveryOutcome::SitemapOnly);
    assert_eq!(result.urls.len(), 3);
    assert!(result.urls.iter().all(|u| u.source == SourceMethod::Sitemap));
    assert!(result.failures.is_empty());
}

#[tokio::test]
async fn test_sitemap_gap_filled_by_pagination() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());

    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &[1, 2, 3])))
        .mount(&server)
        .await;
    // offset 0 is read by the sample and again by full pagination
    mount_listing_offset(&server, 0, listing_page(&[2, 3, 4]), 2).await;
    mount_listing_offset(&server, 3, empty_listing(), 2).await;
    mount_listing_probe(&server, listing_page(&[2, 3, 4])).await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&base).unwrap())
        .await;

    assert_eq!(result.outcome, DiscoveryOutcome::SitemapPlusHtml);
    let expected: HashSet<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids_of(&result), expected);
    assert_eq!(result.urls.len(), 4, "each job id appears once");

    let html_sourced: Vec<&str> = result
        .urls
        .iter()
        .filter(|u| u.source == SourceMethod::Html)
        .map(|u| u.job_id.as_str())
        .collect();
    assert_eq!(html_sourced, vec!["4"]);
}

#[tokio::test]
async fn test_missing_sitemap_falls_back_to_pagination() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());

    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_listing_offset(&server, 0, listing_page(&[1, 2]), 1).await;
    mount_listing_offset(&server, 2, listing_page(&[3, 4]), 1).await;
    mount_listing_offset(&server, 4, listing_page(&[5]), 1).await;
    mount_listing_offset(&server, 6, empty_listing(), 1).await;
    mount_listing_probe(&server, listing_page(&[1, 2])).await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&base).unwrap())
        .await;

    assert_eq!(result.outcome, DiscoveryOutcome::HtmlOnly);
    assert_eq!(result.urls.len(), 5);
    assert!(result.urls.iter().all(|u| u.source == SourceMethod::Html));
    assert_eq!(result.stats.strategy_used, Some(DiscoveryOutcome::HtmlOnly));
}

#[tokio::test]
async fn test_pagination_requests_one_page_past_the_last() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/careers", server.uri())).unwrap();

    mount_listing_offset(&server, 0, listing_page(&[1, 2]), 1).await;
    mount_listing_offset(&server, 2, listing_page(&[3, 4]), 1).await;
    mount_listing_offset(&server, 4, listing_page(&[5]), 1).await;
    mount_listing_offset(&server, 6, empty_listing(), 1).await;

    let config = test_config();
    let client = RateLimitedClient::new(&config.http, &config.throttle).unwrap();
    let crawler = ListingCrawler::new(&client, &config.discovery, "acme");
    let probe = ListingProbe {
        page_size: 2,
        params: ListingParams::JOB,
    };

    let result = crawler.paginate(&base, probe).await;

    // three pages with jobs plus the empty page that ends the listing
    assert_eq!(result.requests, 4);
    assert_eq!(result.urls.len(), 5);
    assert_eq!(result.halt, PaginationHalt::EmptyPage);
    assert!(result.failures.is_empty());
}

#[tokio::test]
async fn test_pagination_stops_when_page_repeats() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/careers", server.uri())).unwrap();

    // site ignores the offset and keeps serving the first page
    mount_listing_offset(&server, 0, listing_page(&[1, 2]), 1).await;
    mount_listing_offset(&server, 2, listing_page(&[1, 2]), 1).await;

    let config = test_config();
    let client = RateLimitedClient::new(&config.http, &config.throttle).unwrap();
    let crawler = ListingCrawler::new(&client, &config.discovery, "acme");
    let probe = ListingProbe {
        page_size: 2,
        params: ListingParams::JOB,
    };

    let result = crawler.paginate(&base, probe).await;

    assert_eq!(result.halt, PaginationHalt::NoNewJobs);
    assert_eq!(result.urls.len(), 2);
}

#[tokio::test]
async fn test_persistent_rate_limit_halts_pagination() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/careers", server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/careers/SearchJobs/"))
        .respond_with(ResponseTemplate::new(406))
        .expect(6)
        .mount(&server)
        .await;

    let config = test_config();
    let client = RateLimitedClient::new(&config.http, &config.throttle).unwrap();
    let crawler = ListingCrawler::new(&client, &config.discovery, "acme");
    let probe = ListingProbe {
        page_size: 6,
        params: ListingParams::JOB,
    };

    let result = crawler.paginate(&base, probe).await;

    // the first request plus max-listing-retries retries
    assert_eq!(result.requests, 6);
    assert_eq!(result.retries, 5);
    assert_eq!(
        result.halt,
        PaginationHalt::RateLimited {
            offset: 0,
            attempts: 6
        }
    );
    assert!(result.urls.is_empty());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].error_type(), ErrorType::RateLimited);
    assert_eq!(result.failures[0].http_status(), Some(406));
}

#[tokio::test]
async fn test_rate_limit_recovers_within_retries() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/careers", server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/careers/SearchJobs/"))
        .and(query_param("jobOffset", "0"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing_offset(&server, 0, listing_page(&[1, 2]), 1).await;
    mount_listing_offset(&server, 2, empty_listing(), 1).await;

    let config = test_config();
    let client = RateLimitedClient::new(&config.http, &config.throttle).unwrap();
    let crawler = ListingCrawler::new(&client, &config.discovery, "acme");
    let probe = ListingProbe {
        page_size: 2,
        params: ListingParams::JOB,
    };

    let result = crawler.paginate(&base, probe).await;

    assert_eq!(result.halt, PaginationHalt::EmptyPage);
    assert_eq!(result.retries, 2);
    assert_eq!(result.urls.len(), 2);
    assert!(result.failures.is_empty());
    assert!(client.has_recent_violations());
}

#[tokio::test]
async fn test_redirect_to_untrusted_host_is_not_followed() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();

    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("http://localhost:{}/careers", port).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &[1])))
        .expect(0)
        .mount(&server)
        .await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&base).unwrap())
        .await;

    assert_eq!(result.outcome, DiscoveryOutcome::ExternalRedirectDetected);
    assert!(result.urls.is_empty());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].error_type(), ErrorType::ExternalRedirect);
}

#[tokio::test]
async fn test_lookalike_host_is_rejected() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());

    // "127.0.0.1" appears in the host but the host is not trusted
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "http://127.0.0.1.attacker.test/careers"),
        )
        .mount(&server)
        .await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&base).unwrap())
        .await;

    assert_eq!(result.outcome, DiscoveryOutcome::ExternalRedirectDetected);
}

#[tokio::test]
async fn test_trusted_redirect_is_followed() {
    let server = MockServer::start().await;
    let old_base = format!("{}/old", server.uri());
    let base = format!("{}/careers", server.uri());

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", base.as_str()))
        .mount(&server)
        .await;
    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &[7, 8])))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing_offset(&server, 0, listing_page(&[7, 8]), 1).await;
    mount_listing_offset(&server, 2, empty_listing(), 1).await;
    mount_listing_probe(&server, listing_page(&[7, 8])).await;

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let result = harvester
        .discovery_engine()
        .discover("acme", Url::parse(&old_base).unwrap())
        .await;

    assert!(result.context.was_redirected());
    assert_eq!(result.context.resolved_base_url().path(), "/careers");
    assert_eq!(result.outcome, DiscoveryOutcome::SitemapOnly);
    assert_eq!(result.urls.len(), 2);
}

#[tokio::test]
async fn test_discovery_batch_writes_artifacts() {
    let server = MockServer::start().await;
    let base = format!("{}/careers", server.uri());

    mount_home(&server).await;
    Mock::given(method("GET"))
        .and(path("/careers/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &[1, 2])))
        .mount(&server)
        .await;
    mount_listing_offset(&server, 0, listing_page(&[1, 2]), 1).await;
    mount_listing_offset(&server, 2, empty_listing(), 1).await;
    mount_listing_probe(&server, listing_page(&[1, 2])).await;

    let dir = tempfile::TempDir::new().unwrap();
    let tenants = vec![Tenant {
        company: "acme".to_string(),
        base_url: Url::parse(&base).unwrap(),
    }];

    let harvester = Harvester::new(test_config()).expect("Failed to build harvester");
    let batch = harvester
        .run_discovery_batch(&tenants, dir.path())
        .await
        .expect("Discovery batch failed");

    assert_eq!(batch.total_urls(), 2);

    let urls = std::fs::read_to_string(dir.path().join("acme_urls.txt")).unwrap();
    assert_eq!(urls.lines().count(), 2);

    let names: Vec<String> = batch
        .files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert!(names.iter().any(|n| n.starts_with("all_discovered_urls_")));
    assert!(names.iter().any(|n| n.starts_with("discovery_summary_")));
}
