//! Integration tests for the job-board finder
//!
//! A wiremock server stands in for a tenant's hosted root; candidates that
//! are not mounted answer 404.

use avature_harvester::config::Config;
use avature_harvester::crawler::{BoardMatch, BoardStatus, Harvester};
use avature_harvester::output::write_board_outputs;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    let mut config = Config::default();
    config.http.request_timeout_ms = 2_000;
    config.throttle.request_delay_ms = 1;
    config.throttle.max_adaptive_delay_ms = 10;
    config.discovery.trusted_domains = vec!["127.0.0.1".to_string()];
    config.challenge.enabled = false;
    config
}

fn platform_page(total: u32) -> String {
    format!(
        r#"<html><head>
        <script src="/ASSET/portal/jquery.min.js"></script>
        </head><body>
        <div class="list-controls__text__legend">1-20 of {total} results</div>
        <footer>Powered by Avature</footer>
        </body></html>"#
    )
}

async fn mount(server: &MockServer, at: &str, response: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

async fn find(server: &MockServer) -> BoardMatch {
    let harvester = Harvester::new(test_config()).unwrap();
    let root = Url::parse(&server.uri()).unwrap();
    harvester.board_finder().find_at("acme", &root).await
}

#[tokio::test]
async fn test_first_platform_candidate_wins() {
    let server = MockServer::start().await;
    mount(&server, "/careers", ResponseTemplate::new(404), 1).await;
    mount(
        &server,
        "/Careers",
        ResponseTemplate::new(200).set_body_string("<html><body>Apply through our new ATS</body></html>"),
        1,
    )
    .await;
    mount(&server, "/talent", ResponseTemplate::new(200).set_body_string(platform_page(57)), 1).await;
    mount(&server, "/jobs", ResponseTemplate::new(200).set_body_string(platform_page(3)), 0).await;

    let found = find(&server).await;
    assert_eq!(found.status, BoardStatus::Valid);
    assert_eq!(found.url.as_ref().map(|u| u.path()), Some("/talent"));
    assert_eq!(found.job_count, 57);
    assert_eq!(found.attempts, 3);
    assert!(found.to_tenant().is_some());
}

#[tokio::test]
async fn test_blocked_candidate_counts_as_likely_valid() {
    let server = MockServer::start().await;
    mount(&server, "/careers", ResponseTemplate::new(406), 1).await;
    mount(&server, "/Careers", ResponseTemplate::new(200).set_body_string(platform_page(1)), 0).await;

    let found = find(&server).await;
    assert_eq!(found.status, BoardStatus::ValidBlocked);
    assert_eq!(found.attempts, 1);
    assert_eq!(found.job_count, 0);
    assert!(found.reason.unwrap().contains("406"));
}

#[tokio::test]
async fn test_off_platform_redirect_is_recorded() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/careers",
        ResponseTemplate::new(302).insert_header("Location", "https://careers.example.com/jobs"),
        1,
    )
    .await;

    let found = find(&server).await;
    assert_eq!(found.status, BoardStatus::Redirected);
    assert_eq!(
        found.redirected_to.as_ref().map(|u| u.as_str()),
        Some("https://careers.example.com/jobs")
    );
    assert_eq!(found.url.as_ref().map(|u| u.path()), Some("/careers"));
    assert!(found.to_tenant().is_none());
}

#[tokio::test]
async fn test_same_host_redirect_is_followed() {
    let server = MockServer::start().await;
    let target = format!("{}/en_US/careers", server.uri());
    mount(
        &server,
        "/careers",
        ResponseTemplate::new(301).insert_header("Location", target.as_str()),
        1,
    )
    .await;
    mount(&server, "/en_US/careers", ResponseTemplate::new(200).set_body_string(platform_page(9)), 1).await;

    let found = find(&server).await;
    assert_eq!(found.status, BoardStatus::Valid);
    assert_eq!(found.attempts, 1);
    assert_eq!(found.job_count, 9);
}

#[tokio::test]
async fn test_every_candidate_tried_before_giving_up() {
    let server = MockServer::start().await;

    let found = find(&server).await;
    assert_eq!(found.status, BoardStatus::NoValidUrls);
    assert_eq!(found.attempts, 13);
    assert!(found.url.is_none());
    assert!(found.reason.unwrap().contains("13 candidates"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 13);
    assert_eq!(requests[0].url.path(), "/careers");
    assert_eq!(requests[12].url.path(), "/fr/careers");
}

#[tokio::test]
async fn test_found_board_lands_in_success_list() {
    let server = MockServer::start().await;
    mount(&server, "/careers", ResponseTemplate::new(200).set_body_string(platform_page(4)), 1).await;

    let found = find(&server).await;
    let dir = tempfile::TempDir::new().unwrap();
    let files = write_board_outputs(dir.path(), "20260101_000000", &[found]).unwrap();

    let success = std::fs::read_to_string(&files[0]).unwrap();
    assert_eq!(success, format!("{}/careers\n", server.uri()));
    assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "");
}
