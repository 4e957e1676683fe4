use super::validate_url as validate_url_impl;
use super::*;
use std::ops::ControlFlow;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"
<html>
    <head><script>analytics()</script></head>
    <body>
        <div class="sidebar">Menu</div>
        <main>
            <h1>Subnets</h1>
            <p>A subnet is a range of IP addresses in your VPC.</p>
        </main>
    </body>
</html>
"#;

fn new_fetcher(dir: &TempDir) -> PageFetcher {
    let cache = ContentCache::load(dir.path().join("cache.json")).expect("should load cache");
    PageFetcher::new(HttpClient::default(), cache)
}

#[test]
fn validate_url() {
    assert!(validate_url_impl("https://docs.aws.amazon.com/vpc/").is_ok());
    assert!(validate_url_impl("http://localhost:8080/page.html").is_ok());

    assert!(validate_url_impl("ftp://example.com").is_err());
    assert!(validate_url_impl("not-a-url").is_err());
    assert!(validate_url_impl("").is_err());
}

#[test]
fn failure_display_matches_legacy_messages() {
    assert_eq!(
        FetchFailure::Status(404).to_string(),
        "Failed to retrieve the webpage"
    );
    assert_eq!(
        FetchFailure::Transport("timed out".to_string()).to_string(),
        "Error fetching page: timed out"
    );
}

#[test]
fn invalid_url_is_a_transport_failure() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut fetcher = new_fetcher(&dir);

    let outcome = fetcher.fetch("not a url");
    assert!(matches!(
        outcome,
        FetchOutcome::Failed(FetchFailure::Transport(_))
    ));
    assert!(fetcher.cache().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_extracts_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vpc/subnets.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("should create temp dir");
    let url = format!("{}/vpc/subnets.html", server.uri());
    let mut fetcher = new_fetcher(&dir);

    let first = fetcher.fetch(&url);
    let second = fetcher.fetch(&url);

    let expected = "Subnets\nA subnet is a range of IP addresses in your VPC.";
    assert_eq!(first, FetchOutcome::Fetched(expected.to_string()));
    assert_eq!(second, first);

    fetcher.save_cache().expect("should save cache");

    // A new run reads from the persisted cache without a request
    let mut rerun = new_fetcher(&dir);
    assert_eq!(rerun.fetch(&url), FetchOutcome::Fetched(expected.to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("should create temp dir");
    let url = format!("{}/missing.html", server.uri());
    let mut fetcher = new_fetcher(&dir);

    assert_eq!(
        fetcher.fetch(&url),
        FetchOutcome::Failed(FetchFailure::Status(404))
    );
    assert!(matches!(fetcher.fetch(&url), FetchOutcome::Failed(_)));
    assert!(fetcher.cache().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_all_skips_duplicates_and_honours_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("should create temp dir");
    let links = vec![
        format!("{}/a.html", server.uri()),
        format!("{}/a.html", server.uri()),
        format!("{}/b.html", server.uri()),
        format!("{}/c.html", server.uri()),
    ];
    let mut fetcher = new_fetcher(&dir);

    let mut visited = Vec::new();
    let stats = fetcher.fetch_all(&links, Some(2), |url, outcome| {
        assert!(matches!(outcome, FetchOutcome::Fetched(_)));
        visited.push(url.to_string());
        ControlFlow::Continue(())
    });

    assert_eq!(visited, vec![links[0].clone(), links[2].clone()]);
    assert_eq!(
        stats,
        FetchStats {
            fetched: 2,
            cached: 0,
            failed: 0
        }
    );
}

#[test]
fn fetch_all_stops_on_break() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut cache = ContentCache::load(dir.path().join("cache.json")).expect("should load cache");
    cache.insert("https://x/a.html", "A");
    cache.insert("https://x/b.html", "B");
    let mut fetcher = PageFetcher::new(HttpClient::default(), cache);
    let links = vec!["https://x/a.html".to_string(), "https://x/b.html".to_string()];

    let mut visited = Vec::new();
    let stats = fetcher.fetch_all(&links, None, |url, _| {
        visited.push(url.to_string());
        ControlFlow::Break(())
    });

    assert_eq!(visited, vec!["https://x/a.html".to_string()]);
    assert_eq!(stats.cached, 1);
}
