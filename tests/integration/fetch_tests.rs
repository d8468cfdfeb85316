//! Integration tests for the fetcher and page cache

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use trawl::cache::{CacheKey, DiskCache, MemoryCache, PageStore};
use trawl::config::UserAgentConfig;
use trawl::crawler::{DomainScope, FetchError, FetchOptions, Fetcher, RedirectScope, Scheme};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(cache: Option<Arc<dyn PageStore>>) -> Fetcher {
    Fetcher::new(&UserAgentConfig::default(), Duration::from_secs(5), cache)
        .expect("Failed to build fetcher")
}

/// "127.0.0.1:port" without a scheme
fn address(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

async fn mount_get(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    mount_get(&mock_server, "/page", "<p>hello 1234 AB</p>", 1).await;

    let cache: Arc<dyn PageStore> = Arc::new(MemoryCache::new());
    let fetcher = fetcher(Some(cache));
    let url = format!("{}/page", mock_server.uri());

    let first = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    let second = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.content, second.content);
    assert_eq!(first.resolved_url, second.resolved_url);
    assert_eq!(second.scheme, Scheme::Http);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let mock_server = MockServer::start().await;
    mount_get(&mock_server, "/page", "<p>hello</p>", 2).await;

    let cache = Arc::new(MemoryCache::new());
    let store: Arc<dyn PageStore> = cache.clone();
    let fetcher = fetcher(Some(store));
    let url = format!("{}/page", mock_server.uri());
    let options = FetchOptions {
        use_cache: false,
        ..Default::default()
    };

    fetcher.fetch(&url, &options).await.unwrap();
    fetcher.fetch(&url, &options).await.unwrap();

    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_scheme_less_url_is_probed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/page", "<p>probed</p>", 1).await;

    let page = fetcher(None)
        .fetch(&format!("{}/page", address(&mock_server)), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(page.scheme, Scheme::Http);
    assert_eq!(page.requested_url.scheme(), "http");
    assert!(page.content.contains("probed"));
}

#[tokio::test]
async fn test_scheme_hint_skips_probing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/", "<p>home</p>", 1).await;

    let options = FetchOptions {
        scheme_hint: Some(Scheme::Http),
        ..Default::default()
    };
    let page = fetcher(None)
        .fetch(&address(&mock_server), &options)
        .await
        .unwrap();

    assert_eq!(page.scheme, Scheme::Http);
}

#[tokio::test]
async fn test_no_reachable_scheme() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/", "<p>home</p>", 0).await;

    let result = fetcher(None)
        .fetch(&address(&mock_server), &FetchOptions::default())
        .await;

    assert!(matches!(result, Err(FetchError::SchemeResolution { .. })));
}

#[tokio::test]
async fn test_without_reachability_check_https_is_assumed() {
    let mock_server = MockServer::start().await;

    let options = FetchOptions {
        validate_reachability: false,
        ..Default::default()
    };
    let result = fetcher(None)
        .fetch(&address(&mock_server), &options)
        .await;

    // the mock server only speaks plain http
    assert!(matches!(result, Err(FetchError::Network { .. })));
}

#[tokio::test]
async fn test_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = fetcher(None)
        .fetch(&format!("{}/missing", mock_server.uri()), &FetchOptions::default())
        .await;

    match result {
        Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_binary_content_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logo"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2, 3], "image/png"))
        .mount(&mock_server)
        .await;

    let result = fetcher(None)
        .fetch(&format!("{}/logo", mock_server.uri()), &FetchOptions::default())
        .await;

    assert!(matches!(result, Err(FetchError::UnsupportedContent { .. })));
}

#[tokio::test]
async fn test_redirect_is_followed_and_cached() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/new", "<p>moved</p>", 1).await;

    let cache: Arc<dyn PageStore> = Arc::new(DiskCache::new(cache_dir.path()).unwrap());
    let fetcher = fetcher(Some(cache));
    let url = format!("{}/old", mock_server.uri());

    let live = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    let cached = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();

    assert_eq!(live.resolved_url.path(), "/new");
    assert_eq!(cached.resolved_url, live.resolved_url);
    assert_eq!(cached.requested_url.path(), "/old");
    assert!(cached.from_cache);
}

#[tokio::test]
async fn test_clearing_cache_forces_refetch() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    mount_get(&mock_server, "/page", "<p>content</p>", 2).await;

    let disk = Arc::new(DiskCache::new(cache_dir.path()).unwrap());
    let store: Arc<dyn PageStore> = disk.clone();
    let fetcher = fetcher(Some(store));
    let url = format!("{}/page", mock_server.uri());

    fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    assert_eq!(disk.len(), 1);

    disk.clear().unwrap();
    assert!(disk.is_empty());

    let page = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    assert!(!page.from_cache);
}

#[tokio::test]
async fn test_cache_survives_new_fetcher() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();
    mount_get(&mock_server, "/page", "<p>durable</p>", 1).await;

    let url = format!("{}/page", mock_server.uri());
    {
        let cache: Arc<dyn PageStore> = Arc::new(DiskCache::new(cache_dir.path()).unwrap());
        fetcher(Some(cache))
            .fetch(&url, &FetchOptions::default())
            .await
            .unwrap();
    }

    let cache = DiskCache::new(cache_dir.path()).unwrap();
    let key = CacheKey::for_url(&url::Url::parse(&url).unwrap());
    assert_eq!(cache.get(&key).unwrap().content, "<p>durable</p>");

    let store: Arc<dyn PageStore> = Arc::new(cache);
    let page = fetcher(Some(store))
        .fetch(&url, &FetchOptions::default())
        .await
        .unwrap();
    assert!(page.from_cache);
}

#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;

    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
        contact_email: Some("test@example.com".to_string()),
    };

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&user_agent, Duration::from_secs(5), None).unwrap();
    fetcher
        .fetch(&mock_server.uri(), &FetchOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_certificate_validation_is_reported() {
    let mock_server = MockServer::start().await;
    mount_get(&mock_server, "/", "<p>ok</p>", 2).await;

    let validated = fetcher(None)
        .fetch(&mock_server.uri(), &FetchOptions::default())
        .await
        .unwrap();
    assert!(validated.certificate_valid);

    let options = FetchOptions {
        validate_certificate: false,
        ..Default::default()
    };
    let unvalidated = fetcher(None)
        .fetch(&mock_server.uri(), &options)
        .await
        .unwrap();
    assert!(!unvalidated.certificate_valid);
}

#[tokio::test]
async fn test_probe_accepts_redirect_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/home"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/home"))
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/home", "<p>home</p>", 1).await;

    let page = fetcher(None)
        .fetch(&address(&mock_server), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(page.scheme, Scheme::Http);
    assert_eq!(page.resolved_url.path(), "/home");
}

#[tokio::test]
async fn test_redirect_loop_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/b"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/a"))
        .mount(&mock_server)
        .await;

    let result = fetcher(None)
        .fetch(&format!("{}/a", mock_server.uri()), &FetchOptions::default())
        .await;

    assert!(matches!(result, Err(FetchError::RedirectLoop { .. })));
}

#[tokio::test]
async fn test_redirect_outside_scope_is_refused() {
    let mock_server = MockServer::start().await;
    let away = format!("http://localhost:{}/away", mock_server.address().port());

    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", away.as_str()))
        .mount(&mock_server)
        .await;
    mount_get(&mock_server, "/away", "<p>away</p>", 0).await;

    let options = FetchOptions {
        redirect_scope: Some(RedirectScope::new("127.0.0.1", DomainScope::Host)),
        ..Default::default()
    };
    let result = fetcher(None)
        .fetch(&format!("{}/go", mock_server.uri()), &options)
        .await;

    match result {
        Err(FetchError::OutOfScopeRedirect { location, .. }) => {
            assert_eq!(location.host_str(), Some("localhost"))
        }
        other => panic!("expected out-of-scope redirect, got {:?}", other),
    }
}
