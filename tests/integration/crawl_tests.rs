//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use trawl::cache::{DiskCache, PageStore};
use trawl::config::UserAgentConfig;
use trawl::crawler::{
    http_client_builder, CrawlOptions, Crawler, DomainScope, Fetcher, MatchPolicy, MatchTarget,
    SearchSpec,
};
use trawl::TrawlError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POSTCODE: &str = r"\d{4}\s?[A-Z]{2}";

fn crawler(cache: Option<Arc<dyn PageStore>>) -> Crawler {
    let fetcher = Fetcher::new(&UserAgentConfig::default(), Duration::from_secs(5), cache)
        .expect("Failed to build fetcher");
    Crawler::new(fetcher)
}

/// A crawler whose clients resolve every name in `hosts` to the mock server
fn resolving_crawler(server: &MockServer, hosts: &[&str]) -> Crawler {
    let agent = UserAgentConfig::default();
    let build = |insecure: bool| {
        hosts
            .iter()
            .fold(
                http_client_builder(&agent, Duration::from_secs(5), insecure),
                |builder, host| builder.resolve(host, *server.address()),
            )
            .build()
            .unwrap()
    };
    Crawler::new(Fetcher::from_clients(
        build(false),
        build(true),
        agent.user_agent_string(),
        None,
    ))
}

fn port(server: &MockServer) -> u16 {
    server.address().port()
}

fn postcode_spec() -> SearchSpec {
    SearchSpec::from_patterns([("postcode", POSTCODE)]).unwrap()
}

fn html(body: &str) -> String {
    format!("<html><head><title>Test</title></head><body>{}</body></html>", body)
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(body), "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

fn paths(urls: &[String]) -> Vec<String> {
    urls.iter()
        .map(|u| url::Url::parse(u).unwrap().path().to_string())
        .collect()
}

#[tokio::test]
async fn test_postcode_found_on_contact_page() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/news">News</a><a href="/about">About</a><a href="/contact">Contact us</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/contact",
        "<p>Visit us at Main Street 1, 1234 AB Utrecht</p>",
        1,
    )
    .await;
    mount_page(&mock_server, "/about", "<p>About us</p>", 0).await;
    mount_page(&mock_server, "/news", "<p>News</p>", 0).await;

    let options = CrawlOptions {
        sort_order_hints: vec!["contact".into()],
        stop_on_keys: vec!["postcode".into()],
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .expect("Crawl failed");

    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
    assert!(result.stopped_early());
    assert_eq!(paths(result.visited_urls()), vec!["/", "/contact"]);
    assert_eq!(
        paths(&result.found_on()["postcode"]),
        vec!["/contact".to_string()]
    );
}

#[tokio::test]
async fn test_sort_hints_order_the_frontier() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/a">News</a><a href="/b">Contact</a><a href="/c">About</a><a href="/d">Blog</a>"#,
        1,
    )
    .await;
    for page in ["/a", "/b", "/c", "/d"] {
        mount_page(&mock_server, page, "<p>page</p>", 1).await;
    }

    let options = CrawlOptions {
        sort_order_hints: vec!["about".into(), "contact".into()],
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &options)
        .await
        .unwrap();

    assert_eq!(
        paths(result.visited_urls()),
        vec!["/", "/c", "/b", "/a", "/d"]
    );
}

#[tokio::test]
async fn test_stop_on_root_match_fetches_nothing_else() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<p>1234 AB</p><a href="/about">About</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/about", "<p>5678 CD</p>", 0).await;

    let options = CrawlOptions {
        stop_on_keys: vec!["postcode".into()],
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();

    assert!(result.stopped_early());
    assert_eq!(result.visited_urls().len(), 1);
    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
}

#[tokio::test]
async fn test_stop_requires_every_key() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<p>1234 AB</p><a href="/contact">Contact</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/contact", "<p>call +31612345678</p>", 1).await;

    let specs = postcode_spec().with_pattern("phone", r"\+31\d{9}").unwrap();
    let options = CrawlOptions {
        stop_on_keys: vec!["postcode".into(), "phone".into()],
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &specs, &options)
        .await
        .unwrap();

    assert!(result.stopped_early());
    assert!(result.is_found("postcode"));
    assert!(result.is_found("phone"));
}

#[tokio::test]
async fn test_links_outside_scope_are_not_followed() {
    let mock_server = MockServer::start().await;
    let port = url::Url::parse(&mock_server.uri())
        .unwrap()
        .port()
        .unwrap();

    // Same server, but reached through a different host name
    let body = format!(
        r#"<a href="/inside">Inside</a><a href="http://localhost:{}/outside">Outside</a>"#,
        port
    );
    mount_page(&mock_server, "/", &body, 1).await;
    mount_page(&mock_server, "/inside", "<p>inside</p>", 1).await;
    mount_page(&mock_server, "/outside", "<p>outside</p>", 0).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/inside"]);
    assert!(result.external_hosts().contains("localhost"));
}

#[tokio::test]
async fn test_no_page_is_fetched_twice() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/a">A</a><a href="/a/">A again</a><a href="/b#top">B</a><a href="/">Home</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/a",
        r#"<a href="/">Home</a><a href="/b">B</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/b", r#"<a href="/a">A</a>"#, 1).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_depth_limit() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", r#"<a href="/one">1</a>"#, 1).await;
    mount_page(&mock_server, "/one", r#"<a href="/two">2</a>"#, 1).await;
    mount_page(&mock_server, "/two", "<p>too deep</p>", 0).await;

    let options = CrawlOptions {
        max_depth: 1,
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &options)
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/one"]);
}

#[tokio::test]
async fn test_max_pages_counts_the_root() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/a", "<p>a</p>", 1).await;
    mount_page(&mock_server, "/b", "<p>b</p>", 0).await;
    mount_page(&mock_server, "/c", "<p>c</p>", 0).await;

    let options = CrawlOptions {
        max_pages: 2,
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &options)
        .await
        .unwrap();

    assert_eq!(result.visited_urls().len(), 2);
    assert!(!result.stopped_early());
}

#[tokio::test]
async fn test_failed_page_does_not_abort_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/broken">Broken</a><a href="/ok">Ok</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/ok", "<p>1234 AB</p>", 1).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(result.failed_urls().len(), 1);
    assert!(result.failed_urls()[0].url.ends_with("/broken"));
    assert!(result.failed_urls()[0].reason.contains("500"));
    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
}

#[tokio::test]
async fn test_unreachable_root_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await;

    assert!(matches!(result, Err(TrawlError::RootUnreachable { .. })));
}

#[tokio::test]
async fn test_unresolvable_scheme_is_an_error() {
    let mock_server = MockServer::start().await;
    let address = mock_server.uri().trim_start_matches("http://").to_string();

    // HEAD is not mocked, so the http probe gets a 404 and https fails outright
    let result = crawler(None)
        .crawl(&address, &postcode_spec(), &CrawlOptions::default())
        .await;

    assert!(matches!(result, Err(TrawlError::SchemeResolution { .. })));
}

#[tokio::test]
async fn test_cached_crawl_matches_live_crawl() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "/",
        r#"<p>1234 AB</p><a href="/contact">Contact</a><a href="/about">About</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/contact", "<p>5678 CD</p>", 1).await;
    mount_page(&mock_server, "/about", "<p>9012 EF</p>", 1).await;

    let cache: Arc<dyn PageStore> = Arc::new(DiskCache::new(cache_dir.path()).unwrap());
    let crawler = crawler(Some(cache));
    let options = CrawlOptions {
        store_to_cache: true,
        ..Default::default()
    };

    let first = crawler
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();
    let second = crawler
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();

    assert_eq!(first.matches(), second.matches());
    assert_eq!(first.visited_urls(), second.visited_urls());
    assert_eq!(first.matches_for("postcode").len(), 3);
}

#[tokio::test]
async fn test_new_search_key_reuses_cache() {
    let mock_server = MockServer::start().await;
    let cache_dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", "<p>1234 AB, call +31612345678</p>", 1).await;

    let cache: Arc<dyn PageStore> = Arc::new(DiskCache::new(cache_dir.path()).unwrap());
    let crawler = crawler(Some(cache));
    let options = CrawlOptions {
        store_to_cache: true,
        ..Default::default()
    };

    let specs = postcode_spec();
    crawler
        .crawl(&mock_server.uri(), &specs, &options)
        .await
        .unwrap();

    let specs = specs.with_pattern("phone", r"\+31\d{9}").unwrap();
    let result = crawler
        .crawl(&mock_server.uri(), &specs, &options)
        .await
        .unwrap();

    assert_eq!(result.matches_for("phone"), ["+31612345678"]);
}

#[tokio::test]
async fn test_first_match_policy() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<p>1234 AB</p><p>5678 CD</p><a href="/more">More</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/more", "<p>9012 EF</p>", 1).await;

    let mut options = CrawlOptions::default();
    options
        .match_policies
        .insert("postcode".into(), MatchPolicy::First);

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();

    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
}

#[tokio::test]
async fn test_concurrent_crawl_visits_same_pages() {
    let mock_server = MockServer::start().await;

    let links: String = (0..8)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_page(&mock_server, "/", &links, 1).await;
    for i in 0..8 {
        mount_page(&mock_server, &format!("/p{}", i), r#"<a href="/">Home</a>"#, 1).await;
    }

    let options = CrawlOptions {
        concurrency: 4,
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &options)
        .await
        .unwrap();

    let mut visited = paths(result.visited_urls());
    visited.sort();
    let mut expected: Vec<String> = (0..8).map(|i| format!("/p{}", i)).collect();
    expected.push("/".to_string());
    expected.sort();
    assert_eq!(visited, expected);
}

#[tokio::test]
async fn test_robots_txt_respected_when_enabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /private", "text/plain"),
        )
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/",
        r#"<a href="/private/page">Private</a><a href="/public">Public</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/private/page", "<p>secret</p>", 0).await;
    mount_page(&mock_server, "/public", "<p>public</p>", 1).await;

    let options = CrawlOptions {
        respect_robots: true,
        ..Default::default()
    };

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &options)
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/public"]);
}

#[tokio::test]
async fn test_links_with_other_extensions_are_skipped() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/logo.png">Logo</a><a href="/index.html">Index</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/index.html", "<p>index</p>", 1).await;
    mount_page(&mock_server, "/logo.png", "", 0).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &SearchSpec::new(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/index.html"]);
}

#[tokio::test]
async fn test_redirect_out_of_scope_is_not_followed() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", r#"<a href="/go">Go</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            format!("http://localhost:{}/away", port(&mock_server)).as_str(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/away", "<p>9999 ZZ</p>", 0).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();

    assert!(result.matches_for("postcode").is_empty());
    assert_eq!(paths(result.visited_urls()), vec!["/"]);
    assert_eq!(result.failed_urls().len(), 1);
    assert!(result.failed_urls()[0].url.ends_with("/go"));
    assert!(result.external_hosts().contains("localhost"));
}

#[tokio::test]
async fn test_redirect_within_scope_is_followed() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", r#"<a href="/moved">Contact</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/contact"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/contact", "<p>1234 AB</p>", 1).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
    assert_eq!(paths(result.visited_urls()), vec!["/", "/moved"]);
    assert!(result.failed_urls().is_empty());
}

#[tokio::test]
async fn test_links_are_requested_as_written() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", r#"<a href="/dir/">Directory</a>"#, 1).await;
    mount_page(&mock_server, "/dir/", "<p>1234 AB</p>", 1).await;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
    assert!(result.failed_urls().is_empty());
    assert_eq!(paths(result.visited_urls()), vec!["/", "/dir"]);
}

#[tokio::test]
async fn test_html_match_target_searches_markup() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<p>Find us on the map</p><script>var zip = "1234 AB";</script>"#,
        2,
    )
    .await;

    let text = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();
    assert!(text.matches_for("postcode").is_empty());

    let options = CrawlOptions {
        match_target: MatchTarget::Html,
        ..Default::default()
    };
    let markup = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();
    assert_eq!(markup.matches_for("postcode"), ["1234 AB"]);
}

#[tokio::test]
async fn test_crawl_without_certificate_validation() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", r#"<a href="/contact">Contact</a>"#, 1).await;
    mount_page(&mock_server, "/contact", "<p>1234 AB</p>", 1).await;

    let mut options = CrawlOptions::default();
    options.fetch.validate_certificate = false;

    let result = crawler(None)
        .crawl(&mock_server.uri(), &postcode_spec(), &options)
        .await
        .unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/contact"]);
    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
}

#[tokio::test]
async fn test_subdomain_scope_follows_subdomains_only() {
    let mock_server = MockServer::start().await;
    let port = port(&mock_server);

    let body = format!(
        r#"<a href="http://shop.example.test:{port}/deals">Shop</a>
           <a href="http://other.test:{port}/elsewhere">Elsewhere</a>"#,
        port = port
    );
    mount_page(&mock_server, "/", &body, 2).await;
    mount_page(&mock_server, "/deals", "<p>1234 AB</p>", 1).await;
    mount_page(&mock_server, "/elsewhere", "<p>9999 ZZ</p>", 0).await;

    let crawler = resolving_crawler(&mock_server, &["example.test", "shop.example.test", "other.test"]);
    let root = format!("http://example.test:{}/", port);

    let options = CrawlOptions {
        domain_scope: DomainScope::Subdomains,
        ..Default::default()
    };
    let result = crawler.crawl(&root, &postcode_spec(), &options).await.unwrap();

    assert_eq!(paths(result.visited_urls()), vec!["/", "/deals"]);
    assert_eq!(result.matches_for("postcode"), ["1234 AB"]);
    assert!(result.external_hosts().contains("other.test"));

    let host_only = crawler
        .crawl(&root, &postcode_spec(), &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(paths(host_only.visited_urls()), vec!["/"]);
    assert!(host_only.external_hosts().contains("shop.example.test"));
}
