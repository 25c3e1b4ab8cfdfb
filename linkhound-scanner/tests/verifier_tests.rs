mod common;

use common::{CallLog, FakePage, FakeSession, FakeWeb};
use linkhound_scanner::browser::WaitUntil;
use linkhound_scanner::{LinkStatus, StatusVerifier};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// HTTP Verification Tests
// ============================================================================

#[tokio::test]
async fn test_ok_and_not_found() {
    let server = MockServer::start().await;
    serve(&server, "/ok", ResponseTemplate::new(200)).await;
    serve(&server, "/gone", ResponseTemplate::new(404)).await;
    let verifier = StatusVerifier::new().unwrap();

    let ok = verifier.verify(&format!("{}/ok", server.uri()), None).await;
    assert_eq!(ok.status, LinkStatus::Http(200));
    assert!(ok.is_success());
    assert!(!ok.via_browser);

    let gone = verifier.verify(&format!("{}/gone", server.uri()), None).await;
    assert_eq!(gone.status, LinkStatus::Http(404));
    assert_eq!(gone.status_text, "Not Found");
    assert!(!gone.is_success());
}

#[tokio::test]
async fn test_not_modified_is_success() {
    let server = MockServer::start().await;
    serve(&server, "/cached", ResponseTemplate::new(304)).await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/cached", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Http(304));
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_server_error_is_captured_not_raised() {
    let server = MockServer::start().await;
    serve(&server, "/boom", ResponseTemplate::new(503)).await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/boom", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Http(503));
}

#[tokio::test]
async fn test_follows_redirects_and_counts_them() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/older"),
    )
    .await;
    serve(
        &server,
        "/older",
        ResponseTemplate::new(302).insert_header("location", format!("{}/new", server.uri()).as_str()),
    )
    .await;
    serve(&server, "/new", ResponseTemplate::new(200)).await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/old", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Http(200));
    assert_eq!(outcome.redirects, 2);
    assert_eq!(outcome.final_url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_redirect_loop_reports_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/loop",
        ResponseTemplate::new(302).insert_header("location", "/loop"),
    )
    .await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/loop", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Error);
    assert_eq!(outcome.redirects, 5);
    assert_eq!(outcome.status_text, "Too many redirects (5)");
    assert!(!outcome.status.is_redirect());
}

#[tokio::test]
async fn test_five_redirects_still_followed() {
    let server = MockServer::start().await;
    for hop in 0..5 {
        serve(
            &server,
            &format!("/hop{}", hop),
            ResponseTemplate::new(301).insert_header("location", format!("/hop{}", hop + 1)),
        )
        .await;
    }
    serve(&server, "/hop5", ResponseTemplate::new(200)).await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/hop0", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Http(200));
    assert_eq!(outcome.redirects, 5);
}

#[tokio::test]
async fn test_sends_browser_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(wiremock::matchers::header_regex("user-agent", "Chrome/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("{}/ua", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Http(200));
}

// ============================================================================
// Network Error Taxonomy Tests
// ============================================================================

#[tokio::test]
async fn test_timeout_sentinel() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;
    let verifier =
        StatusVerifier::with_timeouts(Duration::from_millis(200), Duration::from_secs(1)).unwrap();

    let outcome = verifier.verify(&format!("{}/slow", server.uri()), None).await;

    assert_eq!(outcome.status, LinkStatus::Timeout);
}

#[tokio::test]
async fn test_connection_refused_sentinel() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(&format!("http://127.0.0.1:{}/", port), None).await;

    assert_eq!(outcome.status, LinkStatus::ConnectionRefused);
}

#[tokio::test]
async fn test_dns_failure_sentinel() {
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify("http://linkhound-missing-host.invalid/", None).await;

    assert_eq!(outcome.status, LinkStatus::DnsError);
}

// ============================================================================
// Classification Short-Circuit Tests
// ============================================================================

#[tokio::test]
async fn test_skipped_targets_never_touch_network_or_browser() {
    let web = Arc::new(FakeWeb::new());
    let session = FakeSession::new(web.clone());
    let verifier = StatusVerifier::new().unwrap();

    for url in [
        "data:image/gif;base64,R0lGODlhAQABAAAAACw=",
        "blob:https://site.test/6a2f",
        "https://connect.facebook.net/en_US/fbevents.js",
        "https://www.facebook.com/tr?id=1&ev=PageView",
    ] {
        let outcome = verifier.verify(url, Some(&session)).await;
        assert!(outcome.skipped, "{} should be skipped", url);
        assert_eq!(outcome.status, LinkStatus::Http(200));
        assert_eq!(outcome.response_time, Duration::ZERO);
    }
    assert_eq!(CallLog::count(&web.log.tabs_opened), 0);
}

#[tokio::test]
async fn test_mailto_outcomes() {
    let verifier = StatusVerifier::new().unwrap();

    assert!(verifier.verify("mailto:a@b.co", None).await.is_success());
    assert!(!verifier.verify("mailto:not-an-email", None).await.is_success());
}

// ============================================================================
// Affiliate Browser Verification Tests
// ============================================================================

const AFFILIATE: &str = "https://shop.test/product?clickid=abc";

#[tokio::test]
async fn test_affiliate_403_in_browser_treated_as_working() {
    let web = Arc::new(FakeWeb::new().page(AFFILIATE, FakePage::status(403)));
    let session = FakeSession::new(web.clone());
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(AFFILIATE, Some(&session)).await;

    assert_eq!(outcome.status, LinkStatus::Http(403));
    assert!(outcome.via_browser);
    assert!(outcome.affiliate);
    assert!(outcome.treat_as_working);
    assert_eq!(web.log.navigations.lock().unwrap()[0].1, WaitUntil::DomReady);
    assert_eq!(CallLog::count(&web.log.tabs_closed), 1);
}

#[tokio::test]
async fn test_affiliate_404_reported_normally() {
    let web = Arc::new(FakeWeb::new().page(AFFILIATE, FakePage::status(404)));
    let session = FakeSession::new(web);
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(AFFILIATE, Some(&session)).await;

    assert_eq!(outcome.status, LinkStatus::Http(404));
    assert!(outcome.affiliate);
    assert!(!outcome.treat_as_working);
}

#[tokio::test]
async fn test_affiliate_browser_dns_failure() {
    let web = Arc::new(FakeWeb::new().page(AFFILIATE, FakePage::failing("net::ERR_NAME_NOT_RESOLVED")));
    let session = FakeSession::new(web.clone());
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier.verify(AFFILIATE, Some(&session)).await;

    assert_eq!(outcome.status, LinkStatus::DnsError);
    assert!(!outcome.treat_as_working);
    assert_eq!(CallLog::count(&web.log.tabs_closed), 1);
}

#[tokio::test]
async fn test_affiliate_403_over_http_is_not_overridden() {
    let server = MockServer::start().await;
    serve(&server, "/click/deal", ResponseTemplate::new(403)).await;
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier
        .verify(&format!("{}/click/deal", server.uri()), None)
        .await;

    assert_eq!(outcome.status, LinkStatus::Http(403));
    assert!(outcome.affiliate);
    assert!(!outcome.via_browser);
    assert!(!outcome.treat_as_working);
}

#[tokio::test]
async fn test_non_affiliate_never_uses_browser() {
    let server = MockServer::start().await;
    serve(&server, "/plain", ResponseTemplate::new(200)).await;
    let web = Arc::new(FakeWeb::new());
    let session = FakeSession::new(web.clone());
    let verifier = StatusVerifier::new().unwrap();

    let outcome = verifier
        .verify(&format!("{}/plain", server.uri()), Some(&session))
        .await;

    assert_eq!(outcome.status, LinkStatus::Http(200));
    assert_eq!(CallLog::count(&web.log.tabs_opened), 0);
}
