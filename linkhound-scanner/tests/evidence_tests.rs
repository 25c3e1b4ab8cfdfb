mod common;

use common::{CallLog, FAKE_PNG, FakePage, FakeSession, FakeWeb};
use linkhound_scanner::EvidenceCapturer;
use linkhound_scanner::browser::{ElementCandidate, WaitUntil};
use linkhound_scanner::evidence::NOT_LOCATED_BANNER;
use std::sync::Arc;
use std::time::Duration;

const PAGE: &str = "https://site.test/pricing";

fn capturer() -> EvidenceCapturer {
    EvidenceCapturer::new().with_delays(Duration::ZERO, Duration::ZERO)
}

fn candidates() -> Vec<ElementCandidate> {
    vec![
        ElementCandidate {
            text: "Home".to_string(),
            href: "https://site.test/".to_string(),
            ..Default::default()
        },
        ElementCandidate {
            text: "Start free trial".to_string(),
            href: "https://site.test/trial?plan=pro".to_string(),
            ..Default::default()
        },
    ]
}

// ============================================================================
// Highlight Tests
// ============================================================================

#[tokio::test]
async fn test_highlights_matching_element() {
    let web = Arc::new(FakeWeb::new().page(PAGE, FakePage::html("").with_candidates(candidates())));
    let session = FakeSession::new(web.clone());

    let png = capturer()
        .capture(PAGE, "Start free trial", "https://site.test/trial", &session)
        .await;

    assert_eq!(png.as_deref(), Some(FAKE_PNG));
    assert_eq!(*web.log.highlights.lock().unwrap(), vec![1]);
    assert!(web.log.banners.lock().unwrap().is_empty());
    assert_eq!(web.log.navigations.lock().unwrap()[0].1, WaitUntil::DomReady);
}

#[tokio::test]
async fn test_banner_when_element_not_found() {
    let web = Arc::new(FakeWeb::new().page(PAGE, FakePage::html("").with_candidates(candidates())));
    let session = FakeSession::new(web.clone());

    let png = capturer()
        .capture(PAGE, "Careers", "https://site.test/jobs", &session)
        .await;

    assert!(png.is_some());
    assert!(web.log.highlights.lock().unwrap().is_empty());
    assert_eq!(*web.log.banners.lock().unwrap(), vec![NOT_LOCATED_BANNER.to_string()]);
}

// ============================================================================
// Failure Tolerance Tests
// ============================================================================

#[tokio::test]
async fn test_navigation_timeout_still_captures() {
    let web = Arc::new(FakeWeb::new().page(PAGE, FakePage::timeout()));
    let session = FakeSession::new(web.clone());

    let png = capturer()
        .capture(PAGE, "Start free trial", "https://site.test/trial", &session)
        .await;

    assert!(png.is_some());
    assert_eq!(CallLog::count(&web.log.tabs_closed), 1);
}

#[tokio::test]
async fn test_navigation_error_yields_no_evidence() {
    let web = Arc::new(FakeWeb::new().page(PAGE, FakePage::failing("net::ERR_CONNECTION_RESET")));
    let session = FakeSession::new(web.clone());

    let png = capturer()
        .capture(PAGE, "Start free trial", "https://site.test/trial", &session)
        .await;

    assert!(png.is_none());
    assert_eq!(CallLog::count(&web.log.tabs_opened), 1);
    assert_eq!(CallLog::count(&web.log.tabs_closed), 1);
}

#[tokio::test]
async fn test_screenshot_error_yields_no_evidence() {
    let web = Arc::new(
        FakeWeb::new()
            .page(PAGE, FakePage::html("").with_candidates(candidates()))
            .failing_screenshot(),
    );
    let session = FakeSession::new(web.clone());

    let png = capturer()
        .capture(PAGE, "Start free trial", "https://site.test/trial", &session)
        .await;

    assert!(png.is_none());
    assert_eq!(CallLog::count(&web.log.tabs_closed), 1);
}
