// In-memory browser used by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use linkhound_scanner::browser::{ElementCandidate, NavigationResponse, Viewport, WaitUntil};
use linkhound_scanner::{BrowserLauncher, BrowserSession, BrowserTab, Result, ScanError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

#[derive(Debug, Clone)]
pub enum FakeNavigation {
    Loaded { status: Option<u16> },
    Timeout,
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub navigation: FakeNavigation,
    pub html: String,
    pub candidates: Vec<ElementCandidate>,
}

impl FakePage {
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            navigation: FakeNavigation::Loaded { status: Some(200) },
            html: html.into(),
            candidates: Vec::new(),
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            navigation: FakeNavigation::Loaded { status: Some(code) },
            html: String::new(),
            candidates: Vec::new(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            navigation: FakeNavigation::Timeout,
            html: String::new(),
            candidates: Vec::new(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            navigation: FakeNavigation::Fail(reason.to_string()),
            html: String::new(),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<ElementCandidate>) -> Self {
        self.candidates = candidates;
        self
    }
}

#[derive(Debug, Default)]
pub struct CallLog {
    pub launches: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub tabs_opened: AtomicUsize,
    pub tabs_closed: AtomicUsize,
    pub screenshots: AtomicUsize,
    pub navigations: Mutex<Vec<(String, WaitUntil)>>,
    pub highlights: Mutex<Vec<usize>>,
    pub banners: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn navigated_urls(&self) -> Vec<String> {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[derive(Default)]
pub struct FakeWeb {
    pages: HashMap<String, FakePage>,
    pub log: CallLog,
    pub fail_launch: bool,
    pub fail_screenshot: bool,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn failing_screenshot(mut self) -> Self {
        self.fail_screenshot = true;
        self
    }

    pub fn launcher(self) -> (Arc<FakeLauncher>, Arc<FakeWeb>) {
        let web = Arc::new(self);
        (Arc::new(FakeLauncher { web: web.clone() }), web)
    }

    fn lookup(&self, url: &str) -> FakePage {
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakePage::status(404))
    }
}

pub struct FakeLauncher {
    web: Arc<FakeWeb>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if self.web.fail_launch {
            return Err(ScanError::BrowserLaunch("no chromium available".to_string()));
        }
        self.web.log.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            web: self.web.clone(),
        }))
    }
}

pub struct FakeSession {
    web: Arc<FakeWeb>,
}

impl FakeSession {
    pub fn new(web: Arc<FakeWeb>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_tab(&self) -> Result<Box<dyn BrowserTab>> {
        self.web.log.tabs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTab {
            web: self.web.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.web.log.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeTab {
    web: Arc<FakeWeb>,
    current: Mutex<Option<FakePage>>,
}

impl FakeTab {
    fn current(&self) -> FakePage {
        self.current
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| FakePage::html(""))
    }
}

#[async_trait]
impl BrowserTab for FakeTab {
    async fn configure(&self, _viewport: Viewport, _user_agent: &str, _disable_cache: bool) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<NavigationResponse> {
        self.web
            .log
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), wait));

        let page = self.web.lookup(url);
        *self.current.lock().unwrap() = Some(page.clone());

        match page.navigation {
            FakeNavigation::Loaded { status } => Ok(NavigationResponse {
                status,
                final_url: url.to_string(),
                redirects: 0,
                elapsed: Duration::from_millis(12),
            }),
            FakeNavigation::Timeout => Err(ScanError::Timeout {
                operation: format!("Navigation to {}", url),
                secs: timeout.as_secs(),
            }),
            FakeNavigation::Fail(reason) => Err(ScanError::Navigation {
                url: url.to_string(),
                reason,
            }),
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current().html)
    }

    async fn candidates(&self) -> Result<Vec<ElementCandidate>> {
        Ok(self.current().candidates)
    }

    async fn inject_highlight_style(&self) -> Result<()> {
        Ok(())
    }

    async fn highlight(&self, index: usize) -> Result<()> {
        self.web.log.highlights.lock().unwrap().push(index);
        Ok(())
    }

    async fn show_banner(&self, message: &str) -> Result<()> {
        self.web.log.banners.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn screenshot_viewport(&self) -> Result<Vec<u8>> {
        if self.web.fail_screenshot {
            return Err(ScanError::Browser("screenshot failed".to_string()));
        }
        self.web.log.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(FAKE_PNG.to_vec())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.web.log.tabs_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
