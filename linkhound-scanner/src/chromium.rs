//! Chromium-backed implementation of the browser capability.

use crate::browser::{
    BrowserLauncher, BrowserSession, BrowserTab, ElementCandidate, NavigationResponse, Viewport,
    WaitUntil,
};
use crate::error::{Result, ScanError};
use crate::scripts::{
    CANDIDATES_SCRIPT, HIGHLIGHT_STYLE_SCRIPT, NAVIGATION_INFO_SCRIPT, READY_STATE_SCRIPT,
    banner_script, highlight_script,
};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetCacheDisabledParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_IDLE_SETTLE: Duration = Duration::from_millis(500);

/// Locates a Chrome/Chromium binary. `CHROMIUM_PATH` wins over the
/// well-known install locations; `None` leaves detection to chromiumoxide.
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Some(path);
        }
        warn!("CHROMIUM_PATH points to a missing file: {}", path.display());
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/snap/bin/chromium",
        ]
    };

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    executable: Option<PathBuf>,
    window: Viewport,
}

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self {
            headless: true,
            executable: None,
            window: Viewport::default(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(30))
            .window_size(self.window.width, self.window.height)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");

        if !self.headless {
            builder = builder.with_head();
        }

        if let Some(path) = self.executable.clone().or_else(find_browser_executable) {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(ScanError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // chromiumoxide reports CDP events it cannot decode as errors
                    trace!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler task completed");
        });

        debug!("Browser launched");
        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_tab(&self) -> Result<Box<dyn BrowserTab>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumTab { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            handler_task,
        } = *self;

        let closed = browser.close().await.map(|_| ());
        if let Err(e) = browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        handler_task.abort();
        closed.map_err(ScanError::from)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadyState {
    ready_state: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct NavigationInfo {
    status: u16,
    redirects: u32,
    url: String,
}

pub struct ChromiumTab {
    page: Page,
}

impl ChromiumTab {
    async fn evaluate_value<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScanError::Evaluation(e.to_string()))?;
        result
            .into_value::<T>()
            .map_err(|e| ScanError::Evaluation(e.to_string()))
    }

    async fn wait_for_ready_state(&self, accepted: &[&str]) -> Result<()> {
        loop {
            if let Ok(state) = self.evaluate_value::<ReadyState>(READY_STATE_SCRIPT).await
                && state.url != "about:blank"
                && accepted.contains(&state.ready_state.as_str())
            {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn load(&self, url: &str, wait: WaitUntil) -> Result<()> {
        match wait {
            WaitUntil::DomReady => {
                let returns = self.page.execute(NavigateParams::new(url)).await?;
                if let Some(reason) = returns.result.error_text.clone() {
                    return Err(ScanError::Navigation {
                        url: url.to_string(),
                        reason,
                    });
                }
                self.wait_for_ready_state(&["interactive", "complete"]).await
            }
            WaitUntil::NetworkIdle => {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| ScanError::Navigation {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?;
                self.page.wait_for_navigation().await?;
                self.wait_for_ready_state(&["complete"]).await?;
                tokio::time::sleep(NETWORK_IDLE_SETTLE).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl BrowserTab for ChromiumTab {
    async fn configure(&self, viewport: Viewport, user_agent: &str, disable_cache: bool) -> Result<()> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(ScanError::Browser)?;
        self.page.execute(metrics).await?;
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        self.page
            .execute(SetCacheDisabledParams::new(disable_cache))
            .await?;
        Ok(())
    }

    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<NavigationResponse> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.load(url, wait)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScanError::Timeout {
                    operation: format!("Navigation to {}", url),
                    secs: timeout.as_secs(),
                });
            }
        }
        let elapsed = start.elapsed();

        let info: NavigationInfo = self.evaluate_value(NAVIGATION_INFO_SCRIPT).await?;
        Ok(NavigationResponse {
            status: (info.status > 0).then_some(info.status),
            final_url: info.url,
            redirects: info.redirects,
            elapsed,
        })
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn candidates(&self) -> Result<Vec<ElementCandidate>> {
        self.evaluate_value(CANDIDATES_SCRIPT).await
    }

    async fn inject_highlight_style(&self) -> Result<()> {
        self.evaluate_value::<bool>(HIGHLIGHT_STYLE_SCRIPT).await?;
        Ok(())
    }

    async fn highlight(&self, index: usize) -> Result<()> {
        if self.evaluate_value::<bool>(&highlight_script(index)).await? {
            Ok(())
        } else {
            Err(ScanError::Evaluation(format!(
                "no candidate element at index {}",
                index
            )))
        }
    }

    async fn show_banner(&self, message: &str) -> Result<()> {
        self.evaluate_value::<bool>(&banner_script(message)).await?;
        Ok(())
    }

    async fn screenshot_viewport(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumTab { page } = *self;
        page.close().await?;
        Ok(())
    }
}
