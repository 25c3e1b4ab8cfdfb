//! Browser capability used by the crawler, the verifier and the evidence capturer.
//!
//! A [`BrowserLauncher`] starts a [`BrowserSession`] (one browser process), which
//! opens [`BrowserTab`]s. Sessions and tabs must be closed explicitly; callers
//! close them on every exit path.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long navigation waits before handing the page back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// `DOMContentLoaded`: the document is parsed, subresources may still load.
    DomReady,
    /// Load event fired and the network has gone quiet.
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

/// What the browser observed for the main document after navigating.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationResponse {
    /// HTTP status of the main document, when the browser exposed one.
    pub status: Option<u16>,
    pub final_url: String,
    pub redirects: u32,
    pub elapsed: Duration,
}

/// A reference-bearing element as it appears in the rendered DOM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementCandidate {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub src: String,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_tab(&self) -> Result<Box<dyn BrowserTab>>;

    /// Terminates the browser process.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait BrowserTab: Send + Sync {
    async fn configure(&self, viewport: Viewport, user_agent: &str, disable_cache: bool) -> Result<()>;

    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<NavigationResponse>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String>;

    /// Every anchor, image, stylesheet and script element, in document order.
    async fn candidates(&self) -> Result<Vec<ElementCandidate>>;

    /// Injects the highlight style sheet, replacing any earlier instance.
    async fn inject_highlight_style(&self) -> Result<()>;

    /// Outlines the candidate at `index` (as returned by [`BrowserTab::candidates`])
    /// and scrolls it into view.
    async fn highlight(&self, index: usize) -> Result<()>;

    /// Fixed banner at the top of the page, used when no element matched.
    async fn show_banner(&self, message: &str) -> Result<()>;

    /// PNG of the visible viewport.
    async fn screenshot_viewport(&self) -> Result<Vec<u8>>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Closes a tab, logging rather than propagating a failure to close.
pub async fn close_tab(tab: Box<dyn BrowserTab>) {
    if let Err(e) = tab.close().await {
        tracing::warn!("Failed to close browser tab: {}", e);
    }
}

/// Closes a session, logging rather than propagating a failure to close.
pub async fn shutdown_session(session: Box<dyn BrowserSession>, purpose: &str) {
    tracing::debug!("Closing {} browser", purpose);
    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close {} browser: {}", purpose, e);
    }
}
