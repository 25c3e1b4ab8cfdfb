//! Screenshots of a page with the offending reference outlined.

use crate::browser::{BrowserSession, BrowserTab, ElementCandidate, Viewport, WaitUntil, close_tab};
use crate::error::Result;
use crate::verifier::DEFAULT_USER_AGENT;
use std::time::Duration;
use tracing::{debug, warn};

pub const NOT_LOCATED_BANNER: &str =
    "This link could not be located on the page. It may be hidden or loaded dynamically.";

pub struct EvidenceCapturer {
    viewport: Viewport,
    user_agent: String,
    nav_timeout: Duration,
    settle_delay: Duration,
    highlight_delay: Duration,
    min_substring_len: usize,
}

impl EvidenceCapturer {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            nav_timeout: Duration::from_secs(20),
            settle_delay: Duration::from_millis(1500),
            highlight_delay: Duration::from_millis(500),
            min_substring_len: 4,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    pub fn with_delays(mut self, settle: Duration, highlight: Duration) -> Self {
        self.settle_delay = settle;
        self.highlight_delay = highlight;
        self
    }

    pub fn with_min_substring_len(mut self, len: usize) -> Self {
        self.min_substring_len = len;
        self
    }

    /// PNG of `page_url` with the element pointing at `target_url` highlighted,
    /// or with a banner when no element matches. Best effort: every failure
    /// is logged and yields `None`.
    pub async fn capture(
        &self,
        page_url: &str,
        target_label: &str,
        target_url: &str,
        session: &dyn BrowserSession,
    ) -> Option<Vec<u8>> {
        let tab = match session.open_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                warn!("Could not open tab for evidence of {}: {}", target_url, e);
                return None;
            }
        };

        let result = self
            .capture_in_tab(tab.as_ref(), page_url, target_label, target_url)
            .await;
        close_tab(tab).await;

        match result {
            Ok(png) => Some(png),
            Err(e) => {
                warn!("Evidence capture failed for {} on {}: {}", target_url, page_url, e);
                None
            }
        }
    }

    async fn capture_in_tab(
        &self,
        tab: &dyn BrowserTab,
        page_url: &str,
        target_label: &str,
        target_url: &str,
    ) -> Result<Vec<u8>> {
        tab.configure(self.viewport, &self.user_agent, true).await?;

        match tab.navigate(page_url, WaitUntil::DomReady, self.nav_timeout).await {
            Ok(_) => {}
            Err(e) if e.is_timeout() => {
                debug!("{}; capturing the partial render", e);
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(self.settle_delay).await;

        tab.inject_highlight_style().await?;
        let candidates = tab.candidates().await?;
        match find_matching_element(&candidates, target_label, target_url, self.min_substring_len) {
            Some(index) => {
                debug!("Highlighting element {} for {}", index, target_url);
                tab.highlight(index).await?;
            }
            None => {
                debug!("No element matched {} on {}", target_url, page_url);
                tab.show_banner(NOT_LOCATED_BANNER).await?;
            }
        }
        tokio::time::sleep(self.highlight_delay).await;

        tab.screenshot_viewport().await
    }
}

impl Default for EvidenceCapturer {
    fn default() -> Self {
        Self::new()
    }
}

fn without_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Index of the first candidate matching the reference.
///
/// Tiers, each scanned over every candidate before the next is tried:
/// exact case-insensitive text or alt; substring of text or alt when `text`
/// is longer than `min_substring_len` characters; href/src containing the
/// target URL with query strings ignored.
pub fn find_matching_element(
    candidates: &[ElementCandidate],
    text: &str,
    url: &str,
    min_substring_len: usize,
) -> Option<usize> {
    let needle = text.trim().to_lowercase();

    if !needle.is_empty() {
        let exact = candidates.iter().position(|c| {
            c.text.trim().to_lowercase() == needle || c.alt.trim().to_lowercase() == needle
        });
        if exact.is_some() {
            return exact;
        }

        if needle.chars().count() > min_substring_len {
            let partial = candidates.iter().position(|c| {
                c.text.to_lowercase().contains(&needle) || c.alt.to_lowercase().contains(&needle)
            });
            if partial.is_some() {
                return partial;
            }
        }
    }

    let target = without_query(url.trim());
    if target.is_empty() {
        return None;
    }
    candidates.iter().position(|c| {
        [&c.href, &c.src]
            .into_iter()
            .any(|attr| !attr.is_empty() && without_query(attr).contains(target))
    })
}
