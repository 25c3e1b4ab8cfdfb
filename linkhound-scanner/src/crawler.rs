use crate::browser::{BrowserLauncher, BrowserSession, WaitUntil, close_tab, shutdown_session};
use crate::classifier::LinkClassifier;
use crate::error::{Result, ScanError};
use crate::extract::query_references;
use crate::result::{CrawlResult, Reference, ReferenceKind};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Called with the 1-based page number and URL before each page is loaded.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Bounded breadth-first traversal of one host through a real browser.
pub struct Crawler {
    launcher: Arc<dyn BrowserLauncher>,
    classifier: LinkClassifier,
    nav_timeout: Duration,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            classifier: LinkClassifier::new(),
            nav_timeout: Duration::from_secs(30),
            progress_callback: None,
        }
    }

    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    pub fn with_classifier(mut self, classifier: LinkClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Visits at most `max_pages` pages starting at `root_url`.
    ///
    /// Only a launch failure or an invalid root is an error; pages that fail
    /// to load are recorded in [`CrawlResult::failed_pages`]. The browser is
    /// closed before returning in every case.
    pub async fn crawl(&self, root_url: &str, max_pages: usize) -> Result<CrawlResult> {
        let root = parse_root(root_url)?;
        info!("Starting crawl of {} (max {} pages)", root, max_pages);

        let session = self.launcher.launch().await?;
        let result = self.traverse(session.as_ref(), &root, max_pages).await;
        shutdown_session(session, "crawl").await;

        info!(
            "Crawl complete. Visited {} pages, found {} references",
            result.visited_pages.len(),
            result.references.len()
        );
        Ok(result)
    }

    async fn traverse(&self, session: &dyn BrowserSession, root: &Url, max_pages: usize) -> CrawlResult {
        let root_host = root.host_str().unwrap_or_default().to_string();
        let mut result = CrawlResult::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queued: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();

        frontier.push_back(root.to_string());
        queued.insert(root.to_string());

        while visited.len() < max_pages {
            let Some(url) = frontier.pop_front() else {
                break;
            };
            if !visited.insert(url.clone()) {
                continue;
            }
            result.visited_pages.push(url.clone());

            if let Some(ref callback) = self.progress_callback {
                callback(visited.len(), url.clone());
            }

            let references = match self.load_page(session, &url).await {
                Ok(references) => references,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    result.failed_pages.push(url);
                    continue;
                }
            };
            debug!("{} references on {}", references.len(), url);

            for reference in &references {
                if let Some(next) = self.traversable(reference, &root_host)
                    && !visited.contains(&next)
                    && queued.insert(next.clone())
                {
                    debug!("Queuing {}", next);
                    frontier.push_back(next);
                }
            }
            result.references.extend(references);
        }

        result
    }

    async fn load_page(&self, session: &dyn BrowserSession, url: &str) -> Result<Vec<Reference>> {
        let tab = session.open_tab().await?;
        let result = async {
            tab.navigate(url, WaitUntil::NetworkIdle, self.nav_timeout).await?;
            query_references(tab.as_ref(), url).await
        }
        .await;
        close_tab(tab).await;
        result
    }

    /// The fragment-free URL to follow for `reference`, if it should be crawled.
    fn traversable(&self, reference: &Reference, root_host: &str) -> Option<String> {
        if reference.kind != ReferenceKind::Link {
            return None;
        }
        let mut url = Url::parse(&reference.target_url).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str()? != root_host {
            return None;
        }
        if self.classifier.is_affiliate_class(url.as_str()) {
            debug!("Not following affiliate link {}", url);
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }
}

fn parse_root(root_url: &str) -> Result<Url> {
    let mut root =
        Url::parse(root_url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", root_url, e)))?;
    if !matches!(root.scheme(), "http" | "https") || root.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!(
            "{}: expected an absolute http(s) URL",
            root_url
        )));
    }
    root.set_fragment(None);
    Ok(root)
}
