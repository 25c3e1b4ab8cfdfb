use crate::enrich::{AnalysisCache, AnalysisRequest, Enricher, NoEnrichment, analyze_cached};
use crate::error::{PipelineError, Result};
use crate::report::{Issue, PriorityCounts, ScanReport, ScanSummary};
use crate::scoring;
use chrono::Utc;
use linkhound_scanner::browser::shutdown_session;
use linkhound_scanner::classifier::{issue_type_from_status, priority_from_status};
use linkhound_scanner::{
    BrowserLauncher, BrowserSession, CrawlResult, Crawler, EvidenceCapturer, LinkClassifier, Reference,
    StatusVerifier,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Options for a single scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root_url: String,
    pub max_pages: usize,
    pub capture_evidence: bool,
}

impl ScanOptions {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            max_pages: 20,
            capture_evidence: true,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_capture_evidence(mut self, capture: bool) -> Self {
        self.capture_evidence = capture;
        self
    }
}

/// Pipeline milestones reported to the progress callback
#[derive(Debug, Clone, PartialEq)]
pub enum ScanProgress {
    Crawling { page: usize, url: String },
    Crawled { pages: usize, references: usize, unique_targets: usize },
    Verifying { index: usize, total: usize, url: String },
    Capturing { index: usize, total: usize, url: String },
    Finished { issues: usize },
}

pub type ScanProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Checks `root_url` is an absolute http(s) URL with a host.
pub fn validate_root_url(root_url: &str) -> Result<Url> {
    let url = Url::parse(root_url.trim())
        .map_err(|e| PipelineError::InvalidInput(format!("{}: {}", root_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PipelineError::InvalidInput(format!(
            "{}: expected an absolute http(s) URL",
            root_url
        )));
    }
    Ok(url)
}

/// One browser per phase, launched on first use and always closed by
/// [`PhaseBrowser::release`].
struct PhaseBrowser<'a> {
    launcher: &'a dyn BrowserLauncher,
    purpose: &'static str,
    session: Option<Box<dyn BrowserSession>>,
}

impl<'a> PhaseBrowser<'a> {
    fn new(launcher: &'a dyn BrowserLauncher, purpose: &'static str) -> Self {
        Self {
            launcher,
            purpose,
            session: None,
        }
    }

    async fn get(&mut self) -> Result<&dyn BrowserSession> {
        if self.session.is_none() {
            info!("Launching {} browser", self.purpose);
            self.session = Some(self.launcher.launch().await?);
        }
        self.session
            .as_deref()
            .ok_or_else(|| PipelineError::BrowserLaunch(format!("{} browser unavailable", self.purpose)))
    }

    async fn release(self) {
        if let Some(session) = self.session {
            shutdown_session(session, self.purpose).await;
        }
    }
}

/// A unique target together with the issue it produced, before evidence.
struct Candidate {
    issue: Issue,
    wants_evidence: bool,
}

pub struct Scanner {
    launcher: Arc<dyn BrowserLauncher>,
    classifier: LinkClassifier,
    verifier: StatusVerifier,
    capturer: EvidenceCapturer,
    crawl_timeout: Duration,
    enricher: Arc<dyn Enricher>,
    cache: Arc<AnalysisCache>,
    progress_callback: Option<ScanProgressCallback>,
}

impl Scanner {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Result<Self> {
        Ok(Self {
            launcher,
            classifier: LinkClassifier::new(),
            verifier: StatusVerifier::new()?,
            capturer: EvidenceCapturer::new(),
            crawl_timeout: Duration::from_secs(30),
            enricher: Arc::new(NoEnrichment),
            cache: Arc::new(AnalysisCache::default()),
            progress_callback: None,
        })
    }

    pub fn with_classifier(mut self, classifier: LinkClassifier) -> Self {
        self.verifier = self.verifier.with_classifier(classifier.clone());
        self.classifier = classifier;
        self
    }

    pub fn with_verifier(mut self, verifier: StatusVerifier) -> Self {
        self.classifier = verifier.classifier().clone();
        self.verifier = verifier;
        self
    }

    pub fn with_capturer(mut self, capturer: EvidenceCapturer) -> Self {
        self.capturer = capturer;
        self
    }

    pub fn with_crawl_timeout(mut self, timeout: Duration) -> Self {
        self.crawl_timeout = timeout;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_progress_callback(mut self, callback: ScanProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, progress: ScanProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    /// Crawl, verify, capture evidence and rank. Invalid input is rejected
    /// before any browser is launched.
    pub async fn scan(&self, options: &ScanOptions) -> Result<ScanReport> {
        let root = validate_root_url(&options.root_url)?;
        let started_at = Utc::now();
        info!("Scanning {} (max {} pages)", root, options.max_pages);

        let crawl = self.crawl(root.as_str(), options.max_pages).await?;

        let (targets, appearances) = unique_targets(&crawl.references);
        self.report_progress(ScanProgress::Crawled {
            pages: crawl.visited_pages.len(),
            references: crawl.references.len(),
            unique_targets: targets.len(),
        });
        info!(
            "Verifying {} unique targets from {} references",
            targets.len(),
            crawl.references.len()
        );

        let (mut candidates, skipped_targets) = self.verify_targets(&targets, &appearances).await?;

        if options.capture_evidence {
            self.capture_evidence(&mut candidates).await?;
        }

        let mut issues: Vec<Issue> = candidates.into_iter().map(|c| c.issue).collect();
        issues.sort_by_key(|issue| issue.priority);

        let total_references = crawl.references.len();
        let summary = ScanSummary {
            pages_visited: crawl.visited_pages.len(),
            total_references,
            unique_targets: targets.len(),
            skipped_targets,
            issue_count: issues.len(),
            priority_counts: PriorityCounts::tally(&issues),
        };
        self.report_progress(ScanProgress::Finished { issues: issues.len() });
        info!("Scan complete: {} issues", issues.len());

        Ok(ScanReport {
            scan_id: uuid::Uuid::new_v4().to_string(),
            root_url: root.to_string(),
            started_at,
            finished_at: Utc::now(),
            health_score: scoring::health_score(total_references, issues.len()),
            summary,
            issues,
            visited_pages: crawl.visited_pages,
        })
    }

    async fn crawl(&self, root: &str, max_pages: usize) -> Result<CrawlResult> {
        let mut crawler = Crawler::new(self.launcher.clone())
            .with_nav_timeout(self.crawl_timeout)
            .with_classifier(self.classifier.clone());

        if let Some(ref callback) = self.progress_callback {
            let callback = callback.clone();
            crawler = crawler.with_progress_callback(Arc::new(move |page, url| {
                callback(ScanProgress::Crawling { page, url });
            }));
        }

        Ok(crawler.crawl(root, max_pages).await?)
    }

    async fn verify_targets(
        &self,
        targets: &[&Reference],
        appearances: &HashMap<String, usize>,
    ) -> Result<(Vec<Candidate>, usize)> {
        let mut browser = PhaseBrowser::new(self.launcher.as_ref(), "verification");
        let result = self.verify_with(&mut browser, targets, appearances).await;
        browser.release().await;
        result
    }

    async fn verify_with(
        &self,
        browser: &mut PhaseBrowser<'_>,
        targets: &[&Reference],
        appearances: &HashMap<String, usize>,
    ) -> Result<(Vec<Candidate>, usize)> {
        let mut candidates = Vec::new();
        let mut skipped = 0;

        for (index, reference) in targets.iter().enumerate() {
            let url = reference.target_url.as_str();
            self.report_progress(ScanProgress::Verifying {
                index: index + 1,
                total: targets.len(),
                url: url.to_string(),
            });

            let wants_browser = self.classifier.is_affiliate_class(url)
                && self.classifier.classify_for_skip(url).is_none()
                && self.classifier.classify_special_scheme(url).is_none();
            let session = if wants_browser { Some(browser.get().await?) } else { None };

            let outcome = self.verifier.verify(url, session).await;
            debug!("{} -> {} {}", url, outcome.status, outcome.status_text);

            if outcome.skipped {
                skipped += 1;
                continue;
            }
            if scoring::is_dropped(&outcome) {
                debug!("Dropping {} ({})", url, outcome.status_text);
                continue;
            }

            let request = AnalysisRequest {
                label: reference.label.clone(),
                target_url: url.to_string(),
                context: reference.context.clone(),
                status: outcome.status,
            };
            let enrichment =
                analyze_cached(self.enricher.as_ref(), &self.cache, &request).await.unwrap_or_default();

            if !scoring::is_actual_issue(&outcome) && !enrichment.is_issue {
                continue;
            }

            let explanation = match enrichment.explanation {
                Some(mut text) => {
                    scoring::annotate(&mut text, &outcome);
                    text
                }
                None => scoring::explain(&outcome),
            };
            let count = appearances.get(url).copied().unwrap_or(1);
            let wants_evidence = scoring::needs_evidence(&outcome);
            let issue = Issue {
                page_url: reference.page_url.clone(),
                target_url: url.to_string(),
                label: reference.label.clone(),
                kind: reference.kind,
                context: reference.context.clone(),
                priority: enrichment
                    .priority
                    .unwrap_or_else(|| priority_from_status(&outcome.status)),
                issue_type: enrichment
                    .issue_type
                    .unwrap_or_else(|| issue_type_from_status(&outcome.status).to_string()),
                explanation,
                suggested_fix: enrichment
                    .suggested_fix
                    .or_else(|| scoring::redirect_fix(url, &outcome)),
                impact_score: scoring::impact_score(&outcome.status, &reference.context, count),
                appearances: count,
                screenshot: None,
                outcome,
            };
            candidates.push(Candidate {
                issue,
                wants_evidence,
            });
        }

        Ok((candidates, skipped))
    }

    async fn capture_evidence(&self, candidates: &mut [Candidate]) -> Result<()> {
        let total = candidates.iter().filter(|c| c.wants_evidence).count();
        if total == 0 {
            return Ok(());
        }
        info!("Capturing evidence for {} issues", total);

        let mut browser = PhaseBrowser::new(self.launcher.as_ref(), "evidence");
        let result = self.capture_with(&mut browser, candidates, total).await;
        browser.release().await;
        result
    }

    async fn capture_with(
        &self,
        browser: &mut PhaseBrowser<'_>,
        candidates: &mut [Candidate],
        total: usize,
    ) -> Result<()> {
        for (index, candidate) in candidates.iter_mut().filter(|c| c.wants_evidence).enumerate() {
            let issue = &mut candidate.issue;
            self.report_progress(ScanProgress::Capturing {
                index: index + 1,
                total,
                url: issue.target_url.clone(),
            });
            let session = browser.get().await?;
            issue.screenshot = self
                .capturer
                .capture(&issue.page_url, &issue.label, &issue.target_url, session)
                .await;
        }
        Ok(())
    }
}

/// First reference per target URL in discovery order, and the number of
/// distinct pages each target appears on.
pub fn unique_targets(references: &[Reference]) -> (Vec<&Reference>, HashMap<String, usize>) {
    let mut firsts = Vec::new();
    let mut pages: HashMap<&str, HashSet<&str>> = HashMap::new();

    for reference in references {
        let seen = pages.entry(reference.target_url.as_str()).or_default();
        if seen.is_empty() {
            firsts.push(reference);
        }
        seen.insert(reference.page_url.as_str());
    }

    let counts = pages
        .into_iter()
        .map(|(target, on_pages)| (target.to_string(), on_pages.len()))
        .collect();
    (firsts, counts)
}
