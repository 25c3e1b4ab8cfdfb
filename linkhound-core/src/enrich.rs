//! Optional richer analysis of verified targets.
//!
//! An [`Enricher`] may supply wording, a suggested fix and its own opinion on
//! whether a target is a problem. Absence of an answer is normal and falls
//! back to the deterministic rules in [`crate::scoring`].

use async_trait::async_trait;
use linkhound_scanner::{LinkStatus, Priority};
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisRequest {
    pub label: String,
    pub target_url: String,
    pub context: String,
    pub status: LinkStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub explanation: Option<String>,
    pub suggested_fix: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<Priority>,
    /// Flags a problem even when the status looks healthy.
    pub is_issue: bool,
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Option<Enrichment>;
}

/// Enricher that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl Enricher for NoEnrichment {
    async fn analyze(&self, _request: &AnalysisRequest) -> Option<Enrichment> {
        None
    }
}

/// Bounded, least-recently-used memo of enrichment answers. Misses are
/// cached too, so an unavailable collaborator is asked once per request.
pub struct AnalysisCache {
    entries: Mutex<LruCache<AnalysisRequest, Option<Enrichment>>>,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(&self, request: &AnalysisRequest) -> Option<Option<Enrichment>> {
        self.entries.lock().await.get(request).cloned()
    }

    pub async fn insert(&self, request: AnalysisRequest, enrichment: Option<Enrichment>) {
        self.entries.lock().await.put(request, enrichment);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

pub async fn analyze_cached(
    enricher: &dyn Enricher,
    cache: &AnalysisCache,
    request: &AnalysisRequest,
) -> Option<Enrichment> {
    if let Some(cached) = cache.get(request).await {
        debug!("Enrichment cache hit for {}", request.target_url);
        return cached;
    }
    let enrichment = enricher.analyze(request).await;
    cache.insert(request.clone(), enrichment.clone()).await;
    enrichment
}
