use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Link,
    Image,
    Stylesheet,
    Script,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Link => "link",
            ReferenceKind::Image => "image",
            ReferenceKind::Stylesheet => "stylesheet",
            ReferenceKind::Script => "script",
        }
    }
}

/// One DOM element on a crawled page that points at another resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub page_url: String,
    pub target_url: String,
    pub label: String,
    pub kind: ReferenceKind,
    pub context: String,
}

impl Reference {
    /// Returns `None` when the target is blank; a reference always points somewhere.
    pub fn new(
        page_url: impl Into<String>,
        target_url: impl Into<String>,
        label: impl Into<String>,
        kind: ReferenceKind,
        context: impl Into<String>,
    ) -> Option<Self> {
        let target_url = target_url.into();
        if target_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            page_url: page_url.into(),
            target_url,
            label: label.into(),
            kind,
            context: context.into(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub visited_pages: Vec<String>,
    pub references: Vec<Reference>,
    pub failed_pages: Vec<String>,
}

impl CrawlResult {
    pub fn new() -> Self {
        Self::default()
    }
}
