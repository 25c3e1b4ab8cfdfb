//! Turns a settled DOM serialization into [`Reference`]s.

use crate::browser::BrowserTab;
use crate::error::Result;
use crate::result::{Reference, ReferenceKind};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static REFERENCE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href], img[src], link[rel~="stylesheet"][href], script[src]"#)
        .expect("Failed to compile reference selector - this is a bug")
});

const LANDMARKS: &[&str] = &[
    "header", "nav", "main", "footer", "aside", "section", "article", "form",
];

const CTA_MARKERS: &[&str] = &["btn", "button", "cta"];

/// Reads the current document from `tab` and extracts its references.
pub async fn query_references(tab: &dyn BrowserTab, page_url: &str) -> Result<Vec<Reference>> {
    let html = tab.content().await?;
    Ok(extract_references(&html, page_url))
}

/// Every anchor, image, stylesheet and script in document order.
pub fn extract_references(html: &str, page_url: &str) -> Vec<Reference> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&REFERENCE_SELECTOR)
        .filter_map(|element| {
            let (kind, raw) = match element.value().name() {
                "a" => (ReferenceKind::Link, element.value().attr("href")?),
                "img" => (ReferenceKind::Image, element.value().attr("src")?),
                "link" => (ReferenceKind::Stylesheet, element.value().attr("href")?),
                "script" => (ReferenceKind::Script, element.value().attr("src")?),
                _ => return None,
            };
            if raw.trim().is_empty() {
                return None;
            }

            let target = resolve_target(base.as_ref(), raw);
            let mut context = landmark_context(&element);
            if is_call_to_action(&element) {
                context.push_str(" [CTA]");
            }

            Reference::new(page_url, target, derive_label(&element, kind), kind, context)
        })
        .collect()
}

/// Absolute URL for `raw`. Fragment-only targets and anything that does not
/// join cleanly are kept verbatim.
pub fn resolve_target(base: Option<&Url>, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with('#') {
        return raw.to_string();
    }
    base.and_then(|b| b.join(raw).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty_attr(element: &ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn derive_label(element: &ElementRef, kind: ReferenceKind) -> String {
    match kind {
        ReferenceKind::Link => {
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                text
            } else {
                non_empty_attr(element, "aria-label").unwrap_or_else(|| "No text".to_string())
            }
        }
        ReferenceKind::Image => non_empty_attr(element, "alt").unwrap_or_else(|| "Image".to_string()),
        ReferenceKind::Stylesheet => "Stylesheet".to_string(),
        ReferenceKind::Script => "Script".to_string(),
    }
}

/// `tag#id.firstclass` of the nearest landmark ancestor, or `body`.
fn landmark_context(element: &ElementRef) -> String {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| {
            let value = ancestor.value();
            LANDMARKS.contains(&value.name()) || value.id().is_some_and(|id| !id.is_empty())
        })
        .map(|ancestor| describe(&ancestor))
        .unwrap_or_else(|| "body".to_string())
}

fn describe(element: &ElementRef) -> String {
    let value = element.value();
    let mut out = value.name().to_string();
    if let Some(id) = value.id().filter(|id| !id.is_empty()) {
        out.push('#');
        out.push_str(id);
    }
    // `classes()` iterates a hash set; the first class must come from the attribute text
    if let Some(class) = value.attr("class").and_then(|c| c.split_whitespace().next()) {
        out.push('.');
        out.push_str(class);
    }
    out
}

fn is_call_to_action(element: &ElementRef) -> bool {
    element.value().classes().any(|class| {
        let class = class.to_lowercase();
        CTA_MARKERS.iter().any(|marker| class.contains(marker))
    })
}
