//! Link classification heuristics.
//!
//! Everything here is pure: no network, no browser. The pattern table lives in
//! [`ClassificationRules`] so the rules can be extended and tested on their own.

use crate::outcome::{LinkStatus, VerificationOutcome};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("Failed to compile email regex - this is a bug")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// Pattern table driving every classification decision.
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    /// Host suffixes of analytics beacons and tracking pixels.
    pub tracker_hosts: Vec<String>,
    /// Fragments of path+query that identify a pixel or beacon on any host.
    pub tracker_path_fragments: Vec<String>,
    /// Schemes whose content is embedded in the page itself.
    pub inline_schemes: Vec<String>,
    /// Host suffixes of affiliate networks and click redirectors.
    pub affiliate_hosts: Vec<String>,
    /// Click-tracking path fragments.
    pub affiliate_path_fragments: Vec<String>,
    /// Query keys carrying affiliate or click identifiers.
    pub affiliate_query_keys: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            tracker_hosts: owned(&[
                "google-analytics.com",
                "googletagmanager.com",
                "doubleclick.net",
                "googleadservices.com",
                "connect.facebook.net",
                "bat.bing.com",
                "analytics.twitter.com",
                "px.ads.linkedin.com",
                "hotjar.com",
                "segment.io",
                "mixpanel.com",
                "scorecardresearch.com",
                "quantserve.com",
                "pixel.wp.com",
                "stats.wp.com",
            ]),
            tracker_path_fragments: owned(&[
                "facebook.com/tr",
                "/pixel.gif",
                "/pixel.png",
                "/1x1.gif",
                "/beacon",
                "/collect?",
                "/tracking-pixel",
            ]),
            inline_schemes: owned(&["data", "blob"]),
            affiliate_hosts: owned(&[
                "awin1.com",
                "shareasale.com",
                "linksynergy.com",
                "anrdoezrs.net",
                "jdoqocy.com",
                "tkqlhce.com",
                "dpbolvw.net",
                "kqzyfj.com",
                "go.skimresources.com",
                "prf.hn",
                "pxf.io",
                "sjv.io",
                "impact.com",
            ]),
            affiliate_path_fragments: owned(&[
                "/click/",
                "/clk/",
                "/aff_c",
                "/aff/",
                "/track/click",
                "/tracking/click",
                "/redirect.php",
                "/out/",
            ]),
            affiliate_query_keys: owned(&[
                "clickid",
                "click_id",
                "affid",
                "aff_id",
                "affiliate_id",
                "tid",
                "subid",
            ]),
        }
    }
}

impl ClassificationRules {
    pub fn with_tracker_host(mut self, host: impl Into<String>) -> Self {
        self.tracker_hosts.push(host.into());
        self
    }

    pub fn with_affiliate_host(mut self, host: impl Into<String>) -> Self {
        self.affiliate_hosts.push(host.into());
        self
    }

    pub fn with_affiliate_path_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.affiliate_path_fragments.push(fragment.into());
        self
    }

    pub fn with_affiliate_query_key(mut self, key: impl Into<String>) -> Self {
        self.affiliate_query_keys.push(key.into());
        self
    }
}

fn host_matches(host: &str, suffix: &str) -> bool {
    host == suffix || host.ends_with(&format!(".{}", suffix))
}

fn scheme_of(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

#[derive(Debug, Clone, Default)]
pub struct LinkClassifier {
    rules: ClassificationRules,
}

impl LinkClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: ClassificationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Targets that are never verified over the network: tracking pixels,
    /// analytics beacons and inline content.
    pub fn classify_for_skip(&self, url: &str) -> Option<VerificationOutcome> {
        if let Some(scheme) = scheme_of(url)
            && self.rules.inline_schemes.iter().any(|s| *s == scheme)
        {
            return Some(VerificationOutcome::skipped(url, "Inline content"));
        }

        if self.is_tracker(url) {
            return Some(VerificationOutcome::skipped(url, "Tracking pixel"));
        }

        None
    }

    pub fn is_tracker(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        if self
            .rules
            .tracker_path_fragments
            .iter()
            .any(|fragment| lowered.contains(fragment.as_str()))
        {
            return true;
        }

        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .is_some_and(|host| self.rules.tracker_hosts.iter().any(|h| host_matches(&host, h)))
    }

    /// Outcomes for `mailto:`, `tel:`, `javascript:` and fragment-only targets.
    pub fn classify_special_scheme(&self, url: &str) -> Option<VerificationOutcome> {
        let trimmed = url.trim();
        if trimmed.starts_with('#') {
            return Some(VerificationOutcome::new(url, LinkStatus::Http(200), "Anchor link"));
        }

        match scheme_of(trimmed).as_deref() {
            Some("mailto") => {
                let address = trimmed[7..].split('?').next().unwrap_or_default();
                if is_valid_email_list(address) {
                    Some(VerificationOutcome::new(url, LinkStatus::Http(200), "Valid email link"))
                } else {
                    Some(VerificationOutcome::new(url, LinkStatus::Http(400), "Invalid email address"))
                }
            }
            Some("tel") => Some(VerificationOutcome::new(url, LinkStatus::Http(200), "Phone link")),
            Some("javascript") => {
                Some(VerificationOutcome::new(url, LinkStatus::Http(200), "JavaScript link"))
            }
            _ => None,
        }
    }

    /// Redirector and click-tracking targets. These are checked in a real
    /// browser and never crawled.
    pub fn is_affiliate_class(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        if let Some(host) = parsed.host_str().map(str::to_lowercase)
            && self.rules.affiliate_hosts.iter().any(|h| host_matches(&host, h))
        {
            return true;
        }

        let path = parsed.path().to_lowercase();
        if self
            .rules
            .affiliate_path_fragments
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
        {
            return true;
        }

        parsed.query_pairs().any(|(key, _)| {
            let key = key.to_lowercase();
            self.rules.affiliate_query_keys.iter().any(|k| *k == key)
        })
    }
}

fn is_valid_email_list(addresses: &str) -> bool {
    let mut any = false;
    for address in addresses.split(',') {
        let address = address.trim();
        if !EMAIL_RE.is_match(address) {
            return false;
        }
        any = true;
    }
    any
}

pub fn issue_type_from_status(status: &LinkStatus) -> &'static str {
    match status {
        LinkStatus::Http(404) => "Broken Link (404)",
        LinkStatus::Http(500..=599) => "Server Error (500+)",
        LinkStatus::Http(403) => "Access Forbidden (403)",
        LinkStatus::Http(401) => "Unauthorized (401)",
        LinkStatus::Timeout => "Timeout",
        LinkStatus::Http(300..=399) => "Redirect",
        _ => "Unknown Issue",
    }
}

pub fn priority_from_status(status: &LinkStatus) -> Priority {
    match status {
        LinkStatus::Http(404) | LinkStatus::Http(500..=599) => Priority::Critical,
        LinkStatus::Http(403) | LinkStatus::Http(401) | LinkStatus::Timeout => Priority::High,
        LinkStatus::Http(300..=399) => Priority::Medium,
        _ => Priority::Low,
    }
}
