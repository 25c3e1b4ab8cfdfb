// Triage rules turning verification outcomes into reportable issues

use linkhound_scanner::{LinkStatus, VerificationOutcome};

const CONTEXT_WEIGHTS: &[(&[&str], u32)] = &[
    (&["cta", "button"], 20),
    (&["hero", "header"], 15),
    (&["nav", "navigation"], 10),
];

/// Outcomes removed before any issue decision: anti-bot 403s on affiliate
/// links and 304 responses.
pub fn is_dropped(outcome: &VerificationOutcome) -> bool {
    let anti_bot = outcome.treat_as_working && outcome.affiliate && outcome.status == LinkStatus::Http(403);
    anti_bot || outcome.status == LinkStatus::Http(304)
}

/// Deterministic issue predicate: a failure that is neither overridden nor a
/// plain redirect.
pub fn is_actual_issue(outcome: &VerificationOutcome) -> bool {
    !outcome.is_success() && !outcome.treat_as_working && !outcome.status.is_redirect()
}

/// Screenshots are only worth taking for hard failures.
pub fn needs_evidence(outcome: &VerificationOutcome) -> bool {
    if outcome.treat_as_working {
        return false;
    }
    matches!(
        outcome.status,
        LinkStatus::Http(404)
            | LinkStatus::Http(500..=599)
            | LinkStatus::Error
            | LinkStatus::DnsError
            | LinkStatus::Timeout
    )
}

pub fn impact_score(status: &LinkStatus, context: &str, appearances: usize) -> u8 {
    let mut score: u32 = 50;

    score += match status {
        LinkStatus::Http(404) => 30,
        LinkStatus::Http(500..=599) => 35,
        LinkStatus::Http(403) => 20,
        LinkStatus::Http(300..=399) => 10,
        _ => 0,
    };

    // Whole tokens only: `nav.main-nav` is navigation, `unavailable` is not
    let context = context.to_lowercase();
    let tokens: Vec<&str> = context
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();
    for (needles, weight) in CONTEXT_WEIGHTS {
        if needles.iter().any(|needle| tokens.contains(needle)) {
            score += weight;
        }
    }

    let appearances = u32::try_from(appearances).unwrap_or(u32::MAX);
    score += appearances.saturating_mul(5).min(20);

    score.min(100) as u8
}

/// Share of references that did not produce an issue, or `None` when no
/// references were found.
pub fn health_score(total_references: usize, issue_count: usize) -> Option<u8> {
    if total_references == 0 {
        return None;
    }
    let healthy = total_references.saturating_sub(issue_count) as f64;
    Some((100.0 * healthy / total_references as f64).round() as u8)
}

pub fn explain(outcome: &VerificationOutcome) -> String {
    let mut explanation = match outcome.status {
        LinkStatus::Http(404) => {
            "Page not found. The linked page does not exist or has been moved.".to_string()
        }
        LinkStatus::Http(403) => {
            "Access forbidden. The server refused to serve this resource.".to_string()
        }
        LinkStatus::Http(code @ 500..=599) => format!(
            "Server error ({}). The destination server failed while handling the request.",
            code
        ),
        LinkStatus::Timeout => {
            "Request timed out. The server did not respond in time.".to_string()
        }
        LinkStatus::DnsError => {
            "DNS lookup failed. The domain may have expired or be misspelled.".to_string()
        }
        LinkStatus::ConnectionRefused => {
            "Connection refused. Nothing is accepting connections at this address.".to_string()
        }
        LinkStatus::Error => format!("Request failed: {}", outcome.status_text),
        LinkStatus::Http(300..=399) if outcome.redirects > 0 => format!(
            "Redirected {} times without reaching a final page.",
            outcome.redirects
        ),
        status => format!("Returned status {} ({}).", status, outcome.status_text),
    };

    annotate(&mut explanation, outcome);
    explanation
}

pub fn annotate(explanation: &mut String, outcome: &VerificationOutcome) {
    if outcome.affiliate {
        explanation.push_str(" This is an affiliate or tracking link.");
    }
    if outcome.via_browser {
        explanation.push_str(" Verified in a real browser.");
    }
}

/// Final URL of a redirect chain, when it differs from the target.
pub fn redirect_fix(target_url: &str, outcome: &VerificationOutcome) -> Option<String> {
    (outcome.redirects > 0 && outcome.final_url != target_url).then(|| outcome.final_url.clone())
}
