use crate::browser::{BrowserSession, BrowserTab, NavigationResponse, Viewport, WaitUntil, close_tab};
use crate::classifier::LinkClassifier;
use crate::error::{Result, ScanError};
use crate::outcome::{LinkStatus, VerificationOutcome};
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const MAX_REDIRECTS: u32 = 5;

/// Resolves a target URL to a [`VerificationOutcome`].
///
/// Transport failures are folded into [`LinkStatus`] sentinels; `verify`
/// never fails and never retries.
pub struct StatusVerifier {
    client: Client,
    classifier: LinkClassifier,
    http_timeout: Duration,
    browser_timeout: Duration,
    user_agent: String,
}

impl StatusVerifier {
    pub fn new() -> Result<Self> {
        Self::with_timeouts(Duration::from_secs(15), Duration::from_secs(20))
    }

    pub fn with_timeouts(http_timeout: Duration, browser_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT, http_timeout)?,
            classifier: LinkClassifier::new(),
            http_timeout,
            browser_timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_classifier(mut self, classifier: LinkClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Result<Self> {
        self.user_agent = user_agent.into();
        self.client = build_client(&self.user_agent, self.http_timeout)?;
        Ok(self)
    }

    pub fn classifier(&self) -> &LinkClassifier {
        &self.classifier
    }

    pub async fn verify(&self, url: &str, browser: Option<&dyn BrowserSession>) -> VerificationOutcome {
        if let Some(outcome) = self.classifier.classify_for_skip(url) {
            debug!("Skipping {}: {}", url, outcome.status_text);
            return outcome;
        }

        if let Some(outcome) = self.classifier.classify_special_scheme(url) {
            return outcome;
        }

        let affiliate = self.classifier.is_affiliate_class(url);
        let mut outcome = match browser {
            Some(session) if affiliate => match self.verify_in_browser(url, session).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Browser check unavailable for {} ({}), using HTTP", url, e);
                    self.verify_http(url).await
                }
            },
            _ => self.verify_http(url).await,
        };
        outcome.affiliate = affiliate;

        if affiliate && outcome.via_browser && outcome.status == LinkStatus::Http(403) {
            outcome.treat_as_working = true;
            outcome.status_text =
                "Blocked by anti-bot protection; affiliate link works for visitors".to_string();
        }

        outcome
    }

    async fn verify_in_browser(&self, url: &str, session: &dyn BrowserSession) -> Result<VerificationOutcome> {
        let tab = session.open_tab().await?;
        let result = self.navigate_tab(url, tab.as_ref()).await;
        close_tab(tab).await;
        result
    }

    async fn navigate_tab(&self, url: &str, tab: &dyn BrowserTab) -> Result<VerificationOutcome> {
        tab.configure(Viewport::default(), &self.user_agent, true).await?;

        let start = Instant::now();
        let navigation = tab.navigate(url, WaitUntil::DomReady, self.browser_timeout).await;

        let mut outcome = match navigation {
            Ok(NavigationResponse {
                status,
                final_url,
                redirects,
                elapsed,
            }) => {
                let (status, text) = match status {
                    Some(code) => (LinkStatus::Http(code), status_label(code)),
                    None => (LinkStatus::Http(200), "Loaded in browser".to_string()),
                };
                let mut outcome = VerificationOutcome::new(final_url, status, text);
                outcome.redirects = redirects;
                outcome.response_time = elapsed;
                outcome
            }
            Err(e) => {
                let (status, text) = classify_browser_error(&e);
                let mut outcome = VerificationOutcome::new(url, status, text);
                outcome.response_time = start.elapsed();
                outcome
            }
        };
        outcome.via_browser = true;
        Ok(outcome)
    }

    async fn verify_http(&self, url: &str) -> VerificationOutcome {
        let start = Instant::now();
        let mut current = url.to_string();
        let mut redirects = 0;

        loop {
            let response = match self.client.get(&current).send().await {
                Ok(response) => response,
                Err(e) => {
                    let (status, text) = classify_transport_error(&e);
                    debug!("Request to {} failed: {} ({})", current, status, text);
                    let mut outcome = VerificationOutcome::new(current, status, text);
                    outcome.redirects = redirects;
                    outcome.response_time = start.elapsed();
                    return outcome;
                }
            };

            let status = response.status();
            if status.is_redirection()
                && let Some(next) = next_location(&response, &current)
            {
                if redirects >= MAX_REDIRECTS {
                    debug!("{} exceeded {} redirects", current, MAX_REDIRECTS);
                    let mut outcome = VerificationOutcome::new(
                        current,
                        LinkStatus::Error,
                        format!("Too many redirects ({})", MAX_REDIRECTS),
                    );
                    outcome.redirects = redirects;
                    outcome.response_time = start.elapsed();
                    return outcome;
                }
                debug!("{} redirected ({}) to {}", current, status.as_u16(), next);
                redirects += 1;
                current = next;
                continue;
            }

            let mut outcome = VerificationOutcome::new(
                response.url().to_string(),
                LinkStatus::Http(status.as_u16()),
                status_label(status.as_u16()),
            );
            outcome.redirects = redirects;
            outcome.response_time = start.elapsed();
            return outcome;
        }
    }
}

fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

fn next_location(response: &reqwest::Response, current: &str) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let base = Url::parse(current).ok()?;
    base.join(location).ok().map(|u| u.to_string())
}

fn status_label(code: u16) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", code))
}

/// Maps a reqwest failure onto the sentinel taxonomy, keeping the message
/// as the label for anything unrecognised.
pub fn classify_transport_error(err: &reqwest::Error) -> (LinkStatus, String) {
    if err.is_timeout() {
        return (LinkStatus::Timeout, "Request timed out".to_string());
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    return (LinkStatus::ConnectionRefused, "Connection refused".to_string());
                }
                std::io::ErrorKind::TimedOut => {
                    return (LinkStatus::Timeout, "Connection timed out".to_string());
                }
                _ => {}
            }
        }
        let message = cause.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
        {
            return (LinkStatus::DnsError, "DNS resolution failed".to_string());
        }
        source = cause.source();
    }

    (LinkStatus::Error, error_chain(err))
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Maps a failed browser navigation onto the sentinel taxonomy.
pub fn classify_browser_error(err: &ScanError) -> (LinkStatus, String) {
    if err.is_timeout() {
        return (LinkStatus::Timeout, "Navigation timed out".to_string());
    }
    let message = err.to_string();
    if message.contains("ERR_NAME_NOT_RESOLVED") || message.contains("ERR_NAME_RESOLUTION_FAILED") {
        (LinkStatus::DnsError, "DNS resolution failed".to_string())
    } else if message.contains("ERR_CONNECTION_REFUSED") {
        (LinkStatus::ConnectionRefused, "Connection refused".to_string())
    } else if message.contains("ERR_TIMED_OUT") || message.contains("ERR_CONNECTION_TIMED_OUT") {
        (LinkStatus::Timeout, "Navigation timed out".to_string())
    } else {
        (LinkStatus::Error, message)
    }
}
