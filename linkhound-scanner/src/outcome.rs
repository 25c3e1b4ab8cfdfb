use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status of one verified target: a real HTTP code or a transport-level sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireStatus", into = "WireStatus")]
pub enum LinkStatus {
    Http(u16),
    DnsError,
    Timeout,
    ConnectionRefused,
    Error,
    Skip,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireStatus {
    Code(u16),
    Sentinel(String),
}

impl From<LinkStatus> for WireStatus {
    fn from(status: LinkStatus) -> Self {
        match status {
            LinkStatus::Http(code) => WireStatus::Code(code),
            other => WireStatus::Sentinel(other.to_string()),
        }
    }
}

impl TryFrom<WireStatus> for LinkStatus {
    type Error = String;

    fn try_from(wire: WireStatus) -> Result<Self, String> {
        match wire {
            WireStatus::Code(code) if (100..=599).contains(&code) => Ok(LinkStatus::Http(code)),
            WireStatus::Code(code) => Err(format!("HTTP status out of range: {}", code)),
            WireStatus::Sentinel(s) => LinkStatus::from_sentinel(&s)
                .ok_or_else(|| format!("unknown status sentinel: {}", s)),
        }
    }
}

impl LinkStatus {
    pub fn from_sentinel(s: &str) -> Option<Self> {
        match s {
            "DNS_ERROR" => Some(LinkStatus::DnsError),
            "TIMEOUT" => Some(LinkStatus::Timeout),
            "CONNECTION_REFUSED" => Some(LinkStatus::ConnectionRefused),
            "ERROR" => Some(LinkStatus::Error),
            "SKIP" => Some(LinkStatus::Skip),
            _ => None,
        }
    }

    /// 2xx and 304 count as working.
    pub fn is_success(&self) -> bool {
        matches!(self, LinkStatus::Http(code) if (200..300).contains(code) || *code == 304)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, LinkStatus::Http(code) if (300..400).contains(code))
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Http(code) => write!(f, "{}", code),
            LinkStatus::DnsError => f.write_str("DNS_ERROR"),
            LinkStatus::Timeout => f.write_str("TIMEOUT"),
            LinkStatus::ConnectionRefused => f.write_str("CONNECTION_REFUSED"),
            LinkStatus::Error => f.write_str("ERROR"),
            LinkStatus::Skip => f.write_str("SKIP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: LinkStatus,
    pub status_text: String,
    #[serde(with = "duration_millis")]
    pub response_time: Duration,
    pub redirects: u32,
    pub final_url: String,
    pub via_browser: bool,
    pub affiliate: bool,
    pub treat_as_working: bool,
    pub skipped: bool,
}

impl VerificationOutcome {
    pub fn new(url: impl Into<String>, status: LinkStatus, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            response_time: Duration::ZERO,
            redirects: 0,
            final_url: url.into(),
            via_browser: false,
            affiliate: false,
            treat_as_working: false,
            skipped: false,
        }
    }

    /// Synthetic outcome for targets that are never put on the wire.
    pub fn skipped(url: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut outcome = Self::new(url, LinkStatus::Http(200), reason);
        outcome.skipped = true;
        outcome
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
