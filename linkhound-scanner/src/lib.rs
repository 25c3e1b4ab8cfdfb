pub mod browser;
pub mod chromium;
pub mod classifier;
pub mod crawler;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod outcome;
pub mod result;
mod scripts;
pub mod verifier;

pub use browser::{BrowserLauncher, BrowserSession, BrowserTab};
pub use chromium::ChromiumLauncher;
pub use classifier::{ClassificationRules, LinkClassifier, Priority};
pub use crawler::Crawler;
pub use error::{Result, ScanError};
pub use evidence::EvidenceCapturer;
pub use outcome::{LinkStatus, VerificationOutcome};
pub use result::{CrawlResult, Reference, ReferenceKind};
pub use verifier::StatusVerifier;
