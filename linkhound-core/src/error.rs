use linkhound_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Crawl failed: {0}")]
    Crawl(#[source] ScanError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ScanError> for PipelineError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidUrl(msg) => PipelineError::InvalidInput(msg),
            ScanError::BrowserLaunch(msg) => PipelineError::BrowserLaunch(msg),
            other => PipelineError::Crawl(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_errors_map_onto_pipeline_taxonomy() {
        let err: PipelineError = ScanError::InvalidUrl("nope".to_string()).into();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let err: PipelineError = ScanError::BrowserLaunch("missing chrome".to_string()).into();
        assert!(matches!(err, PipelineError::BrowserLaunch(_)));
        assert_eq!(err.to_string(), "Failed to launch browser: missing chrome");

        let err: PipelineError = ScanError::Evaluation("x".to_string()).into();
        assert!(matches!(err, PipelineError::Crawl(_)));
    }
}
