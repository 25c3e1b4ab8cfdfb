pub mod enrich;
pub mod error;
pub mod report;
pub mod scan;
pub mod scoring;

pub use error::{PipelineError, Result};
pub use report::{Issue, ReportFormat, ScanReport};
pub use scan::{ScanOptions, ScanProgress, ScanProgressCallback, Scanner};
