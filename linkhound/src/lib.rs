// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{describe_progress, emit_report, emit_screenshots, expand_path, handle_scan, parse_format};
