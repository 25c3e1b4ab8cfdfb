// Scan report model and renderers

use chrono::{DateTime, Utc};
use linkhound_scanner::{Priority, ReferenceKind, VerificationOutcome};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub page_url: String,
    pub target_url: String,
    pub label: String,
    pub kind: ReferenceKind,
    pub context: String,
    pub outcome: VerificationOutcome,
    pub priority: Priority,
    pub issue_type: String,
    pub explanation: String,
    pub suggested_fix: Option<String>,
    pub impact_score: u8,
    pub appearances: usize,
    #[serde(with = "screenshot_base64", default)]
    pub screenshot: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.priority {
                Priority::Critical => counts.critical += 1,
                Priority::High => counts.high += 1,
                Priority::Medium => counts.medium += 1,
                Priority::Low => counts.low += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub pages_visited: usize,
    pub total_references: usize,
    pub unique_targets: usize,
    pub skipped_targets: usize,
    pub issue_count: usize,
    pub priority_counts: PriorityCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub root_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `None` when the scan found no references at all.
    pub health_score: Option<u8>,
    pub summary: ScanSummary,
    pub issues: Vec<Issue>,
    pub visited_pages: Vec<String>,
}

impl ScanReport {
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    fn health_display(&self) -> String {
        match self.health_score {
            Some(score) => format!("{}/100", score),
            None => "n/a (no references found)".to_string(),
        }
    }
}

pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Csv => Ok(generate_csv_report(report)),
    }
}

pub fn generate_text_report(data: &ScanReport) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push_str("                         LINKHOUND LINK HEALTH REPORT\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Scan ID:       {}\n", data.scan_id));
    report.push_str(&format!("Root URL:      {}\n", data.root_url));
    report.push_str(&format!(
        "Scan Date:     {}\n",
        data.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("Duration:      {} seconds\n", data.duration_secs()));
    report.push_str(&format!("Pages Visited: {}\n", data.summary.pages_visited));
    report.push_str(&format!("References:    {}\n", data.summary.total_references));
    report.push_str(&format!(
        "Unique URLs:   {} ({} skipped)\n",
        data.summary.unique_targets, data.summary.skipped_targets
    ));
    report.push_str(&format!("Health Score:  {}\n", data.health_display()));
    report.push('\n');

    report.push_str(HEAVY_RULE);
    report.push_str("SUMMARY\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    let counts = &data.summary.priority_counts;
    report.push_str(&format!("Total Issues: {}\n\n", data.summary.issue_count));
    if counts.critical > 0 {
        report.push_str(&format!("  [CRITICAL] {}  (Fix immediately)\n", counts.critical));
    }
    if counts.high > 0 {
        report.push_str(&format!("  [HIGH]     {}  (High priority)\n", counts.high));
    }
    if counts.medium > 0 {
        report.push_str(&format!("  [MEDIUM]   {}  (Should be addressed)\n", counts.medium));
    }
    if counts.low > 0 {
        report.push_str(&format!("  [LOW]      {}  (Minor issues)\n", counts.low));
    }
    report.push('\n');

    if !data.issues.is_empty() {
        report.push_str(HEAVY_RULE);
        report.push_str("ISSUES\n");
        report.push_str(HEAVY_RULE);
        report.push('\n');

        for (idx, issue) in data.issues.iter().enumerate() {
            report.push_str(&format!("[{}] {}\n", idx + 1, issue.issue_type));
            report.push_str(&format!("Priority:     {}\n", issue.priority.as_str().to_uppercase()));
            report.push_str(&format!(
                "Status:       {} {}\n",
                issue.outcome.status, issue.outcome.status_text
            ));
            report.push_str(&format!("Target:       {}\n", issue.target_url));
            report.push_str(&format!("Found On:     {}\n", issue.page_url));
            report.push_str(&format!("Element:      {} \"{}\" in {}\n", issue.kind.as_str(), issue.label, issue.context));
            report.push_str(&format!(
                "Impact:       {}/100 (on {} page{})\n",
                issue.impact_score,
                issue.appearances,
                if issue.appearances == 1 { "" } else { "s" }
            ));
            if issue.screenshot.is_some() {
                report.push_str("Evidence:     screenshot captured\n");
            }

            report.push_str("\nExplanation:\n");
            report.push_str(&wrap_text(&issue.explanation, 80, "  "));
            report.push('\n');

            if let Some(ref fix) = issue.suggested_fix {
                report.push_str("\nSuggested Fix:\n");
                report.push_str(&wrap_text(fix, 80, "  "));
                report.push('\n');
            }

            report.push('\n');
            report.push_str(LIGHT_RULE);
            report.push('\n');
        }
    }

    report.push_str(HEAVY_RULE);
    report.push_str("                          End of Report\n");
    report.push_str(HEAVY_RULE);
    report.push_str("\nGenerated by Linkhound\n\n");

    report
}

pub fn generate_json_report(data: &ScanReport) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(data)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "metadata".to_string(),
            serde_json::json!({
                "generator": "Linkhound",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": Utc::now().to_rfc3339(),
                "format": "json",
            }),
        );
    }
    serde_json::to_string_pretty(&value)
}

const CSV_HEADER: &[&str] = &[
    "rank",
    "priority",
    "issue_type",
    "status",
    "status_text",
    "target_url",
    "page_url",
    "label",
    "kind",
    "context",
    "impact_score",
    "appearances",
    "affiliate",
    "via_browser",
    "explanation",
    "suggested_fix",
    "screenshot_png_base64",
];

pub fn generate_csv_report(data: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADER.join(","));
    out.push_str("\r\n");

    for (idx, issue) in data.issues.iter().enumerate() {
        let fields = [
            (idx + 1).to_string(),
            issue.priority.as_str().to_string(),
            issue.issue_type.clone(),
            issue.outcome.status.to_string(),
            issue.outcome.status_text.clone(),
            issue.target_url.clone(),
            issue.page_url.clone(),
            issue.label.clone(),
            issue.kind.as_str().to_string(),
            issue.context.clone(),
            issue.impact_score.to_string(),
            issue.appearances.to_string(),
            issue.outcome.affiliate.to_string(),
            issue.outcome.via_browser.to_string(),
            issue.explanation.clone(),
            issue.suggested_fix.clone().unwrap_or_default(),
            issue
                .screenshot
                .as_deref()
                .map(screenshot_base64::encode)
                .unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Writes each captured screenshot as `issue-<rank>.png` under `dir`.
pub fn export_screenshots(data: &ScanReport, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (idx, issue) in data.issues.iter().enumerate() {
        if let Some(ref png) = issue.screenshot {
            let path = dir.join(format!("issue-{}.png", idx + 1));
            fs::write(&path, png)?;
            written.push(path);
        }
    }
    Ok(written)
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width - indent.len() && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

mod screenshot_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_respects_width() {
        let wrapped = wrap_text("one two three four five six", 12, "  ");
        for line in wrapped.lines() {
            assert!(line.len() <= 12, "line too long: {:?}", line);
        }
        assert_eq!(wrapped.lines().count(), 3);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }
}
