use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::checks::runner::total_counters;
use crate::checks::{exit_code, CheckCounters, CheckOutcome, ExitPolicy, SecretMatch};
use crate::errors::BreachwatchError;
use super::html::render_html_report;

pub const HTML_REPORT_FILE: &str = "security-report.html";
pub const JSON_REPORT_FILE: &str = "security-report.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub generated_at: DateTime<Utc>,
    pub counters: CheckCounters,
    pub policy: ExitPolicy,
    pub exit_code: i32,
    pub checks: Vec<CheckOutcome>,
}

impl SecurityReport {
    pub fn assemble(outcomes: Vec<CheckOutcome>, policy: ExitPolicy) -> Self {
        let counters = total_counters(&outcomes);
        Self {
            generated_at: Utc::now(),
            exit_code: exit_code(&counters, &policy),
            counters,
            policy,
            checks: outcomes,
        }
    }

    pub fn secret_matches(&self) -> impl Iterator<Item = &SecretMatch> {
        self.checks.iter().flat_map(|c| c.secret_matches.iter())
    }

    pub fn missing_headers(&self) -> impl Iterator<Item = &String> {
        self.checks.iter().flat_map(|c| c.missing_headers.iter())
    }
}

/// Writes the HTML and JSON renditions into `output_dir`.
pub async fn write_report(report: &SecurityReport, output_dir: &Path) -> Result<(PathBuf, PathBuf), BreachwatchError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let json_path = output_dir.join(JSON_REPORT_FILE);
    tokio::fs::write(&json_path, serde_json::to_string_pretty(report)?).await?;

    let html_path = output_dir.join(HTML_REPORT_FILE);
    tokio::fs::write(&html_path, render_html_report(report)).await?;

    info!(
        html = %html_path.display(),
        json = %json_path.display(),
        exit_code = report.exit_code,
        "Security report written"
    );
    Ok((html_path, json_path))
}
