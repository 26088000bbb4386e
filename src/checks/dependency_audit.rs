use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{CheckCounters, CheckOutcome, SecurityCheck};
use crate::utils::truncation::truncate_snippet;

pub const NAME: &str = "dependency_audit";

enum AuditInput {
    Body(String),
    Skip(&'static str),
}

/// `npm audit` severity counts. A pre-generated report takes precedence
/// over running npm.
pub struct DependencyAudit {
    project_dir: PathBuf,
    audit_report: Option<PathBuf>,
}

impl DependencyAudit {
    pub fn new(project_dir: impl Into<PathBuf>, audit_report: Option<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            audit_report,
        }
    }

    async fn audit_json(&self) -> Result<AuditInput, String> {
        if let Some(report) = &self.audit_report {
            return tokio::fs::read_to_string(report)
                .await
                .map(AuditInput::Body)
                .map_err(|e| format!("cannot read {}: {}", report.display(), e));
        }

        if !self.project_dir.join("package.json").is_file() {
            return Ok(AuditInput::Skip("no package.json in project directory"));
        }

        let output = tokio::process::Command::new("npm")
            .args(["audit", "--json"])
            .current_dir(&self.project_dir)
            .output()
            .await;

        match output {
            // npm exits non-zero whenever vulnerabilities exist, so a JSON
            // body is used regardless of the exit status.
            Ok(out) => {
                debug!(status = ?out.status.code(), bytes = out.stdout.len(), "npm audit finished");
                let body = String::from_utf8_lossy(&out.stdout).into_owned();
                if !out.status.success() && serde_json::from_str::<Value>(&body).is_err() {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    return Err(format!(
                        "npm audit exited with {}: {}",
                        out.status,
                        truncate_snippet(stderr.trim())
                    ));
                }
                Ok(AuditInput::Body(body))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AuditInput::Skip("npm not installed")),
            Err(e) => Err(format!("failed to run npm audit: {}", e)),
        }
    }
}

/// npm reports its own failures (missing lockfile, registry errors) as a
/// JSON body with an `error` object instead of vulnerability metadata.
pub fn audit_error(report: &Value) -> Option<String> {
    let error = report.get("error")?.as_object()?;
    let field = |key: &str| error.get(key).and_then(Value::as_str).unwrap_or("").trim();
    let (code, summary) = (field("code"), field("summary"));
    Some(match (code.is_empty(), summary.is_empty()) {
        (false, false) => format!("{}: {}", code, summary),
        (false, true) => code.to_string(),
        (true, false) => summary.to_string(),
        (true, true) => "npm audit reported an error".to_string(),
    })
}

/// Reads `metadata.vulnerabilities.{critical,high,moderate}`; anything
/// missing counts as zero.
pub fn parse_audit_counts(report: &Value) -> CheckCounters {
    let vulns = &report["metadata"]["vulnerabilities"];
    let count = |key: &str| vulns[key].as_u64().unwrap_or(0);
    CheckCounters {
        critical: count("critical"),
        high: count("high"),
        medium: count("moderate"),
        secrets: 0,
    }
}

#[async_trait]
impl SecurityCheck for DependencyAudit {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckOutcome {
        let body = match self.audit_json().await {
            Ok(AuditInput::Body(body)) => body,
            Ok(AuditInput::Skip(reason)) => return CheckOutcome::skipped(NAME, reason),
            Err(reason) => {
                warn!(reason = %reason, "Dependency audit failed");
                return CheckOutcome::failed(NAME, reason);
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(report) => match audit_error(&report) {
                Some(reason) => {
                    warn!(reason = %reason, "npm audit reported an error");
                    CheckOutcome::failed(NAME, truncate_snippet(&reason))
                }
                None => CheckOutcome::completed(NAME, parse_audit_counts(&report)),
            },
            Err(e) => {
                warn!(error = %e, "Unparseable npm audit output");
                CheckOutcome::failed(NAME, format!("unparseable audit output: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;
    use serde_json::json;

    #[test]
    fn test_parse_full_metadata() {
        let report = json!({
            "metadata": { "vulnerabilities": { "info": 0, "low": 4, "moderate": 3, "high": 2, "critical": 1, "total": 10 } }
        });
        assert_eq!(
            parse_audit_counts(&report),
            CheckCounters { critical: 1, high: 2, medium: 3, secrets: 0 }
        );
    }

    #[test]
    fn test_missing_fields_are_zero() {
        assert!(parse_audit_counts(&json!({})).is_clean());
        assert!(parse_audit_counts(&json!({ "metadata": {} })).is_clean());
        let partial = parse_audit_counts(&json!({ "metadata": { "vulnerabilities": { "high": 7 } } }));
        assert_eq!(partial.high, 7);
        assert_eq!(partial.critical, 0);
    }

    #[tokio::test]
    async fn test_reads_pregenerated_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("audit.json");
        std::fs::write(&report, r#"{"metadata":{"vulnerabilities":{"critical":2,"moderate":1}}}"#).unwrap();

        let outcome = DependencyAudit::new(dir.path(), Some(report)).run().await;
        assert_eq!(outcome.status, CheckStatus::Completed);
        assert_eq!(outcome.counters.critical, 2);
        assert_eq!(outcome.counters.medium, 1);
    }

    #[tokio::test]
    async fn test_skips_without_package_json() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = DependencyAudit::new(dir.path(), None).run().await;
        assert!(matches!(outcome.status, CheckStatus::Skipped(_)));
    }

    #[tokio::test]
    async fn test_garbage_report_fails_without_findings() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("audit.json");
        std::fs::write(&report, "npm ERR! something broke").unwrap();

        let outcome = DependencyAudit::new(dir.path(), Some(report)).run().await;
        assert!(matches!(outcome.status, CheckStatus::Failed(_)));
        assert!(outcome.counters.is_clean());
    }

    #[tokio::test]
    async fn test_error_body_fails_instead_of_clean() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("audit.json");
        std::fs::write(
            &report,
            r#"{"error":{"code":"ENOLOCK","summary":"This command requires an existing lockfile.","detail":"Try creating one first"}}"#,
        )
        .unwrap();

        let outcome = DependencyAudit::new(dir.path(), Some(report)).run().await;
        assert_eq!(
            outcome.status,
            CheckStatus::Failed("ENOLOCK: This command requires an existing lockfile.".into())
        );
        assert!(outcome.counters.is_clean());
    }

    #[test]
    fn test_audit_error_detection() {
        assert_eq!(audit_error(&json!({ "error": { "code": "E500" } })), Some("E500".into()));
        assert_eq!(
            audit_error(&json!({ "error": {} })),
            Some("npm audit reported an error".into())
        );
        assert_eq!(audit_error(&json!({ "error": null, "metadata": {} })), None);
        assert_eq!(audit_error(&json!({ "metadata": { "vulnerabilities": {} } })), None);
    }
}
