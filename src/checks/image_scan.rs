use async_trait::async_trait;
use bollard::Docker;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{find_on_path, CheckCounters, CheckOutcome, SecurityCheck};

pub const NAME: &str = "image_scan";

/// Trivy scan of locally available container images.
pub struct ImageScan {
    images: Vec<String>,
}

impl ImageScan {
    pub fn new(images: Vec<String>) -> Self {
        Self { images }
    }

    async fn scan_image(image: &str) -> Result<CheckCounters, String> {
        let output = tokio::process::Command::new("trivy")
            .args(["image", "--format", "json", "--quiet", image])
            .output()
            .await
            .map_err(|e| format!("failed to run trivy: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "trivy exited with {}: {}",
                output.status.code().unwrap_or(-1),
                crate::utils::truncation::truncate_snippet(stderr.trim())
            ));
        }

        let report: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("unparseable trivy output: {}", e))?;
        Ok(parse_trivy_counts(&report))
    }
}

/// Counts `Results[].Vulnerabilities[].Severity` for CRITICAL/HIGH/MEDIUM.
pub fn parse_trivy_counts(report: &Value) -> CheckCounters {
    let mut counters = CheckCounters::default();
    let results = report["Results"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    for result in results {
        let vulns = result["Vulnerabilities"].as_array().map(Vec::as_slice).unwrap_or(&[]);
        for vuln in vulns {
            match vuln["Severity"].as_str() {
                Some("CRITICAL") => counters.critical += 1,
                Some("HIGH") => counters.high += 1,
                Some("MEDIUM") => counters.medium += 1,
                _ => {}
            }
        }
    }
    counters
}

#[async_trait]
impl SecurityCheck for ImageScan {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckOutcome {
        if self.images.is_empty() {
            return CheckOutcome::skipped(NAME, "no images configured");
        }
        if find_on_path("trivy").is_none() {
            return CheckOutcome::skipped(NAME, "trivy not installed");
        }
        let docker = match Docker::connect_with_local_defaults() {
            Ok(docker) => docker,
            Err(e) => return CheckOutcome::skipped(NAME, format!("docker unavailable: {}", e)),
        };

        let mut counters = CheckCounters::default();
        let mut scanned = 0usize;
        let mut errors = Vec::new();

        for image in &self.images {
            if let Err(e) = docker.inspect_image(image).await {
                debug!(image = %image, error = %e, "Image not present locally, skipping");
                continue;
            }
            match Self::scan_image(image).await {
                Ok(found) => {
                    info!(image = %image, critical = found.critical, high = found.high, "Image scanned");
                    counters.add(&found);
                    scanned += 1;
                }
                Err(e) => {
                    warn!(image = %image, error = %e, "Image scan failed");
                    errors.push(format!("{}: {}", image, e));
                }
            }
        }

        match (scanned, errors.is_empty()) {
            (0, true) => CheckOutcome::skipped(NAME, "none of the configured images exist locally"),
            (0, false) => CheckOutcome::failed(NAME, errors.join("; ")),
            _ => CheckOutcome::completed(NAME, counters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;
    use serde_json::json;

    #[test]
    fn test_parse_trivy_results() {
        let report = json!({
            "Results": [
                { "Target": "app:latest (debian 12)", "Vulnerabilities": [
                    { "VulnerabilityID": "CVE-1", "Severity": "CRITICAL" },
                    { "VulnerabilityID": "CVE-2", "Severity": "HIGH" },
                    { "VulnerabilityID": "CVE-3", "Severity": "HIGH" },
                    { "VulnerabilityID": "CVE-4", "Severity": "LOW" }
                ]},
                { "Target": "node-pkg", "Vulnerabilities": [
                    { "VulnerabilityID": "CVE-5", "Severity": "MEDIUM" }
                ]},
                { "Target": "clean" }
            ]
        });
        assert_eq!(
            parse_trivy_counts(&report),
            CheckCounters { critical: 1, high: 2, medium: 1, secrets: 0 }
        );
    }

    #[test]
    fn test_parse_trivy_empty() {
        assert!(parse_trivy_counts(&json!({})).is_clean());
        assert!(parse_trivy_counts(&json!({ "Results": null })).is_clean());
    }

    #[tokio::test]
    async fn test_no_images_skips() {
        let outcome = ImageScan::new(Vec::new()).run().await;
        assert_eq!(outcome.status, CheckStatus::Skipped("no images configured".into()));
    }
}
