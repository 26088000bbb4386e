use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{CheckCounters, CheckOutcome, SecurityCheck};

pub const NAME: &str = "header_check";

pub const REQUIRED_HEADERS: [&str; 4] = [
    "Strict-Transport-Security",
    "X-Content-Type-Options",
    "X-Frame-Options",
    "Content-Security-Policy",
];

pub struct HeaderCheck {
    url: Option<String>,
    timeout: Duration,
}

impl HeaderCheck {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        Self { url, timeout }
    }
}

/// Required headers absent from a rendered `name: value` header block.
/// Matching is a case-insensitive substring test.
pub fn missing_headers(header_block: &str) -> Vec<String> {
    let lower = header_block.to_lowercase();
    REQUIRED_HEADERS
        .iter()
        .filter(|h| !lower.contains(&h.to_lowercase()))
        .map(|h| h.to_string())
        .collect()
}

fn render_headers(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}\n", name, value.to_str().unwrap_or("")))
        .collect()
}

#[async_trait]
impl SecurityCheck for HeaderCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckOutcome {
        let Some(url) = &self.url else {
            return CheckOutcome::skipped(NAME, "no header_url configured");
        };

        let client = match reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
        {
            Ok(client) => client,
            Err(e) => return CheckOutcome::failed(NAME, format!("http client: {}", e)),
        };

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request to {} timed out after {}s", url, self.timeout.as_secs())
                } else {
                    format!("request to {} failed: {}", url, e)
                };
                warn!(url = %url, reason = %reason, "Header check failed");
                return CheckOutcome::failed(NAME, reason);
            }
        };

        let missing = missing_headers(&render_headers(response.headers()));
        info!(url = %url, status = response.status().as_u16(), missing = missing.len(), "Security headers checked");

        let mut outcome = CheckOutcome::completed(NAME, CheckCounters::default());
        outcome.missing_headers = missing;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;
    use axum::{http::header, response::IntoResponse, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn test_missing_headers_case_insensitive() {
        let block = "strict-transport-security: max-age=63072000\nX-CONTENT-TYPE-OPTIONS: nosniff\n";
        assert_eq!(missing_headers(block), vec!["X-Frame-Options", "Content-Security-Policy"]);
    }

    #[test]
    fn test_substring_match_accepts_report_only_variant() {
        let block = "content-security-policy-report-only: default-src 'self'\n";
        assert!(!missing_headers(block).contains(&"Content-Security-Policy".to_string()));
    }

    #[test]
    fn test_all_missing_from_empty_block() {
        assert_eq!(missing_headers("").len(), 4);
    }

    #[tokio::test]
    async fn test_against_live_server() {
        let app = Router::new().route("/", get(|| async {
            (
                [
                    (header::STRICT_TRANSPORT_SECURITY, "max-age=31536000"),
                    (header::X_FRAME_OPTIONS, "DENY"),
                ],
                "ok",
            ).into_response()
        }));
        let url = serve(app).await;

        let outcome = HeaderCheck::new(Some(url), Duration::from_secs(5)).run().await;
        assert_eq!(outcome.status, CheckStatus::Completed);
        assert_eq!(outcome.missing_headers, vec!["X-Content-Type-Options", "Content-Security-Policy"]);
        assert!(outcome.counters.is_clean());
    }

    #[tokio::test]
    async fn test_unreachable_url_fails_softly() {
        let outcome = HeaderCheck::new(Some("http://127.0.0.1:1/".into()), Duration::from_secs(2)).run().await;
        assert!(matches!(outcome.status, CheckStatus::Failed(_)));
        assert!(outcome.missing_headers.is_empty());
    }

    #[tokio::test]
    async fn test_no_url_skips() {
        let outcome = HeaderCheck::new(None, Duration::from_secs(1)).run().await;
        assert!(matches!(outcome.status, CheckStatus::Skipped(_)));
    }
}
