//! Best-effort security checks. A check never fails the run: tool errors are
//! recorded on the outcome and contribute zero findings.

pub mod dependency_audit;
pub mod header_check;
pub mod image_scan;
pub mod policy;
pub mod runner;
pub mod secret_scan;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use policy::{exit_code, ExitPolicy};
pub use runner::CheckRunner;

#[async_trait]
pub trait SecurityCheck: Send + Sync {
    /// Stable identifier used in reports and logs.
    fn name(&self) -> &'static str;

    async fn run(&self) -> CheckOutcome;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCounters {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub secrets: u64,
}

impl CheckCounters {
    pub fn add(&mut self, other: &CheckCounters) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.secrets += other.secrets;
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum CheckStatus {
    Completed,
    /// Tool or input absent.
    Skipped(String),
    /// Tool present but the run or its output was unusable.
    Failed(String),
}

impl CheckStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Completed => None,
            Self::Skipped(r) | Self::Failed(r) => Some(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMatch {
    pub pattern: String,
    /// Path relative to the scanned root.
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub status: CheckStatus,
    pub counters: CheckCounters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_matches: Vec<SecretMatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_headers: Vec<String>,
    pub duration_ms: u64,
}

impl CheckOutcome {
    pub fn completed(name: &str, counters: CheckCounters) -> Self {
        Self::with_status(name, CheckStatus::Completed, counters)
    }

    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Skipped(reason.into()), CheckCounters::default())
    }

    pub fn failed(name: &str, reason: impl Into<String>) -> Self {
        Self::with_status(name, CheckStatus::Failed(reason.into()), CheckCounters::default())
    }

    fn with_status(name: &str, status: CheckStatus, counters: CheckCounters) -> Self {
        Self {
            name: name.to_string(),
            status,
            counters,
            secret_matches: Vec::new(),
            missing_headers: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Locate an executable on `PATH`.
pub fn find_on_path(tool: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(tool))
        .find(|candidate| candidate.is_file())
}
