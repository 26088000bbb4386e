use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{IncidentStatus, NotificationStatus, TimelineInterval};

/// `?actor=` on mutating endpoints whose body is a domain type.
#[derive(Debug, Default, Deserialize)]
pub struct ActorQuery {
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: IncidentStatus,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationSentRequest {
    /// Defaults to now.
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub completed: bool,
    pub actor: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NotificationStatusRequest {
    pub status: NotificationStatus,
    pub error: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub status: NotificationStatus,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Look-back window in days, 1..=365.
    pub days: Option<i64>,
    pub interval: Option<String>,
}

impl WindowQuery {
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.days.unwrap_or(7).clamp(1, 365))
    }

    pub fn interval(&self) -> TimelineInterval {
        self.interval
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(TimelineInterval::Day)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub git_hash: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}
