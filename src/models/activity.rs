use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::page::Tally;
use crate::errors::BreachwatchError;

/// Timeline action. The column is free text, so unknown values are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityAction {
    Created,
    StatusChange,
    SeverityChange,
    Assignment,
    Comment,
    BreachFlagged,
    NotificationQueued,
    NotificationStatus,
    Updated,
    Other(String),
}

impl ActivityAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::StatusChange => "status_change",
            Self::SeverityChange => "severity_change",
            Self::Assignment => "assignment",
            Self::Comment => "comment",
            Self::BreachFlagged => "breach_flagged",
            Self::NotificationQueued => "notification_queued",
            Self::NotificationStatus => "notification_status",
            Self::Updated => "updated",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ActivityAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => Self::Created,
            "status_change" => Self::StatusChange,
            "severity_change" => Self::SeverityChange,
            "assignment" => Self::Assignment,
            "comment" => Self::Comment,
            "breach_flagged" => Self::BreachFlagged,
            "notification_queued" => Self::NotificationQueued,
            "notification_status" => Self::NotificationStatus,
            "updated" => Self::Updated,
            _ => Self::Other(value),
        }
    }
}

impl From<ActivityAction> for String {
    fn from(value: ActivityAction) -> Self {
        match value {
            ActivityAction::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only timeline entry on an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentActivity {
    pub id: i64,
    pub incident_id: i64,
    pub action_type: ActivityAction,
    pub description: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub action_type: ActivityAction,
    pub description: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
}

impl NewActivity {
    pub fn new(action_type: ActivityAction, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: Some(description.into()),
            old_value: None,
            new_value: None,
            performed_by: None,
        }
    }

    pub fn change(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn by(mut self, actor: Option<&str>) -> Self {
        self.performed_by = actor.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    pub incident_id: Option<i64>,
    pub action_type: Option<String>,
    pub performed_by: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub since: DateTime<Utc>,
    pub total_events: u64,
    pub events_by_action: Vec<Tally>,
    pub events_by_performer: Vec<Tally>,
    pub recent_activity: Vec<IncidentActivity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineInterval {
    Hour,
    Day,
}

impl TimelineInterval {
    /// Number of leading characters of a stored timestamp that identify
    /// the bucket ("2026-03-01T08" or "2026-03-01").
    pub fn prefix_len(&self) -> usize {
        match self {
            Self::Hour => 13,
            Self::Day => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl FromStr for TimelineInterval {
    type Err = BreachwatchError;

    /// Anything other than "hour" buckets by day.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("hour") {
            Ok(Self::Hour)
        } else {
            Ok(Self::Day)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineBucket {
    pub bucket: String,
    pub event_count: u64,
    pub unique_performers: u64,
}
