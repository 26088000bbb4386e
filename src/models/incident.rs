use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::BreachwatchError;

/// Incident lifecycle state, in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Contained,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 5] = [
        Self::Open,
        Self::Investigating,
        Self::Contained,
        Self::Resolved,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Contained => "contained",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Position in the lifecycle, open = 0.
    pub fn stage(&self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Investigating => 1,
            Self::Contained => 2,
            Self::Resolved => 3,
            Self::Closed => 4,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unknown incident status '{}'", s)))
    }
}

/// Severity of an individual incident, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Lower values indicate higher severity. Critical = 0 ... Low = 3.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = BreachwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BreachwatchError::Validation(format!("unknown severity '{}'", s)))
    }
}

/// The incident aggregate. Breach columns are stored independently of one
/// another; see `tracking::consistency` for the combinations that disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub incident_number: String,
    pub title: String,
    pub description: Option<String>,
    pub incident_type_id: Option<i64>,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub contained_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_data_breach: bool,
    pub affected_records: i64,
    pub requires_notification: bool,
    pub notification_deadline: Option<DateTime<Utc>>,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub notification_completed: bool,
    pub root_cause: Option<String>,
    pub remediation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIncident {
    /// Generated as `INC-<year>-<seq>` when absent.
    pub incident_number: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub incident_type_id: Option<i64>,
    pub severity: Option<Severity>,
    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
    pub detected_at: Option<DateTime<Utc>>,
}

impl NewIncident {
    pub fn validate(&self) -> Result<(), BreachwatchError> {
        if self.title.trim().is_empty() {
            return Err(BreachwatchError::Validation("incident title must not be empty".into()));
        }
        if let Some(number) = &self.incident_number {
            if number.trim().is_empty() {
                return Err(BreachwatchError::Validation("incident_number must not be blank".into()));
            }
        }
        Ok(())
    }
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub incident_type_id: Option<i64>,
    pub severity: Option<Severity>,
    pub assigned_to: Option<String>,
    pub affected_records: Option<i64>,
    pub root_cause: Option<String>,
    pub remediation: Option<String>,
}

impl IncidentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.incident_type_id.is_none()
            && self.severity.is_none()
            && self.assigned_to.is_none()
            && self.affected_records.is_none()
            && self.root_cause.is_none()
            && self.remediation.is_none()
    }

    pub fn validate(&self) -> Result<(), BreachwatchError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(BreachwatchError::Validation("incident title must not be empty".into()));
            }
        }
        if let Some(records) = self.affected_records {
            if records < 0 {
                return Err(BreachwatchError::Validation("affected_records must not be negative".into()));
            }
        }
        Ok(())
    }
}

/// Input for flagging an incident as a personal-data breach.
#[derive(Debug, Clone, Deserialize)]
pub struct BreachDetails {
    #[serde(default)]
    pub affected_records: Option<i64>,
    #[serde(default = "default_true")]
    pub requires_notification: bool,
    /// Overrides the deadline window derived from the incident type.
    #[serde(default)]
    pub deadline_hours: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for BreachDetails {
    fn default() -> Self {
        Self {
            affected_records: None,
            requires_notification: true,
            deadline_hours: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
    pub incident_type_id: Option<i64>,
    pub is_data_breach: Option<bool>,
    pub detected_from: Option<DateTime<Utc>>,
    pub detected_to: Option<DateTime<Utc>>,
    /// Case-insensitive match against number, title and description.
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Dashboard counts across all incidents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentStats {
    pub total: u64,
    pub active: u64,
    pub by_status: Vec<super::Tally>,
    pub by_severity: Vec<super::Tally>,
    pub data_breaches: u64,
    pub open_breaches: u64,
    pub overdue_breaches: u64,
    pub pending_notifications: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("Investigating".parse::<IncidentStatus>().unwrap(), IncidentStatus::Investigating);
        assert_eq!(" closed ".parse::<IncidentStatus>().unwrap(), IncidentStatus::Closed);
        assert!("archived".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn test_status_stages_follow_lifecycle() {
        let stages: Vec<u8> = IncidentStatus::ALL.iter().map(|s| s.stage()).collect();
        assert_eq!(stages, vec![0, 1, 2, 3, 4]);
        assert!(IncidentStatus::Contained.is_active());
        assert!(!IncidentStatus::Resolved.is_active());
    }

    #[test]
    fn test_severity_round_trip_and_rank() {
        for sev in Severity::ALL {
            assert_eq!(sev.as_str().parse::<Severity>().unwrap(), sev);
        }
        assert!(Severity::Critical.rank() < Severity::Low.rank());
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_new_incident_requires_title() {
        let incident = NewIncident { title: "  ".into(), ..Default::default() };
        assert!(incident.validate().is_err());
    }

    #[test]
    fn test_update_rejects_negative_records() {
        let update = IncidentUpdate { affected_records: Some(-1), ..Default::default() };
        assert!(update.validate().is_err());
        assert!(!update.is_empty());
        assert!(IncidentUpdate::default().is_empty());
    }

    #[test]
    fn test_breach_details_defaults_to_notification() {
        let details: BreachDetails = serde_json::from_str("{}").unwrap();
        assert!(details.requires_notification);
        assert!(details.deadline_hours.is_none());
    }
}
