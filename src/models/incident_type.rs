use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::BreachwatchError;

/// Longest notification window accepted anywhere (ten years). Keeps computed
/// deadlines inside four-digit years so stored timestamps stay sortable.
pub const MAX_DEADLINE_HOURS: u32 = 87_600;

/// Rejects a zero or out-of-range deadline window; `field` names it in the message.
pub fn validate_deadline_hours(field: &str, hours: u32) -> Result<(), BreachwatchError> {
    if hours == 0 {
        return Err(BreachwatchError::Validation(format!("{} must be positive", field)));
    }
    if hours > MAX_DEADLINE_HOURS {
        return Err(BreachwatchError::Validation(format!(
            "{} must be at most {}, got {}",
            field, MAX_DEADLINE_HOURS, hours
        )));
    }
    Ok(())
}

/// Lookup entry classifying incidents. `severity_level` runs from 1 (most
/// severe) to 4; `notification_deadline_hours` is set for categories that
/// fall under a regulatory notification window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub severity_level: u8,
    pub notification_deadline_hours: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncidentType {
    pub name: String,
    pub description: Option<String>,
    pub severity_level: u8,
    pub notification_deadline_hours: Option<u32>,
}

impl NewIncidentType {
    pub fn validate(&self) -> Result<(), BreachwatchError> {
        if self.name.trim().is_empty() {
            return Err(BreachwatchError::Validation("incident type name must not be empty".into()));
        }
        if !(1..=4).contains(&self.severity_level) {
            return Err(BreachwatchError::Validation(format!(
                "severity_level must be between 1 and 4, got {}",
                self.severity_level
            )));
        }
        if let Some(hours) = self.notification_deadline_hours {
            validate_deadline_hours("notification_deadline_hours", hours)?;
        }
        Ok(())
    }
}
