use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::models::{validate_deadline_hours, BreachDetails, Incident};

/// Window applied when neither the request nor the incident type names one.
pub const DEFAULT_DEADLINE_HOURS: u32 = 72;

pub fn notification_deadline(detected_at: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>, BreachwatchError> {
    detected_at
        .checked_add_signed(Duration::hours(i64::from(hours)))
        .ok_or_else(|| BreachwatchError::Validation(format!(
            "deadline of {} hours after {} is out of range",
            hours, detected_at
        )))
}

/// Where an incident stands with respect to its breach notification duty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BreachState {
    NotApplicable,
    AwaitingNotification {
        deadline: DateTime<Utc>,
        remaining_secs: i64,
    },
    Overdue {
        deadline: DateTime<Utc>,
        overdue_secs: i64,
    },
    Notified {
        sent_at: DateTime<Utc>,
        on_time: bool,
    },
    /// Notification is required but no deadline was ever recorded.
    NotificationOutstanding,
}

impl BreachState {
    pub fn evaluate(incident: &Incident, now: DateTime<Utc>) -> Self {
        if !incident.is_data_breach || !incident.requires_notification {
            return Self::NotApplicable;
        }
        if let Some(sent_at) = incident.notification_sent_at {
            let on_time = incident.notification_deadline.map_or(true, |d| sent_at <= d);
            return Self::Notified { sent_at, on_time };
        }
        match incident.notification_deadline {
            None => Self::NotificationOutstanding,
            Some(deadline) if now > deadline => Self::Overdue {
                deadline,
                overdue_secs: (now - deadline).num_seconds(),
            },
            Some(deadline) => Self::AwaitingNotification {
                deadline,
                remaining_secs: (deadline - now).num_seconds(),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotApplicable => "not applicable",
            Self::AwaitingNotification { .. } => "awaiting notification",
            Self::Overdue { .. } => "OVERDUE",
            Self::Notified { on_time: true, .. } => "notified on time",
            Self::Notified { on_time: false, .. } => "notified late",
            Self::NotificationOutstanding => "notification outstanding (no deadline)",
        }
    }
}

/// Flags the incident as a data breach. The deadline window comes from the
/// request override, then the incident type, then `default_hours`.
pub fn mark_data_breach(
    db: &Database,
    id: i64,
    details: &BreachDetails,
    default_hours: u32,
    actor: Option<&str>,
) -> Result<Incident, BreachwatchError> {
    if let Some(hours) = details.deadline_hours {
        validate_deadline_hours("deadline_hours", hours)?;
    }
    let incident = db.get_incident(id)?
        .ok_or_else(|| BreachwatchError::NotFound(format!("Incident {} not found", id)))?;

    let type_hours = match incident.incident_type_id {
        Some(type_id) => db.get_incident_type(type_id)?.and_then(|t| t.notification_deadline_hours),
        None => None,
    };
    let hours = details.deadline_hours.or(type_hours).unwrap_or(default_hours);
    // Types stored before the bound existed can still carry an oversized window.
    validate_deadline_hours("deadline window", hours)?;

    let deadline = if details.requires_notification {
        Some(notification_deadline(incident.detected_at, hours)?)
    } else {
        None
    };

    let updated = db.set_breach_fields(
        id,
        details.affected_records,
        details.requires_notification,
        deadline,
        actor,
    )?;
    info!(
        incident = %updated.incident_number,
        deadline_hours = hours,
        requires_notification = details.requires_notification,
        "Incident flagged as data breach"
    );
    Ok(updated)
}

pub fn overdue_breaches(db: &Database, now: DateTime<Utc>) -> Result<Vec<Incident>, BreachwatchError> {
    let overdue = db.list_overdue_breaches(now)?;
    if !overdue.is_empty() {
        warn!(count = overdue.len(), "Breach notifications past deadline");
    }
    Ok(overdue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::{NewIncident, MAX_DEADLINE_HOURS};

    fn detected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn breach_incident(db: &Database, type_name: Option<&str>) -> Incident {
        let type_id = type_name.map(|n| db.get_incident_type_by_name(n).unwrap().unwrap().id);
        db.create_incident(&NewIncident {
            title: "Customer table exfiltrated".into(),
            incident_type_id: type_id,
            detected_at: Some(detected()),
            ..Default::default()
        }, None).unwrap()
    }

    #[test]
    fn test_deadline_is_detected_plus_hours() {
        let deadline = notification_deadline(detected(), 72).unwrap();
        assert_eq!(deadline, Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_mark_uses_type_window() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, Some("data_breach"));
        let marked = mark_data_breach(&db, incident.id, &BreachDetails::default(), 24, None).unwrap();
        assert!(marked.is_data_breach);
        assert_eq!(marked.notification_deadline, Some(detected() + Duration::hours(72)));
    }

    #[test]
    fn test_mark_falls_back_to_default_hours() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, Some("phishing"));
        let marked = mark_data_breach(&db, incident.id, &BreachDetails::default(), 48, None).unwrap();
        assert_eq!(marked.notification_deadline, Some(detected() + Duration::hours(48)));
    }

    #[test]
    fn test_mark_override_wins() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, Some("data_breach"));
        let details = BreachDetails { deadline_hours: Some(12), affected_records: Some(500), ..Default::default() };
        let marked = mark_data_breach(&db, incident.id, &details, DEFAULT_DEADLINE_HOURS, None).unwrap();
        assert_eq!(marked.notification_deadline, Some(detected() + Duration::hours(12)));
        assert_eq!(marked.affected_records, 500);
    }

    #[test]
    fn test_mark_without_notification_has_no_deadline() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, None);
        let details = BreachDetails { requires_notification: false, ..Default::default() };
        let marked = mark_data_breach(&db, incident.id, &details, DEFAULT_DEADLINE_HOURS, None).unwrap();
        assert!(marked.is_data_breach);
        assert!(marked.notification_deadline.is_none());
        assert_eq!(BreachState::evaluate(&marked, Utc::now()), BreachState::NotApplicable);
    }

    #[test]
    fn test_states_over_time() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, Some("data_breach"));
        let marked = mark_data_breach(&db, incident.id, &BreachDetails::default(), DEFAULT_DEADLINE_HOURS, None).unwrap();
        let deadline = detected() + Duration::hours(72);

        let early = BreachState::evaluate(&marked, detected() + Duration::hours(10));
        assert_eq!(early, BreachState::AwaitingNotification { deadline, remaining_secs: 62 * 3600 });

        let late = BreachState::evaluate(&marked, deadline + Duration::hours(1));
        assert_eq!(late, BreachState::Overdue { deadline, overdue_secs: 3600 });

        let sent = db.record_notification_sent(incident.id, Some(deadline + Duration::hours(2)), true, None).unwrap();
        let state = BreachState::evaluate(&sent, deadline + Duration::hours(3));
        assert!(matches!(state, BreachState::Notified { on_time: false, .. }));
        assert_eq!(state.label(), "notified late");
    }

    #[test]
    fn test_overdue_listing() {
        let db = Database::in_memory().unwrap();
        let overdue = breach_incident(&db, Some("data_breach"));
        let notified = breach_incident(&db, Some("data_breach"));
        mark_data_breach(&db, overdue.id, &BreachDetails::default(), DEFAULT_DEADLINE_HOURS, None).unwrap();
        mark_data_breach(&db, notified.id, &BreachDetails::default(), DEFAULT_DEADLINE_HOURS, None).unwrap();
        db.record_notification_sent(notified.id, Some(detected()), true, None).unwrap();

        let now = detected() + Duration::days(5);
        let listed = overdue_breaches(&db, now).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, overdue.id);

        assert!(overdue_breaches(&db, detected()).unwrap().is_empty());
    }

    #[test]
    fn test_zero_override_rejected() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, None);
        let details = BreachDetails { deadline_hours: Some(0), ..Default::default() };
        assert!(matches!(
            mark_data_breach(&db, incident.id, &details, 72, None),
            Err(BreachwatchError::Validation(_))
        ));
    }

    #[test]
    fn test_huge_override_rejected_without_panic() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, None);
        let details = BreachDetails { deadline_hours: Some(u32::MAX), ..Default::default() };
        assert!(matches!(
            mark_data_breach(&db, incident.id, &details, 72, None),
            Err(BreachwatchError::Validation(_))
        ));
        let unchanged = db.get_incident(incident.id).unwrap().unwrap();
        assert!(!unchanged.is_data_breach);
    }

    #[test]
    fn test_oversized_default_window_rejected() {
        let db = Database::in_memory().unwrap();
        let incident = breach_incident(&db, None);
        assert!(matches!(
            mark_data_breach(&db, incident.id, &BreachDetails::default(), MAX_DEADLINE_HOURS + 1, None),
            Err(BreachwatchError::Validation(_))
        ));
    }

    #[test]
    fn test_deadline_overflow_is_an_error() {
        let near_end = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        assert!(matches!(
            notification_deadline(near_end, 2),
            Err(BreachwatchError::Validation(_))
        ));
    }
}
