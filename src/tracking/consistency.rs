use serde::Serialize;
use crate::models::{Incident, IncidentStatus};

/// Column combinations the store accepts but which contradict each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyIssue {
    NotificationCompletedWithoutSentAt,
    ClosedWithoutResolvedAt,
    NotificationRequiredWithoutDeadline,
    NotificationWithoutBreach,
    ResolvedBeforeDetected,
}

impl ConsistencyIssue {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotificationCompletedWithoutSentAt => "notification marked completed but no sent timestamp",
            Self::ClosedWithoutResolvedAt => "incident closed without a resolution timestamp",
            Self::NotificationRequiredWithoutDeadline => "breach requires notification but has no deadline",
            Self::NotificationWithoutBreach => "notification flags set on an incident not marked as a breach",
            Self::ResolvedBeforeDetected => "resolution timestamp precedes detection",
        }
    }
}

pub fn check(incident: &Incident) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();

    if incident.notification_completed && incident.notification_sent_at.is_none() {
        issues.push(ConsistencyIssue::NotificationCompletedWithoutSentAt);
    }
    if incident.status == IncidentStatus::Closed && incident.resolved_at.is_none() {
        issues.push(ConsistencyIssue::ClosedWithoutResolvedAt);
    }
    if incident.is_data_breach && incident.requires_notification && incident.notification_deadline.is_none() {
        issues.push(ConsistencyIssue::NotificationRequiredWithoutDeadline);
    }
    if !incident.is_data_breach
        && (incident.requires_notification || incident.notification_completed || incident.notification_sent_at.is_some())
    {
        issues.push(ConsistencyIssue::NotificationWithoutBreach);
    }
    if incident.resolved_at.map_or(false, |r| r < incident.detected_at) {
        issues.push(ConsistencyIssue::ResolvedBeforeDetected);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::Database;
    use crate::models::NewIncident;
    use crate::tracking::lifecycle::advance_status;

    fn incident(db: &Database) -> Incident {
        db.create_incident(&NewIncident { title: "consistency".into(), ..Default::default() }, None).unwrap()
    }

    #[test]
    fn test_fresh_incident_is_consistent() {
        let db = Database::in_memory().unwrap();
        assert!(check(&incident(&db)).is_empty());
    }

    #[test]
    fn test_raw_close_is_flagged_guarded_close_is_not() {
        let db = Database::in_memory().unwrap();
        let raw = incident(&db);
        let closed = db.set_incident_status(raw.id, IncidentStatus::Closed, None).unwrap();
        assert_eq!(check(&closed), vec![ConsistencyIssue::ClosedWithoutResolvedAt]);

        let guarded = incident(&db);
        let closed = advance_status(&db, guarded.id, IncidentStatus::Closed, None).unwrap();
        assert!(check(&closed).is_empty());
    }

    #[test]
    fn test_completed_without_sent_at() {
        let db = Database::in_memory().unwrap();
        let i = incident(&db);
        db.set_breach_fields(i.id, None, true, Some(Utc::now()), None).unwrap();
        let updated = db.record_notification_sent(i.id, None, true, None).unwrap();
        assert_eq!(check(&updated), vec![ConsistencyIssue::NotificationCompletedWithoutSentAt]);
    }

    #[test]
    fn test_breach_without_deadline() {
        let db = Database::in_memory().unwrap();
        let i = incident(&db);
        let updated = db.set_breach_fields(i.id, None, true, None, None).unwrap();
        assert_eq!(check(&updated), vec![ConsistencyIssue::NotificationRequiredWithoutDeadline]);
    }

    #[test]
    fn test_notification_without_breach() {
        let db = Database::in_memory().unwrap();
        let i = incident(&db);
        let updated = db.record_notification_sent(i.id, Some(Utc::now()), false, None).unwrap();
        assert_eq!(check(&updated), vec![ConsistencyIssue::NotificationWithoutBreach]);
    }

    #[test]
    fn test_resolved_before_detected() {
        let db = Database::in_memory().unwrap();
        let i = db.create_incident(&NewIncident {
            title: "future detection".into(),
            detected_at: Some(Utc::now() + chrono::Duration::days(3)),
            ..Default::default()
        }, None).unwrap();
        let resolved = db.set_incident_status(i.id, IncidentStatus::Resolved, None).unwrap();
        assert!(check(&resolved).contains(&ConsistencyIssue::ResolvedBeforeDetected));
    }
}
