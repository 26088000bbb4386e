use chrono::{DateTime, Datelike, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row};
use crate::errors::BreachwatchError;
use crate::models::{
    clamp_limit, ActivityAction, Incident, IncidentFilter, IncidentStatus, IncidentUpdate,
    NewActivity, NewIncident, Page,
};
use crate::utils::time;
use super::activities::insert_activity;
use super::rows::{enum_col, escape_like, opt_ts_col, ts_col};
use super::Database;
use tracing::info;

pub(crate) const INCIDENT_COLUMNS: &str = "id, incident_number, title, description, incident_type_id, status, severity, reported_by, assigned_to, detected_at, contained_at, resolved_at, closed_at, is_data_breach, affected_records, requires_notification, notification_deadline, notification_sent_at, notification_completed, root_cause, remediation, created_at, updated_at";

pub(crate) fn incident_from_row(row: &Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        incident_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        incident_type_id: row.get(4)?,
        status: enum_col(row, 5)?,
        severity: enum_col(row, 6)?,
        reported_by: row.get(7)?,
        assigned_to: row.get(8)?,
        detected_at: ts_col(row, 9)?,
        contained_at: opt_ts_col(row, 10)?,
        resolved_at: opt_ts_col(row, 11)?,
        closed_at: opt_ts_col(row, 12)?,
        is_data_breach: row.get(13)?,
        affected_records: row.get(14)?,
        requires_notification: row.get(15)?,
        notification_deadline: opt_ts_col(row, 16)?,
        notification_sent_at: opt_ts_col(row, 17)?,
        notification_completed: row.get(18)?,
        root_cause: row.get(19)?,
        remediation: row.get(20)?,
        created_at: ts_col(row, 21)?,
        updated_at: ts_col(row, 22)?,
    })
}

pub(crate) fn fetch_incident(conn: &Connection, id: i64) -> Result<Option<Incident>, BreachwatchError> {
    conn.query_row(
        &format!("SELECT {} FROM incidents WHERE id = ?1", INCIDENT_COLUMNS),
        rusqlite::params![id],
        incident_from_row,
    )
    .optional()
    .map_err(|e| BreachwatchError::from_sqlite("Query incident", e))
}

fn require_incident(conn: &Connection, id: i64) -> Result<Incident, BreachwatchError> {
    fetch_incident(conn, id)?.ok_or_else(|| BreachwatchError::NotFound(format!("Incident {} not found", id)))
}

/// Next `INC-<year>-<seq>` number. Uses the highest sequence in the year so
/// deleted incidents never cause a number to be reissued.
fn next_incident_number(conn: &Connection, year: i32) -> Result<String, BreachwatchError> {
    let prefix = format!("INC-{}-", year);
    let max_seq: Option<i64> = conn.query_row(
        "SELECT MAX(CAST(substr(incident_number, ?1) AS INTEGER)) FROM incidents WHERE incident_number LIKE ?2",
        rusqlite::params![prefix.len() as i64 + 1, format!("{}%", prefix)],
        |row| row.get(0),
    ).map_err(|e| BreachwatchError::from_sqlite("Number incident", e))?;
    Ok(format!("{}{:05}", prefix, max_seq.unwrap_or(0) + 1))
}

/// Side effects applied together with a status write.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusWrite {
    /// Stamp `resolved_at` if it is still null.
    pub backfill_resolved: bool,
    /// Clear `resolved_at`/`closed_at` (reopening).
    pub clear_resolution: bool,
}

impl Database {
    pub fn create_incident(&self, new: &NewIncident, actor: Option<&str>) -> Result<Incident, BreachwatchError> {
        new.validate()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;

        let now = Utc::now();
        let detected_at = new.detected_at.unwrap_or(now);
        let number = match &new.incident_number {
            Some(n) => n.trim().to_string(),
            None => next_incident_number(&tx, detected_at.year())?,
        };

        tx.execute(
            "INSERT INTO incidents (incident_number, title, description, incident_type_id, severity, reported_by, assigned_to, detected_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                number,
                new.title.trim(),
                new.description,
                new.incident_type_id,
                new.severity.unwrap_or_default().as_str(),
                new.reported_by,
                new.assigned_to,
                time::to_db(&detected_at),
                time::to_db(&now),
            ],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to create incident", e))?;

        let id = tx.last_insert_rowid();
        insert_activity(&tx, id, &NewActivity::new(ActivityAction::Created, format!("Incident {} opened", number))
            .change(None, Some(IncidentStatus::Open.to_string()))
            .by(actor.or(new.reported_by.as_deref())))?;

        let incident = require_incident(&tx, id)?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit incident: {}", e)))?;

        info!(incident = %incident.incident_number, severity = %incident.severity, "Incident created");
        Ok(incident)
    }

    pub fn get_incident(&self, id: i64) -> Result<Option<Incident>, BreachwatchError> {
        let conn = self.lock()?;
        fetch_incident(&conn, id)
    }

    pub fn get_incident_by_number(&self, number: &str) -> Result<Option<Incident>, BreachwatchError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM incidents WHERE incident_number = ?1", INCIDENT_COLUMNS),
            rusqlite::params![number],
            incident_from_row,
        )
        .optional()
        .map_err(|e| BreachwatchError::from_sqlite("Query incident", e))
    }

    pub fn list_incidents(&self, filter: &IncidentFilter) -> Result<Page<Incident>, BreachwatchError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            params.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(severity) = filter.severity {
            clauses.push("severity = ?");
            params.push(Value::Text(severity.as_str().to_string()));
        }
        if let Some(type_id) = filter.incident_type_id {
            clauses.push("incident_type_id = ?");
            params.push(Value::Integer(type_id));
        }
        if let Some(breach) = filter.is_data_breach {
            clauses.push("is_data_breach = ?");
            params.push(Value::Integer(breach as i64));
        }
        if let Some(from) = &filter.detected_from {
            clauses.push("detected_at >= ?");
            params.push(Value::Text(time::to_db(from)));
        }
        if let Some(to) = &filter.detected_to {
            clauses.push("detected_at <= ?");
            params.push(Value::Text(time::to_db(to)));
        }
        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            clauses.push("(incident_number LIKE ? ESCAPE '\\' OR title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(query));
            for _ in 0..3 {
                params.push(Value::Text(pattern.clone()));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit = clamp_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0);

        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM incidents{}", where_sql),
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        ).map_err(|e| BreachwatchError::Database(format!("Count failed: {}", e)))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM incidents{} ORDER BY detected_at DESC, id DESC LIMIT ? OFFSET ?",
            INCIDENT_COLUMNS, where_sql
        )).map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;

        let mut page_params = params.clone();
        page_params.push(Value::Integer(limit as i64));
        page_params.push(Value::Integer(offset as i64));

        let rows = stmt.query_map(rusqlite::params_from_iter(page_params.iter()), incident_from_row)
            .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

        let mut incidents = Vec::new();
        for row in rows {
            incidents.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
        }
        Ok(Page::new(incidents, total as u64, limit, offset))
    }

    /// Apply a partial update, recording one timeline entry per changed field.
    pub fn update_incident(&self, id: i64, update: &IncidentUpdate, actor: Option<&str>) -> Result<Incident, BreachwatchError> {
        update.validate()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;
        let current = require_incident(&tx, id)?;

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut activities: Vec<NewActivity> = Vec::new();

        if let Some(title) = update.title.as_deref().map(str::trim) {
            if title != current.title {
                sets.push("title = ?");
                params.push(Value::Text(title.to_string()));
                activities.push(NewActivity::new(ActivityAction::Updated, "Title changed")
                    .change(Some(current.title.clone()), Some(title.to_string())));
            }
        }
        if let Some(description) = &update.description {
            if current.description.as_ref() != Some(description) {
                sets.push("description = ?");
                params.push(Value::Text(description.clone()));
                activities.push(NewActivity::new(ActivityAction::Updated, "Description changed"));
            }
        }
        if let Some(type_id) = update.incident_type_id {
            if current.incident_type_id != Some(type_id) {
                sets.push("incident_type_id = ?");
                params.push(Value::Integer(type_id));
                activities.push(NewActivity::new(ActivityAction::Updated, "Incident type changed")
                    .change(current.incident_type_id.map(|t| t.to_string()), Some(type_id.to_string())));
            }
        }
        if let Some(severity) = update.severity {
            if severity != current.severity {
                sets.push("severity = ?");
                params.push(Value::Text(severity.as_str().to_string()));
                activities.push(NewActivity::new(ActivityAction::SeverityChange, format!("Severity set to {}", severity))
                    .change(Some(current.severity.to_string()), Some(severity.to_string())));
            }
        }
        if let Some(assignee) = &update.assigned_to {
            if current.assigned_to.as_ref() != Some(assignee) {
                sets.push("assigned_to = ?");
                params.push(Value::Text(assignee.clone()));
                activities.push(NewActivity::new(ActivityAction::Assignment, format!("Assigned to {}", assignee))
                    .change(current.assigned_to.clone(), Some(assignee.clone())));
            }
        }
        if let Some(records) = update.affected_records {
            if records != current.affected_records {
                sets.push("affected_records = ?");
                params.push(Value::Integer(records));
                activities.push(NewActivity::new(ActivityAction::Updated, "Affected record count changed")
                    .change(Some(current.affected_records.to_string()), Some(records.to_string())));
            }
        }
        if let Some(root_cause) = &update.root_cause {
            if current.root_cause.as_ref() != Some(root_cause) {
                sets.push("root_cause = ?");
                params.push(Value::Text(root_cause.clone()));
                activities.push(NewActivity::new(ActivityAction::Updated, "Root cause recorded"));
            }
        }
        if let Some(remediation) = &update.remediation {
            if current.remediation.as_ref() != Some(remediation) {
                sets.push("remediation = ?");
                params.push(Value::Text(remediation.clone()));
                activities.push(NewActivity::new(ActivityAction::Updated, "Remediation recorded"));
            }
        }

        if sets.is_empty() {
            return Ok(current);
        }

        sets.push("updated_at = ?");
        params.push(Value::Text(time::now_db()));
        params.push(Value::Integer(id));

        tx.execute(
            &format!("UPDATE incidents SET {} WHERE id = ?", sets.join(", ")),
            rusqlite::params_from_iter(params.iter()),
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to update incident", e))?;

        for activity in activities {
            insert_activity(&tx, id, &activity.by(actor))?;
        }

        let incident = require_incident(&tx, id)?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit update: {}", e)))?;
        Ok(incident)
    }

    /// Raw status write: any status may be written at any time. Entering
    /// contained/resolved/closed stamps the matching timestamp if unset.
    pub fn set_incident_status(&self, id: i64, status: IncidentStatus, actor: Option<&str>) -> Result<Incident, BreachwatchError> {
        self.write_status(id, status, StatusWrite::default(), actor, |_| Ok(()))
    }

    /// Status write with a guard evaluated against the current row inside
    /// the same transaction.
    pub fn write_status<G>(
        &self,
        id: i64,
        status: IncidentStatus,
        options: StatusWrite,
        actor: Option<&str>,
        guard: G,
    ) -> Result<Incident, BreachwatchError>
    where
        G: FnOnce(&Incident) -> Result<(), BreachwatchError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;
        let current = require_incident(&tx, id)?;
        guard(&current)?;

        let now = time::now_db();
        let stamp_column = match status {
            IncidentStatus::Contained => Some("contained_at"),
            IncidentStatus::Resolved => Some("resolved_at"),
            IncidentStatus::Closed => Some("closed_at"),
            _ => None,
        };

        let mut sets = vec!["status = ?1".to_string(), "updated_at = ?2".to_string()];
        if options.clear_resolution {
            sets.push("resolved_at = NULL".to_string());
            sets.push("closed_at = NULL".to_string());
        }
        if let Some(column) = stamp_column {
            sets.push(format!("{col} = COALESCE({col}, ?2)", col = column));
        }
        if options.backfill_resolved && stamp_column != Some("resolved_at") {
            sets.push("resolved_at = COALESCE(resolved_at, ?2)".to_string());
        }

        tx.execute(
            &format!("UPDATE incidents SET {} WHERE id = ?3", sets.join(", ")),
            rusqlite::params![status.as_str(), now, id],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to update status", e))?;

        if current.status != status {
            insert_activity(&tx, id, &NewActivity::new(ActivityAction::StatusChange, format!("Status changed to {}", status))
                .change(Some(current.status.to_string()), Some(status.to_string()))
                .by(actor))?;
        }

        let incident = require_incident(&tx, id)?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit status: {}", e)))?;

        info!(incident = %incident.incident_number, from = %current.status, to = %status, "Incident status written");
        Ok(incident)
    }

    /// Raw write of the breach columns. Deadline computation lives in
    /// `tracking::breach`.
    pub fn set_breach_fields(
        &self,
        id: i64,
        affected_records: Option<i64>,
        requires_notification: bool,
        deadline: Option<DateTime<Utc>>,
        actor: Option<&str>,
    ) -> Result<Incident, BreachwatchError> {
        if affected_records.map_or(false, |r| r < 0) {
            return Err(BreachwatchError::Validation("affected_records must not be negative".into()));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;
        let current = require_incident(&tx, id)?;

        tx.execute(
            "UPDATE incidents SET is_data_breach = 1, affected_records = COALESCE(?1, affected_records), requires_notification = ?2, notification_deadline = ?3, updated_at = ?4 WHERE id = ?5",
            rusqlite::params![
                affected_records,
                requires_notification,
                deadline.as_ref().map(time::to_db),
                time::now_db(),
                id,
            ],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to flag breach", e))?;

        let description = match &deadline {
            Some(d) => format!("Flagged as data breach; notification due by {}", time::to_db(d)),
            None => "Flagged as data breach; no notification required".to_string(),
        };
        insert_activity(&tx, id, &NewActivity::new(ActivityAction::BreachFlagged, description)
            .change(
                current.notification_deadline.as_ref().map(time::to_db),
                deadline.as_ref().map(time::to_db),
            )
            .by(actor))?;

        let incident = require_incident(&tx, id)?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit breach flag: {}", e)))?;
        Ok(incident)
    }

    /// Raw write of the notification outcome columns on the incident.
    pub fn record_notification_sent(
        &self,
        id: i64,
        sent_at: Option<DateTime<Utc>>,
        completed: bool,
        actor: Option<&str>,
    ) -> Result<Incident, BreachwatchError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;
        let current = require_incident(&tx, id)?;

        tx.execute(
            "UPDATE incidents SET notification_sent_at = ?1, notification_completed = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![sent_at.as_ref().map(time::to_db), completed, time::now_db(), id],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to record notification", e))?;

        insert_activity(&tx, id, &NewActivity::new(
            ActivityAction::NotificationStatus,
            if completed { "Breach notification completed" } else { "Breach notification recorded" },
        )
            .change(
                current.notification_sent_at.as_ref().map(time::to_db),
                sent_at.as_ref().map(time::to_db),
            )
            .by(actor))?;

        let incident = require_incident(&tx, id)?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit notification: {}", e)))?;
        Ok(incident)
    }

    /// Deletes the incident; activities and notifications cascade.
    pub fn delete_incident(&self, id: i64) -> Result<bool, BreachwatchError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM incidents WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| BreachwatchError::from_sqlite("Delete failed", e))?;
        if affected > 0 {
            info!(incident_id = id, "Incident deleted");
        }
        Ok(affected > 0)
    }

    /// Breaches whose deadline passed without a recorded notification.
    pub fn list_overdue_breaches(&self, now: DateTime<Utc>) -> Result<Vec<Incident>, BreachwatchError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM incidents WHERE is_data_breach = 1 AND requires_notification = 1 AND notification_sent_at IS NULL AND notification_deadline IS NOT NULL AND notification_deadline < ?1 ORDER BY notification_deadline",
            INCIDENT_COLUMNS
        )).map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![time::to_db(&now)], incident_from_row)
            .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

        let mut incidents = Vec::new();
        for row in rows {
            incidents.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
        }
        Ok(incidents)
    }
}
