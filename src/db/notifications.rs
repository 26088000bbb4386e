use rusqlite::{Connection, OptionalExtension, Row};
use crate::errors::BreachwatchError;
use crate::models::{
    ActivityAction, IncidentNotification, NewActivity, NewNotification, NotificationStatus,
};
use crate::utils::{time, truncation};
use super::activities::insert_activity;
use super::rows::{enum_col, opt_ts_col, ts_col};
use super::Database;
use tracing::info;

const NOTIFICATION_COLUMNS: &str = "id, incident_id, recipient_type, recipient, channel, subject, message, status, sent_at, acknowledged_at, error_message, created_at, updated_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<IncidentNotification> {
    Ok(IncidentNotification {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        recipient_type: enum_col(row, 2)?,
        recipient: row.get(3)?,
        channel: enum_col(row, 4)?,
        subject: row.get(5)?,
        message: row.get(6)?,
        status: enum_col(row, 7)?,
        sent_at: opt_ts_col(row, 8)?,
        acknowledged_at: opt_ts_col(row, 9)?,
        error_message: row.get(10)?,
        created_at: ts_col(row, 11)?,
        updated_at: ts_col(row, 12)?,
    })
}

fn fetch_notification(conn: &Connection, id: i64) -> Result<Option<IncidentNotification>, BreachwatchError> {
    conn.query_row(
        &format!("SELECT {} FROM incident_notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
        rusqlite::params![id],
        notification_from_row,
    )
    .optional()
    .map_err(|e| BreachwatchError::from_sqlite("Query notification", e))
}

fn collect_notifications(
    conn: &Connection,
    sql: &str,
    param: &dyn rusqlite::ToSql,
) -> Result<Vec<IncidentNotification>, BreachwatchError> {
    let mut stmt = conn.prepare(sql)
        .map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map([param], notification_from_row)
        .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
    }
    Ok(notifications)
}

impl Database {
    pub fn create_notification(
        &self,
        incident_id: i64,
        new: &NewNotification,
        actor: Option<&str>,
    ) -> Result<IncidentNotification, BreachwatchError> {
        new.validate()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;

        let now = time::now_db();
        tx.execute(
            "INSERT INTO incident_notifications (incident_id, recipient_type, recipient, channel, subject, message, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
            rusqlite::params![
                incident_id,
                new.recipient_type.as_str(),
                new.recipient.trim(),
                new.channel.as_str(),
                new.subject,
                new.message,
                now,
            ],
        ).map_err(|e| BreachwatchError::from_sqlite(&format!("Failed to queue notification for incident {}", incident_id), e))?;

        let id = tx.last_insert_rowid();
        insert_activity(&tx, incident_id, &NewActivity::new(
            ActivityAction::NotificationQueued,
            format!("Notification to {} ({}) via {} queued", new.recipient.trim(), new.recipient_type.as_str(), new.channel.as_str()),
        ).by(actor))?;

        let notification = fetch_notification(&tx, id)?
            .ok_or_else(|| BreachwatchError::Internal(format!("Notification {} vanished after insert", id)))?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit notification: {}", e)))?;
        Ok(notification)
    }

    pub fn get_notification(&self, id: i64) -> Result<Option<IncidentNotification>, BreachwatchError> {
        let conn = self.lock()?;
        fetch_notification(&conn, id)
    }

    pub fn list_notifications(&self, incident_id: i64) -> Result<Vec<IncidentNotification>, BreachwatchError> {
        let conn = self.lock()?;
        collect_notifications(
            &conn,
            &format!("SELECT {} FROM incident_notifications WHERE incident_id = ?1 ORDER BY created_at, id", NOTIFICATION_COLUMNS),
            &incident_id,
        )
    }

    pub fn list_notifications_by_status(&self, status: NotificationStatus) -> Result<Vec<IncidentNotification>, BreachwatchError> {
        let conn = self.lock()?;
        collect_notifications(
            &conn,
            &format!("SELECT {} FROM incident_notifications WHERE status = ?1 ORDER BY created_at, id", NOTIFICATION_COLUMNS),
            &status.as_str(),
        )
    }

    /// Direct status write; no transition order is enforced. Delivery states
    /// stamp their timestamp once, `failed` stores the error text.
    pub fn update_notification_status(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<&str>,
        actor: Option<&str>,
    ) -> Result<IncidentNotification, BreachwatchError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| BreachwatchError::Database(format!("Failed to begin transaction: {}", e)))?;
        let current = fetch_notification(&tx, id)?
            .ok_or_else(|| BreachwatchError::NotFound(format!("Notification {} not found", id)))?;

        let now = time::now_db();
        let error_message = match status {
            NotificationStatus::Failed => Some(truncation::truncate_error(error.unwrap_or("delivery failed"))),
            _ => None,
        };
        tx.execute(
            "UPDATE incident_notifications SET status = ?1, \
                sent_at = CASE WHEN ?1 IN ('sent', 'acknowledged') THEN COALESCE(sent_at, ?2) ELSE sent_at END, \
                acknowledged_at = CASE WHEN ?1 = 'acknowledged' THEN COALESCE(acknowledged_at, ?2) ELSE acknowledged_at END, \
                error_message = ?3, updated_at = ?2 \
             WHERE id = ?4",
            rusqlite::params![status.as_str(), now, error_message, id],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to update notification", e))?;

        if current.status != status {
            insert_activity(&tx, current.incident_id, &NewActivity::new(
                ActivityAction::NotificationStatus,
                format!("Notification to {} marked {}", current.recipient, status),
            )
                .change(Some(current.status.to_string()), Some(status.to_string()))
                .by(actor))?;
        }

        let notification = fetch_notification(&tx, id)?
            .ok_or_else(|| BreachwatchError::Internal(format!("Notification {} vanished after update", id)))?;
        tx.commit()
            .map_err(|e| BreachwatchError::Database(format!("Failed to commit notification: {}", e)))?;

        info!(notification_id = id, from = %current.status, to = %status, "Notification status written");
        Ok(notification)
    }
}
