use chrono::{DateTime, Utc};
use rusqlite::Connection;
use crate::errors::BreachwatchError;
use crate::models::{IncidentStats, IncidentStatus, Severity, Tally};
use crate::utils::time;
use super::Database;

fn count(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<u64, BreachwatchError> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))
        .map_err(|e| BreachwatchError::Database(format!("Count failed: {}", e)))?;
    Ok(n.max(0) as u64)
}

/// Counts per value of `column`, listing every value in `values` even when
/// it has no rows.
fn tally_column(conn: &Connection, column: &str, values: &[&str]) -> Result<Vec<Tally>, BreachwatchError> {
    let mut stmt = conn.prepare(&format!("SELECT {col}, COUNT(*) FROM incidents GROUP BY {col}", col = column))
        .map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

    let mut counted = Vec::new();
    for row in rows {
        counted.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
    }

    Ok(values
        .iter()
        .map(|value| Tally {
            name: value.to_string(),
            count: counted
                .iter()
                .find(|(name, _)| name == value)
                .map_or(0, |(_, n)| *n as u64),
        })
        .collect())
}

impl Database {
    pub fn incident_stats(&self, now: DateTime<Utc>) -> Result<IncidentStats, BreachwatchError> {
        let conn = self.lock()?;
        let statuses: Vec<&str> = IncidentStatus::ALL.iter().map(|s| s.as_str()).collect();
        let severities: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
        let now_db = time::to_db(&now);

        Ok(IncidentStats {
            total: count(&conn, "SELECT COUNT(*) FROM incidents", &[])?,
            active: count(&conn, "SELECT COUNT(*) FROM incidents WHERE status NOT IN ('resolved', 'closed')", &[])?,
            by_status: tally_column(&conn, "status", &statuses)?,
            by_severity: tally_column(&conn, "severity", &severities)?,
            data_breaches: count(&conn, "SELECT COUNT(*) FROM incidents WHERE is_data_breach = 1", &[])?,
            open_breaches: count(
                &conn,
                "SELECT COUNT(*) FROM incidents WHERE is_data_breach = 1 AND requires_notification = 1 AND notification_completed = 0",
                &[],
            )?,
            overdue_breaches: count(
                &conn,
                "SELECT COUNT(*) FROM incidents WHERE is_data_breach = 1 AND requires_notification = 1 AND notification_sent_at IS NULL AND notification_deadline IS NOT NULL AND notification_deadline < ?1",
                &[&now_db],
            )?,
            pending_notifications: count(
                &conn,
                "SELECT COUNT(*) FROM incident_notifications WHERE status = 'pending'",
                &[],
            )?,
        })
    }
}
