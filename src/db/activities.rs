use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use crate::errors::BreachwatchError;
use crate::models::{
    clamp_limit, ActivityAction, ActivityFilter, ActivityStats, IncidentActivity, NewActivity, Page,
    Tally, TimelineBucket, TimelineInterval,
};
use crate::utils::time;
use super::rows::ts_col;
use super::Database;

const ACTIVITY_COLUMNS: &str = "id, incident_id, action_type, description, old_value, new_value, performed_by, created_at";

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<IncidentActivity> {
    Ok(IncidentActivity {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        action_type: ActivityAction::from(row.get::<_, String>(2)?),
        description: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        performed_by: row.get(6)?,
        created_at: ts_col(row, 7)?,
    })
}

/// Append a timeline row. Callers holding a transaction pass it here so the
/// entry commits together with the change it describes.
pub(crate) fn insert_activity(conn: &Connection, incident_id: i64, activity: &NewActivity) -> Result<i64, BreachwatchError> {
    conn.execute(
        "INSERT INTO incident_activities (incident_id, action_type, description, old_value, new_value, performed_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            incident_id,
            activity.action_type.as_str(),
            activity.description,
            activity.old_value,
            activity.new_value,
            activity.performed_by,
            time::now_db(),
        ],
    ).map_err(|e| BreachwatchError::from_sqlite(&format!("Failed to log activity for incident {}", incident_id), e))?;
    Ok(conn.last_insert_rowid())
}

fn collect_activities(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<IncidentActivity>, BreachwatchError> {
    let mut stmt = conn.prepare(sql)
        .map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), activity_from_row)
        .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

    let mut activities = Vec::new();
    for row in rows {
        activities.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
    }
    Ok(activities)
}

fn collect_tallies(conn: &Connection, sql: &str, since: &str) -> Result<Vec<Tally>, BreachwatchError> {
    let mut stmt = conn.prepare(sql)
        .map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map(rusqlite::params![since], |row| {
        Ok(Tally {
            name: row.get::<_, Option<String>>(0)?.unwrap_or_else(|| "unknown".to_string()),
            count: row.get::<_, i64>(1)? as u64,
        })
    }).map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

    let mut tallies = Vec::new();
    for row in rows {
        tallies.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
    }
    Ok(tallies)
}

impl Database {
    pub fn add_activity(&self, incident_id: i64, activity: &NewActivity) -> Result<IncidentActivity, BreachwatchError> {
        let conn = self.lock()?;
        let id = insert_activity(&conn, incident_id, activity)?;
        let mut found = collect_activities(
            &conn,
            &format!("SELECT {} FROM incident_activities WHERE id = ?", ACTIVITY_COLUMNS),
            &[Value::Integer(id)],
        )?;
        found.pop()
            .ok_or_else(|| BreachwatchError::Internal(format!("Activity {} vanished after insert", id)))
    }

    /// Full timeline of one incident, oldest first.
    pub fn list_activities(&self, incident_id: i64) -> Result<Vec<IncidentActivity>, BreachwatchError> {
        let conn = self.lock()?;
        collect_activities(
            &conn,
            &format!("SELECT {} FROM incident_activities WHERE incident_id = ? ORDER BY created_at, id", ACTIVITY_COLUMNS),
            &[Value::Integer(incident_id)],
        )
    }

    /// Filtered audit view across all incidents, newest first.
    pub fn query_activities(&self, filter: &ActivityFilter) -> Result<Page<IncidentActivity>, BreachwatchError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(incident_id) = filter.incident_id {
            clauses.push("incident_id = ?");
            params.push(Value::Integer(incident_id));
        }
        if let Some(action) = &filter.action_type {
            clauses.push("action_type = ?");
            params.push(Value::Text(action.clone()));
        }
        if let Some(actor) = &filter.performed_by {
            clauses.push("performed_by = ?");
            params.push(Value::Text(actor.clone()));
        }
        if let Some(from) = &filter.date_from {
            clauses.push("created_at >= ?");
            params.push(Value::Text(time::to_db(from)));
        }
        if let Some(to) = &filter.date_to {
            clauses.push("created_at <= ?");
            params.push(Value::Text(time::to_db(to)));
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
            &format!("SELECT COUNT(*) FROM incident_activities{}", where_sql),
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        ).map_err(|e| BreachwatchError::Database(format!("Count failed: {}", e)))?;

        let mut page_params = params;
        page_params.push(Value::Integer(limit as i64));
        page_params.push(Value::Integer(offset as i64));
        let items = collect_activities(
            &conn,
            &format!(
                "SELECT {} FROM incident_activities{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                ACTIVITY_COLUMNS, where_sql
            ),
            &page_params,
        )?;

        Ok(Page::new(items, total as u64, limit, offset))
    }

    pub fn activity_stats(&self, since: DateTime<Utc>) -> Result<ActivityStats, BreachwatchError> {
        let since_db = time::to_db(&since);
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM incident_activities WHERE created_at >= ?1",
            rusqlite::params![since_db],
            |row| row.get(0),
        ).map_err(|e| BreachwatchError::Database(format!("Count failed: {}", e)))?;

        let events_by_action = collect_tallies(
            &conn,
            "SELECT action_type, COUNT(*) AS n FROM incident_activities WHERE created_at >= ?1 GROUP BY action_type ORDER BY n DESC, action_type",
            &since_db,
        )?;
        let events_by_performer = collect_tallies(
            &conn,
            "SELECT performed_by, COUNT(*) AS n FROM incident_activities WHERE created_at >= ?1 GROUP BY performed_by ORDER BY n DESC, performed_by LIMIT 10",
            &since_db,
        )?;
        let recent_activity = collect_activities(
            &conn,
            &format!(
                "SELECT {} FROM incident_activities WHERE created_at >= ? ORDER BY created_at DESC, id DESC LIMIT 10",
                ACTIVITY_COLUMNS
            ),
            &[Value::Text(since_db.clone())],
        )?;

        Ok(ActivityStats {
            since,
            total_events: total as u64,
            events_by_action,
            events_by_performer,
            recent_activity,
        })
    }

    /// Event counts bucketed by hour or day, newest bucket first.
    pub fn activity_timeline(
        &self,
        since: DateTime<Utc>,
        interval: TimelineInterval,
    ) -> Result<Vec<TimelineBucket>, BreachwatchError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT substr(created_at, 1, ?1) AS bucket, COUNT(*), COUNT(DISTINCT performed_by) FROM incident_activities WHERE created_at >= ?2 GROUP BY bucket ORDER BY bucket DESC"
        ).map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(
            rusqlite::params![interval.prefix_len() as i64, time::to_db(&since)],
            |row| {
                Ok(TimelineBucket {
                    bucket: row.get(0)?,
                    event_count: row.get::<_, i64>(1)? as u64,
                    unique_performers: row.get::<_, i64>(2)? as u64,
                })
            },
        ).map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

        let mut buckets = Vec::new();
        for row in rows {
            buckets.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
        }
        Ok(buckets)
    }

    pub fn distinct_action_types(&self) -> Result<Vec<String>, BreachwatchError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT action_type FROM incident_activities ORDER BY action_type")
            .map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

        let mut actions = Vec::new();
        for row in rows {
            actions.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
        }
        Ok(actions)
    }
}
