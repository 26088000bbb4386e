use rusqlite::{Connection, OptionalExtension, Row};
use crate::errors::BreachwatchError;
use crate::models::{IncidentType, NewIncidentType};
use crate::utils::time;
use super::rows::ts_col;
use super::Database;

const TYPE_COLUMNS: &str = "id, name, description, severity_level, notification_deadline_hours, created_at";

fn type_from_row(row: &Row<'_>) -> rusqlite::Result<IncidentType> {
    Ok(IncidentType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        severity_level: row.get(3)?,
        notification_deadline_hours: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

pub(crate) fn fetch_incident_type(conn: &Connection, id: i64) -> Result<Option<IncidentType>, BreachwatchError> {
    conn.query_row(
        &format!("SELECT {} FROM incident_types WHERE id = ?1", TYPE_COLUMNS),
        rusqlite::params![id],
        type_from_row,
    )
    .optional()
    .map_err(|e| BreachwatchError::from_sqlite("Query incident type", e))
}

impl Database {
    pub fn create_incident_type(&self, new: &NewIncidentType) -> Result<IncidentType, BreachwatchError> {
        new.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO incident_types (name, description, severity_level, notification_deadline_hours, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                new.name.trim(),
                new.description,
                new.severity_level,
                new.notification_deadline_hours,
                time::now_db(),
            ],
        ).map_err(|e| BreachwatchError::from_sqlite("Failed to create incident type", e))?;

        let id = conn.last_insert_rowid();
        fetch_incident_type(&conn, id)?
            .ok_or_else(|| BreachwatchError::Internal(format!("Incident type {} vanished after insert", id)))
    }

    pub fn get_incident_type(&self, id: i64) -> Result<Option<IncidentType>, BreachwatchError> {
        let conn = self.lock()?;
        fetch_incident_type(&conn, id)
    }

    pub fn get_incident_type_by_name(&self, name: &str) -> Result<Option<IncidentType>, BreachwatchError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM incident_types WHERE name = ?1", TYPE_COLUMNS),
            rusqlite::params![name],
            type_from_row,
        )
        .optional()
        .map_err(|e| BreachwatchError::from_sqlite("Query incident type", e))
    }

    pub fn list_incident_types(&self) -> Result<Vec<IncidentType>, BreachwatchError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            &format!("SELECT {} FROM incident_types ORDER BY severity_level, name", TYPE_COLUMNS)
        ).map_err(|e| BreachwatchError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map([], type_from_row)
            .map_err(|e| BreachwatchError::Database(format!("Query error: {}", e)))?;

        let mut types = Vec::new();
        for row in rows {
            types.push(row.map_err(|e| BreachwatchError::Database(format!("Row error: {}", e)))?);
        }
        Ok(types)
    }

    /// Incidents referencing the type keep existing with a null type.
    pub fn delete_incident_type(&self, id: i64) -> Result<bool, BreachwatchError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM incident_types WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| BreachwatchError::from_sqlite("Delete incident type", e))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewIncident;

    fn new_type(name: &str) -> NewIncidentType {
        NewIncidentType {
            name: name.to_string(),
            description: Some("test type".to_string()),
            severity_level: 2,
            notification_deadline_hours: Some(24),
        }
    }

    #[test]
    fn test_seeded_types_present() {
        let db = Database::in_memory().unwrap();
        let breach = db.get_incident_type_by_name("data_breach").unwrap().unwrap();
        assert_eq!(breach.severity_level, 1);
        assert_eq!(breach.notification_deadline_hours, Some(72));

        let phishing = db.get_incident_type_by_name("phishing").unwrap().unwrap();
        assert_eq!(phishing.notification_deadline_hours, None);
    }

    #[test]
    fn test_create_and_get_type() {
        let db = Database::in_memory().unwrap();
        let created = db.create_incident_type(&new_type("insider_threat")).unwrap();
        let fetched = db.get_incident_type(created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "insider_threat");
        assert_eq!(fetched.notification_deadline_hours, Some(24));
    }

    #[test]
    fn test_duplicate_type_name_conflicts() {
        let db = Database::in_memory().unwrap();
        db.create_incident_type(&new_type("insider_threat")).unwrap();
        let err = db.create_incident_type(&new_type("insider_threat")).unwrap_err();
        assert!(matches!(err, BreachwatchError::Conflict(_)));
    }

    #[test]
    fn test_duplicate_of_seeded_name_conflicts() {
        let db = Database::in_memory().unwrap();
        let err = db.create_incident_type(&new_type("data_breach")).unwrap_err();
        assert!(matches!(err, BreachwatchError::Conflict(_)));
    }

    #[test]
    fn test_out_of_range_severity_rejected() {
        let db = Database::in_memory().unwrap();
        let mut bad = new_type("bad_level");
        bad.severity_level = 7;
        let err = db.create_incident_type(&bad).unwrap_err();
        assert!(matches!(err, BreachwatchError::Validation(_)));
    }

    #[test]
    fn test_list_ordered_by_severity_level() {
        let db = Database::in_memory().unwrap();
        let types = db.list_incident_types().unwrap();
        assert!(types.len() >= 7);
        let levels: Vec<u8> = types.iter().map(|t| t.severity_level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }

    #[test]
    fn test_delete_type_nulls_incident_reference() {
        let db = Database::in_memory().unwrap();
        let kind = db.create_incident_type(&new_type("temporary")).unwrap();
        let incident = db.create_incident(&NewIncident {
            title: "Typed incident".into(),
            incident_type_id: Some(kind.id),
            ..Default::default()
        }, None).unwrap();

        assert!(db.delete_incident_type(kind.id).unwrap());
        let reloaded = db.get_incident(incident.id).unwrap().unwrap();
        assert_eq!(reloaded.incident_type_id, None);
        assert!(!db.delete_incident_type(kind.id).unwrap());
    }
}
