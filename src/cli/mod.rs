pub mod commands;
pub mod serve;
pub mod check;
pub mod incident;
pub mod notify;
pub mod activity;
pub mod export;

pub use commands::{Cli, Commands};

use chrono::{DateTime, Utc};

use crate::config::BreachwatchConfig;
use crate::db::Database;
use crate::errors::BreachwatchError;
use crate::models::Incident;

pub fn open_db(config: &BreachwatchConfig) -> Result<Database, BreachwatchError> {
    Database::new(&config.database.path)
}

/// Looks an incident up by numeric id or by incident number.
pub fn resolve_incident(db: &Database, reference: &str) -> Result<Incident, BreachwatchError> {
    let reference = reference.trim();
    let found = match reference.parse::<i64>() {
        Ok(id) => db.get_incident(id)?,
        Err(_) => db.get_incident_by_number(reference)?,
    };
    found.ok_or_else(|| BreachwatchError::NotFound(format!("Incident {} not found", reference)))
}

pub fn parse_time(raw: &str) -> Result<DateTime<Utc>, BreachwatchError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BreachwatchError::Validation(format!("invalid timestamp '{}': {}", raw, e)))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), BreachwatchError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewIncident;

    #[test]
    fn test_resolve_by_id_and_number() {
        let db = Database::in_memory().unwrap();
        let created = db.create_incident(&NewIncident { title: "lookup".into(), ..Default::default() }, None).unwrap();

        assert_eq!(resolve_incident(&db, &created.id.to_string()).unwrap().id, created.id);
        assert_eq!(resolve_incident(&db, &created.incident_number).unwrap().id, created.id);
        assert!(matches!(resolve_incident(&db, "INC-1999-00001"), Err(BreachwatchError::NotFound(_))));
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2026-03-01T08:00:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2026-03-01T06:00:00+00:00");
        assert!(matches!(parse_time("yesterday"), Err(BreachwatchError::Validation(_))));
    }
}
