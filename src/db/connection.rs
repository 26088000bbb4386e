use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::errors::BreachwatchError;
use tracing::{debug, info};

/// `PRAGMA user_version` once the default incident types have been inserted.
const SEEDED_VERSION: i64 = 1;

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, BreachwatchError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| BreachwatchError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| BreachwatchError::Database(format!("Failed to set pragmas: {}", e)))?;

        debug!(path, "Opened incident database");
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, BreachwatchError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BreachwatchError::Database(format!("Failed to open in-memory db: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, BreachwatchError> {
        // Cascade deletes depend on this being set on every connection.
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| BreachwatchError::Database(format!("Failed to enable foreign keys: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), BreachwatchError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| BreachwatchError::Database(format!("Failed to create tables: {}", e)))?;

        // Seed once per database so operator deletions survive a restart.
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| BreachwatchError::Database(format!("Failed to read schema version: {}", e)))?;
        if version < SEEDED_VERSION {
            conn.execute_batch(&format!(
                "BEGIN; {} PRAGMA user_version = {}; COMMIT;",
                super::schema::SEED_INCIDENT_TYPES,
                SEEDED_VERSION
            ))
            .map_err(|e| BreachwatchError::Database(format!("Failed to seed incident types: {}", e)))?;
            info!("Seeded default incident types");
        }
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, BreachwatchError> {
        self.conn
            .lock()
            .map_err(|_| BreachwatchError::Database("Connection mutex poisoned".into()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enabled_in_memory() {
        let db = Database::in_memory().unwrap();
        let conn = db.lock().unwrap();
        let enabled: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_reopen_file_database_keeps_seed_unique() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("incidents.db");
        let path = path.to_str().unwrap();

        let first = Database::new(path).unwrap();
        let seeded = first.list_incident_types().unwrap().len();
        drop(first);

        let second = Database::new(path).unwrap();
        assert_eq!(second.list_incident_types().unwrap().len(), seeded);
    }

    #[test]
    fn test_deleted_seed_type_stays_deleted_after_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("incidents.db");
        let path = path.to_str().unwrap();

        let first = Database::new(path).unwrap();
        let phishing = first.get_incident_type_by_name("phishing").unwrap().unwrap();
        assert!(first.delete_incident_type(phishing.id).unwrap());
        let remaining = first.list_incident_types().unwrap().len();
        drop(first);

        let second = Database::new(path).unwrap();
        assert!(second.get_incident_type_by_name("phishing").unwrap().is_none());
        assert_eq!(second.list_incident_types().unwrap().len(), remaining);
    }
}
