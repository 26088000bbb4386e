use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreachwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BreachwatchError {
    /// Maps a rusqlite failure onto the error taxonomy. Constraint violations
    /// become caller-facing errors instead of opaque database failures.
    pub fn from_sqlite(context: &str, err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = err {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return BreachwatchError::Conflict(format!("{}: {}", context, detail));
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_CHECK
                | rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    return BreachwatchError::Validation(format!("{}: {}", context, detail));
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return BreachwatchError::NotFound(format!("{}: referenced row does not exist", context));
                }
                _ => {}
            }
        }
        BreachwatchError::Database(format!("{}: {}", context, err))
    }
}
