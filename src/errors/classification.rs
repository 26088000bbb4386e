use axum::http::StatusCode;
use super::types::BreachwatchError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub status: StatusCode,
    pub exit_code: i32,
}

impl BreachwatchError {
    /// Classify this error for the HTTP layer and the process exit code.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Caller errors
            BreachwatchError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                status: StatusCode::BAD_REQUEST,
                exit_code: 2,
            },
            BreachwatchError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                status: StatusCode::NOT_FOUND,
                exit_code: 3,
            },
            BreachwatchError::Conflict(_) => ErrorClassification {
                error_type: "ConflictError",
                status: StatusCode::CONFLICT,
                exit_code: 4,
            },
            BreachwatchError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                status: StatusCode::UNPROCESSABLE_ENTITY,
                exit_code: 4,
            },
            BreachwatchError::InvalidTransition { .. } => ErrorClassification {
                error_type: "InvalidTransitionError",
                status: StatusCode::CONFLICT,
                exit_code: 4,
            },
            BreachwatchError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                status: StatusCode::BAD_REQUEST,
                exit_code: 2,
            },

            // Environment failures
            BreachwatchError::Io(_) => ErrorClassification {
                error_type: "IoError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
                exit_code: 1,
            },
            BreachwatchError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
                exit_code: 1,
            },
            BreachwatchError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
                exit_code: 1,
            },
            BreachwatchError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
                exit_code: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = BreachwatchError::NotFound("incident 7".into());
        let class = err.classify();
        assert_eq!(class.status, StatusCode::NOT_FOUND);
        assert_eq!(class.error_type, "NotFoundError");
        assert_eq!(class.exit_code, 3);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = BreachwatchError::Conflict("duplicate incident number".into());
        assert_eq!(err.classify().status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_transition_is_conflict() {
        let err = BreachwatchError::InvalidTransition {
            from: "closed".into(),
            to: "open".into(),
        };
        let class = err.classify();
        assert_eq!(class.status, StatusCode::CONFLICT);
        assert_eq!(class.exit_code, 4);
        assert_eq!(err.to_string(), "Invalid status transition: closed -> open");
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = BreachwatchError::Config("bad config".into());
        assert_eq!(err.classify().exit_code, 2);
    }

    #[test]
    fn test_database_error_is_server_error() {
        let err = BreachwatchError::Database("disk full".into());
        assert_eq!(err.classify().status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.classify().exit_code, 1);
    }

    #[test]
    fn test_io_error_is_server_error() {
        let err = BreachwatchError::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken"));
        let class = err.classify();
        assert_eq!(class.error_type, "IoError");
        assert_eq!(class.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(class.exit_code, 1);
    }

    #[test]
    fn test_validation_is_unprocessable() {
        let err = BreachwatchError::Validation("severity_level out of range".into());
        assert_eq!(err.classify().status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');").unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        let mapped = BreachwatchError::from_sqlite("insert", err);
        assert!(matches!(mapped, BreachwatchError::Conflict(_)));
    }

    #[test]
    fn test_check_violation_maps_to_validation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER CHECK (n BETWEEN 1 AND 4));").unwrap();
        let err = conn.execute("INSERT INTO t VALUES (9)", []).unwrap_err();
        let mapped = BreachwatchError::from_sqlite("insert", err);
        assert!(matches!(mapped, BreachwatchError::Validation(_)));
    }
}
