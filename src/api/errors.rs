use axum::{response::IntoResponse, Json};
use serde_json::json;
use tracing::error;
use crate::errors::BreachwatchError;

impl IntoResponse for BreachwatchError {
    fn into_response(self) -> axum::response::Response {
        let class = self.classify();
        if class.status.is_server_error() {
            error!(error = %self, error_type = class.error_type, "Request failed");
        }

        (
            class.status,
            Json(json!({ "error": self.to_string(), "error_type": class.error_type })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, BreachwatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_from_classification() {
        let resp = BreachwatchError::NotFound("Incident 9 not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = BreachwatchError::InvalidTransition { from: "closed".into(), to: "open".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = BreachwatchError::Database("locked".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
