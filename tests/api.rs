use axum::http::StatusCode;
use axum::body::Body;
use http_body_util::BodyExt;
use tower::ServiceExt;
use serde_json::{json, Value};
use breachwatch::db::Database;
use breachwatch::api::{build_router, AppState};
use breachwatch::config::BreachwatchConfig;

fn create_test_state() -> AppState {
    let db = Database::in_memory().unwrap();
    AppState::new(db, BreachwatchConfig::default(), None)
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

async fn create_incident(state: &AppState, body: Value) -> Value {
    let response = app(state).oneshot(make_request("POST", "/api/incidents", Some(body))).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_and_get_incident() {
    let state = create_test_state();
    let created = create_incident(&state, json!({
        "title": "Laptop stolen from car",
        "severity": "high",
        "reported_by": "alice"
    })).await;

    assert_eq!(created["status"], "open");
    assert_eq!(created["severity"], "high");
    let number = created["incident_number"].as_str().unwrap();
    assert!(number.starts_with("INC-"));
    assert!(number.ends_with("-00001"));

    let id = created["id"].as_i64().unwrap();
    let response = app(&state).oneshot(make_request("GET", &format!("/api/incidents/{}", id), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["title"], "Laptop stolen from car");

    // Creation is on the audit trail
    let response = app(&state)
        .oneshot(make_request("GET", &format!("/api/incidents/{}/activities", id), None))
        .await
        .unwrap();
    let activities = response_json(response).await;
    assert_eq!(activities[0]["action_type"], "created");
    assert_eq!(activities[0]["performed_by"], "alice");
}

#[tokio::test]
async fn test_get_missing_incident_is_404() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/incidents/999", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert_eq!(body["error_type"], "NotFoundError");
}

#[tokio::test]
async fn test_empty_title_rejected() {
    let state = create_test_state();
    let response = app(&state)
        .oneshot(make_request("POST", "/api/incidents", Some(json!({ "title": "  " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let state = create_test_state();
    create_incident(&state, json!({ "title": "first" })).await;
    let second = create_incident(&state, json!({ "title": "second" })).await;

    let uri = format!("/api/incidents/{}/status", second["id"]);
    let response = app(&state)
        .oneshot(make_request("POST", &uri, Some(json!({ "status": "investigating" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/incidents?status=investigating", None))
        .await
        .unwrap();
    let page = response_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "second");

    let response = app(&state).oneshot(make_request("GET", "/api/incidents", None)).await.unwrap();
    assert_eq!(response_json(response).await["total"], 2);
}

#[tokio::test]
async fn test_lifecycle_guard_returns_conflict() {
    let state = create_test_state();
    let incident = create_incident(&state, json!({ "title": "closed early" })).await;
    let uri = format!("/api/incidents/{}/status", incident["id"]);

    let response = app(&state)
        .oneshot(make_request("POST", &uri, Some(json!({ "status": "closed", "actor": "lead" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "closed");
    assert!(!body["resolved_at"].is_null());
    assert!(!body["closed_at"].is_null());

    // Closed is terminal
    let response = app(&state)
        .oneshot(make_request("POST", &uri, Some(json!({ "status": "open" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["error_type"], "InvalidTransitionError");
}

#[tokio::test]
async fn test_oversized_deadline_windows_rejected() {
    let state = create_test_state();
    let created = create_incident(&state, json!({ "title": "Backup bucket left public" })).await;
    let id = created["id"].as_i64().unwrap();

    let response = app(&state)
        .oneshot(make_request(
            "POST",
            &format!("/api/incidents/{}/breach", id),
            Some(json!({ "deadline_hours": 4294967295u32 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app(&state)
        .oneshot(make_request("GET", &format!("/api/incidents/{}", id), None))
        .await
        .unwrap();
    assert_eq!(response_json(response).await["is_data_breach"], false);

    let response = app(&state)
        .oneshot(make_request(
            "POST",
            "/api/incident-types",
            Some(json!({
                "name": "archival_leak",
                "severity_level": 2,
                "notification_deadline_hours": 1000000
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_breach_flag_sets_deadline_from_type() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/incident-types", None)).await.unwrap();
    let types = response_json(response).await;
    let data_breach = types
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "data_breach")
        .unwrap()
        .clone();

    let incident = create_incident(&state, json!({
        "title": "Customer table dumped",
        "incident_type_id": data_breach["id"],
        "detected_at": "2024-03-01T08:00:00Z"
    })).await;
    let id = incident["id"].as_i64().unwrap();

    let response = app(&state)
        .oneshot(make_request(
            "POST",
            &format!("/api/incidents/{}/breach?actor=dpo", id),
            Some(json!({ "affected_records": 1200 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["is_data_breach"], true);
    assert_eq!(body["affected_records"], 1200);
    assert_eq!(body["notification_deadline"], "2024-03-04T08:00:00Z");

    // Detected long ago, nothing sent: overdue
    let response = app(&state)
        .oneshot(make_request("GET", &format!("/api/incidents/{}/breach-state", id), None))
        .await
        .unwrap();
    let state_body = response_json(response).await;
    assert_eq!(state_body["breach"]["state"], "overdue");

    let response = app(&state).oneshot(make_request("GET", "/api/breaches/overdue", None)).await.unwrap();
    assert_eq!(response_json(response).await["total"], 1);

    let response = app(&state)
        .oneshot(make_request(
            "POST",
            &format!("/api/incidents/{}/notification-sent", id),
            Some(json!({ "sent_at": "2024-03-03T12:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(make_request("GET", &format!("/api/incidents/{}/breach-state", id), None))
        .await
        .unwrap();
    let state_body = response_json(response).await;
    assert_eq!(state_body["breach"]["state"], "notified");
    assert_eq!(state_body["breach"]["on_time"], true);

    let response = app(&state).oneshot(make_request("GET", "/api/breaches/overdue", None)).await.unwrap();
    assert_eq!(response_json(response).await["total"], 0);
}

#[tokio::test]
async fn test_notification_flow() {
    let state = create_test_state();
    let incident = create_incident(&state, json!({ "title": "notify" })).await;
    let id = incident["id"].as_i64().unwrap();

    let response = app(&state)
        .oneshot(make_request(
            "POST",
            &format!("/api/incidents/{}/notifications", id),
            Some(json!({
                "recipient_type": "regulator",
                "recipient": "dpa@example.org",
                "channel": "email"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let notification = response_json(response).await;
    assert_eq!(notification["status"], "pending");

    let response = app(&state)
        .oneshot(make_request("GET", "/api/notifications?status=pending", None))
        .await
        .unwrap();
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);

    let response = app(&state)
        .oneshot(make_request(
            "PATCH",
            &format!("/api/notifications/{}", notification["id"]),
            Some(json!({ "status": "failed", "error": "mailbox full" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["status"], "failed");
    assert_eq!(updated["error_message"], "mailbox full");

    // Queueing for a missing incident
    let response = app(&state)
        .oneshot(make_request(
            "POST",
            "/api/incidents/999/notifications",
            Some(json!({ "recipient_type": "internal", "recipient": "ciso", "channel": "email" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_and_activity_stats() {
    let state = create_test_state();
    let incident = create_incident(&state, json!({ "title": "commented" })).await;
    let uri = format!("/api/incidents/{}/activities", incident["id"]);

    let response = app(&state)
        .oneshot(make_request("POST", &uri, Some(json!({ "comment": "Called the ISP", "performed_by": "bob" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app(&state)
        .oneshot(make_request("POST", &uri, Some(json!({ "comment": "" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/activities/stats?days=1", None))
        .await
        .unwrap();
    let stats = response_json(response).await;
    assert_eq!(stats["total_events"], 2);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/activities?action_type=comment", None))
        .await
        .unwrap();
    let page = response_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["performed_by"], "bob");

    let response = app(&state)
        .oneshot(make_request("GET", "/api/activities/timeline?interval=hour", None))
        .await
        .unwrap();
    let timeline = response_json(response).await;
    assert_eq!(timeline["interval"], "hour");
    let events: u64 = timeline["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["event_count"].as_u64().unwrap())
        .sum();
    assert_eq!(events, 2);
}

#[tokio::test]
async fn test_delete_incident() {
    let state = create_test_state();
    let incident = create_incident(&state, json!({ "title": "to delete" })).await;
    let uri = format!("/api/incidents/{}", incident["id"]);

    let response = app(&state).oneshot(make_request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["deleted"], true);

    let response = app(&state).oneshot(make_request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let state = create_test_state();
    create_incident(&state, json!({ "title": "one", "severity": "critical" })).await;

    let response = app(&state).oneshot(make_request("GET", "/api/stats", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = response_json(response).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["active"], 1);
}

#[tokio::test]
async fn test_token_required_when_configured() {
    let state = AppState::new(Database::in_memory().unwrap(), BreachwatchConfig::default(), Some("s3cret".into()));

    let response = app(&state).oneshot(make_request("GET", "/api/incidents", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .uri("/api/incidents")
        .header("Authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app(&state).oneshot(request).await.unwrap().status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .uri("/api/incidents")
        .header("Authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app(&state).oneshot(request).await.unwrap().status(), StatusCode::OK);

    // Health stays open
    let response = app(&state).oneshot(make_request("GET", "/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_export_formats_and_unknown_job() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/export/formats", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["formats"].as_array().unwrap().len(), 2);

    let response = app(&state)
        .oneshot(make_request("GET", "/api/export/jobs/export_missing", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
