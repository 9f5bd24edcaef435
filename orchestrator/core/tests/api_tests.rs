// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP router tests driven through `tower::ServiceExt::oneshot`.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::Harness;
use kraken_core::application::incident_service::StandardIncidentService;
use kraken_core::application::repository_factory::Repositories;
use kraken_core::domain::response::CoordinationPolicy;
use kraken_core::domain::worker::WorkerType;
use kraken_core::presentation::api::{app, AppState};

async fn router(skip: &[WorkerType]) -> Router {
    let harness = Harness::builtin(skip).await;
    let repositories = Repositories::in_memory();
    let service = StandardIncidentService::new(
        repositories.incidents,
        repositories.actions,
        repositories.responses,
        Arc::new(harness.coordinator(CoordinationPolicy::BestEffort)),
        harness.dispatcher.clone(),
        harness.event_bus.clone(),
    );
    app(AppState::new(
        Arc::new(service),
        harness.dispatcher,
        harness.registry,
        harness.artifacts.evidence,
    ))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let router = router(&[]).await;
    let (status, body) = send(&router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workers"], 5);
}

#[tokio::test]
async fn test_create_incident_returns_five_step_record() {
    let router = router(&[]).await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/incidents",
        Some(json!({
            "type": "data_exfiltration",
            "severity": "high",
            "source_ip": "198.51.100.23",
            "target_systems": ["host1"],
            "ticket": "SEC-4411"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["response"]["status"], "completed");
    assert_eq!(body["response"]["steps"].as_array().unwrap().len(), 5);
    assert_eq!(body["incident"]["status"], "contained");
    assert_eq!(body["incident"]["details"]["ticket"], "SEC-4411");

    let id = body["incident"]["id"].as_str().unwrap();
    let (status, details) = send(&router, Method::GET, &format!("/api/incidents/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["incident"]["id"], id);
    assert_eq!(details["actions"], json!([]));

    let (status, listed) = send(&router, Method::GET, "/api/incidents?severity=high", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_and_add_action() {
    let router = router(&[]).await;
    let (_, created) = send(
        &router,
        Method::POST,
        "/api/incidents",
        Some(json!({"type": "phishing"})),
    )
    .await;
    let id = created["incident"]["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &router,
        Method::PUT,
        &format!("/api/incidents/{}", id),
        Some(json!({"resolution_status": "user_retrained"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["updated_fields"], json!(["resolution_status"]));

    let (status, action) = send(
        &router,
        Method::POST,
        &format!("/api/incidents/{}/actions", id),
        Some(json!({
            "type": "generate_notification",
            "agent_type": "compliance",
            "parameters": {"framework": "gdpr"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(action["status"], "completed");
    assert_eq!(action["result"]["payload"]["framework"], "gdpr");
}

#[tokio::test]
async fn test_dispatch_against_missing_worker_is_503() {
    let router = router(&[WorkerType::Forensic]).await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/tasks",
        Some(json!({"type": "collect_evidence", "worker_type": "forensic"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["component"], "dispatcher");
    assert!(body["error"].as_str().unwrap().contains("WorkerUnavailable"));
}

#[tokio::test]
async fn test_dispatch_task_returns_envelope() {
    let router = router(&[]).await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/tasks",
        Some(json!({"type": "isolate_system", "worker_type": "containment", "system_id": "web-9"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["worker_type"], "containment");
    assert_eq!(body["payload"]["system_id"], "web-9");
}

#[tokio::test]
async fn test_error_bodies() {
    let router = router(&[]).await;

    let (status, body) = send(&router, Method::GET, "/api/incidents/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["component"], "api");

    let missing = format!("/api/incidents/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&router, Method::GET, &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["component"], "incident_service");

    let (status, _) = send(&router, Method::POST, "/api/incidents", Some(json!({"severity": "low"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workers_heartbeat() {
    let router = router(&[WorkerType::Compliance]).await;
    let (status, body) = send(&router, Method::GET, "/api/workers", None).await;

    assert_eq!(status, StatusCode::OK);
    let workers = body["workers"].as_array().unwrap();
    assert_eq!(workers.len(), 4);
    assert!(workers.iter().all(|w| w["status"] == "ready"));
}

#[tokio::test]
async fn test_evidence_collected_by_response_is_readable() {
    let router = router(&[]).await;
    let (_, created) = send(
        &router,
        Method::POST,
        "/api/incidents",
        Some(json!({"type": "ransomware", "severity": "critical", "target_systems": ["db-01"]})),
    )
    .await;
    let evidence_id = created["incident"]["evidence_ids"][0].as_str().unwrap().to_string();

    let (status, record) = send(&router, Method::GET, &format!("/api/evidence/{}", evidence_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["evidence_id"], evidence_id.as_str());
    assert_eq!(record["evidence_type"], "incident_response");
    assert_eq!(record["hash"].as_str().unwrap().len(), 64);
    assert_eq!(record["data"]["incident_type"], "ransomware");

    for id in ["ev-zz-1", "ev-zz-2"] {
        let (status, _) = send(
            &router,
            Method::POST,
            "/api/tasks",
            Some(json!({"type": "collect_evidence", "worker_type": "forensic", "evidence_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, all) = send(&router, Method::GET, "/api/evidence", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, page) = send(&router, Method::GET, "/api/evidence?skip=1&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["evidence_id"], "ev-zz-1");
}

#[tokio::test]
async fn test_evidence_lookup_errors() {
    let router = router(&[]).await;

    let (status, body) = send(&router, Method::GET, "/api/evidence/ev-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["component"], "evidence");

    let (status, body) = send(&router, Method::GET, "/api/evidence/.hidden", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["component"], "evidence");

    let (status, body) = send(&router, Method::GET, "/api/evidence", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
