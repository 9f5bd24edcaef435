// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running KRAKEN-FLUX node

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

/// Query parameters accepted by `GET /api/incidents`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncidentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

/// Paging parameters accepted by `GET /api/evidence`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvidenceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl NodeClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_base_url(format!("http://{}:{}", host, port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value> {
        self.send(self.client.get(self.url("/health")), "Health check")
            .await
    }

    pub async fn create_incident(&self, request: &Value) -> Result<Value> {
        self.send(
            self.client.post(self.url("/api/incidents")).json(request),
            "Create incident",
        )
        .await
    }

    pub async fn get_incident(&self, incident_id: &str) -> Result<Value> {
        self.send(
            self.client
                .get(self.url(&format!("/api/incidents/{}", incident_id))),
            "Get incident",
        )
        .await
    }

    pub async fn list_incidents(&self, query: &IncidentQuery) -> Result<Value> {
        self.send(
            self.client.get(self.url("/api/incidents")).query(query),
            "List incidents",
        )
        .await
    }

    pub async fn update_incident(&self, incident_id: &str, update: &Value) -> Result<Value> {
        self.send(
            self.client
                .put(self.url(&format!("/api/incidents/{}", incident_id)))
                .json(update),
            "Update incident",
        )
        .await
    }

    pub async fn add_action(&self, incident_id: &str, action: &Value) -> Result<Value> {
        self.send(
            self.client
                .post(self.url(&format!("/api/incidents/{}/actions", incident_id)))
                .json(action),
            "Add action",
        )
        .await
    }

    pub async fn dispatch_task(&self, task: &Value) -> Result<Value> {
        self.send(
            self.client.post(self.url("/api/tasks")).json(task),
            "Dispatch task",
        )
        .await
    }

    pub async fn list_workers(&self) -> Result<Value> {
        self.send(self.client.get(self.url("/api/workers")), "List workers")
            .await
    }

    pub async fn list_evidence(&self, query: &EvidenceQuery) -> Result<Value> {
        self.send(
            self.client.get(self.url("/api/evidence")).query(query),
            "List evidence",
        )
        .await
    }

    pub async fn get_evidence(&self, evidence_id: &str) -> Result<Value> {
        self.send(
            self.client
                .get(self.url(&format!("/api/evidence/{}", evidence_id))),
            "Get evidence",
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Value> {
        let request = match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("{} request failed", operation))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // Node errors carry {"error", "component"}
            let detail = match serde_json::from_str::<Value>(&body) {
                Ok(value) => format!(
                    "{} [{}]",
                    value["error"].as_str().unwrap_or(&body),
                    value["component"].as_str().unwrap_or("unknown")
                ),
                Err(_) => body,
            };
            anyhow::bail!("{} failed ({}): {}", operation, status, detail);
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse {} response", operation.to_lowercase()))
    }
}

/// True when the node could not be reached at all.
pub fn is_connect_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_incident_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/incidents")
            .match_body(Matcher::PartialJson(json!({"type": "ransomware"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"incident": {"id": "abc"}, "response": {"status": "completed"}}"#)
            .create_async()
            .await;

        let client = NodeClient::with_base_url(server.url()).unwrap();
        let created = client
            .create_incident(&json!({"type": "ransomware", "severity": "critical"}))
            .await
            .unwrap();

        assert_eq!(created["incident"]["id"], "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/tasks")
            .with_status(503)
            .with_body(r#"{"error": "worker forensic unavailable", "component": "dispatcher"}"#)
            .create_async()
            .await;

        let client = NodeClient::with_base_url(server.url()).unwrap();
        let err = client
            .dispatch_task(&json!({"type": "collect_evidence", "worker_type": "forensic"}))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("503"));
        assert!(err.contains("worker forensic unavailable"));
        assert!(err.contains("[dispatcher]"));
    }

    #[tokio::test]
    async fn test_list_incidents_sends_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/incidents")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("severity".into(), "high".into()),
                Matcher::UrlEncoded("status".into(), "contained".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = NodeClient::with_base_url(format!("{}/", server.url())).unwrap();
        let query = IncidentQuery {
            status: Some("contained".into()),
            severity: Some("high".into()),
            ..Default::default()
        };
        let listed = client.list_incidents(&query).await.unwrap();

        assert_eq!(listed, json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_evidence_paging_and_not_found() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/api/evidence")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("skip".into(), "10".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"evidence_id": "ev-11"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/evidence/ev-404")
            .with_status(404)
            .with_body(r#"{"error": "Evidence not found: ev-404", "component": "evidence"}"#)
            .create_async()
            .await;

        let client = NodeClient::with_base_url(server.url()).unwrap();
        let page = client
            .list_evidence(&EvidenceQuery {
                skip: Some(10),
                limit: Some(5),
            })
            .await
            .unwrap();
        assert_eq!(page[0]["evidence_id"], "ev-11");
        list.assert_async().await;

        let err = client.get_evidence("ev-404").await.unwrap_err().to_string();
        assert!(err.contains("404"));
        assert!(err.contains("[evidence]"));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connect_error() {
        // Port 9 (discard) is closed on test hosts
        let client = NodeClient::new("127.0.0.1", 9)
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let err = client.health().await.unwrap_err();
        assert!(is_connect_error(&err));
    }
}
