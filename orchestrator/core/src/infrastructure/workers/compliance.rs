// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Compliance worker: regulatory notifications and incident documentation.
//!
//! Both breach notifications and incident reports are written to the
//! `documentation` namespace.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{configured_state, delegate_worker_state, timestamp};
use crate::domain::node_config::WorkerSettings;
use crate::domain::storage::ArtifactStore;
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerError, WorkerHeartbeat, WorkerState, WorkerType};

const CAPABILITIES: &[&str] = &[
    "breach_notification",
    "compliance_monitoring",
    "legal_documentation",
    "stakeholder_communication",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceOperation {
    GenerateNotification,
    MonitorCompliance,
    PrepareDocumentation,
}

impl ComplianceOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "generate_notification" => Some(Self::GenerateNotification),
            "monitor_compliance" => Some(Self::MonitorCompliance),
            "prepare_documentation" => Some(Self::PrepareDocumentation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceFramework {
    Hipaa,
    Gdpr,
    PciDss,
    Sox,
}

impl ComplianceFramework {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFramework::Hipaa => "hipaa",
            ComplianceFramework::Gdpr => "gdpr",
            ComplianceFramework::PciDss => "pci_dss",
            ComplianceFramework::Sox => "sox",
        }
    }
}

impl fmt::Display for ComplianceFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceFramework {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hipaa" => Ok(ComplianceFramework::Hipaa),
            "gdpr" => Ok(ComplianceFramework::Gdpr),
            "pci_dss" => Ok(ComplianceFramework::PciDss),
            "sox" => Ok(ComplianceFramework::Sox),
            other => Err(WorkerError::InvalidPayload(format!(
                "Unknown compliance framework: {}",
                other
            ))),
        }
    }
}

pub struct ComplianceWorker {
    state: WorkerState,
    documentation: Arc<dyn ArtifactStore>,
}

impl ComplianceWorker {
    pub fn new(documentation: Arc<dyn ArtifactStore>, settings: &WorkerSettings) -> Self {
        Self {
            state: configured_state(WorkerType::Compliance, CAPABILITIES, settings),
            documentation,
        }
    }

    async fn store(&self, key: &str, document: &Value) -> Result<(), WorkerError> {
        self.documentation
            .put(key, document)
            .await
            .map_err(|e| WorkerError::Storage(e.to_string()))
    }

    async fn generate_notification(&self, task: &Task) -> Result<Value, WorkerError> {
        let framework: ComplianceFramework = task
            .get_str("framework")
            .ok_or_else(|| WorkerError::InvalidPayload("Unknown compliance framework: none".to_string()))?
            .parse()?;

        let notification_id = format!("notification_{}", Uuid::new_v4().simple());
        let notification = json!({
            "framework": framework.as_str(),
            "incident_details": task.get("incident_details").cloned().unwrap_or_else(|| json!({})),
            "notification_requirements": [],
            "timeline_requirements": [],
            "documentation_requirements": [],
        });
        self.store(&notification_id, &notification).await?;

        info!(framework = %framework, notification_id = %notification_id, "Breach notification generated");

        Ok(json!({
            "status": "notification_generated",
            "notification_id": notification_id,
            "framework": framework.as_str(),
            "timestamp": timestamp(),
        }))
    }

    fn monitor_compliance(&self, task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "status": "compliance_checked",
            "framework": task.value_or_null("framework"),
            "monitoring_period": task.str_or("monitoring_period", "daily"),
            "timestamp": timestamp(),
            "findings": [],
        }))
    }

    async fn prepare_documentation(&self, task: &Task) -> Result<Value, WorkerError> {
        let document_id = format!("documentation_{}", Uuid::new_v4().simple());
        let documentation = json!({
            "incident_id": task.value_or_null("incident_id"),
            "documentation_type": task.value_or_null("documentation_type"),
            "incident_data": task.value_or_null("incident_data"),
            "evidence_data": task.value_or_null("evidence_data"),
            "prepared_at": timestamp(),
        });
        self.store(&document_id, &documentation).await?;

        Ok(json!({
            "status": "documentation_prepared",
            "incident_id": task.value_or_null("incident_id"),
            "documentation_type": task.value_or_null("documentation_type"),
            "document_id": document_id,
            "timestamp": timestamp(),
            "documentation": {},
        }))
    }
}

#[async_trait]
impl Worker for ComplianceWorker {
    delegate_worker_state!();

    async fn initialize(&self) -> bool {
        if self.state.is_ready() {
            return true;
        }
        let prepared = self.documentation.prepare().await;
        self.state.finish_initialize(prepared)
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        let operation = ComplianceOperation::from_name(&task.task_type)
            .ok_or_else(|| self.state.unknown_operation(&task.task_type))?;

        match operation {
            ComplianceOperation::GenerateNotification => self.generate_notification(task).await,
            ComplianceOperation::MonitorCompliance => self.monitor_compliance(task),
            ComplianceOperation::PrepareDocumentation => self.prepare_documentation(task).await,
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::Namespace;
    use crate::infrastructure::storage::InMemoryArtifactStore;

    fn worker() -> (ComplianceWorker, Arc<dyn ArtifactStore>) {
        let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Namespace::Documentation));
        let worker = ComplianceWorker::new(store.clone(), &WorkerSettings::defaults_for(WorkerType::Compliance));
        (worker, store)
    }

    #[tokio::test]
    async fn test_generate_notification_stores_document() {
        let (compliance, store) = worker();
        let task = Task::new(WorkerType::Compliance, "generate_notification")
            .with_field("framework", "gdpr")
            .with_field("incident_details", json!({"records_exposed": 1200}));

        let payload = compliance.execute(&task).await.unwrap();
        assert_eq!(payload["status"], "notification_generated");
        assert_eq!(payload["framework"], "gdpr");

        let id = payload["notification_id"].as_str().unwrap();
        let document = store.get(id).await.unwrap().unwrap();
        assert_eq!(document["framework"], "gdpr");
        assert_eq!(document["notification_requirements"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_framework_is_rejected() {
        let (compliance, store) = worker();
        for task in [
            Task::new(WorkerType::Compliance, "generate_notification").with_field("framework", "iso27001"),
            Task::new(WorkerType::Compliance, "generate_notification"),
        ] {
            let err = compliance.execute(&task).await.unwrap_err();
            assert!(matches!(err, WorkerError::InvalidPayload(_)));
        }
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_documentation_writes_report() {
        let (compliance, store) = worker();
        let task = Task::new(WorkerType::Compliance, "prepare_documentation")
            .with_field("incident_id", "inc-1")
            .with_field("documentation_type", "incident_report");

        let payload = compliance.execute(&task).await.unwrap();
        assert_eq!(payload["status"], "documentation_prepared");
        assert_eq!(payload["documentation_type"], "incident_report");

        let keys = store.list().await.unwrap();
        assert_eq!(keys, vec![payload["document_id"].as_str().unwrap().to_string()]);
    }
}
