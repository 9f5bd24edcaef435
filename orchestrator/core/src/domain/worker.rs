// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Worker Domain Model
//!
//! A **Worker** is a capability-providing unit that executes one task at a
//! time on behalf of the incident-response platform. Every worker exposes a
//! fixed set of capability names and a closed set of operations; the string
//! `type` carried by an inbound [`Task`] is parsed into that closed set by
//! the worker itself.
//!
//! ## Lifecycle
//!
//! ```text
//! Initialized --initialize()--> Ready --cleanup()--> Shutdown
//!      |                          |
//!      +------ fault -----------> Error   (evicted from the registry)
//! ```
//!
//! [`WorkerState`] carries the bookkeeping shared by every built-in worker
//! (identity, status, capabilities, metadata, heartbeat).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::envelope::ErrorKind;
use crate::domain::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing key for tasks. Exactly one live worker per type may be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    Guardian,
    Simulation,
    Containment,
    Forensic,
    Compliance,
}

impl WorkerType {
    pub const ALL: [WorkerType; 5] = [
        WorkerType::Guardian,
        WorkerType::Simulation,
        WorkerType::Containment,
        WorkerType::Forensic,
        WorkerType::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerType::Guardian => "guardian",
            WorkerType::Simulation => "simulation",
            WorkerType::Containment => "containment",
            WorkerType::Forensic => "forensic",
            WorkerType::Compliance => "compliance",
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerType {
    type Err = UnknownWorkerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guardian" => Ok(WorkerType::Guardian),
            "simulation" => Ok(WorkerType::Simulation),
            "containment" => Ok(WorkerType::Containment),
            "forensic" | "forensics" => Ok(WorkerType::Forensic),
            "compliance" => Ok(WorkerType::Compliance),
            _ => Err(UnknownWorkerType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown worker type: {0}")]
pub struct UnknownWorkerType(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Initialized,
    Ready,
    Error,
    Shutdown,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerStatus::Initialized => "initialized",
            WorkerStatus::Ready => "ready",
            WorkerStatus::Error => "error",
            WorkerStatus::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Faults raised by a worker while handling a task.
///
/// These never cross the dispatcher boundary as `Err`: the dispatcher folds
/// them into an error-status [`crate::domain::envelope::ResultEnvelope`].
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error("UnknownOperation: '{operation}' is not handled by the {worker_type} worker")]
    UnknownOperation {
        worker_type: WorkerType,
        operation: String,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            WorkerError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            WorkerError::Storage(_) => ErrorKind::Storage,
            WorkerError::Execution(_) => ErrorKind::Execution,
        }
    }
}

/// Snapshot returned by a heartbeat sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub worker_id: WorkerId,
    pub worker_type: WorkerType,
    pub status: WorkerStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    fn worker_type(&self) -> WorkerType;

    fn status(&self) -> WorkerStatus;

    fn capabilities(&self) -> Vec<String>;

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities().iter().any(|c| c == capability)
    }

    /// Bring the worker to `Ready`. Returns `false` and leaves the worker in
    /// `Error` on failure; never panics past this boundary.
    async fn initialize(&self) -> bool;

    /// Handle one task. The worker parses `task.task_type` into its own
    /// operation set and fails with [`WorkerError::UnknownOperation`] otherwise.
    async fn execute(&self, task: &Task) -> Result<Value, WorkerError>;

    /// Release resources and move to `Shutdown`. Safe to call repeatedly.
    async fn cleanup(&self) -> bool;

    async fn heartbeat(&self) -> WorkerHeartbeat;

    /// Record an uncaught fault. The registry evicts workers in this state.
    fn mark_failed(&self, reason: &str);
}

/// Shared bookkeeping for built-in workers.
pub struct WorkerState {
    id: WorkerId,
    worker_type: WorkerType,
    status: RwLock<WorkerStatus>,
    capabilities: RwLock<Vec<String>>,
    metadata: RwLock<Map<String, Value>>,
    last_heartbeat: RwLock<DateTime<Utc>>,
}

impl WorkerState {
    pub fn new(worker_type: WorkerType) -> Self {
        Self {
            id: WorkerId::new(),
            worker_type,
            status: RwLock::new(WorkerStatus::Initialized),
            capabilities: RwLock::new(Vec::new()),
            metadata: RwLock::new(Map::new()),
            last_heartbeat: RwLock::new(Utc::now()),
        }
    }

    pub fn with_capabilities(self, capabilities: &[&str]) -> Self {
        for capability in capabilities {
            self.register_capability(capability);
        }
        self
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.read()
    }

    pub fn is_ready(&self) -> bool {
        self.status() == WorkerStatus::Ready
    }

    pub fn set_status(&self, status: WorkerStatus) {
        *self.status.write() = status;
    }

    pub fn capabilities(&self) -> Vec<String> {
        self.capabilities.read().clone()
    }

    /// Adds a capability if not already present.
    pub fn register_capability(&self, capability: &str) {
        let mut capabilities = self.capabilities.write();
        if !capabilities.iter().any(|c| c == capability) {
            capabilities.push(capability.to_string());
            debug!(worker_type = %self.worker_type, capability, "Registered capability");
        }
    }

    pub fn update_metadata(&self, key: impl Into<String>, value: Value) {
        self.metadata.write().insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<Value> {
        self.metadata.read().get(key).cloned()
    }

    /// Settle the outcome of an initialization attempt into a status.
    pub fn finish_initialize<E: fmt::Display>(&self, result: Result<(), E>) -> bool {
        match result {
            Ok(()) => {
                self.set_status(WorkerStatus::Ready);
                info!(worker_type = %self.worker_type, worker_id = %self.id, "Worker initialized");
                true
            }
            Err(e) => {
                self.set_status(WorkerStatus::Error);
                error!(worker_type = %self.worker_type, worker_id = %self.id, "Worker initialization failed: {}", e);
                false
            }
        }
    }

    pub fn shutdown(&self) -> bool {
        self.set_status(WorkerStatus::Shutdown);
        info!(worker_type = %self.worker_type, worker_id = %self.id, "Worker shut down");
        true
    }

    pub fn mark_failed(&self, reason: &str) {
        self.set_status(WorkerStatus::Error);
        self.update_metadata("last_fault", Value::String(reason.to_string()));
        error!(worker_type = %self.worker_type, worker_id = %self.id, "Worker fault: {}", reason);
    }

    pub fn heartbeat(&self) -> WorkerHeartbeat {
        let now = Utc::now();
        *self.last_heartbeat.write() = now;
        WorkerHeartbeat {
            worker_id: self.id,
            worker_type: self.worker_type,
            status: self.status(),
            last_heartbeat: now,
            capabilities: self.capabilities(),
            metadata: self.metadata.read().clone(),
        }
    }

    pub fn unknown_operation(&self, operation: &str) -> WorkerError {
        WorkerError::UnknownOperation {
            worker_type: self.worker_type,
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_type_parsing() {
        assert_eq!("containment".parse::<WorkerType>().unwrap(), WorkerType::Containment);
        assert_eq!("Forensics".parse::<WorkerType>().unwrap(), WorkerType::Forensic);
        assert!("quantum".parse::<WorkerType>().is_err());

        for worker_type in WorkerType::ALL {
            assert_eq!(worker_type.as_str().parse::<WorkerType>().unwrap(), worker_type);
        }
    }

    #[test]
    fn test_capabilities_are_deduplicated() {
        let state = WorkerState::new(WorkerType::Guardian)
            .with_capabilities(&["network_traffic_analysis", "network_traffic_analysis"]);
        assert_eq!(state.capabilities(), vec!["network_traffic_analysis".to_string()]);
    }

    #[test]
    fn test_initialize_outcomes() {
        let state = WorkerState::new(WorkerType::Forensic);
        assert_eq!(state.status(), WorkerStatus::Initialized);

        assert!(!state.finish_initialize::<String>(Err("disk unavailable".into())));
        assert_eq!(state.status(), WorkerStatus::Error);

        assert!(state.finish_initialize::<String>(Ok(())));
        assert!(state.is_ready());
    }

    #[test]
    fn test_mark_failed_records_reason() {
        let state = WorkerState::new(WorkerType::Compliance);
        state.set_status(WorkerStatus::Ready);
        state.mark_failed("handler panicked");

        assert_eq!(state.status(), WorkerStatus::Error);
        assert_eq!(
            state.get_metadata("last_fault"),
            Some(Value::String("handler panicked".to_string()))
        );
    }

    #[test]
    fn test_unknown_operation_message_and_kind() {
        let state = WorkerState::new(WorkerType::Containment);
        let err = state.unknown_operation("launch_missiles");
        assert!(err.to_string().contains("UnknownOperation"));
        assert_eq!(err.kind(), ErrorKind::UnknownOperation);
    }
}
