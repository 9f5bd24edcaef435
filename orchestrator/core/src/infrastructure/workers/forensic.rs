// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Forensic worker: evidence collection and chain-of-custody verification.
//!
//! Evidence records live in the `evidence` namespace of an [`ArtifactStore`],
//! one document per `evidence_id`:
//!
//! ```json
//! {"evidence_id": "...", "evidence_type": "...", "timestamp": "...",
//!  "hash": "<sha256 hex>", "data": {...}, "chain_of_custody": []}
//! ```
//!
//! The hash is computed over the serialized `data` value. serde_json emits
//! object keys in sorted order and is built with `float_roundtrip`, so a
//! record read back from disk re-serializes to the bytes that were hashed.

use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{configured_state, delegate_worker_state, timestamp};
use crate::domain::node_config::WorkerSettings;
use crate::domain::storage::{validate_key, ArtifactStore, StorageError};
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerError, WorkerHeartbeat, WorkerState, WorkerType};

const CAPABILITIES: &[&str] = &[
    "evidence_collection",
    "chain_of_custody",
    "memory_analysis",
    "timeline_reconstruction",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForensicOperation {
    CollectEvidence,
    VerifyChain,
    AnalyzeMemory,
}

impl ForensicOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "collect_evidence" => Some(Self::CollectEvidence),
            "verify_chain" => Some(Self::VerifyChain),
            "analyze_memory" => Some(Self::AnalyzeMemory),
            _ => None,
        }
    }
}

/// SHA-256 hex digest of a JSON value's serialized form.
pub fn evidence_hash(data: &Value) -> Result<String, WorkerError> {
    let bytes = serde_json::to_vec(data)
        .map_err(|e| WorkerError::Execution(format!("Failed to serialize evidence: {}", e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn storage_error(e: StorageError) -> WorkerError {
    match e {
        StorageError::InvalidKey(msg) => WorkerError::InvalidPayload(msg),
        other => WorkerError::Storage(other.to_string()),
    }
}

pub struct ForensicWorker {
    state: WorkerState,
    evidence: Arc<dyn ArtifactStore>,
}

impl ForensicWorker {
    pub fn new(evidence: Arc<dyn ArtifactStore>, settings: &WorkerSettings) -> Self {
        Self {
            state: configured_state(WorkerType::Forensic, CAPABILITIES, settings),
            evidence,
        }
    }

    fn evidence_id(task: &Task) -> Result<String, WorkerError> {
        let evidence_id = match task.get_str("evidence_id") {
            Some(id) => id.to_string(),
            None => format!("ev-{}", Uuid::new_v4().simple()),
        };
        validate_key(&evidence_id).map_err(storage_error)?;
        Ok(evidence_id)
    }

    async fn collect_evidence(&self, task: &Task) -> Result<Value, WorkerError> {
        let evidence_id = Self::evidence_id(task)?;
        let data = task.value_or_null("evidence_data");
        let hash = evidence_hash(&data)?;

        let record = json!({
            "evidence_id": evidence_id,
            "evidence_type": task.value_or_null("evidence_type"),
            "timestamp": timestamp(),
            "hash": hash,
            "data": data,
            "chain_of_custody": [],
        });
        self.evidence
            .put(&evidence_id, &record)
            .await
            .map_err(storage_error)?;

        info!(evidence_id = %evidence_id, hash = %hash, "Evidence collected");

        Ok(json!({
            "status": "collected",
            "evidence_id": evidence_id,
            "hash": hash,
            "timestamp": timestamp(),
        }))
    }

    async fn verify_chain(&self, task: &Task) -> Result<Value, WorkerError> {
        let evidence_id = task
            .get_str("evidence_id")
            .ok_or_else(|| WorkerError::InvalidPayload("'evidence_id' is required".to_string()))?;

        let record = self
            .evidence
            .get(evidence_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| WorkerError::Storage(format!("Evidence {} not found", evidence_id)))?;

        let recorded_hash = record.get("hash").and_then(Value::as_str).unwrap_or_default();
        let current_hash = evidence_hash(record.get("data").unwrap_or(&Value::Null))?;
        let status = if recorded_hash == current_hash {
            "verified"
        } else {
            warn!(evidence_id, "Evidence hash mismatch");
            "tampered"
        };

        Ok(json!({
            "status": status,
            "evidence_id": evidence_id,
            "hash": current_hash,
            "chain_of_custody": record.get("chain_of_custody").cloned().unwrap_or_else(|| json!([])),
            "verification_timestamp": timestamp(),
        }))
    }

    fn analyze_memory(&self, _task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "status": "analyzed",
            "timestamp": timestamp(),
            "findings": [],
            "artifacts": [],
        }))
    }
}

#[async_trait]
impl Worker for ForensicWorker {
    delegate_worker_state!();

    async fn initialize(&self) -> bool {
        if self.state.is_ready() {
            return true;
        }
        let prepared = self.evidence.prepare().await;
        self.state.finish_initialize(prepared)
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        let operation = ForensicOperation::from_name(&task.task_type)
            .ok_or_else(|| self.state.unknown_operation(&task.task_type))?;

        match operation {
            ForensicOperation::CollectEvidence => self.collect_evidence(task).await,
            ForensicOperation::VerifyChain => self.verify_chain(task).await,
            ForensicOperation::AnalyzeMemory => self.analyze_memory(task),
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }
}
