// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Incident Response Record
//!
//! Aggregate produced by one run of the coordinator. It holds one
//! [`StepResult`] per workflow step, in step order, under a single incident
//! identifier.
//!
//! ## Steps
//!
//! | Step | Worker | Operation | Record key |
//! |------|--------|-----------|------------|
//! | `Assess` | guardian | `threat_assessment` | `threat_assessment` |
//! | `Model` | simulation | `model_attack_path` | `attack_model` |
//! | `Contain` | containment | `contain_threat` | `containment` |
//! | `CollectEvidence` | forensic | `collect_evidence` | `evidence` |
//! | `Document` | compliance | `prepare_documentation` | `documentation` |
//!
//! A record is append-only while `in_progress`. Once finalized (`completed`
//! or `aborted`) further appends are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::envelope::ResultEnvelope;
use crate::domain::incident::IncidentId;
use crate::domain::worker::WorkerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStep {
    Assess,
    Model,
    Contain,
    CollectEvidence,
    Document,
}

impl ResponseStep {
    pub const ORDER: [ResponseStep; 5] = [
        ResponseStep::Assess,
        ResponseStep::Model,
        ResponseStep::Contain,
        ResponseStep::CollectEvidence,
        ResponseStep::Document,
    ];

    pub fn worker_type(&self) -> WorkerType {
        match self {
            ResponseStep::Assess => WorkerType::Guardian,
            ResponseStep::Model => WorkerType::Simulation,
            ResponseStep::Contain => WorkerType::Containment,
            ResponseStep::CollectEvidence => WorkerType::Forensic,
            ResponseStep::Document => WorkerType::Compliance,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ResponseStep::Assess => "threat_assessment",
            ResponseStep::Model => "model_attack_path",
            ResponseStep::Contain => "contain_threat",
            ResponseStep::CollectEvidence => "collect_evidence",
            ResponseStep::Document => "prepare_documentation",
        }
    }

    pub fn record_key(&self) -> &'static str {
        match self {
            ResponseStep::Assess => "threat_assessment",
            ResponseStep::Model => "attack_model",
            ResponseStep::Contain => "containment",
            ResponseStep::CollectEvidence => "evidence",
            ResponseStep::Document => "documentation",
        }
    }

    fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ResponseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: ResponseStep,
    pub envelope: ResultEnvelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Aborted,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::InProgress => "in_progress",
            ResponseStatus::Completed => "completed",
            ResponseStatus::Aborted => "aborted",
        }
    }
}

/// What the coordinator does after a step produces an error envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationPolicy {
    /// Run every step; failures are recorded and the run still completes.
    #[default]
    BestEffort,
    /// Abort the run at the first error envelope.
    FailFast,
}

impl FromStr for CoordinationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(CoordinationPolicy::BestEffort),
            "fail_fast" => Ok(CoordinationPolicy::FailFast),
            other => Err(format!("Unknown coordination policy: {}", other)),
        }
    }
}

impl fmt::Display for CoordinationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinationPolicy::BestEffort => f.write_str("best_effort"),
            CoordinationPolicy::FailFast => f.write_str("fail_fast"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseRecordError {
    #[error("Response record for incident {0} is already finalized")]
    Finalized(IncidentId),

    #[error("Step {got} is out of order, expected {expected}")]
    OutOfOrder {
        expected: String,
        got: ResponseStep,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentResponseRecord {
    pub incident_id: IncidentId,
    pub status: ResponseStatus,
    pub policy: CoordinationPolicy,
    pub steps: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl IncidentResponseRecord {
    pub fn new(incident_id: IncidentId, policy: CoordinationPolicy) -> Self {
        Self {
            incident_id,
            status: ResponseStatus::InProgress,
            policy,
            steps: Vec::with_capacity(ResponseStep::ORDER.len()),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.status != ResponseStatus::InProgress
    }

    /// The step the record expects next, or `None` when all five are present.
    pub fn next_step(&self) -> Option<ResponseStep> {
        ResponseStep::ORDER.get(self.steps.len()).copied()
    }

    pub fn append(
        &mut self,
        step: ResponseStep,
        envelope: ResultEnvelope,
    ) -> Result<(), ResponseRecordError> {
        if self.is_finalized() {
            return Err(ResponseRecordError::Finalized(self.incident_id));
        }
        match self.next_step() {
            Some(expected) if expected == step => {
                self.steps.push(StepResult { step, envelope });
                Ok(())
            }
            expected => Err(ResponseRecordError::OutOfOrder {
                expected: expected
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "no further steps".to_string()),
                got: step,
            }),
        }
    }

    pub fn complete(&mut self) {
        self.finalize(ResponseStatus::Completed);
    }

    pub fn abort(&mut self) {
        self.finalize(ResponseStatus::Aborted);
    }

    fn finalize(&mut self, status: ResponseStatus) {
        if !self.is_finalized() {
            self.status = status;
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn envelope(&self, step: ResponseStep) -> Option<&ResultEnvelope> {
        self.steps
            .get(step.position())
            .filter(|result| result.step == step)
            .map(|result| &result.envelope)
    }

    pub fn failed_steps(&self) -> Vec<ResponseStep> {
        self.steps
            .iter()
            .filter(|result| !result.envelope.is_success())
            .map(|result| result.step)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ErrorKind;
    use serde_json::json;

    fn ok(step: ResponseStep) -> ResultEnvelope {
        ResultEnvelope::success(step.worker_type(), step.operation(), json!({}))
    }

    #[test]
    fn test_step_table() {
        assert_eq!(ResponseStep::Contain.worker_type(), WorkerType::Containment);
        assert_eq!(ResponseStep::Model.record_key(), "attack_model");
        assert_eq!(ResponseStep::Document.operation(), "prepare_documentation");
    }

    #[test]
    fn test_append_in_order_then_complete() {
        let mut record = IncidentResponseRecord::new(IncidentId::new(), CoordinationPolicy::BestEffort);
        for step in ResponseStep::ORDER {
            record.append(step, ok(step)).unwrap();
        }
        assert_eq!(record.next_step(), None);

        record.complete();
        assert_eq!(record.status, ResponseStatus::Completed);
        assert!(record.completed_at.is_some());
        assert!(record.envelope(ResponseStep::CollectEvidence).is_some());
    }

    #[test]
    fn test_out_of_order_append_is_rejected() {
        let mut record = IncidentResponseRecord::new(IncidentId::new(), CoordinationPolicy::BestEffort);
        let err = record
            .append(ResponseStep::Contain, ok(ResponseStep::Contain))
            .unwrap_err();
        assert!(matches!(err, ResponseRecordError::OutOfOrder { .. }));
        assert!(record.steps.is_empty());
    }

    #[test]
    fn test_finalized_record_rejects_appends() {
        let mut record = IncidentResponseRecord::new(IncidentId::new(), CoordinationPolicy::FailFast);
        record
            .append(
                ResponseStep::Assess,
                ResultEnvelope::failure(
                    WorkerType::Guardian,
                    "threat_assessment",
                    ErrorKind::Execution,
                    "boom",
                ),
            )
            .unwrap();
        record.abort();

        let err = record
            .append(ResponseStep::Model, ok(ResponseStep::Model))
            .unwrap_err();
        assert_eq!(err, ResponseRecordError::Finalized(record.incident_id));
        assert_eq!(record.failed_steps(), vec![ResponseStep::Assess]);

        // Finalizing twice keeps the first terminal state.
        record.complete();
        assert_eq!(record.status, ResponseStatus::Aborted);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("fail-fast".parse::<CoordinationPolicy>().unwrap(), CoordinationPolicy::FailFast);
        assert_eq!("best_effort".parse::<CoordinationPolicy>().unwrap(), CoordinationPolicy::BestEffort);
        assert!("yolo".parse::<CoordinationPolicy>().is_err());
    }
}
