// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Guardian worker: threat detection and assessment.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{configured_state, delegate_worker_state, timestamp};
use crate::domain::node_config::WorkerSettings;
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerError, WorkerHeartbeat, WorkerState, WorkerType};

const CAPABILITIES: &[&str] = &[
    "network_traffic_analysis",
    "behavioral_anomaly_detection",
    "threat_intelligence_correlation",
    "predictive_threat_modeling",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardianOperation {
    NetworkAnalysis,
    BehavioralAnalysis,
    ThreatAssessment,
}

impl GuardianOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "network_analysis" => Some(Self::NetworkAnalysis),
            "behavioral_analysis" => Some(Self::BehavioralAnalysis),
            "threat_assessment" => Some(Self::ThreatAssessment),
            _ => None,
        }
    }
}

pub struct GuardianWorker {
    state: WorkerState,
}

impl GuardianWorker {
    pub fn new(settings: &WorkerSettings) -> Self {
        Self {
            state: configured_state(WorkerType::Guardian, CAPABILITIES, settings),
        }
    }

    fn network_analysis(&self, task: &Task) -> Result<Value, WorkerError> {
        debug!(
            traffic_present = task.get("traffic_data").is_some(),
            "Analyzing network traffic"
        );
        Ok(json!({
            "timestamp": timestamp(),
            "analysis_type": "network_traffic",
            "findings": [],
            "confidence_score": 0.0,
        }))
    }

    fn behavioral_analysis(&self, _task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "timestamp": timestamp(),
            "analysis_type": "behavioral",
            "anomalies": [],
            "risk_score": 0.0,
        }))
    }

    fn threat_assessment(&self, _task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "timestamp": timestamp(),
            "analysis_type": "threat_assessment",
            "threat_level": "low",
            "confidence": 0.0,
            "recommendations": [],
        }))
    }
}

#[async_trait]
impl Worker for GuardianWorker {
    delegate_worker_state!();

    async fn initialize(&self) -> bool {
        if self.state.is_ready() {
            return true;
        }
        self.state.finish_initialize::<WorkerError>(Ok(()))
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        let operation = GuardianOperation::from_name(&task.task_type)
            .ok_or_else(|| self.state.unknown_operation(&task.task_type))?;

        match operation {
            GuardianOperation::NetworkAnalysis => self.network_analysis(task),
            GuardianOperation::BehavioralAnalysis => self.behavioral_analysis(task),
            GuardianOperation::ThreatAssessment => self.threat_assessment(task),
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }
}
