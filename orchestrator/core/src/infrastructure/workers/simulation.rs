// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{configured_state, delegate_worker_state, timestamp};
use crate::domain::node_config::WorkerSettings;
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerError, WorkerHeartbeat, WorkerState, WorkerType};

const CAPABILITIES: &[&str] = &[
    "attack_path_modeling",
    "response_simulation",
    "threat_attribution",
    "impact_assessment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOperation {
    ModelAttackPath,
    SimulateResponse,
    AnalyzeImpact,
}

impl SimulationOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "model_attack_path" => Some(Self::ModelAttackPath),
            "simulate_response" => Some(Self::SimulateResponse),
            "analyze_impact" => Some(Self::AnalyzeImpact),
            _ => None,
        }
    }
}

/// Models attack paths and response strategies for an incident.
pub struct SimulationWorker {
    state: WorkerState,
}

impl SimulationWorker {
    pub fn new(settings: &WorkerSettings) -> Self {
        Self {
            state: configured_state(WorkerType::Simulation, CAPABILITIES, settings),
        }
    }

    fn model_attack_path(&self, task: &Task) -> Result<Value, WorkerError> {
        Ok(json!({
            "status": "modeled",
            "target_system": task.value_or_null("target_system"),
            "attack_type": task.value_or_null("attack_type"),
            "timestamp": timestamp(),
            "attack_paths": [],
            "probabilities": {},
        }))
    }

    fn simulate_response(&self, task: &Task) -> Result<Value, WorkerError> {
        let strategies = task.string_list("response_strategies")?;
        Ok(json!({
            "status": "simulated",
            "incident_type": task.value_or_null("incident_type"),
            "timestamp": timestamp(),
            "strategies_evaluated": strategies.len(),
            "strategy_results": [],
            "recommendations": [],
        }))
    }

    fn analyze_impact(&self, task: &Task) -> Result<Value, WorkerError> {
        let affected_systems = task.string_list("affected_systems")?;
        Ok(json!({
            "status": "analyzed",
            "threat_scenario": task.value_or_null("threat_scenario"),
            "affected_systems": affected_systems,
            "timestamp": timestamp(),
            "impact_areas": [],
            "risk_assessment": {},
            "mitigation_suggestions": [],
        }))
    }
}

#[async_trait]
impl Worker for SimulationWorker {
    delegate_worker_state!();

    async fn initialize(&self) -> bool {
        if self.state.is_ready() {
            return true;
        }
        self.state.finish_initialize::<WorkerError>(Ok(()))
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        let operation = SimulationOperation::from_name(&task.task_type)
            .ok_or_else(|| self.state.unknown_operation(&task.task_type))?;

        match operation {
            SimulationOperation::ModelAttackPath => self.model_attack_path(task),
            SimulationOperation::SimulateResponse => self.simulate_response(task),
            SimulationOperation::AnalyzeImpact => self.analyze_impact(task),
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }
}
