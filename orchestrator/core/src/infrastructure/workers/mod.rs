// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in Workers
//!
//! | Worker | Operations | Storage namespace |
//! |--------|------------|-------------------|
//! | [`GuardianWorker`] | `network_analysis`, `behavioral_analysis`, `threat_assessment` | - |
//! | [`SimulationWorker`] | `model_attack_path`, `simulate_response`, `analyze_impact` | - |
//! | [`ContainmentWorker`] | `contain_threat`, `isolate_system`, `coordinate_recovery` | - |
//! | [`ForensicWorker`] | `collect_evidence`, `verify_chain`, `analyze_memory` | `evidence` |
//! | [`ComplianceWorker`] | `generate_notification`, `monitor_compliance`, `prepare_documentation` | `documentation` |
//!
//! Each worker parses `task.type` into its own closed operation enum and
//! matches on it; anything else is `UnknownOperation`.

pub mod compliance;
pub mod containment;
pub mod forensic;
pub mod guardian;
pub mod simulation;

pub use compliance::ComplianceWorker;
pub use containment::ContainmentWorker;
pub use forensic::ForensicWorker;
pub use guardian::GuardianWorker;
pub use simulation::SimulationWorker;

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::node_config::{NodeConfigManifest, WorkerSettings};
use crate::domain::worker::{Worker, WorkerState, WorkerType};
use crate::infrastructure::storage::{ArtifactBackend, ArtifactStores};

/// Sync accessors every built-in worker delegates to its `state: WorkerState`.
macro_rules! delegate_worker_state {
    () => {
        fn id(&self) -> $crate::domain::worker::WorkerId {
            self.state.id()
        }

        fn worker_type(&self) -> $crate::domain::worker::WorkerType {
            self.state.worker_type()
        }

        fn status(&self) -> $crate::domain::worker::WorkerStatus {
            self.state.status()
        }

        fn capabilities(&self) -> Vec<String> {
            self.state.capabilities()
        }

        fn mark_failed(&self, reason: &str) {
            self.state.mark_failed(reason)
        }
    };
}

pub(crate) use delegate_worker_state;

/// Build a worker's state and expose its settings in heartbeat metadata.
pub(crate) fn configured_state(
    worker_type: WorkerType,
    capabilities: &[&str],
    settings: &WorkerSettings,
) -> WorkerState {
    let state = WorkerState::new(worker_type).with_capabilities(capabilities);
    state.update_metadata(
        "interval_secs",
        Value::from(settings.interval.as_secs()),
    );
    for (key, value) in &settings.options {
        state.update_metadata(key.clone(), value.clone());
    }
    state
}

pub(crate) fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

/// Construct one worker of the given type.
pub fn build_worker(
    worker_type: WorkerType,
    settings: &WorkerSettings,
    artifacts: &ArtifactStores,
) -> Arc<dyn Worker> {
    match worker_type {
        WorkerType::Guardian => Arc::new(GuardianWorker::new(settings)),
        WorkerType::Simulation => Arc::new(SimulationWorker::new(settings)),
        WorkerType::Containment => Arc::new(ContainmentWorker::new(settings)),
        WorkerType::Forensic => Arc::new(ForensicWorker::new(artifacts.evidence.clone(), settings)),
        WorkerType::Compliance => Arc::new(ComplianceWorker::new(
            artifacts.documentation.clone(),
            settings,
        )),
    }
}

/// All five workers with built-in settings.
pub fn default_workers(artifacts: &ArtifactStores) -> Vec<Arc<dyn Worker>> {
    WorkerType::ALL
        .into_iter()
        .map(|worker_type| build_worker(worker_type, &WorkerSettings::defaults_for(worker_type), artifacts))
        .collect()
}

/// The artifact stores selected by `storage.artifact_root`.
pub fn artifact_stores_from_config(config: &NodeConfigManifest) -> ArtifactStores {
    ArtifactStores::new(&ArtifactBackend::from_root(
        config.spec.storage.artifact_root.clone(),
    ))
}

/// The workers enabled in `config`, with their configured settings.
pub fn workers_from_config(config: &NodeConfigManifest, artifacts: &ArtifactStores) -> Vec<Arc<dyn Worker>> {
    config
        .spec
        .workers
        .iter()
        .filter(|(_, settings)| settings.enabled)
        .map(|(worker_type, settings)| build_worker(*worker_type, settings, artifacts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::worker::WorkerStatus;

    #[tokio::test]
    async fn test_default_workers_cover_every_type() {
        let workers = default_workers(&ArtifactStores::in_memory());
        let types: Vec<WorkerType> = workers.iter().map(|w| w.worker_type()).collect();
        assert_eq!(types, WorkerType::ALL.to_vec());

        for worker in &workers {
            assert_eq!(worker.status(), WorkerStatus::Initialized);
            assert_eq!(worker.capabilities().len(), 4);
            assert!(worker.initialize().await);
        }
    }

    #[tokio::test]
    async fn test_settings_surface_in_heartbeat() {
        let settings = WorkerSettings::defaults_for(WorkerType::Containment);
        let worker = build_worker(WorkerType::Containment, &settings, &ArtifactStores::in_memory());

        let heartbeat = worker.heartbeat().await;
        assert_eq!(heartbeat.metadata["interval_secs"], 15);
        assert_eq!(heartbeat.metadata["max_concurrent_actions"], 5);
    }

    #[tokio::test]
    async fn test_forensic_writes_to_shared_evidence_store() {
        let artifacts = ArtifactStores::in_memory();
        let settings = WorkerSettings::defaults_for(WorkerType::Forensic);
        let forensic = build_worker(WorkerType::Forensic, &settings, &artifacts);
        assert!(forensic.initialize().await);

        let collect = crate::domain::task::Task::new(WorkerType::Forensic, "collect_evidence")
            .with_field("evidence_id", "ev-shared");
        forensic.execute(&collect).await.unwrap();

        assert_eq!(artifacts.evidence.list().await.unwrap(), vec!["ev-shared"]);
    }

    #[test]
    fn test_disabled_workers_are_skipped() {
        let mut config = NodeConfigManifest::default();
        if let Some(settings) = config.spec.workers.get_mut(&WorkerType::Simulation) {
            settings.enabled = false;
        }
        config.spec.workers.remove(&WorkerType::Guardian);

        let types: Vec<WorkerType> = workers_from_config(&config, &ArtifactStores::in_memory())
            .iter()
            .map(|w| w.worker_type())
            .collect();
        assert_eq!(
            types,
            vec![WorkerType::Containment, WorkerType::Forensic, WorkerType::Compliance]
        );
    }
}
