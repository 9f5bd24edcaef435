// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Five-step incident response against real and scripted workers.

mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::{Harness, Script, ScriptedWorker};
use kraken_core::domain::envelope::{EnvelopeStatus, ErrorKind};
use kraken_core::domain::incident::{Incident, Severity};
use kraken_core::domain::response::{CoordinationPolicy, ResponseStatus, ResponseStep};
use kraken_core::domain::worker::{Worker, WorkerType};

fn incident() -> Incident {
    let mut incident = Incident::new("ransomware", Severity::Critical);
    incident.target_systems = vec!["db-01".to_string(), "web-02".to_string()];
    incident
}

fn statuses(record: &kraken_core::domain::response::IncidentResponseRecord) -> Vec<EnvelopeStatus> {
    record.steps.iter().map(|s| s.envelope.status()).collect()
}

#[tokio::test]
async fn test_all_steps_succeed_in_order() {
    let harness = Harness::builtin(&[]).await;
    let record = harness
        .coordinator(CoordinationPolicy::BestEffort)
        .respond(&incident())
        .await
        .unwrap();

    assert_eq!(record.status, ResponseStatus::Completed);
    assert!(record.completed_at.is_some());
    assert_eq!(
        record.steps.iter().map(|s| s.step).collect::<Vec<_>>(),
        ResponseStep::ORDER.to_vec()
    );
    assert_eq!(statuses(&record), vec![EnvelopeStatus::Success; 5]);

    let modeled = record.envelope(ResponseStep::Model).unwrap().payload().unwrap();
    assert_eq!(modeled["target_system"], "db-01");
    assert_eq!(modeled["attack_type"], "ransomware");

    let contained = record.envelope(ResponseStep::Contain).unwrap().payload().unwrap();
    assert_eq!(contained["containment_level"], "low");
    assert_eq!(contained["affected_systems"], json!(["db-01", "web-02"]));

    let collected = record.envelope(ResponseStep::CollectEvidence).unwrap().payload().unwrap();
    assert_eq!(collected["status"], "collected");
}

#[tokio::test]
async fn test_failed_containment_keeps_going() {
    let harness = Harness::builtin(&[WorkerType::Containment]).await;
    let failing = ScriptedWorker::new(WorkerType::Containment, Script::Fail("firewall API rejected rule".into()));
    failing.initialize().await;
    harness
        .registry
        .register(WorkerType::Containment, failing as Arc<dyn Worker>)
        .unwrap();

    let record = harness
        .coordinator(CoordinationPolicy::BestEffort)
        .respond(&incident())
        .await
        .unwrap();

    assert_eq!(record.status, ResponseStatus::Completed);
    assert_eq!(
        statuses(&record),
        vec![
            EnvelopeStatus::Success,
            EnvelopeStatus::Success,
            EnvelopeStatus::Error,
            EnvelopeStatus::Success,
            EnvelopeStatus::Success,
        ]
    );
    assert_eq!(record.failed_steps(), vec![ResponseStep::Contain]);

    let evidence_input = record.envelope(ResponseStep::CollectEvidence).unwrap();
    assert!(evidence_input.is_success());
}

#[tokio::test]
async fn test_missing_worker_is_recorded_as_unavailable() {
    let harness = Harness::builtin(&[WorkerType::Simulation]).await;
    let record = harness
        .coordinator(CoordinationPolicy::BestEffort)
        .respond(&incident())
        .await
        .unwrap();

    assert_eq!(record.steps.len(), 5);
    let model = record.envelope(ResponseStep::Model).unwrap();
    assert_eq!(model.error_kind(), Some(ErrorKind::WorkerUnavailable));
    assert_eq!(model.task_type(), "model_attack_path");
}

#[tokio::test]
async fn test_fail_fast_aborts_after_failing_step() {
    let slow = ScriptedWorker::new(WorkerType::Simulation, Script::Sleep(Duration::from_secs(5)));
    let mut workers: Vec<Arc<dyn Worker>> = kraken_core::infrastructure::workers::default_workers(
        &kraken_core::infrastructure::storage::ArtifactStores::in_memory(),
    )
    .into_iter()
    .filter(|w| w.worker_type() != WorkerType::Simulation)
    .collect();
    workers.push(slow);
    let harness = Harness::with_workers(workers, Duration::from_millis(50)).await;

    let record = harness
        .coordinator(CoordinationPolicy::FailFast)
        .respond(&incident())
        .await
        .unwrap();

    assert_eq!(record.status, ResponseStatus::Aborted);
    assert_eq!(record.steps.len(), 2);
    assert_eq!(
        record.envelope(ResponseStep::Model).unwrap().error_kind(),
        Some(ErrorKind::Timeout)
    );
    assert!(record.envelope(ResponseStep::Contain).is_none());
}
