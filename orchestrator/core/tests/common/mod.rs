// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kraken_core::application::coordinator::Coordinator;
use kraken_core::application::dispatcher::Dispatcher;
use kraken_core::application::registry::WorkerRegistry;
use kraken_core::domain::response::CoordinationPolicy;
use kraken_core::domain::task::Task;
use kraken_core::domain::worker::{
    Worker, WorkerError, WorkerHeartbeat, WorkerId, WorkerState, WorkerStatus, WorkerType,
};
use kraken_core::infrastructure::event_bus::EventBus;
use kraken_core::infrastructure::storage::ArtifactStores;
use kraken_core::infrastructure::workers::default_workers;

/// What a [`ScriptedWorker`] does with every task it receives.
#[derive(Clone)]
pub enum Script {
    Succeed(Value),
    Fail(String),
    Sleep(Duration),
    Panic(&'static str),
}

pub struct ScriptedWorker {
    state: WorkerState,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedWorker {
    pub fn new(worker_type: WorkerType, script: Script) -> Arc<Self> {
        Arc::new(Self {
            state: WorkerState::new(worker_type).with_capabilities(&["scripted"]),
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.state.id()
    }

    fn worker_type(&self) -> WorkerType {
        self.state.worker_type()
    }

    fn status(&self) -> WorkerStatus {
        self.state.status()
    }

    fn capabilities(&self) -> Vec<String> {
        self.state.capabilities()
    }

    async fn initialize(&self) -> bool {
        self.state.finish_initialize::<String>(Ok(()))
    }

    async fn execute(&self, task: &Task) -> Result<Value, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Succeed(payload) => Ok(payload.clone()),
            Script::Fail(message) => Err(WorkerError::Execution(message.clone())),
            Script::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(json!({"task": task.task_type}))
            }
            Script::Panic(message) => panic!("{}", message),
        }
    }

    async fn cleanup(&self) -> bool {
        self.state.shutdown()
    }

    async fn heartbeat(&self) -> WorkerHeartbeat {
        self.state.heartbeat()
    }

    fn mark_failed(&self, reason: &str) {
        self.state.mark_failed(reason)
    }
}

pub struct Harness {
    pub event_bus: Arc<EventBus>,
    pub registry: Arc<WorkerRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub artifacts: ArtifactStores,
}

impl Harness {
    pub async fn with_workers(workers: Vec<Arc<dyn Worker>>, timeout: Duration) -> Self {
        Self::with_stores(workers, ArtifactStores::in_memory(), timeout).await
    }

    async fn with_stores(workers: Vec<Arc<dyn Worker>>, artifacts: ArtifactStores, timeout: Duration) -> Self {
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let registry = Arc::new(WorkerRegistry::new(event_bus.clone()));
        registry.initialize(workers).await;
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), event_bus.clone(), timeout));
        Self {
            event_bus,
            registry,
            dispatcher,
            artifacts,
        }
    }

    /// The five built-in workers, minus `skip`, on in-memory artifact stores.
    pub async fn builtin(skip: &[WorkerType]) -> Self {
        let artifacts = ArtifactStores::in_memory();
        let workers = default_workers(&artifacts)
            .into_iter()
            .filter(|w| !skip.contains(&w.worker_type()))
            .collect();
        Self::with_stores(workers, artifacts, Duration::from_secs(5)).await
    }

    pub fn coordinator(&self, policy: CoordinationPolicy) -> Coordinator {
        Coordinator::new(self.dispatcher.clone(), self.event_bus.clone(), policy)
    }
}
