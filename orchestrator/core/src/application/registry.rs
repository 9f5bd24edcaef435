// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Worker Registry
//!
//! Owns the live worker set: at most one [`Worker`] per [`WorkerType`].
//!
//! The set sits behind a single `parking_lot::RwLock`. Registration and
//! eviction take the write lock, lookups take the read lock, and no lock is
//! held across an `.await`: async sweeps (`heartbeat_all`, `shutdown`) work
//! on a cloned snapshot of the `Arc`s.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::events::WorkerLifecycleEvent;
use crate::domain::worker::{Worker, WorkerHeartbeat, WorkerId, WorkerStatus, WorkerType};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("AlreadyRegistered: a {0} worker is already registered")]
    AlreadyRegistered(WorkerType),

    #[error("NotFound: no {0} worker is registered")]
    NotFound(WorkerType),

    #[error("Worker type mismatch: registering a {actual} worker under {expected}")]
    TypeMismatch {
        expected: WorkerType,
        actual: WorkerType,
    },
}

pub struct WorkerRegistry {
    workers: RwLock<BTreeMap<WorkerType, Arc<dyn Worker>>>,
    event_bus: Arc<EventBus>,
}

impl WorkerRegistry {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            workers: RwLock::new(BTreeMap::new()),
            event_bus,
        }
    }

    /// Initialize each worker and register the ones that come up `ready`.
    ///
    /// Failures are logged and skipped. Returns the number of workers registered.
    pub async fn initialize(&self, workers: Vec<Arc<dyn Worker>>) -> usize {
        let mut registered = 0;

        for worker in workers {
            let worker_type = worker.worker_type();

            if !worker.initialize().await || worker.status() != WorkerStatus::Ready {
                error!(worker_type = %worker_type, worker_id = %worker.id(), "Worker failed to initialize, not registering");
                self.event_bus
                    .publish_worker_event(WorkerLifecycleEvent::WorkerInitializationFailed {
                        worker_id: worker.id(),
                        worker_type,
                        failed_at: Utc::now(),
                    });
                continue;
            }

            match self.register(worker_type, worker) {
                Ok(()) => registered += 1,
                Err(e) => warn!("Skipping worker during initialization: {}", e),
            }
        }

        info!(registered, "Worker registry initialized");
        registered
    }

    pub fn register(&self, worker_type: WorkerType, worker: Arc<dyn Worker>) -> Result<(), RegistryError> {
        if worker.worker_type() != worker_type {
            return Err(RegistryError::TypeMismatch {
                expected: worker_type,
                actual: worker.worker_type(),
            });
        }

        let worker_id = worker.id();
        {
            let mut workers = self.workers.write();
            if workers.contains_key(&worker_type) {
                return Err(RegistryError::AlreadyRegistered(worker_type));
            }
            workers.insert(worker_type, worker);
        }

        info!(worker_type = %worker_type, worker_id = %worker_id, "Worker registered");
        self.event_bus
            .publish_worker_event(WorkerLifecycleEvent::WorkerRegistered {
                worker_id,
                worker_type,
                registered_at: Utc::now(),
            });
        Ok(())
    }

    /// Remove the worker of the given type and hand it back to the caller.
    pub fn unregister(&self, worker_type: WorkerType) -> Result<Arc<dyn Worker>, RegistryError> {
        let worker = self
            .workers
            .write()
            .remove(&worker_type)
            .ok_or(RegistryError::NotFound(worker_type))?;

        info!(worker_type = %worker_type, worker_id = %worker.id(), "Worker unregistered");
        self.event_bus
            .publish_worker_event(WorkerLifecycleEvent::WorkerUnregistered {
                worker_id: worker.id(),
                worker_type,
                unregistered_at: Utc::now(),
            });
        Ok(worker)
    }

    pub fn resolve(&self, worker_type: WorkerType) -> Result<Arc<dyn Worker>, RegistryError> {
        self.workers
            .read()
            .get(&worker_type)
            .cloned()
            .ok_or(RegistryError::NotFound(worker_type))
    }

    pub fn contains(&self, worker_type: WorkerType) -> bool {
        self.workers.read().contains_key(&worker_type)
    }

    /// Snapshot of the registered workers, ordered by type.
    pub fn all(&self) -> Vec<Arc<dyn Worker>> {
        self.workers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    pub async fn heartbeat_all(&self) -> Vec<WorkerHeartbeat> {
        let workers = self.all();
        let mut heartbeats = Vec::with_capacity(workers.len());
        for worker in workers {
            heartbeats.push(worker.heartbeat().await);
        }
        heartbeats
    }

    /// Mark a worker failed and drop it from the active set.
    ///
    /// The entry is only removed if it still belongs to `worker_id`; a
    /// replacement registered in the meantime is left alone. Returns whether
    /// an entry was removed.
    pub fn evict(&self, worker_type: WorkerType, worker_id: WorkerId, reason: &str) -> bool {
        let evicted = {
            let mut workers = self.workers.write();
            match workers.get(&worker_type) {
                Some(current) if current.id() == worker_id => workers.remove(&worker_type),
                _ => None,
            }
        };

        match evicted {
            Some(worker) => {
                worker.mark_failed(reason);
                warn!(worker_type = %worker_type, worker_id = %worker_id, "Worker evicted: {}", reason);
                self.event_bus
                    .publish_worker_event(WorkerLifecycleEvent::WorkerEvicted {
                        worker_id,
                        worker_type,
                        reason: reason.to_string(),
                        evicted_at: Utc::now(),
                    });
                true
            }
            None => false,
        }
    }

    /// Clean up every worker and empty the set.
    pub async fn shutdown(&self) {
        let workers: Vec<Arc<dyn Worker>> = {
            let mut guard = self.workers.write();
            std::mem::take(&mut *guard).into_values().collect()
        };

        for worker in workers {
            let worker_type = worker.worker_type();
            if !worker.cleanup().await {
                warn!(worker_type = %worker_type, "Worker cleanup reported failure");
            }
            self.event_bus
                .publish_worker_event(WorkerLifecycleEvent::WorkerShutdown {
                    worker_id: worker.id(),
                    worker_type,
                    shutdown_at: Utc::now(),
                });
        }

        info!("Worker registry shut down");
    }
}
