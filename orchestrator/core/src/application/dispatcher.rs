// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task Dispatcher
//!
//! Routes a [`Task`] to the registered worker for its `worker_type` and wraps
//! whatever happens into exactly one [`ResultEnvelope`].
//!
//! | Outcome of `execute` | Envelope |
//! |----------------------|----------|
//! | `Ok(payload)` | `success` |
//! | `Err(WorkerError)` | `error`, kind from the error |
//! | exceeded `worker_timeout` | `error`, kind `timeout` |
//! | panic | `error`, kind `worker_fault`; worker evicted |
//!
//! Only an unresolvable worker is an `Err` ([`DispatchError::WorkerUnavailable`]);
//! in that case the worker is never invoked.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::registry::WorkerRegistry;
use crate::domain::envelope::{ErrorKind, ResultEnvelope};
use crate::domain::events::DispatchEvent;
use crate::domain::task::Task;
use crate::domain::worker::{Worker, WorkerStatus, WorkerType};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("WorkerUnavailable: {worker_type} ({reason})")]
    WorkerUnavailable { worker_type: String, reason: String },
}

pub struct Dispatcher {
    registry: Arc<WorkerRegistry>,
    event_bus: Arc<EventBus>,
    worker_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<WorkerRegistry>, event_bus: Arc<EventBus>, worker_timeout: Duration) -> Self {
        Self {
            registry,
            event_bus,
            worker_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn worker_timeout(&self) -> Duration {
        self.worker_timeout
    }

    pub async fn dispatch(&self, task: &Task) -> Result<ResultEnvelope, DispatchError> {
        let worker = self.resolve_ready(task)?;
        let worker_type = worker.worker_type();

        debug!(worker_type = %worker_type, task_type = %task.task_type, "Dispatching task");
        self.event_bus
            .publish_dispatch_event(DispatchEvent::TaskDispatched {
                worker_type,
                task_type: task.task_type.clone(),
                dispatched_at: Utc::now(),
            });

        let started = Instant::now();
        let invocation = AssertUnwindSafe(worker.execute(task)).catch_unwind();
        let envelope = match tokio::time::timeout(self.worker_timeout, invocation).await {
            Ok(Ok(Ok(payload))) => ResultEnvelope::success(worker_type, &task.task_type, payload),
            Ok(Ok(Err(e))) => {
                warn!(worker_type = %worker_type, task_type = %task.task_type, "Task failed: {}", e);
                ResultEnvelope::failure(worker_type, &task.task_type, e.kind(), e.to_string())
            }
            Ok(Err(panic)) => {
                let reason = format!(
                    "WorkerFault: {} worker panicked handling '{}': {}",
                    worker_type,
                    task.task_type,
                    panic_message(panic.as_ref())
                );
                self.fault(&worker, &reason);
                ResultEnvelope::failure(worker_type, &task.task_type, ErrorKind::WorkerFault, reason)
            }
            Err(_elapsed) => {
                let message = format!(
                    "Timeout: {} worker did not finish '{}' within {:?}",
                    worker_type, task.task_type, self.worker_timeout
                );
                warn!(worker_type = %worker_type, task_type = %task.task_type, "{}", message);
                ResultEnvelope::failure(worker_type, &task.task_type, ErrorKind::Timeout, message)
            }
        };
        let elapsed = started.elapsed();

        self.record(&envelope, elapsed);
        Ok(envelope)
    }

    fn resolve_ready(&self, task: &Task) -> Result<Arc<dyn Worker>, DispatchError> {
        let resolved = task
            .worker_type
            .parse::<WorkerType>()
            .map_err(|e| e.to_string())
            .and_then(|worker_type| self.registry.resolve(worker_type).map_err(|e| e.to_string()))
            .and_then(|worker| match worker.status() {
                WorkerStatus::Ready => Ok(worker),
                status => Err(format!("worker is {}", status)),
            });

        resolved.map_err(|reason| {
            warn!(worker_type = %task.worker_type, task_type = %task.task_type, "Rejecting task: {}", reason);
            metrics::counter!(
                "kraken_tasks_dispatched_total",
                "worker_type" => task.worker_type.clone(),
                "status" => "unavailable"
            )
            .increment(1);
            self.event_bus
                .publish_dispatch_event(DispatchEvent::TaskRejected {
                    worker_type: task.worker_type.clone(),
                    task_type: task.task_type.clone(),
                    reason: reason.clone(),
                    rejected_at: Utc::now(),
                });
            DispatchError::WorkerUnavailable {
                worker_type: task.worker_type.clone(),
                reason,
            }
        })
    }

    fn fault(&self, worker: &Arc<dyn Worker>, reason: &str) {
        if !self.registry.evict(worker.worker_type(), worker.id(), reason) {
            // Already replaced or unregistered; still record the fault on the instance.
            worker.mark_failed(reason);
        }
    }

    fn record(&self, envelope: &ResultEnvelope, elapsed: Duration) {
        let worker_type = envelope.worker_type().as_str();
        let status = envelope.status().to_string();

        metrics::counter!(
            "kraken_tasks_dispatched_total",
            "worker_type" => worker_type,
            "status" => status.clone()
        )
        .increment(1);
        metrics::histogram!("kraken_task_duration_seconds", "worker_type" => worker_type)
            .record(elapsed.as_secs_f64());

        info!(
            worker_type,
            task_type = envelope.task_type(),
            status = %status,
            duration_ms = elapsed.as_millis() as u64,
            "Executed task"
        );

        self.event_bus
            .publish_dispatch_event(DispatchEvent::TaskCompleted {
                worker_type: envelope.worker_type(),
                task_type: envelope.task_type().to_string(),
                status: envelope.status(),
                error_kind: envelope.error_kind(),
                duration_ms: elapsed.as_millis() as u64,
                completed_at: Utc::now(),
            });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
