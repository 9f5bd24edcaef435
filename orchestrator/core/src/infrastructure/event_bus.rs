// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming on tokio broadcast channels. Events are not
// persisted; a subscriber that falls behind the channel capacity loses the
// oldest events.

use crate::domain::events::{DispatchEvent, IncidentEvent, WorkerLifecycleEvent};
use crate::domain::incident::IncidentId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    WorkerLifecycle(WorkerLifecycleEvent),
    Dispatch(DispatchEvent),
    Incident(IncidentEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_worker_event(&self, event: WorkerLifecycleEvent) {
        self.publish(DomainEvent::WorkerLifecycle(event));
    }

    pub fn publish_dispatch_event(&self, event: DispatchEvent) {
        self.publish(DomainEvent::Dispatch(event));
    }

    pub fn publish_incident_event(&self, event: IncidentEvent) {
        self.publish(DomainEvent::Incident(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        let receiver = self.sender.subscribe();
        EventReceiver { receiver }
    }

    /// Subscribe to the incident events of a single incident
    pub fn subscribe_incident(&self, incident_id: IncidentId) -> IncidentEventReceiver {
        let receiver = self.sender.subscribe();
        IncidentEventReceiver {
            receiver,
            incident_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until an event is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for incident-specific events (filtered)
pub struct IncidentEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    incident_id: IncidentId,
}

impl IncidentEventReceiver {
    pub async fn recv(&mut self) -> Result<IncidentEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let DomainEvent::Incident(incident_event) = event {
                if incident_id_of(&incident_event) == self.incident_id {
                    return Ok(incident_event);
                }
            }
        }
    }
}

fn incident_id_of(event: &IncidentEvent) -> IncidentId {
    match event {
        IncidentEvent::IncidentDetected { incident_id, .. }
        | IncidentEvent::ResponseStepCompleted { incident_id, .. }
        | IncidentEvent::ResponseFinished { incident_id, .. }
        | IncidentEvent::IncidentStatusChanged { incident_id, .. }
        | IncidentEvent::ActionRecorded { incident_id, .. } => *incident_id,
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incident::{IncidentStatus, Severity};
    use crate::domain::worker::{WorkerId, WorkerType};
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let worker_id = WorkerId::new();
        event_bus.publish_worker_event(WorkerLifecycleEvent::WorkerRegistered {
            worker_id,
            worker_type: WorkerType::Guardian,
            registered_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            DomainEvent::WorkerLifecycle(WorkerLifecycleEvent::WorkerRegistered { worker_id: id, .. }) => {
                assert_eq!(id, worker_id);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_incident_event_filtering() {
        let event_bus = EventBus::new(10);
        let incident_id = IncidentId::new();
        let other_incident_id = IncidentId::new();

        let mut receiver = event_bus.subscribe_incident(incident_id);

        event_bus.publish_incident_event(IncidentEvent::IncidentDetected {
            incident_id: other_incident_id,
            incident_type: "phishing".to_string(),
            severity: Severity::Low,
            detected_at: Utc::now(),
        });
        event_bus.publish_incident_event(IncidentEvent::IncidentStatusChanged {
            incident_id,
            status: IncidentStatus::Contained,
            changed_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            IncidentEvent::IncidentStatusChanged { incident_id: id, status, .. } => {
                assert_eq!(id, incident_id);
                assert_eq!(status, IncidentStatus::Contained);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_dispatch_event(DispatchEvent::TaskDispatched {
            worker_type: WorkerType::Forensic,
            task_type: "collect_evidence".to_string(),
            dispatched_at: Utc::now(),
        });

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }
}
