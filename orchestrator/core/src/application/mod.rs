// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod coordinator;
pub mod dispatcher;
pub mod incident_service;
pub mod registry;
pub mod repository_factory;

// Re-export use cases for convenience
pub use coordinator::Coordinator;
pub use dispatcher::{DispatchError, Dispatcher};
pub use incident_service::{IncidentService, IncidentServiceError, StandardIncidentService};
pub use registry::{RegistryError, WorkerRegistry};
pub use repository_factory::Repositories;
