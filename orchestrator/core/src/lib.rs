// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # KRAKEN-FLUX Core
//!
//! Worker registry, task dispatch and five-step incident-response
//! coordination.
//!
//! # Architecture
//!
//! - **domain:** workers, tasks, envelopes, incidents, repository traits
//! - **application:** registry, dispatcher, coordinator, incident service
//! - **infrastructure:** built-in workers, artifact stores, repositories, event bus
//! - **presentation:** HTTP API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
