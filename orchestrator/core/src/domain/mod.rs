// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types and traits: workers and tasks, result envelopes, incidents and
//! their response records, repository and artifact-store seams, node config.

pub mod action;
pub mod envelope;
pub mod events;
pub mod incident;
pub mod node_config;
pub mod repository;
pub mod response;
pub mod storage;
pub mod task;
pub mod worker;
