// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node server and client
//!
//! Handles:
//! - Wiring the node (storage, workers, dispatcher, HTTP API)
//! - Prometheus exporter
//! - Graceful shutdown
//! - Reaching a running node over HTTP

use std::time::Duration;

pub mod client;
pub mod server;

pub use client::NodeClient;
pub use server::serve;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub enum NodeStatus {
    Running { uptime_secs: Option<u64>, workers: usize },
    Stopped,
    Unhealthy { error: String },
}

/// Query `/health` on a node.
pub async fn check_node_status(host: &str, port: u16) -> NodeStatus {
    let client = match NodeClient::new(host, port) {
        Ok(client) => client.with_timeout(Duration::from_secs(2)),
        Err(e) => {
            return NodeStatus::Unhealthy {
                error: e.to_string(),
            }
        }
    };

    match client.health().await {
        Ok(health) => NodeStatus::Running {
            uptime_secs: health["uptime_seconds"].as_u64(),
            workers: health["workers"].as_u64().unwrap_or(0) as usize,
        },
        Err(e) if client::is_connect_error(&e) => NodeStatus::Stopped,
        Err(e) => NodeStatus::Unhealthy {
            error: e.to_string(),
        },
    }
}
