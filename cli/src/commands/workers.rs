// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node and worker status

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use crate::daemon::{check_node_status, NodeClient, NodeStatus};

pub async fn handle_command(host: &str, port: u16) -> Result<()> {
    match check_node_status(host, port).await {
        NodeStatus::Running {
            uptime_secs,
            workers,
        } => {
            println!(
                "{} {}:{} ({} workers, up {}s)",
                "● Node running".green(),
                host,
                port,
                workers,
                uptime_secs.unwrap_or(0)
            );
        }
        NodeStatus::Stopped => {
            println!("{} {}:{}", "○ Node not reachable".yellow(), host, port);
            return Ok(());
        }
        NodeStatus::Unhealthy { error } => {
            anyhow::bail!("Node unhealthy: {}", error);
        }
    }

    let client = NodeClient::new(host, port)?;
    let listing = client.list_workers().await?;
    print_workers(&listing);
    Ok(())
}

fn print_workers(listing: &Value) {
    let Some(workers) = listing["workers"].as_array() else {
        return;
    };

    for worker in workers {
        let status = worker["status"].as_str().unwrap_or("unknown");
        let badge = match status {
            "ready" => status.green(),
            "initializing" => status.yellow(),
            _ => status.red(),
        };
        println!(
            "  {:<12} {:<14} {}",
            worker["worker_type"].as_str().unwrap_or("?"),
            badge,
            worker["worker_id"].as_str().unwrap_or("").dimmed()
        );
    }
}
