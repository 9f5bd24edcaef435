// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Raw task dispatch
//!
//! Commands: dispatch

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::{json, Map, Value};

use super::{parse_json_object, print_json};
use crate::daemon::NodeClient;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Send one task to a worker and print its result envelope
    Dispatch {
        /// Target worker type
        #[arg(value_name = "WORKER")]
        worker_type: String,

        /// Operation name (e.g. collect_evidence)
        #[arg(value_name = "OPERATION")]
        operation: String,

        /// Task fields as a JSON object (or @file.json)
        #[arg(short, long)]
        payload: Option<String>,
    },
}

pub async fn handle_command(command: TaskCommand, host: &str, port: u16) -> Result<()> {
    let client = NodeClient::new(host, port)?;

    match command {
        TaskCommand::Dispatch {
            worker_type,
            operation,
            payload,
        } => {
            let task = task_body(&worker_type, &operation, parse_json_object(payload.as_deref())?);
            let envelope = client.dispatch_task(&task).await?;

            let title = match envelope["status"].as_str() {
                Some("success") => format!("{} {}", "✓".green(), operation),
                _ => format!("{} {}", "✗".red(), operation),
            };
            print_json(&title, &envelope)
        }
    }
}

/// Routing keys win over same-named payload fields.
fn task_body(worker_type: &str, operation: &str, payload: Map<String, Value>) -> Value {
    let mut task = payload;
    task.insert("type".into(), json!(operation));
    task.insert("worker_type".into(), json!(worker_type));
    Value::Object(task)
}
