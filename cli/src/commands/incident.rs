// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Incident commands
//!
//! Commands: create, get, list, update, action

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::{json, Map, Value};

use super::{parse_json_object, print_json};
use crate::daemon::client::{IncidentQuery, NodeClient};

#[derive(Subcommand)]
pub enum IncidentCommand {
    /// Report an incident and run the coordinated response
    Create {
        /// Incident type (e.g. ransomware, data_exfiltration)
        #[arg(long = "type", value_name = "TYPE")]
        incident_type: String,

        /// Severity (low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        severity: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        source_ip: Option<String>,

        /// Affected systems, comma separated
        #[arg(long = "targets", value_delimiter = ',')]
        target_systems: Vec<String>,

        /// Extra details as a JSON object (or @file.json)
        #[arg(long)]
        details: Option<String>,
    },

    /// Show an incident, its response record and actions
    Get {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// List incidents
    List {
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        severity: Option<String>,

        /// RFC3339 lower bound on creation time
        #[arg(long)]
        since: Option<String>,

        /// RFC3339 upper bound on creation time
        #[arg(long)]
        until: Option<String>,
    },

    /// Update incident fields
    Update {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        severity: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        containment_status: Option<String>,

        #[arg(long)]
        resolution_status: Option<String>,
    },

    /// Record and dispatch a manual action against an incident
    Action {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,

        /// Target worker (guardian, simulation, containment, forensic, compliance)
        #[arg(short, long)]
        worker: String,

        /// Operation to run (e.g. isolate_system)
        #[arg(long = "type", value_name = "TYPE")]
        action_type: String,

        /// Parameters as a JSON object (or @file.json)
        #[arg(short, long)]
        params: Option<String>,
    },
}

pub async fn handle_command(command: IncidentCommand, host: &str, port: u16) -> Result<()> {
    let client = NodeClient::new(host, port)?;

    match command {
        IncidentCommand::Create {
            incident_type,
            severity,
            description,
            source_ip,
            target_systems,
            details,
        } => {
            let mut request = Map::new();
            request.insert("type".into(), json!(incident_type));
            request.insert("severity".into(), json!(severity));
            if let Some(description) = description {
                request.insert("description".into(), json!(description));
            }
            if let Some(source_ip) = source_ip {
                request.insert("source_ip".into(), json!(source_ip));
            }
            request.insert("target_systems".into(), json!(target_systems));
            // Unknown top-level keys land in the incident's details
            for (key, value) in parse_json_object(details.as_deref())? {
                request.entry(key).or_insert(value);
            }

            let created = client.create_incident(&Value::Object(request)).await?;
            print_created(&created);
            Ok(())
        }
        IncidentCommand::Get { id } => {
            let details = client.get_incident(&id).await?;
            print_json(&format!("Incident {}", id), &details)
        }
        IncidentCommand::List {
            status,
            severity,
            since,
            until,
        } => {
            let query = IncidentQuery {
                status,
                severity,
                since,
                until,
            };
            let incidents = client.list_incidents(&query).await?;
            print_incident_table(&incidents);
            Ok(())
        }
        IncidentCommand::Update {
            id,
            status,
            severity,
            description,
            containment_status,
            resolution_status,
        } => {
            let update = update_body(&[
                ("status", status),
                ("severity", severity),
                ("description", description),
                ("containment_status", containment_status),
                ("resolution_status", resolution_status),
            ]);
            if update.is_empty() {
                anyhow::bail!("Nothing to update; pass at least one field flag");
            }

            let updated = client.update_incident(&id, &Value::Object(update)).await?;
            println!(
                "{} {}",
                "✓ Updated".green(),
                updated["updated_fields"]
            );
            Ok(())
        }
        IncidentCommand::Action {
            id,
            worker,
            action_type,
            params,
        } => {
            let action = json!({
                "type": action_type,
                "worker_type": worker,
                "parameters": parse_json_object(params.as_deref())?,
            });
            let recorded = client.add_action(&id, &action).await?;
            print_json("Action recorded", &recorded)
        }
    }
}

fn update_body(fields: &[(&str, Option<String>)]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), json!(v))))
        .collect()
}

fn print_created(created: &Value) {
    let incident = &created["incident"];
    let response = &created["response"];

    println!(
        "{} {} ({})",
        "Incident".bold(),
        incident["id"].as_str().unwrap_or("?"),
        incident["status"].as_str().unwrap_or("?")
    );

    if let Some(steps) = response["steps"].as_array() {
        for step in steps {
            let name = step["step"].as_str().unwrap_or("?");
            let envelope = &step["envelope"];
            let outcome = match envelope["status"].as_str() {
                Some("success") => "success".green(),
                Some(other) => format!(
                    "{} ({})",
                    other,
                    envelope["error_kind"].as_str().unwrap_or("unknown")
                )
                .red(),
                None => "missing".dimmed(),
            };
            println!("  {:<20} {}", name, outcome);
        }
    }

    println!(
        "{} {}",
        "Response".bold(),
        response["status"].as_str().unwrap_or("?")
    );
}

fn print_incident_table(incidents: &Value) {
    let Some(rows) = incidents.as_array() else {
        return;
    };
    if rows.is_empty() {
        println!("{}", "No incidents".dimmed());
        return;
    }

    println!(
        "{:<38} {:<22} {:<10} {:<12} {}",
        "ID".bold(),
        "TYPE".bold(),
        "SEVERITY".bold(),
        "STATUS".bold(),
        "CREATED".bold()
    );
    for row in rows {
        println!(
            "{:<38} {:<22} {:<10} {:<12} {}",
            row["id"].as_str().unwrap_or("?"),
            row["incident_type"].as_str().unwrap_or("?"),
            row["severity"].as_str().unwrap_or("?"),
            row["status"].as_str().unwrap_or("?"),
            row["created_at"].as_str().unwrap_or("?")
        );
    }
}
