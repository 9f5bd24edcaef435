// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Evidence commands
//!
//! Commands: list, get

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use super::print_json;
use crate::daemon::client::{EvidenceQuery, NodeClient};

#[derive(Subcommand)]
pub enum EvidenceCommand {
    /// List collected evidence records
    List {
        /// Records to skip
        #[arg(long)]
        skip: Option<usize>,

        /// Maximum records to return (node default 100)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one evidence record
    Get {
        #[arg(value_name = "EVIDENCE_ID")]
        id: String,
    },
}

pub async fn handle_command(command: EvidenceCommand, host: &str, port: u16) -> Result<()> {
    let client = NodeClient::new(host, port)?;

    match command {
        EvidenceCommand::List { skip, limit } => {
            let records = client.list_evidence(&EvidenceQuery { skip, limit }).await?;
            print_evidence_table(&records);
            Ok(())
        }
        EvidenceCommand::Get { id } => {
            let record = client.get_evidence(&id).await?;
            print_json(&format!("Evidence {}", id), &record)
        }
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

fn print_evidence_table(records: &Value) {
    let Some(rows) = records.as_array() else {
        return;
    };
    if rows.is_empty() {
        println!("{}", "No evidence".dimmed());
        return;
    }

    println!(
        "{:<40} {:<20} {:<18} {}",
        "EVIDENCE ID".bold(),
        "TYPE".bold(),
        "HASH".bold(),
        "COLLECTED".bold()
    );
    for row in rows {
        println!(
            "{:<40} {:<20} {:<18} {}",
            row["evidence_id"].as_str().unwrap_or("?"),
            row["evidence_type"].as_str().unwrap_or("-"),
            short_hash(row["hash"].as_str().unwrap_or("")),
            row["timestamp"].as_str().unwrap_or("?")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash(&"ab".repeat(32)), "abababababababab");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[tokio::test]
    async fn test_list_forwards_paging() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/evidence")
            .match_query(Matcher::UrlEncoded("limit".into(), "2".into()))
            .with_status(200)
            .with_body(r#"[{"evidence_id": "ev-1", "evidence_type": "disk_image", "hash": "00ff"}]"#)
            .create_async()
            .await;

        let url = server.url();
        let (host, port) = url
            .trim_start_matches("http://")
            .rsplit_once(':')
            .unwrap();
        handle_command(
            EvidenceCommand::List {
                skip: None,
                limit: Some(2),
            },
            host,
            port.parse().unwrap(),
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }
}
