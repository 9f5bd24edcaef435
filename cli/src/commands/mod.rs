// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the KRAKEN-FLUX CLI

pub mod config;
pub mod evidence;
pub mod incident;
pub mod task;
pub mod workers;

pub use self::config::ConfigCommand;
pub use self::evidence::EvidenceCommand;
pub use self::incident::IncidentCommand;
pub use self::task::TaskCommand;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{Map, Value};

/// Parse a `--params`/`--payload` argument into a JSON object. `@path` reads
/// the object from a file.
pub fn parse_json_object(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path))?,
        None => raw.to_string(),
    };
    match serde_json::from_str::<Value>(&text).context("Invalid JSON argument")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Expected a JSON object, got {}", other),
    }
}

pub(crate) fn print_json(title: &str, value: &Value) -> Result<()> {
    println!("{}", title.bold());
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render response")?
    );
    Ok(())
}
