// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use kraken_core::domain::node_config::NodeConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output path (default: ./kraken-config.yaml)
        #[arg(short, long, default_value = "./kraken-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. KRAKEN_CONFIG_PATH: {}",
            std::env::var("KRAKEN_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./kraken-config.yaml");
        println!("  4. ~/.kraken/config.yaml");
        println!("  5. /etc/kraken/config.yaml");
        println!();
    }

    let spec = &config.spec;

    println!("{}", "Node Identity:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  ID: {}", spec.node.id);
    if let Some(region) = &spec.node.region {
        println!("  Region: {}", region);
    }
    println!();

    println!("{}", "Dispatch:".bold());
    println!(
        "  Worker timeout: {}",
        format_secs(spec.dispatch.worker_timeout)
    );
    println!("  Policy: {}", spec.dispatch.policy);
    println!();

    println!("{}", "Workers:".bold());
    for (worker_type, settings) in &spec.workers {
        let state = if settings.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        println!(
            "  {} ({}) every {}",
            worker_type.to_string().bold(),
            state,
            format_secs(settings.interval)
        );
    }
    println!();

    println!("{}", "Storage:".bold());
    println!("  Backend: {:?}", spec.storage.backend);
    if spec.storage.database_url.is_some() {
        println!("  Database URL: {}", "(set)".dimmed());
    }
    if let Some(root) = &spec.storage.artifact_root {
        println!("  Artifact root: {}", root.display());
    }
    println!();

    println!("{}", "Network:".bold());
    println!(
        "  HTTP API: {}:{}",
        spec.network.bind_address, spec.network.port
    );
    if spec.observability.metrics.enabled {
        println!("  Metrics: :{}", spec.observability.metrics.port);
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    NodeConfigManifest::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn format_secs(duration: std::time::Duration) -> String {
    format!("{}s", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kraken-config.yaml");

        handle_command(
            ConfigCommand::Generate {
                output: path.clone(),
                force: false,
            },
            None,
        )
        .await
        .unwrap();

        let loaded = NodeConfigManifest::from_yaml_file(&path).unwrap();
        assert!(loaded.validate().is_ok());

        handle_command(ConfigCommand::Validate { file: Some(path) }, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kraken-config.yaml");
        std::fs::write(&path, "keep me").unwrap();

        let result = handle_command(
            ConfigCommand::Generate {
                output: path.clone(),
                force: false,
            },
            None,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_validate_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = handle_command(
            ConfigCommand::Validate {
                file: Some(dir.path().join("absent.yaml")),
            },
            None,
        )
        .await;

        assert!(result.is_err());
    }
}
