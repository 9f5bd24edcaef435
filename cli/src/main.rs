// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # KRAKEN-FLUX CLI
//!
//! The `kraken` binary runs an incident-response node and talks to one.
//!
//! ## Commands
//!
//! - `kraken serve` - Run the node (worker registry, dispatcher, HTTP API)
//! - `kraken incident create|get|list|update|action` - Incident operations
//! - `kraken task dispatch` - Send a raw task to a worker
//! - `kraken evidence list|get` - Read collected evidence records
//! - `kraken workers` - Heartbeat sweep of registered workers
//! - `kraken config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use kraken_core::domain::node_config::NodeConfigManifest;
use kraken_flux::commands::{self, ConfigCommand, EvidenceCommand, IncidentCommand, TaskCommand};
use kraken_flux::daemon;

/// KRAKEN-FLUX - Coordinated security incident response
#[derive(Parser)]
#[command(name = "kraken")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "KRAKEN_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: config, else 8000)
    #[arg(long, global = true, env = "KRAKEN_PORT")]
    port: Option<u16>,

    /// HTTP API host
    #[arg(long, global = true, env = "KRAKEN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "KRAKEN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the incident-response node
    #[command(name = "serve")]
    Serve,

    /// Incident operations
    #[command(name = "incident")]
    Incident {
        #[command(subcommand)]
        command: IncidentCommand,
    },

    /// Raw task dispatch
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Collected evidence records
    #[command(name = "evidence")]
    Evidence {
        #[command(subcommand)]
        command: EvidenceCommand,
    },

    /// Show registered workers and their heartbeats
    #[command(name = "workers")]
    Workers,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let port = cli.port.unwrap_or(daemon::DEFAULT_PORT);

    match cli.command {
        Some(Commands::Serve) => {
            let config = NodeConfigManifest::load_or_default(cli.config.clone())
                .context("Failed to load configuration")?;
            let logging = &config.spec.observability.logging;
            let level = cli.log_level.as_deref().unwrap_or(&logging.level);
            init_logging(level, &logging.format)?;

            daemon::server::serve(config, cli.port).await
        }
        Some(Commands::Incident { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::incident::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Task { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::task::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Evidence { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::evidence::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Workers) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::workers::handle_command(&cli.host, port).await
        }
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over `level`.
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.with_target(false).compact().init(),
    }

    Ok(())
}
