// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node server wiring: storage, worker registry, dispatcher, coordinator and
//! the HTTP API, torn down in reverse on SIGINT/SIGTERM.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use kraken_core::application::coordinator::Coordinator;
use kraken_core::application::dispatcher::Dispatcher;
use kraken_core::application::incident_service::StandardIncidentService;
use kraken_core::application::registry::WorkerRegistry;
use kraken_core::application::repository_factory::Repositories;
use kraken_core::domain::node_config::NodeConfigManifest;
use kraken_core::domain::repository::StorageBackend;
use kraken_core::infrastructure::db::Database;
use kraken_core::infrastructure::event_bus::EventBus;
use kraken_core::infrastructure::workers::{artifact_stores_from_config, workers_from_config};
use kraken_core::presentation::api::{app, AppState};

pub async fn serve(config: NodeConfigManifest, port_override: Option<u16>) -> Result<()> {
    config.validate().context("Invalid node configuration")?;

    let node = &config.spec.node;
    info!(node_id = %node.id, name = %config.metadata.name, "Starting KRAKEN-FLUX node");

    if config.spec.observability.metrics.enabled {
        let metrics_addr: SocketAddr = (
            [0, 0, 0, 0],
            config.spec.observability.metrics.port,
        )
            .into();
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(address = %metrics_addr, "Prometheus exporter listening");
    }

    let backend = config.storage_backend();
    let pool = match &backend {
        StorageBackend::PostgreSQL(pg) => {
            let database = Database::new(&pg.connection_string).await?;
            info!("Connected to PostgreSQL");
            Some(database.get_pool().clone())
        }
        StorageBackend::InMemory => {
            info!("Using in-memory repositories");
            None
        }
    };
    let repositories = Repositories::create(&backend, pool);

    let event_bus = Arc::new(EventBus::with_default_capacity());
    let registry = Arc::new(WorkerRegistry::new(event_bus.clone()));
    let artifacts = artifact_stores_from_config(&config);
    let registered = registry
        .initialize(workers_from_config(&config, &artifacts))
        .await;
    if registered == 0 {
        warn!("No workers registered; every dispatch will report worker_unavailable");
    } else {
        info!(workers = registered, "Workers registered");
    }

    let dispatch = &config.spec.dispatch;
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        event_bus.clone(),
        dispatch.worker_timeout,
    ));
    let coordinator = Arc::new(Coordinator::new(
        dispatcher.clone(),
        event_bus.clone(),
        dispatch.policy,
    ));
    let incident_service = Arc::new(StandardIncidentService::new(
        repositories.incidents,
        repositories.actions,
        repositories.responses,
        coordinator,
        dispatcher.clone(),
        event_bus,
    ));

    let router = app(AppState::new(
        incident_service,
        dispatcher,
        registry.clone(),
        artifacts.evidence,
    ));

    let network = &config.spec.network;
    let port = port_override.unwrap_or(network.port);
    let bind_addr = format!("{}:{}", network.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!(address = %bind_addr, policy = ?dispatch.policy, "HTTP API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down workers");
    registry.shutdown().await;
    info!("Node stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
