//! GridMesh Coordination Core — Entry Point
//!
//! Initializes configuration, logging, the in-process bus, the ledger
//! connection, and the coordination agents. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build the in-process bus and register mailboxes
//! 4. Connect the ledger provider (key from GRIDMESH_PRIVATE_KEY)
//! 5. Bind the auction contract + audit sink + forecaster client
//! 6. Spawn health/metrics/strategy server
//! 7. Spawn hub, coordinator and forecast relay under the supervisor
//! 8. Wait for SIGINT → graceful shutdown with bounded joins

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::api::HttpForecaster;
use adapters::bus::MemoryBus;
use adapters::chain::{LedgerProvider, VickreyAuction};
use adapters::metrics::MetricsRegistry;
use adapters::persistence::JsonlAuditSink;
use domain::{AgentRole, BidPricer, BusAddress, BusMessage, TradingStrategy};
use ports::bus::MessageBus;
use usecases::{AgentSupervisor, AuctionCoordinator, DependencyHub, ForecastRelay};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.node.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.node.name,
        version = env!("CARGO_PKG_VERSION"),
        consumers = config.hub.dependencies.len(),
        "Starting GridMesh coordination core"
    );

    // ── 3. Shutdown + health channels ───────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (health_tx, health_rx) = watch::channel(true);

    // ── 4. In-process bus with one mailbox per agent ────────
    let mut bus = MemoryBus::new(config.bus.capacity);
    let hub_mailbox = bus.register(BusAddress::Hub);
    let coordinator_mailbox = bus.register(BusAddress::Role(AgentRole::Negotiator));
    let relay_mailbox = bus.register(BusAddress::Role(AgentRole::Forecaster));
    let bus = Arc::new(bus);

    // ── 5. Ledger connection + contract binding ─────────────
    let provider = Arc::new(
        LedgerProvider::connect(&config.ledger)
            .await
            .context("Failed to connect ledger provider")?,
    );
    let contract = config
        .ledger
        .contract_address
        .parse()
        .context("Invalid auction contract address")?;
    let ledger = Arc::new(
        VickreyAuction::new(Arc::clone(&provider), contract, config.ledger.gas_limit)
            .await
            .context("Failed to bind auction contract")?,
    );

    // ── 6. Audit sink, forecaster client, metrics ───────────
    let audit = Arc::new(
        JsonlAuditSink::new(&config.persistence.data_dir)
            .await
            .context("Failed to create audit sink")?,
    );
    let forecaster = Arc::new(
        HttpForecaster::new(&config.forecaster).context("Failed to build forecaster client")?,
    );
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    // ── 7. Build and spawn the agents ───────────────────────
    let pricer = BidPricer::new(
        config.pricing.aggressive_factor,
        config.pricing.neutral_factor,
        config.pricing.conservative_factor,
    );
    let nonce = format!("{}_{}", config.node.nonce_prefix, AgentRole::Negotiator);

    let hub = DependencyHub::new(Arc::clone(&bus), Arc::clone(&metrics), config.hub.clone());
    let coordinator = AuctionCoordinator::new(
        Arc::clone(&ledger),
        Arc::clone(&audit),
        Arc::clone(&metrics),
        pricer,
        config.auction.clone(),
        nonce,
    );
    let relay = ForecastRelay::new(Arc::clone(&bus), Arc::clone(&forecaster));

    let mut supervisor = AgentSupervisor::new();
    supervisor.spawn_agent("hub", hub.run(hub_mailbox, shutdown_rx.clone()));
    supervisor.spawn_agent(
        "coordinator",
        coordinator.run(coordinator_mailbox, shutdown_rx.clone()),
    );
    supervisor.spawn_agent("forecast_relay", relay.run(relay_mailbox, shutdown_rx.clone()));
    let handles = supervisor.take_handles();
    let supervisor = Arc::new(supervisor);

    // ── 8. Health / metrics / strategy server ───────────────
    let server_handle = if config.metrics.enabled {
        let state = ServerState {
            health_rx,
            metrics: Arc::clone(&metrics),
            supervisor: Arc::clone(&supervisor),
            bus: Arc::clone(&bus),
        };
        let bind_address = config.metrics.bind_address.clone();
        Some(tokio::spawn(serve_http(bind_address, state)))
    } else {
        None
    };

    info!("All tasks spawned — coordination core running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // Graceful shutdown: signal, mark unready, bounded joins
    let _ = shutdown_tx.send(true);
    let _ = health_tx.send(false);

    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(15), handle).await;
    }

    if let Some(handle) = server_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Shared state for the HTTP surface.
#[derive(Clone)]
struct ServerState {
    health_rx: watch::Receiver<bool>,
    metrics: Arc<MetricsRegistry>,
    supervisor: Arc<AgentSupervisor>,
    bus: Arc<MemoryBus>,
}

/// Serve health, metrics and strategy endpoints.
///
/// - `/live`     — liveness probe: 200 while the process runs
/// - `/ready`    — readiness: 503 during shutdown or agent failure
/// - `/metrics`  — Prometheus text exposition
/// - `/strategy` — POST `{"strategy": "..."}` to retune bid pricing
async fn serve_http(bind_address: String, state: ServerState) -> Result<()> {
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    let app = Router::new()
        .route("/live", get(|| async { StatusCode::OK }))
        .route(
            "/ready",
            get(|State(state): State<ServerState>| async move {
                if *state.health_rx.borrow() && state.supervisor.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
        .route(
            "/metrics",
            get(|State(state): State<ServerState>| async move {
                match state.metrics.export() {
                    Ok(body) => (StatusCode::OK, body),
                    Err(e) => {
                        warn!(error = %e, "Metrics export failed");
                        (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                    }
                }
            }),
        )
        .route(
            "/strategy",
            post(
                |State(state): State<ServerState>, Json(body): Json<serde_json::Value>| async move {
                    let Some(tag) = body.get("strategy").and_then(|v| v.as_str()) else {
                        return StatusCode::UNPROCESSABLE_ENTITY;
                    };
                    let Ok(strategy) = tag.parse::<TradingStrategy>() else {
                        return StatusCode::UNPROCESSABLE_ENTITY;
                    };

                    let message = BusMessage::Status {
                        from: AgentRole::Dashboard,
                        body: serde_json::json!({ "strategy": strategy }),
                    };
                    match state.bus.send(BusAddress::Hub, message).await {
                        Ok(()) => {
                            info!(strategy = %tag, "Trading strategy updated");
                            StatusCode::ACCEPTED
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to publish strategy update");
                            StatusCode::SERVICE_UNAVAILABLE
                        }
                    }
                },
            ),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
