mod command;
mod config;
mod registry;
mod session;

use anyhow::Context;
use command::RequestExecutor;
use config::NodeConfig;
use registry::FleetRegistry;
use robofleet_shared::CalibrationEngine;
use session::SessionManager;
use std::sync::Arc;
use tokio::net::TcpListener;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = NodeConfig::from_env().context("loading node configuration")?;

    info!("Fleet node starting: {}", config.node_id);
    info!("  Listen address: {}", config.bind_addr);
    info!("  Session idle timeout: {:?}", config.session_idle_timeout);
    match config.rng_seed {
        Some(seed) => info!("  Sensor noise seed: {}", seed),
        None => info!("  Sensor noise seed: entropy"),
    }

    let registry = Arc::new(FleetRegistry::new());
    let calibrator = CalibrationEngine::new(config.build_rng()).with_profile(config.calibration);
    info!(
        "Calibration profile: max offset {:.0}%, drift threshold {:.0}%",
        calibrator.profile().max_offset_fraction * 100.0,
        calibrator.profile().drift_fraction * 100.0
    );

    let executor = Arc::new(RequestExecutor::new(
        config.node_id.clone(),
        registry,
        calibrator,
    ));
    let sessions = Arc::new(SessionManager::new());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Fleet node {} listening on {}", executor.node_id(), config.bind_addr);

    tokio::select! {
        result = session::accept_loop(
            listener,
            executor.clone(),
            sessions.clone(),
            config.session_idle_timeout,
        ) => {
            result.context("accepting console connections")?;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutdown requested");
        }
    }

    for client in sessions.connected_clients().await {
        info!(
            "  Dropping console {} ({}): {} requests in {:?}",
            client.addr,
            client.client_id,
            client.requests,
            client.connected_at.elapsed()
        );
    }
    info!(
        "Fleet node stopped: {} robots registered, {} consoles connected",
        executor.registry().count().await,
        sessions.count().await
    );
    Ok(())
}
