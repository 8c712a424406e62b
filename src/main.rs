//! ==============================================================================
//! main.rs - smart bin host entry point
//! ==============================================================================
//!
//! purpose:
//!     runs the live ingestion pipeline for one bin and serves its state to
//!     the dashboard.
//!
//! responsibilities:
//!     - load configuration and initialise logging
//!     - create the session's snapshot store
//!     - run the connection manager (live link, retry, simulation fallback)
//!     - serve the read-only api
//!     - tear everything down on ctrl-c
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌──────────────────┐   ┌─────────────┐  ┌───────────────┐  │
//!     │  │ connection mgr   │   │ api server  │  │ reading log   │  │
//!     │  │ (sole writer)    │   │ (read-only) │  │ (subscriber)  │  │
//!     │  └────────┬─────────┘   └──────┬──────┘  └───────┬───────┘  │
//!     │           │ writes             │ reads           │ notified │
//!     │           v                    v                 v          │
//!     │     ┌───────────────────────────────────────────────────┐   │
//!     │     │                 snapshot store                     │   │
//!     │     └───────────────────────────────────────────────────┘   │
//!     └───────────┬─────────────────────────────────────────────────┘
//!                 │ ws:// (json frames)
//!                 v
//!          sensor server (mqtt bridge)
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use smartbin_host::api::{self, ApiState};
use smartbin_host::config::MonitorConfig;
use smartbin_host::device::DeviceClient;
use smartbin_host::manager::ConnectionManager;
use smartbin_host::store::SensorStore;
use smartbin_host::transport::WebSocketTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: logging first so config problems are visible, then the level
    // from the config file unless RUST_LOG overrides it
    let log_filter = init_logging();
    info!("Smart Bin Host - live sensor pipeline");
    let config = MonitorConfig::load_or_default();
    if std::env::var_os("RUST_LOG").is_none() {
        log_filter.modify(|f| *f = EnvFilter::new(&config.logging.level))?;
    }
    config.print_summary();

    // step 2: one store for the whole session
    let (writer, store) = SensorStore::new(config.limits());

    let _reading_log = if config.logging.show_sensor_data {
        Some(store.subscribe(|s| {
            info!(
                status = %s.connection_status,
                temperature = ?s.reading.temperature,
                humidity = ?s.reading.humidity,
                distance = ?s.reading.distance,
                fill = s.derived.fill_percentage,
                bin = s.derived.bin_status.as_str(),
                "snapshot updated"
            );
        }))
    } else {
        None
    };

    // step 3: connection manager owns the writer
    let manager = ConnectionManager::new(
        config.link_settings(),
        Arc::new(WebSocketTransport),
        writer,
    );
    let handle = manager.handle();
    let manager_task = tokio::spawn(manager.run());

    // step 4: api server in background
    let api_state = ApiState {
        store: store.clone(),
        device: DeviceClient::new(&config.endpoint()),
        manager: Some(handle.clone()),
    };
    let bind = config.dashboard.bind.clone();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api::serve(&bind, api_state).await {
            error!("Api server error: {:#}", e);
        }
    });

    // step 5: run until ctrl-c
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown();
    if let Err(e) = manager_task.await {
        error!("Connection manager task failed: {}", e);
    }
    api_task.abort();
    Ok(())
}

fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}
