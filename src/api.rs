//! ==============================================================================
//! api.rs - read-only dashboard api
//! ==============================================================================
//!
//! purpose:
//!     the boundary the dashboard views consume. every GET reads the current
//!     snapshot from the store; nothing here writes sensor state.
//!
//! routes:
//!     GET  /api/snapshot          full snapshot (reading, derived, status, history)
//!     GET  /api/status            connection status + last update
//!     GET  /api/sensors           latest reading only
//!     GET  /api/history/:metric   one series (temperature|humidity|ultrasonicDistance)
//!     POST /api/device-config     forward device settings to the sensor server
//!     POST /api/reconnect         ask the manager to retry the live link
//!
//! ==============================================================================

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::device::{DeviceClient, DeviceConfig};
use crate::domain::{ConnectionStatus, Metric, SensorReading};
use crate::error::DeviceError;
use crate::manager::ManagerHandle;
use crate::store::SensorStore;
use crate::transport::Endpoint;

#[derive(Clone)]
pub struct ApiState {
    pub store: SensorStore,
    pub device: DeviceClient,
    pub manager: Option<ManagerHandle>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    connection_status: ConnectionStatus,
    last_update: Option<u64>,
}

/// optional new target for a reconnect
#[derive(Debug, Default, Deserialize)]
pub struct ReconnectRequest {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/status", get(status_handler))
        .route("/api/sensors", get(sensors_handler))
        .route("/api/history/:metric", get(history_handler))
        .route("/api/device-config", post(device_config_handler))
        .route("/api/reconnect", post(reconnect_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(bind: &str, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Dashboard api live at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn snapshot_handler(State(state): State<ApiState>) -> Response {
    Json(state.store.snapshot().as_ref().clone()).into_response()
}

async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    let snapshot = state.store.snapshot();
    Json(StatusResponse {
        connection_status: snapshot.connection_status,
        last_update: snapshot.last_update,
    })
}

async fn sensors_handler(State(state): State<ApiState>) -> Json<SensorReading> {
    Json(state.store.snapshot().reading)
}

async fn history_handler(
    State(state): State<ApiState>,
    Path(metric): Path<String>,
) -> Response {
    match Metric::parse(&metric) {
        Some(metric) => {
            let snapshot = state.store.snapshot();
            Json(snapshot.history.series(metric).clone()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "message": format!("unknown metric: {}", metric)})),
        )
            .into_response(),
    }
}

async fn device_config_handler(
    State(state): State<ApiState>,
    Json(config): Json<DeviceConfig>,
) -> Response {
    match state.device.save_config(&config).await {
        Ok(success) => Json(json!({"success": success})).into_response(),
        Err(DeviceError::Request(e)) => {
            warn!("Device config push failed: {}", e);
            (StatusCode::BAD_GATEWAY, Json(json!({"success": false, "error": e.to_string()})))
                .into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"success": false, "error": e.to_string()})))
            .into_response(),
    }
}

async fn reconnect_handler(
    State(state): State<ApiState>,
    body: Option<Json<ReconnectRequest>>,
) -> Response {
    let Some(manager) = state.manager else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "message": "no connection manager"})),
        )
            .into_response();
    };

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let endpoint = request.address.map(|address| {
        Endpoint::new(address, request.port.unwrap_or(3000), request.secure.unwrap_or(false))
    });
    manager.reconnect(endpoint);
    (StatusCode::ACCEPTED, Json(json!({"status": "ok"}))).into_response()
}
