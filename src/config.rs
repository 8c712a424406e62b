//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the live sensor feed lives (address, port, wss?).
//!     - LinkConfig: secure-context flag, retry cadence, attempt cap.
//!     - SimulationConfig: synthetic tick cadence.
//!     - HistoryConfig / BinConfig: chart length and bin geometry.
//!     - DashboardConfig: bind address of the read-only api.
//!     - LoggingConfig: tracing filter and per-reading logging.
//!
//! every value is read once at startup; there is no hot reload.
//!
//! ==============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::fill::BIN_DEPTH_CM;
use crate::history::HISTORY_CAPACITY;
use crate::manager::LinkSettings;
use crate::snapshot::Limits;
use crate::transport::Endpoint;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    pub link: LinkConfig,
    pub simulation: SimulationConfig,
    pub history: HistoryConfig,
    pub bin: BinConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// use wss:// for the live feed
    pub secure: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// the consuming context is served over an encrypted channel
    pub secure_context: bool,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BinConfig {
    pub depth_cm: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: "192.168.1.104".to_string(), port: 3000, secure: false }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { secure_context: false, reconnect_interval_ms: 5000, max_reconnect_attempts: None }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 3000 }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: HISTORY_CAPACITY }
    }
}

impl Default for BinConfig {
    fn default() -> Self {
        Self { depth_cm: BIN_DEPTH_CM }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: MonitorConfig =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("monitor.toml"),
            std::path::PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        warn!("No config file found - using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.address.trim().is_empty() {
            bail!("server.address must not be empty");
        }
        if self.server.port == 0 {
            bail!("server.port must not be 0");
        }
        if self.link.reconnect_interval_ms == 0 {
            bail!("link.reconnect_interval_ms must be greater than 0");
        }
        if self.simulation.tick_interval_ms == 0 {
            bail!("simulation.tick_interval_ms must be greater than 0");
        }
        if self.history.capacity == 0 {
            bail!("history.capacity must be greater than 0");
        }
        if !(self.bin.depth_cm.is_finite() && self.bin.depth_cm > 0.0) {
            bail!("bin.depth_cm must be a positive number");
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.server.address.clone(), self.server.port, self.server.secure)
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            endpoint: self.endpoint(),
            secure_context: self.link.secure_context,
            reconnect_interval: Duration::from_millis(self.link.reconnect_interval_ms),
            simulation_interval: Duration::from_millis(self.simulation.tick_interval_ms),
            max_reconnect_attempts: self.link.max_reconnect_attempts,
        }
    }

    pub fn limits(&self) -> Limits {
        Limits { bin_depth_cm: self.bin.depth_cm, history_capacity: self.history.capacity }
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        info!("Sensor feed: {}", self.endpoint().url());
        info!(
            "Secure context: {} | Retry: {}ms | Max attempts: {}",
            self.link.secure_context,
            self.link.reconnect_interval_ms,
            self.link
                .max_reconnect_attempts
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        );
        info!(
            "Simulation tick: {}ms | History: {} points | Bin depth: {}cm",
            self.simulation.tick_interval_ms, self.history.capacity, self.bin.depth_cm
        );
        info!("Dashboard api: {} | Log level: {}", self.dashboard.bind, self.logging.level);
    }
}
