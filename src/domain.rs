//! ==============================================================================
//! domain.rs - value types shared by every layer
//! ==============================================================================
//!
//! purpose:
//!     the plain data the pipeline moves around: raw readings from the bin,
//!     what we derive from them, and the link status the dashboard shows.
//!
//! relationships:
//!     - produced by: transport.rs (parsed frames), simulation.rs
//!     - consumed by: fill.rs, history.rs, snapshot.rs, api.rs
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// one reading from the bin. any field may be missing when that
/// sensor did not report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// degrees celsius
    #[serde(default)]
    pub temperature: Option<f64>,
    /// relative humidity (0-100%)
    #[serde(default)]
    pub humidity: Option<f64>,
    /// ultrasonic distance from the lid to the contents, in cm
    #[serde(default, rename = "ultrasonicDistance")]
    pub distance: Option<f64>,
}

impl SensorReading {
    pub fn new(temperature: Option<f64>, humidity: Option<f64>, distance: Option<f64>) -> Self {
        Self { temperature, humidity, distance }
    }

    /// parse one inbound frame.
    ///
    /// the frame must be a json object; unknown keys are ignored and
    /// missing or null keys become `None`.
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(PayloadError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// discrete fill bucket shown on the dashboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinStatus {
    #[default]
    Empty,
    Low,
    Medium,
    High,
    Full,
}

/// coarse display band for a bin status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Elevated,
    Critical,
}

impl BinStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BinStatus::Empty => "empty",
            BinStatus::Low => "low",
            BinStatus::Medium => "medium",
            BinStatus::High => "high",
            BinStatus::Full => "full",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            BinStatus::Empty | BinStatus::Low => Severity::Normal,
            BinStatus::Medium => Severity::Elevated,
            BinStatus::High | BinStatus::Full => Severity::Critical,
        }
    }
}

/// fill percentage plus its bucket. recomputed only when a reading
/// carries a distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub fill_percentage: u8,
    pub bin_status: BinStatus,
}

/// which data-producing mode is active. exactly one holds at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Simulation,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Simulation => "simulation",
        };
        f.write_str(s)
    }
}

/// one charted sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// unix timestamp in milliseconds
    pub timestamp: u64,
    pub value: f64,
}

/// the three charted metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Humidity,
    Distance,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Distance];

    /// accepts the wire name as well as the short name for distance
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "temperature" => Some(Metric::Temperature),
            "humidity" => Some(Metric::Humidity),
            "ultrasonicDistance" | "distance" => Some(Metric::Distance),
            _ => None,
        }
    }

    pub fn value_of(self, reading: &SensorReading) -> Option<f64> {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::Humidity => reading.humidity,
            Metric::Distance => reading.distance,
        }
    }
}

/// unix time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
