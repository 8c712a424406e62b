//! ==============================================================================
//! snapshot.rs - the complete dashboard state at one instant
//! ==============================================================================
//!
//! purpose:
//!     a snapshot is never edited in place. every change is a `Patch`
//!     applied to the current value, producing the next value, which the
//!     store then publishes in one step. a reader can therefore never see
//!     new reading fields next to stale history.
//!
//! relationships:
//!     - uses: fill.rs (derivation), history.rs (rolling series)
//!     - used by: store.rs (publishes), api.rs (serializes)
//!
//! ==============================================================================

use serde::Serialize;

use crate::domain::{ConnectionStatus, DerivedState, SensorReading};
use crate::fill;
use crate::history::{History, HISTORY_CAPACITY};

/// limits the derivation and history work within
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub bin_depth_cm: f64,
    pub history_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { bin_depth_cm: fill::BIN_DEPTH_CM, history_capacity: HISTORY_CAPACITY }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(flatten)]
    pub derived: DerivedState,
    pub connection_status: ConnectionStatus,
    /// unix ms of the last successful update, `None` until the first one
    pub last_update: Option<u64>,
    #[serde(rename = "historyData")]
    pub history: History,
}

/// one logical change to the snapshot
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Patch {
    /// a reading arrived (live or simulated)
    Reading(SensorReading),
    /// the transport opened
    Connected,
    /// any other status change
    Status(ConnectionStatus),
}

impl Snapshot {
    /// the snapshot that results from applying `patch` at time `now_ms`
    pub fn apply(&self, patch: Patch, now_ms: u64, limits: &Limits) -> Snapshot {
        match patch {
            Patch::Reading(reading) => {
                // no distance, no new fill estimate
                let derived = match reading.distance {
                    Some(_) => fill::derive(reading.distance, limits.bin_depth_cm),
                    None => self.derived,
                };
                Snapshot {
                    reading,
                    derived,
                    connection_status: self.connection_status,
                    last_update: Some(now_ms),
                    history: self.history.with_reading(&reading, now_ms, limits.history_capacity),
                }
            }
            Patch::Connected => Snapshot {
                connection_status: ConnectionStatus::Connected,
                last_update: Some(now_ms),
                ..self.clone()
            },
            Patch::Status(status) => Snapshot { connection_status: status, ..self.clone() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BinStatus;

    #[test]
    fn starts_empty() {
        let s = Snapshot::default();
        assert_eq!(s.connection_status, ConnectionStatus::Connecting);
        assert_eq!(s.last_update, None);
        assert_eq!(s.derived.fill_percentage, 0);
        assert_eq!(s.derived.bin_status, BinStatus::Empty);
        assert!(s.history.temperature.is_empty());
    }

    #[test]
    fn reading_updates_everything_together() {
        let limits = Limits::default();
        let s = Snapshot::default().apply(
            Patch::Reading(SensorReading::new(Some(25.0), Some(60.0), Some(9.0))),
            1_700_000_000_000,
            &limits,
        );
        assert_eq!(s.derived.fill_percentage, 70);
        assert_eq!(s.derived.bin_status, BinStatus::High);
        assert_eq!(s.last_update, Some(1_700_000_000_000));
        assert_eq!(s.history.temperature.len(), 1);
        assert_eq!(s.history.humidity.len(), 1);
        assert_eq!(s.history.distance.len(), 1);
    }

    #[test]
    fn reading_without_distance_keeps_derived() {
        let limits = Limits::default();
        let s = Snapshot::default()
            .apply(Patch::Reading(SensorReading::new(None, None, Some(3.0))), 1, &limits)
            .apply(Patch::Reading(SensorReading::new(Some(22.0), None, None)), 2, &limits);
        assert_eq!(s.derived.fill_percentage, 90);
        assert_eq!(s.derived.bin_status, BinStatus::Full);
        assert_eq!(s.reading.distance, None);
        // the earlier distance point stays in history
        assert_eq!(s.history.distance.len(), 1);
        assert_eq!(s.history.temperature.len(), 1);
    }

    #[test]
    fn status_changes_leave_data_alone() {
        let limits = Limits::default();
        let before = Snapshot::default()
            .apply(Patch::Reading(SensorReading::new(Some(20.0), None, None)), 5, &limits);
        let after = before.apply(Patch::Status(ConnectionStatus::Disconnected), 9, &limits);
        assert_eq!(after.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(after.last_update, Some(5));
        assert_eq!(after.history, before.history);

        let connected = after.apply(Patch::Connected, 12, &limits);
        assert_eq!(connected.connection_status, ConnectionStatus::Connected);
        assert_eq!(connected.last_update, Some(12));
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(json.get("ultrasonicDistance").is_some());
        assert_eq!(json["fillPercentage"], 0);
        assert_eq!(json["binStatus"], "empty");
        assert_eq!(json["connectionStatus"], "connecting");
        assert!(json["historyData"]["ultrasonicDistance"].is_array());
    }
}
