//! ==============================================================================
//! history.rs - bounded rolling series for the charts
//! ==============================================================================
//!
//! each metric keeps at most `capacity` points, oldest evicted first.
//! appends never touch the series they start from: a reader holding the
//! previous snapshot keeps seeing exactly what it saw.
//!
//! ==============================================================================

use std::collections::VecDeque;

use serde::Serialize;

use crate::domain::{HistoryPoint, Metric, SensorReading};

/// default number of points kept per metric
pub const HISTORY_CAPACITY: usize = 50;

/// one metric's rolling series
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series(VecDeque<HistoryPoint>);

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// a copy of this series with `point` appended, trimmed from the front
    /// down to `capacity`
    pub fn appended(&self, point: HistoryPoint, capacity: usize) -> Series {
        let mut points = self.0.clone();
        points.push_back(point);
        while points.len() > capacity {
            points.pop_front();
        }
        Series(points)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&HistoryPoint> {
        self.0.front()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.0.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.0.iter()
    }
}

/// the three per-metric series
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct History {
    pub temperature: Series,
    pub humidity: Series,
    #[serde(rename = "ultrasonicDistance")]
    pub distance: Series,
}

impl History {
    pub fn series(&self, metric: Metric) -> &Series {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Distance => &self.distance,
        }
    }

    /// history with every present field of `reading` appended at `timestamp`.
    /// series for absent fields are carried over untouched.
    pub fn with_reading(&self, reading: &SensorReading, timestamp: u64, capacity: usize) -> History {
        let next = |metric: Metric| {
            let series = self.series(metric);
            match metric.value_of(reading) {
                Some(value) => series.appended(HistoryPoint { timestamp, value }, capacity),
                None => series.clone(),
            }
        };
        History {
            temperature: next(Metric::Temperature),
            humidity: next(Metric::Humidity),
            distance: next(Metric::Distance),
        }
    }
}
