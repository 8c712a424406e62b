//! synthetic readings for simulation mode.
//!
//! every value is a whole number drawn uniformly from the ranges below.
//! the manager owns the ticker; this only produces the readings.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::SensorReading;

pub const TEMPERATURE_RANGE: RangeInclusive<i32> = 18..=32;
pub const HUMIDITY_RANGE: RangeInclusive<i32> = 30..=90;
pub const DISTANCE_RANGE: RangeInclusive<i32> = 0..=30;

pub struct SimulationGenerator {
    rng: StdRng,
    produced: u64,
}

impl SimulationGenerator {
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng(), produced: 0 }
    }

    /// reproducible sequence, for tests
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), produced: 0 }
    }

    pub fn next_reading(&mut self) -> SensorReading {
        self.produced += 1;
        SensorReading {
            temperature: Some(self.rng.random_range(TEMPERATURE_RANGE) as f64),
            humidity: Some(self.rng.random_range(HUMIDITY_RANGE) as f64),
            distance: Some(self.rng.random_range(DISTANCE_RANGE) as f64),
        }
    }

    /// how many readings this generator has produced
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

impl Default for SimulationGenerator {
    fn default() -> Self {
        Self::new()
    }
}
