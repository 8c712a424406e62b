//! fill level derivation from the ultrasonic distance.
//!
//! the sensor sits in the lid looking down, so distance is inverse to
//! fill: 0 cm means full, `depth` cm means empty.

use crate::domain::{BinStatus, DerivedState};

/// default bin depth in cm
pub const BIN_DEPTH_CM: f64 = 30.0;

/// fill percentage for the default 30 cm bin
pub fn fill_percentage(distance: Option<f64>) -> u8 {
    fill_percentage_for_depth(distance, BIN_DEPTH_CM)
}

/// fill percentage for a bin of `depth` cm. absent distance reads as 0%.
pub fn fill_percentage_for_depth(distance: Option<f64>, depth: f64) -> u8 {
    let Some(distance) = distance.filter(|d| !d.is_nan()) else {
        return 0;
    };
    if depth <= 0.0 {
        return 0;
    }
    let clamped = distance.clamp(0.0, depth);
    let fill = 100.0 - (clamped / depth * 100.0);
    fill.round().clamp(0.0, 100.0) as u8
}

/// bucket a fill percentage. each band includes its lower bound.
pub fn bin_status(fill_percentage: u8) -> BinStatus {
    match fill_percentage {
        0..=19 => BinStatus::Empty,
        20..=39 => BinStatus::Low,
        40..=69 => BinStatus::Medium,
        70..=89 => BinStatus::High,
        _ => BinStatus::Full,
    }
}

/// both derived fields for one distance
pub fn derive(distance: Option<f64>, depth: f64) -> DerivedState {
    let fill_percentage = fill_percentage_for_depth(distance, depth);
    DerivedState { fill_percentage, bin_status: bin_status(fill_percentage) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, 0)]
    #[case(Some(30.0), 0)]
    #[case(Some(0.0), 100)]
    #[case(Some(15.0), 50)]
    #[case(Some(9.0), 70)]
    #[case(Some(45.0), 0)]
    #[case(Some(-4.0), 100)]
    #[case(Some(f64::NAN), 0)]
    fn fill_from_distance(#[case] distance: Option<f64>, #[case] expected: u8) {
        assert_eq!(fill_percentage(distance), expected);
    }

    #[test]
    fn rounds_to_nearest() {
        // 100 - 10/30*100 = 66.67
        assert_eq!(fill_percentage(Some(10.0)), 67);
        // 100 - 20/30*100 = 33.33
        assert_eq!(fill_percentage(Some(20.0)), 33);
    }

    #[test]
    fn custom_depth() {
        assert_eq!(fill_percentage_for_depth(Some(25.0), 100.0), 75);
        assert_eq!(fill_percentage_for_depth(Some(5.0), 0.0), 0);
    }

    #[rstest]
    #[case(0, BinStatus::Empty)]
    #[case(19, BinStatus::Empty)]
    #[case(20, BinStatus::Low)]
    #[case(39, BinStatus::Low)]
    #[case(40, BinStatus::Medium)]
    #[case(69, BinStatus::Medium)]
    #[case(70, BinStatus::High)]
    #[case(89, BinStatus::High)]
    #[case(90, BinStatus::Full)]
    #[case(100, BinStatus::Full)]
    fn status_boundaries(#[case] fill: u8, #[case] expected: BinStatus) {
        assert_eq!(bin_status(fill), expected);
    }

    #[test]
    fn status_is_monotonic_over_range() {
        let mut previous = bin_status(0);
        for fill in 1..=100u8 {
            let current = bin_status(fill);
            assert!(current as u8 >= previous as u8, "regressed at {fill}");
            previous = current;
        }
    }
}
