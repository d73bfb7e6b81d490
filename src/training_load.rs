//! Training load (TRIMP) and recovery time
//!
//! `hrr_ratio = (avg_hr - resting_hr) / (max_hr - resting_hr)`
//! `load = duration × avg_hr × 0.64 × e^(1.92 × hrr_ratio)`
//!
//! Recovery hours scale with load, then grow 2 % per year of age over 30 and
//! 1 % per bpm of resting heart rate over 60.

use tracing::debug;

/// Banister weighting coefficient
const TRIMP_SCALE: f64 = 0.64;

/// Banister exponent (male coefficient)
const TRIMP_EXPONENT: f64 = 1.92;

/// Hours of recovery per unit of load
const RECOVERY_HOURS_PER_LOAD: f64 = 0.2;

/// Heart-rate-weighted load of a run
///
/// Every input is required and zero counts as missing. When `max_hr` equals
/// `resting_hr` the ratio is undefined and the result is non-finite.
pub fn training_load(
    duration_minutes: Option<f64>,
    avg_hr: Option<f64>,
    max_hr: Option<f64>,
    resting_hr: Option<f64>,
) -> Option<f64> {
    let (Some(duration), Some(avg_hr), Some(max_hr), Some(resting_hr)) = (
        nonzero(duration_minutes),
        nonzero(avg_hr),
        nonzero(max_hr),
        nonzero(resting_hr),
    ) else {
        debug!("Training load inputs incomplete, skipping");
        return None;
    };

    let hrr_ratio = (avg_hr - resting_hr) / (max_hr - resting_hr);
    let intensity = TRIMP_SCALE * (TRIMP_EXPONENT * hrr_ratio).exp();
    Some(duration * avg_hr * intensity)
}

/// Suggested recovery time in hours
pub fn recovery_time(load: Option<f64>, resting_hr: Option<f64>, age: Option<u32>) -> Option<f64> {
    let (Some(load), Some(resting_hr), Some(age)) =
        (nonzero(load), nonzero(resting_hr), age.filter(|&a| a > 0))
    else {
        debug!("Recovery inputs incomplete, skipping");
        return None;
    };

    let base = load * RECOVERY_HOURS_PER_LOAD;
    let age_factor = 1.0 + ((f64::from(age) - 30.0) * 0.02).max(0.0);
    let hr_factor = 1.0 + ((resting_hr - 60.0) * 0.01).max(0.0);
    Some(base * age_factor * hr_factor)
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_load() {
        // ratio (150 - 60) / (190 - 60) = 0.6923
        let load = training_load(Some(30.0), Some(150.0), Some(190.0), Some(60.0)).unwrap();
        let expected = 30.0 * 150.0 * 0.64 * (1.92_f64 * 90.0 / 130.0).exp();
        assert!((load - expected).abs() < 1e-9);
        assert!(load > 10_000.0 && load < 11_000.0);
    }

    #[test]
    fn test_training_load_missing_inputs() {
        assert!(training_load(None, Some(150.0), Some(190.0), Some(60.0)).is_none());
        assert!(training_load(Some(30.0), Some(150.0), Some(190.0), None).is_none());
        assert!(training_load(Some(30.0), Some(150.0), Some(190.0), Some(0.0)).is_none());
    }

    #[test]
    fn test_training_load_degenerate_reserve() {
        let load = training_load(Some(30.0), Some(150.0), Some(60.0), Some(60.0)).unwrap();
        assert!(!load.is_finite());
    }

    #[test]
    fn test_recovery_time() {
        // Young athlete with low resting HR: no adjustment
        assert_eq!(recovery_time(Some(100.0), Some(55.0), Some(25)), Some(20.0));

        // age 40 (+20 %), resting 70 (+10 %)
        let hours = recovery_time(Some(100.0), Some(70.0), Some(40)).unwrap();
        assert!((hours - 20.0 * 1.2 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_recovery_time_missing_inputs() {
        assert!(recovery_time(None, Some(60.0), Some(30)).is_none());
        assert!(recovery_time(Some(0.0), Some(60.0), Some(30)).is_none());
        assert!(recovery_time(Some(100.0), Some(60.0), None).is_none());
    }
}
