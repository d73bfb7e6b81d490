//! VO2max estimation from a single run
//!
//! Uses a heart-rate ratio estimate (`15.3 × HRmax / 60`) with a pace
//! adjustment: runs faster than 4:30 min/km earn a 15 % bonus, runs faster
//! than 5:30 min/km a 5 % bonus.
//!
//! VO2max represents the maximum rate of oxygen consumption during incremental
//! exercise, in ml/kg/min.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Gender;

/// Reference resting heart rate in the ratio estimate
pub const REFERENCE_RESTING_HR: f64 = 60.0;

/// Inputs for [`estimate_vo2max`]; any missing value skips the estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vo2MaxInputs {
    pub age: Option<u32>,
    pub weight_kg: Option<f64>,
    pub gender: Option<Gender>,
    /// Run duration in minutes
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    /// Highest heart rate observed during the run
    pub max_hr: Option<u16>,
}

impl Vo2MaxInputs {
    /// Pace in minutes per kilometre, if both inputs are usable
    pub fn pace_min_per_km(&self) -> Option<f64> {
        let duration = positive(self.duration_minutes)?;
        let distance = positive(self.distance_km)?;
        Some(duration / distance)
    }
}

/// Estimate VO2max (ml/kg/min), rounded to one decimal place
pub fn estimate_vo2max(inputs: &Vo2MaxInputs) -> Option<f64> {
    let complete = inputs.age.filter(|&a| a > 0).is_some()
        && positive(inputs.weight_kg).is_some()
        && inputs.gender.is_some()
        && inputs.max_hr.filter(|&hr| hr > 0).is_some();

    let pace_km = inputs.pace_min_per_km();
    let (true, Some(pace_km), Some(max_hr)) = (complete, pace_km, inputs.max_hr) else {
        debug!(?inputs, "VO2max inputs incomplete, skipping estimate");
        return None;
    };

    let mut vo2max = 15.3 * (f64::from(max_hr) / REFERENCE_RESTING_HR);
    if pace_km < 4.5 {
        vo2max *= 1.15;
    } else if pace_km < 5.5 {
        vo2max *= 1.05;
    }

    Some((vo2max * 10.0).round() / 10.0)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(duration_minutes: f64, distance_km: f64) -> Vo2MaxInputs {
        Vo2MaxInputs {
            age: Some(35),
            weight_kg: Some(70.0),
            gender: Some(Gender::Male),
            duration_minutes: Some(duration_minutes),
            distance_km: Some(distance_km),
            max_hr: Some(180),
        }
    }

    #[test]
    fn test_pace_adjustments() {
        // 15.3 * 3 = 45.9
        assert_eq!(estimate_vo2max(&inputs(60.0, 10.0)), Some(45.9));
        // 5:00/km: +5 %
        assert_eq!(estimate_vo2max(&inputs(50.0, 10.0)), Some(48.2));
        // 4:00/km: +15 %
        assert_eq!(estimate_vo2max(&inputs(40.0, 10.0)), Some(52.8));
    }

    #[test]
    fn test_missing_inputs_skip() {
        let mut missing_gender = inputs(50.0, 10.0);
        missing_gender.gender = None;
        assert_eq!(estimate_vo2max(&missing_gender), None);

        let mut missing_weight = inputs(50.0, 10.0);
        missing_weight.weight_kg = None;
        assert_eq!(estimate_vo2max(&missing_weight), None);

        let mut no_distance = inputs(50.0, 0.0);
        no_distance.distance_km = Some(0.0);
        assert_eq!(estimate_vo2max(&no_distance), None);

        assert_eq!(estimate_vo2max(&Vo2MaxInputs::default()), None);
    }
}
