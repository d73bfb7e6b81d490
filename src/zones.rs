//! Heart-rate training zones based on heart rate reserve (Karvonen)
//!
//! `max_hr = 220 - age`, `HRR = max_hr - resting_hr`. Every heart-rate sample
//! is placed in the first zone whose HRR band contains
//! `(hr - resting_hr) / HRR`; both band edges are inclusive. Samples outside
//! every band (below 30 % or above 100 % of HRR) are counted separately.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Static definition of one training zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneDefinition {
    pub label: &'static str,
    pub name: &'static str,
    /// Lower and upper fraction of heart rate reserve
    pub hrr_range: (f64, f64),
    pub description: &'static str,
    pub color: &'static str,
}

/// The five zones, in ascending order
pub const TRAINING_ZONES: [ZoneDefinition; 5] = [
    ZoneDefinition {
        label: "Zone 1",
        name: "Recovery",
        hrr_range: (0.30, 0.40),
        description: "Very light intensity, active recovery, improves basic endurance",
        color: "#7FB3D5",
    },
    ZoneDefinition {
        label: "Zone 2",
        name: "Aerobic",
        hrr_range: (0.40, 0.60),
        description: "Light aerobic, fat burning, builds endurance",
        color: "#2ECC71",
    },
    ZoneDefinition {
        label: "Zone 3",
        name: "Tempo",
        hrr_range: (0.60, 0.70),
        description: "Moderate intensity, improves efficiency and aerobic capacity",
        color: "#F4D03F",
    },
    ZoneDefinition {
        label: "Zone 4",
        name: "Threshold",
        hrr_range: (0.70, 0.85),
        description: "Hard intensity, increases lactate threshold and speed",
        color: "#E67E22",
    },
    ZoneDefinition {
        label: "Zone 5",
        name: "VO2 Max",
        hrr_range: (0.85, 1.00),
        description: "Maximum effort, improves speed and power",
        color: "#E74C3C",
    },
];

/// Time spent in one zone during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTime {
    pub label: String,
    pub name: String,
    pub hrr_range: (f64, f64),
    /// Heart-rate band in bpm (truncated)
    pub hr_range: (u16, u16),
    pub description: String,
    pub color: String,
    pub time_spent_minutes: f64,
    /// Share of all heart-rate samples, in percent
    pub percentage: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingZones {
    pub max_hr: u16,
    pub heart_rate_reserve: f64,
    pub sample_interval_secs: f64,
    pub zones: Vec<ZoneTime>,
    /// Samples that fell outside every zone
    pub unzoned_samples: usize,
}

impl TrainingZones {
    pub fn zone(&self, label: &str) -> Option<&ZoneTime> {
        self.zones.iter().find(|z| z.label == label)
    }

    /// Minutes across all zones
    pub fn total_minutes(&self) -> f64 {
        self.zones.iter().map(|z| z.time_spent_minutes).sum()
    }
}

/// Average seconds between heart-rate samples
///
/// Falls back to one second when there is nothing to divide.
pub fn sample_interval_secs(duration_secs: f64, sample_count: usize) -> f64 {
    if sample_count == 0 || !(duration_secs > 0.0) {
        return 1.0;
    }
    duration_secs / sample_count as f64
}

/// 1-based index of the first zone containing `hrr_fraction`
pub fn zone_for(hrr_fraction: f64) -> Option<usize> {
    TRAINING_ZONES
        .iter()
        .position(|z| z.hrr_range.0 <= hrr_fraction && hrr_fraction <= z.hrr_range.1)
        .map(|i| i + 1)
}

/// Distribute heart-rate samples over the five zones
///
/// Returns `None` when there are no samples, or when age or resting heart
/// rate is missing (zero counts as missing) or leaves no heart rate reserve.
pub fn calculate_training_zones(
    heart_rates: &[u16],
    age: Option<u32>,
    resting_hr: Option<u16>,
    sample_interval_secs: f64,
) -> Option<TrainingZones> {
    let age = age.filter(|&a| a > 0);
    let resting_hr = resting_hr.filter(|&hr| hr > 0);

    let (Some(age), Some(resting_hr)) = (age, resting_hr) else {
        debug!("Missing age or resting heart rate, skipping training zones");
        return None;
    };
    if heart_rates.is_empty() {
        debug!("No heart-rate samples, skipping training zones");
        return None;
    }

    let max_hr = 220.0 - f64::from(age);
    let resting = f64::from(resting_hr);
    let reserve = max_hr - resting;
    if reserve <= 0.0 {
        debug!(max_hr, resting, "No heart rate reserve, skipping training zones");
        return None;
    }

    let mut counts = [0usize; 5];
    let mut unzoned = 0;
    for &hr in heart_rates {
        match zone_for((f64::from(hr) - resting) / reserve) {
            Some(zone) => counts[zone - 1] += 1,
            None => unzoned += 1,
        }
    }

    let total = heart_rates.len() as f64;
    let zones = TRAINING_ZONES
        .iter()
        .zip(counts)
        .map(|(def, count)| ZoneTime {
            label: def.label.to_string(),
            name: def.name.to_string(),
            hrr_range: def.hrr_range,
            hr_range: (
                (resting + def.hrr_range.0 * reserve) as u16,
                (resting + def.hrr_range.1 * reserve) as u16,
            ),
            description: def.description.to_string(),
            color: def.color.to_string(),
            time_spent_minutes: count as f64 * sample_interval_secs / 60.0,
            percentage: count as f64 / total * 100.0,
            sample_count: count,
        })
        .collect();

    Some(TrainingZones {
        max_hr: max_hr as u16,
        heart_rate_reserve: reserve,
        sample_interval_secs,
        zones,
        unzoned_samples: unzoned,
    })
}
