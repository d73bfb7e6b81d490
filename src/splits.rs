//! Mile splits
//!
//! Splits are cut at the first interval that carries the running distance
//! past each whole mile; the remainder is reported as a partial split.

use serde::{Deserialize, Serialize};

use crate::geo::pace_min_per_mile;
use crate::segments::IntervalSample;

/// Split length in miles
pub const SPLIT_DISTANCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MileSplit {
    /// 1-based split number
    pub mile: u32,
    /// Distance covered in this split (a little over a mile, or less for the last one)
    pub distance: f64,
    pub duration_minutes: f64,
    /// Minutes per mile over the split
    pub pace: f64,
    pub avg_hr: Option<f64>,
    pub partial: bool,
}

#[derive(Default)]
struct SplitAccumulator {
    distance: f64,
    minutes: f64,
    hr_total: u64,
    hr_count: u32,
}

impl SplitAccumulator {
    fn add(&mut self, sample: &IntervalSample) {
        self.distance += sample.distance;
        self.minutes += sample.time_delta.max(0.0);
        if let Some(hr) = sample.heart_rate {
            self.hr_total += u64::from(hr);
            self.hr_count += 1;
        }
    }

    fn emit(&mut self, mile: u32, partial: bool) -> MileSplit {
        let acc = std::mem::take(self);
        MileSplit {
            mile,
            distance: acc.distance,
            duration_minutes: acc.minutes,
            pace: pace_min_per_mile(acc.minutes, acc.distance),
            avg_hr: (acc.hr_count > 0).then(|| acc.hr_total as f64 / f64::from(acc.hr_count)),
            partial,
        }
    }
}

/// Cut the interval stream into mile splits
pub fn mile_splits(samples: &[IntervalSample]) -> Vec<MileSplit> {
    let mut splits = Vec::new();
    let mut current = SplitAccumulator::default();

    for sample in samples {
        current.add(sample);
        if current.distance >= SPLIT_DISTANCE {
            let mile = splits.len() as u32 + 1;
            splits.push(current.emit(mile, false));
        }
    }

    if current.distance > 0.0 {
        let mile = splits.len() as u32 + 1;
        splits.push(current.emit(mile, true));
    }

    splits
}
