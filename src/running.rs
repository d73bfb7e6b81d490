//! Race-time prediction and pace-zone recommendations
//!
//! Both work from the paces (min/mile) of a run's fast segments. Infinite,
//! NaN and non-positive paces are ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::AnalysisResult;

/// Riegel fatigue exponent
pub const RIEGEL_EXPONENT: f64 = 1.06;

/// Base distance (km) the best pace is projected from
pub const BASE_DISTANCE_KM: f64 = 5.0;

/// Target race distances in kilometres, with their report keys
pub const RACE_DISTANCES: [(&str, f64); 4] =
    [("5k", 5.0), ("10k", 10.0), ("21.1k", 21.1), ("42.2k", 42.2)];

/// Paces usable for predictions
pub fn valid_paces(paces: &[f64]) -> Vec<f64> {
    paces
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect()
}

/// Predicted finishing times in minutes, keyed by distance label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacePredictions {
    /// Best pace the predictions were derived from
    pub best_pace: f64,
    pub times: BTreeMap<String, f64>,
}

impl RacePredictions {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.times.get(label).copied()
    }
}

/// Project the best pace onto standard race distances
///
/// `base_time = best_pace × 5`, then `base_time × (d / 5)^1.06` for each
/// distance `d`.
pub fn predict_race_times(paces: &[f64]) -> Option<RacePredictions> {
    let best_pace = valid_paces(paces).into_iter().reduce(f64::min)?;
    let base_time = best_pace * BASE_DISTANCE_KM;

    let times = RACE_DISTANCES
        .iter()
        .map(|&(label, km)| {
            let predicted = base_time * (km / BASE_DISTANCE_KM).powf(RIEGEL_EXPONENT);
            (label.to_string(), predicted)
        })
        .collect();

    Some(RacePredictions { best_pace, times })
}

/// One recommended training pace band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceZone {
    pub name: String,
    /// Pace band in min/mile, faster end first
    pub range: (f64, f64),
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceRecommendations {
    pub avg_pace: f64,
    pub best_pace: f64,
    pub zones: Vec<PaceZone>,
}

impl PaceRecommendations {
    pub fn zone(&self, name: &str) -> Option<&PaceZone> {
        self.zones.iter().find(|z| z.name == name)
    }
}

/// Base a zone's band on the average or the best pace
enum Anchor {
    Average,
    Best,
}

const PACE_ZONES: [(&str, Anchor, f64, f64, &str); 5] = [
    (
        "Recovery",
        Anchor::Average,
        1.4,
        1.5,
        "Very easy running, for recovery days",
    ),
    (
        "Easy",
        Anchor::Average,
        1.2,
        1.3,
        "Comfortable pace for building endurance",
    ),
    (
        "Long Run",
        Anchor::Average,
        1.1,
        1.2,
        "Slightly faster than easy pace",
    ),
    (
        "Tempo",
        Anchor::Best,
        1.05,
        1.1,
        "Comfortably hard, sustainable for 20-40 minutes",
    ),
    (
        "Interval",
        Anchor::Best,
        0.9,
        0.95,
        "Fast pace for short intervals",
    ),
];

/// Five training bands derived from average and best pace
pub fn pace_recommendations(paces: &[f64]) -> Option<PaceRecommendations> {
    let valid = valid_paces(paces);
    if valid.is_empty() {
        return None;
    }

    let avg_pace = valid.iter().sum::<f64>() / valid.len() as f64;
    let best_pace = valid.iter().copied().fold(f64::INFINITY, f64::min);

    let zones = PACE_ZONES
        .iter()
        .map(|(name, anchor, low, high, description)| {
            let base = match anchor {
                Anchor::Average => avg_pace,
                Anchor::Best => best_pace,
            };
            PaceZone {
                name: name.to_string(),
                range: (base * low, base * high),
                description: description.to_string(),
            }
        })
        .collect();

    Some(PaceRecommendations {
        avg_pace,
        best_pace,
        zones,
    })
}

/// Recommendations from the fast segments of several earlier runs
pub fn pace_recommendations_from_history(results: &[AnalysisResult]) -> Option<PaceRecommendations> {
    let paces: Vec<f64> = results
        .iter()
        .flat_map(|r| r.fast_segments.iter().map(|s| s.pace))
        .collect();
    pace_recommendations(&paces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_riegel_projection() {
        let predictions = predict_race_times(&[7.0, 6.0, f64::INFINITY]).unwrap();
        assert_eq!(predictions.best_pace, 6.0);
        assert!((predictions.get("5k").unwrap() - 30.0).abs() < 1e-12);
        assert!((predictions.get("10k").unwrap() - 62.548).abs() < 1e-3);
        assert!((predictions.get("21.1k").unwrap() - 138.023).abs() < 1e-3);
        assert_eq!(predictions.times.len(), 4);
    }

    #[test]
    fn test_predictions_need_a_valid_pace() {
        assert!(predict_race_times(&[]).is_none());
        assert!(predict_race_times(&[f64::INFINITY, f64::NAN, 0.0]).is_none());
    }

    #[test]
    fn test_pace_recommendations() {
        let recs = pace_recommendations(&[6.0, 8.0, f64::INFINITY]).unwrap();
        assert_eq!(recs.avg_pace, 7.0);
        assert_eq!(recs.best_pace, 6.0);
        assert_eq!(recs.zones.len(), 5);

        let recovery = recs.zone("Recovery").unwrap();
        assert!((recovery.range.0 - 9.8).abs() < 1e-9);
        assert!((recovery.range.1 - 10.5).abs() < 1e-9);

        let interval = recs.zone("Interval").unwrap();
        assert!((interval.range.0 - 5.4).abs() < 1e-9);
        assert!((interval.range.1 - 5.7).abs() < 1e-9);
    }

    #[test]
    fn test_pace_recommendations_empty() {
        assert!(pace_recommendations(&[]).is_none());
        assert!(pace_recommendations(&[-1.0]).is_none());
    }
}
