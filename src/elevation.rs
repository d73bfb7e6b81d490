//! Elevation profile, gain/loss and its relation to pace

use serde::{Deserialize, Serialize};

use crate::models::Track;
use crate::segments::IntervalSample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Miles from the start
    pub distance: f64,
    /// Meters
    pub elevation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationSummary {
    pub profile: Vec<ProfilePoint>,
    /// Total climbing in meters
    pub gain: f64,
    /// Total descent in meters (positive)
    pub loss: f64,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
}

/// Elevation change over one interval next to the pace run over it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationImpact {
    pub elevation_change: f64,
    pub pace: f64,
    pub distance: f64,
}

/// Elevation against cumulative distance, plus gain and loss
///
/// Points without an elevation still advance the distance.
pub fn elevation_summary(track: &Track, samples: &[IntervalSample]) -> ElevationSummary {
    let mut summary = ElevationSummary::default();
    let Some(first) = track.points.first() else {
        return summary;
    };

    let mut distance = 0.0;
    let mut previous = first.elevation;
    if let Some(ele) = first.elevation {
        summary.profile.push(ProfilePoint { distance, elevation: ele });
    }

    for sample in samples {
        distance += sample.distance;
        let Some(ele) = sample.to.elevation else {
            continue;
        };

        if let Some(prev) = previous {
            let delta = ele - prev;
            if delta > 0.0 {
                summary.gain += delta;
            } else {
                summary.loss -= delta;
            }
        }
        previous = Some(ele);
        summary.profile.push(ProfilePoint { distance, elevation: ele });
    }

    let elevations = summary.profile.iter().map(|p| p.elevation);
    summary.min_elevation = elevations.clone().reduce(f64::min);
    summary.max_elevation = elevations.reduce(f64::max);
    summary
}

/// Pair each interval's elevation change with its pace
///
/// Intervals missing an elevation at either end are skipped, as are NaN paces.
pub fn elevation_impact(samples: &[IntervalSample]) -> Vec<ElevationImpact> {
    samples
        .iter()
        .filter(|s| !s.pace.is_nan())
        .filter_map(|s| {
            let change = s.to.elevation? - s.from.elevation?;
            Some(ElevationImpact {
                elevation_change: change,
                pace: s.pace,
                distance: s.distance,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackPoint;
    use crate::segments::interval_samples;
    use chrono::{TimeZone, Utc};

    fn track(elevations: &[Option<f64>]) -> Track {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        Track::from_points(
            elevations
                .iter()
                .enumerate()
                .map(|(i, &elevation)| TrackPoint {
                    latitude: 40.0 + (i as f64 * 0.1 / crate::geo::EARTH_RADIUS_MILES).to_degrees(),
                    longitude: -105.0,
                    elevation,
                    timestamp: (start + chrono::Duration::seconds(60 * i as i64)).fixed_offset(),
                    heart_rate: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_gain_and_loss() {
        let track = track(&[Some(100.0), Some(110.0), Some(105.0), None, Some(120.0)]);
        let samples = interval_samples(&track, 8.0, false);
        let summary = elevation_summary(&track, &samples);

        assert_eq!(summary.gain, 25.0);
        assert_eq!(summary.loss, 5.0);
        assert_eq!(summary.profile.len(), 4);
        assert!((summary.profile[3].distance - 0.4).abs() < 1e-9);
        assert_eq!(summary.min_elevation, Some(100.0));
        assert_eq!(summary.max_elevation, Some(120.0));
    }

    #[test]
    fn test_no_elevation_data() {
        let track = track(&[None, None, None]);
        let samples = interval_samples(&track, 8.0, false);
        let summary = elevation_summary(&track, &samples);
        assert!(summary.profile.is_empty());
        assert_eq!(summary.gain, 0.0);
        assert_eq!(summary.max_elevation, None);
        assert!(elevation_impact(&samples).is_empty());
    }

    #[test]
    fn test_elevation_impact() {
        let track = track(&[Some(100.0), Some(110.0), None, Some(90.0)]);
        let impact = elevation_impact(&interval_samples(&track, 8.0, false));
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[0].elevation_change, 10.0);
        assert!((impact[0].pace - 10.0).abs() < 1e-6);
    }
}
