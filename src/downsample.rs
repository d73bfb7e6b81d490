//! Adaptive downsampling for high-frequency tracks
//!
//! A track is reduced by four independent passes that each return a set of
//! point indices to keep:
//!
//! 1. time gap: one point per `min_time_gap_secs` since the last kept point
//! 2. heart rate: points whose HR moved more than `hr_delta_bpm` from the
//!    last kept point
//! 3. pace transitions: points where the fast/slow classification flips,
//!    plus their immediate neighbours
//! 4. overflow: if more than `max_kept_ratio` of the points survive, keep
//!    every 2nd survivor plus the transition points
//!
//! The first and last point are always kept.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::DownsampleError;
use crate::geo::haversine_miles;
use crate::import::gpx;
use crate::models::{Track, TrackPoint};

/// Tracks shorter than this are never considered high-frequency
pub const MIN_DETECTION_POINTS: usize = 50;

/// Tracks shorter than this are never downsampled
pub const MIN_DOWNSAMPLE_POINTS: usize = 100;

/// Downsampling and detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownsampleConfig {
    /// Density (points per minute) above which a track is high-frequency
    pub threshold_per_minute: f64,

    /// Length of the opening window used to measure density
    pub sample_window_minutes: f64,

    /// Minimum seconds between points kept by the time-gap pass
    pub min_time_gap_secs: f64,

    /// Time gap used instead when the track exceeds one point per second
    pub high_density_time_gap_secs: f64,

    /// Heart-rate change (bpm) that forces a point to be kept
    pub hr_delta_bpm: u16,

    /// Fraction of the original points above which the overflow pass runs
    pub max_kept_ratio: f64,
}

impl Default for DownsampleConfig {
    fn default() -> Self {
        Self {
            threshold_per_minute: 20.0,
            sample_window_minutes: 2.0,
            min_time_gap_secs: 3.0,
            high_density_time_gap_secs: 5.0,
            hr_delta_bpm: 5,
            max_kept_ratio: 0.5,
        }
    }
}

impl DownsampleConfig {
    pub fn validate(&self) -> Result<(), DownsampleError> {
        let positive = [
            ("threshold_per_minute", self.threshold_per_minute),
            ("sample_window_minutes", self.sample_window_minutes),
            ("min_time_gap_secs", self.min_time_gap_secs),
            ("high_density_time_gap_secs", self.high_density_time_gap_secs),
        ];
        for (setting, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DownsampleError::InvalidSetting {
                    setting: setting.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if !(self.max_kept_ratio > 0.0 && self.max_kept_ratio <= 1.0) {
            return Err(DownsampleError::InvalidSetting {
                setting: "max_kept_ratio".to_string(),
                value: self.max_kept_ratio.to_string(),
            });
        }

        Ok(())
    }
}

/// Points per minute over the opening `sample_window_minutes` of the track
///
/// Uses the whole track duration when it is shorter than the window.
/// Returns `None` when there are fewer than two points or no elapsed time.
pub fn density_per_minute(track: &Track, sample_window_minutes: f64) -> Option<f64> {
    if track.len() < 2 {
        return None;
    }

    let mut times: Vec<_> = track.points.iter().map(|p| p.timestamp).collect();
    times.sort();

    let start = times[0];
    let span_minutes = (times[times.len() - 1] - start).num_milliseconds() as f64 / 60_000.0;
    let window_ms = (sample_window_minutes * 60_000.0) as i64;
    let cutoff = start + chrono::Duration::milliseconds(window_ms);

    let in_window = times.iter().filter(|&&t| t <= cutoff).count();
    let actual_minutes = sample_window_minutes.min(span_minutes);

    if actual_minutes > 0.0 {
        Some(in_window as f64 / actual_minutes)
    } else {
        None
    }
}

/// Whether the track is dense enough to warrant downsampling
pub fn needs_downsampling(
    track: &Track,
    threshold_per_minute: f64,
    sample_window_minutes: f64,
) -> bool {
    if track.document_points() < MIN_DETECTION_POINTS {
        return false;
    }

    match density_per_minute(track, sample_window_minutes) {
        Some(density) => {
            debug!(density, threshold_per_minute, "Measured track density");
            density > threshold_per_minute
        }
        None => false,
    }
}

/// Pass 1: keep a point once `min_gap_secs` have elapsed since the last kept one
pub fn time_gap_pass(points: &[TrackPoint], min_gap_secs: f64) -> BTreeSet<usize> {
    let mut kept = endpoints(points.len());
    if points.len() < 3 {
        return kept;
    }

    let mut last_kept = 0;
    for i in 1..points.len() - 1 {
        if points[i].seconds_since(&points[last_kept]) >= min_gap_secs {
            kept.insert(i);
            last_kept = i;
        }
    }
    kept
}

/// Pass 2: keep points whose heart rate differs from the last kept point's
///
/// `already_kept` supplies the anchors from earlier passes; only newly kept
/// indices are returned.
pub fn heart_rate_pass(
    points: &[TrackPoint],
    already_kept: &BTreeSet<usize>,
    delta_bpm: u16,
) -> BTreeSet<usize> {
    let mut added = BTreeSet::new();
    if points.len() < 3 {
        return added;
    }

    let mut anchor = 0;
    for i in 1..points.len() - 1 {
        if already_kept.contains(&i) {
            anchor = i;
            continue;
        }

        if let (Some(hr), Some(anchor_hr)) = (points[i].heart_rate, points[anchor].heart_rate) {
            if hr.abs_diff(anchor_hr) > delta_bpm {
                added.insert(i);
                anchor = i;
            }
        }
    }
    added
}

/// Fast/slow status of the interval ending at each point
///
/// Index 0 and intervals with no elapsed time or no distance are `None`.
pub fn pace_statuses(points: &[TrackPoint], pace_limit: f64) -> Vec<Option<bool>> {
    let mut statuses = Vec::with_capacity(points.len());
    if points.is_empty() {
        return statuses;
    }
    statuses.push(None);

    for pair in points.windows(2) {
        let seconds = pair[1].seconds_since(&pair[0]);
        let distance = haversine_miles(
            pair[0].latitude,
            pair[0].longitude,
            pair[1].latitude,
            pair[1].longitude,
        );

        let status = if seconds > 0.0 && distance > 0.0 {
            let pace = (seconds / 60.0) / distance;
            Some(pace <= pace_limit)
        } else {
            None
        };
        statuses.push(status);
    }
    statuses
}

/// Interior indices where the classification flips relative to the preceding pair
pub fn transition_points(points: &[TrackPoint], pace_limit: f64) -> Vec<usize> {
    let statuses = pace_statuses(points, pace_limit);
    if statuses.len() < 3 {
        return Vec::new();
    }

    (1..statuses.len() - 1)
        .filter(|&i| match (statuses[i - 1], statuses[i]) {
            (Some(previous), Some(current)) => previous != current,
            _ => false,
        })
        .collect()
}

/// Pass 3: each transition point together with its neighbours
pub fn pace_transition_pass(points: &[TrackPoint], pace_limit: f64) -> BTreeSet<usize> {
    transition_points(points, pace_limit)
        .into_iter()
        .flat_map(|i| [i - 1, i, i + 1])
        .collect()
}

/// Pass 4: thin an oversized selection to every `keep_every_n`-th survivor
///
/// Points in `protected` (transitions and their neighbours) and the first and
/// last survivor are never thinned.
pub fn overflow_pass(
    kept: &BTreeSet<usize>,
    protected: &BTreeSet<usize>,
    keep_every_n: usize,
) -> BTreeSet<usize> {
    let ordered: Vec<usize> = kept.iter().copied().collect();
    if ordered.len() <= 2 {
        return kept.clone();
    }

    let every = keep_every_n.max(1);
    let last = ordered.len() - 1;

    ordered
        .iter()
        .enumerate()
        .filter(|&(position, idx)| {
            position == 0 || position == last || protected.contains(idx) || position % every == 0
        })
        .map(|(_, &idx)| idx)
        .collect()
}

/// Result of running all four passes over a point sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub kept: BTreeSet<usize>,
    pub transitions: usize,
    pub overflow_filtered: bool,
}

/// Run the passes in order and merge their index sets
pub fn select_points(
    points: &[TrackPoint],
    min_gap_secs: f64,
    hr_delta_bpm: u16,
    pace_limit: Option<f64>,
    max_kept_ratio: f64,
) -> Selection {
    let mut kept = time_gap_pass(points, min_gap_secs);
    let by_heart_rate = heart_rate_pass(points, &kept, hr_delta_bpm);
    kept.extend(by_heart_rate);

    let mut transitions = 0;
    let mut protected = BTreeSet::new();
    if let Some(limit) = pace_limit {
        transitions = transition_points(points, limit).len();
        protected = pace_transition_pass(points, limit);
        kept.extend(protected.iter().copied());
    }

    let mut overflow_filtered = false;
    if kept.len() as f64 > points.len() as f64 * max_kept_ratio {
        kept = overflow_pass(&kept, &protected, 2);
        overflow_filtered = true;
    }

    Selection {
        kept,
        transitions,
        overflow_filtered,
    }
}

/// Outcome of a downsampling attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownsampleOutcome {
    /// False when the track was left untouched
    pub applied: bool,

    /// Indices (into the input track) that survive
    #[serde(skip)]
    pub kept: BTreeSet<usize>,

    pub original_points: usize,

    pub kept_points: usize,

    /// Time gap actually used by the first pass
    pub effective_time_gap_secs: f64,

    /// Number of pace transitions found
    pub transitions: usize,

    /// Whether the overflow pass had to thin the selection
    pub overflow_filtered: bool,
}

impl DownsampleOutcome {
    fn untouched(track: &Track, gap: f64) -> Self {
        let kept: BTreeSet<usize> = (0..track.len()).collect();
        Self {
            applied: false,
            original_points: track.len(),
            kept_points: kept.len(),
            kept,
            effective_time_gap_secs: gap,
            transitions: 0,
            overflow_filtered: false,
        }
    }

    /// Share of the original points removed, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.original_points == 0 {
            return 0.0;
        }
        (1.0 - self.kept_points as f64 / self.original_points as f64) * 100.0
    }
}

/// Applies the four-pass reduction to a track
#[derive(Debug, Clone, Default)]
pub struct Downsampler {
    pub config: DownsampleConfig,
}

impl Downsampler {
    pub fn new(config: DownsampleConfig) -> Self {
        Self { config }
    }

    /// Detection using this downsampler's thresholds
    pub fn needs_downsampling(&self, track: &Track) -> bool {
        needs_downsampling(
            track,
            self.config.threshold_per_minute,
            self.config.sample_window_minutes,
        )
    }

    /// Choose the points to keep
    ///
    /// Tracks under [`MIN_DOWNSAMPLE_POINTS`] come back untouched with
    /// `applied == false`.
    pub fn downsample(
        &self,
        track: &Track,
        pace_limit: Option<f64>,
    ) -> Result<DownsampleOutcome, DownsampleError> {
        self.config.validate()?;
        if let Some(limit) = pace_limit {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(DownsampleError::InvalidSetting {
                    setting: "pace_limit".to_string(),
                    value: limit.to_string(),
                });
            }
        }

        let n = track.len();
        let document_points = track.document_points();
        if document_points < MIN_DOWNSAMPLE_POINTS {
            debug!(points = document_points, "Not enough track points to downsample");
            return Ok(DownsampleOutcome::untouched(track, self.config.min_time_gap_secs));
        }

        // Rough density assuming a 30 minute recording; above one point per
        // second the minimum gap is widened.
        let mut gap = self.config.min_time_gap_secs;
        if document_points as f64 / 30.0 > 60.0 {
            gap = gap.max(self.config.high_density_time_gap_secs);
            debug!(gap, "High frequency track, widening minimum time gap");
        }

        let selection = select_points(
            &track.points,
            gap,
            self.config.hr_delta_bpm,
            pace_limit,
            self.config.max_kept_ratio,
        );

        let outcome = DownsampleOutcome {
            applied: true,
            original_points: n,
            kept_points: selection.kept.len(),
            kept: selection.kept,
            effective_time_gap_secs: gap,
            transitions: selection.transitions,
            overflow_filtered: selection.overflow_filtered,
        };

        info!(
            original = outcome.original_points,
            kept = outcome.kept_points,
            transitions = outcome.transitions,
            reduction_percent = outcome.reduction_percent(),
            "Downsampled track"
        );

        Ok(outcome)
    }

    /// Downsample and also rewrite the source GPX document
    pub fn downsample_document(
        &self,
        bytes: &[u8],
        track: &Track,
        pace_limit: Option<f64>,
    ) -> Result<(DownsampleOutcome, Vec<u8>), DownsampleError> {
        let outcome = self.downsample(track, pace_limit)?;
        let ordinals = track.ordinals_for(&outcome.kept);
        let document = gpx::write_reduced(bytes, &ordinals)?;
        Ok((outcome, document))
    }
}

fn endpoints(len: usize) -> BTreeSet<usize> {
    let mut set = BTreeSet::new();
    if len > 0 {
        set.insert(0);
        set.insert(len - 1);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const MILE_DEG: f64 = 1.0 / 3956.0 * 57.29577951308232;

    /// Point `secs` after the start, `miles` north of the origin
    fn point(secs: f64, miles: f64, hr: Option<u16>) -> TrackPoint {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        TrackPoint {
            latitude: 40.0 + miles * MILE_DEG,
            longitude: -105.0,
            elevation: None,
            timestamp: (start + chrono::Duration::milliseconds((secs * 1000.0) as i64))
                .fixed_offset(),
            heart_rate: hr,
        }
    }

    /// Steady 8:00/mile track sampled every `interval` seconds
    fn steady_track(count: usize, interval: f64) -> Track {
        let miles_per_sec = 1.0 / 480.0;
        Track::from_points(
            (0..count)
                .map(|i| {
                    let t = i as f64 * interval;
                    point(t, t * miles_per_sec, Some(150))
                })
                .collect(),
        )
    }

    #[test]
    fn test_needs_downsampling_dense_track() {
        // 150 points at 1 second: 121 points in the first 2 minutes
        let track = steady_track(150, 1.0);
        assert!(needs_downsampling(&track, 20.0, 2.0));
        let density = density_per_minute(&track, 2.0).unwrap();
        assert!((density - 60.5).abs() < 1e-9);
    }

    #[test]
    fn test_needs_downsampling_short_circuits() {
        assert!(!needs_downsampling(&steady_track(49, 1.0), 20.0, 2.0));
        // 60 points every 5 seconds is 12 per minute
        assert!(!needs_downsampling(&steady_track(60, 5.0), 20.0, 2.0));
    }

    #[test]
    fn test_density_uses_shorter_duration() {
        // 60 points over 59 seconds: window shrinks to the actual span
        let track = steady_track(60, 1.0);
        let density = density_per_minute(&track, 2.0).unwrap();
        assert!((density - 60.0 / (59.0 / 60.0)).abs() < 1e-9);

        let single = steady_track(1, 1.0);
        assert!(density_per_minute(&single, 2.0).is_none());
    }

    #[test]
    fn test_time_gap_pass() {
        let points: Vec<_> = (0..10).map(|i| point(i as f64, 0.0, None)).collect();
        let kept = time_gap_pass(&points, 3.0);
        assert_eq!(kept.into_iter().collect::<Vec<_>>(), vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_heart_rate_pass() {
        let hrs = [140, 142, 147, 150, 150, 158, 150];
        let points: Vec<_> = hrs
            .iter()
            .enumerate()
            .map(|(i, &hr)| point(i as f64, 0.0, Some(hr)))
            .collect();
        let kept: BTreeSet<usize> = [0, 6].into_iter().collect();

        let added = heart_rate_pass(&points, &kept, 5);
        // 147 vs 140 -> keep 2; 150 vs 147 no; 158 vs 147 -> keep 5
        assert_eq!(added.into_iter().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn test_heart_rate_pass_uses_kept_anchor() {
        let hrs = [140, 160, 161, 161];
        let points: Vec<_> = hrs
            .iter()
            .enumerate()
            .map(|(i, &hr)| point(i as f64, 0.0, Some(hr)))
            .collect();
        let kept: BTreeSet<usize> = [0, 1, 3].into_iter().collect();

        // Index 2 is compared against kept index 1 (160), not the start
        assert!(heart_rate_pass(&points, &kept, 5).is_empty());
    }

    #[test]
    fn test_pace_transitions() {
        // 10 s per step; 0.03 mi per step is 5.6 min/mi (fast), 0.01 is 16.7 (slow)
        let steps = [0.03, 0.03, 0.03, 0.01, 0.01, 0.01, 0.03, 0.03];
        let mut miles = 0.0;
        let mut points = vec![point(0.0, 0.0, None)];
        for (i, step) in steps.iter().enumerate() {
            miles += step;
            points.push(point((i + 1) as f64 * 10.0, miles, None));
        }

        let statuses = pace_statuses(&points, 8.0);
        assert_eq!(statuses[0], None);
        assert_eq!(statuses[1], Some(true));
        assert_eq!(statuses[4], Some(false));

        assert_eq!(transition_points(&points, 8.0), vec![4, 7]);
        let pass = pace_transition_pass(&points, 8.0);
        assert_eq!(pass.into_iter().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_overflow_pass_keeps_protected_and_ends() {
        let kept: BTreeSet<usize> = (0..10).collect();
        let protected: BTreeSet<usize> = [3].into_iter().collect();
        let thinned = overflow_pass(&kept, &protected, 2);
        assert_eq!(thinned.into_iter().collect::<Vec<_>>(), vec![0, 2, 3, 4, 6, 8, 9]);
    }

    #[test]
    fn test_downsample_small_track_is_noop() {
        let track = steady_track(99, 1.0);
        let outcome = Downsampler::default().downsample(&track, Some(7.0)).unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.kept_points, 99);
        assert_eq!(outcome.reduction_percent(), 0.0);
    }

    #[test]
    fn test_downsample_reduces_dense_track() {
        let track = steady_track(600, 1.0);
        let outcome = Downsampler::default().downsample(&track, Some(7.0)).unwrap();

        assert!(outcome.applied);
        assert!(outcome.kept.contains(&0));
        assert!(outcome.kept.contains(&599));
        assert!(outcome.kept_points < 300);
        assert!(outcome.reduction_percent() > 50.0);
        assert_eq!(outcome.effective_time_gap_secs, 3.0);
    }

    #[test]
    fn test_adaptive_gap_for_very_dense_track() {
        let track = steady_track(2000, 0.5);
        let outcome = Downsampler::default().downsample(&track, None).unwrap();
        assert_eq!(outcome.effective_time_gap_secs, 5.0);
        assert!(outcome.kept.contains(&1999));
    }

    #[test]
    fn test_downsample_rejects_bad_settings() {
        let track = steady_track(200, 1.0);
        let downsampler = Downsampler::new(DownsampleConfig {
            min_time_gap_secs: 0.0,
            ..Default::default()
        });
        assert!(downsampler.downsample(&track, None).is_err());
        assert!(Downsampler::default().downsample(&track, Some(-1.0)).is_err());
    }

    #[test]
    fn test_gates_count_untimed_document_points() {
        // 45 timestamped points at 1 Hz out of 60 trkpt elements
        let mut track = steady_track(45, 1.0);
        track.total_trackpoints = 60;
        assert_eq!(track.document_points(), 60);
        assert!(needs_downsampling(&track, 20.0, 2.0));

        // 95 timestamped points out of 120 still meet the 100-point minimum
        let mut track = steady_track(95, 1.0);
        track.total_trackpoints = 120;
        let outcome = Downsampler::default().downsample(&track, Some(7.0)).unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.original_points, 95);
        assert!(outcome.kept.contains(&94));
    }

    #[test]
    fn test_adaptive_gap_uses_document_points() {
        // 1000 timed points, but 1900 trkpt elements puts n/30 above 60
        let mut track = steady_track(1000, 1.0);
        assert_eq!(
            Downsampler::default().downsample(&track, None).unwrap().effective_time_gap_secs,
            3.0
        );
        track.total_trackpoints = 1900;
        assert_eq!(
            Downsampler::default().downsample(&track, None).unwrap().effective_time_gap_secs,
            5.0
        );
    }
}
