//! Fast/slow segmentation of a track
//!
//! Consecutive points become [`IntervalSample`]s, each classified against the
//! pace limit. [`SegmentBuilder`] then folds runs of same-class samples into
//! [`Segment`]s with a one-sample lookahead.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::geo::{haversine_miles, pace_min_per_mile};
use crate::models::{Coordinate, Segment, Track, TrackPoint};

/// Below this distance (miles) a segment's accumulated distance is not trusted for pace
pub const MIN_TRUSTED_DISTANCE: f64 = 0.005;

/// Floor applied to the distance divisor when falling back
pub const MIN_PACE_DISTANCE: f64 = 0.001;

/// Interval distances below this are treated as noise on high-frequency tracks
pub const HIGH_FREQUENCY_NOISE_DISTANCE: f64 = 0.001;

/// Derived measurements between two consecutive points
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalSample {
    pub from: TrackPoint,
    pub to: TrackPoint,

    /// Miles between the two points
    pub distance: f64,

    /// Minutes between the two points
    pub time_delta: f64,

    /// Minutes per mile, infinite when undefined
    pub pace: f64,

    /// Heart rate recorded at the later point
    pub heart_rate: Option<u16>,

    pub is_fast: bool,

    /// Classification differs from the preceding sample
    pub pace_transition: bool,
}

impl IntervalSample {
    pub fn between(
        from: &TrackPoint,
        to: &TrackPoint,
        pace_limit: f64,
        high_frequency: bool,
    ) -> Self {
        let distance = haversine_miles(from.latitude, from.longitude, to.latitude, to.longitude);
        let time_delta = to.seconds_since(from) / 60.0;

        let pace = if high_frequency && distance < HIGH_FREQUENCY_NOISE_DISTANCE {
            f64::INFINITY
        } else {
            pace_min_per_mile(time_delta, distance)
        };

        Self {
            from: *from,
            to: *to,
            distance,
            time_delta,
            pace,
            heart_rate: to.heart_rate,
            is_fast: pace.is_finite() && pace <= pace_limit,
            pace_transition: false,
        }
    }
}

/// One sample per pair of consecutive points
pub fn interval_samples(track: &Track, pace_limit: f64, high_frequency: bool) -> Vec<IntervalSample> {
    let mut samples: Vec<IntervalSample> = Vec::with_capacity(track.len().saturating_sub(1));

    for pair in track.points.windows(2) {
        let mut sample = IntervalSample::between(&pair[0], &pair[1], pace_limit, high_frequency);
        if let Some(previous) = samples.last() {
            sample.pace_transition = previous.is_fast != sample.is_fast;
        }
        samples.push(sample);
    }

    samples
}

/// Running totals for the segment under construction
#[derive(Debug, Clone)]
struct Accumulator {
    is_fast: bool,
    start_time: DateTime<FixedOffset>,
    points: Vec<TrackPoint>,
    coordinates: Vec<Coordinate>,
    distance: f64,
    total_hr: u64,
    hr_count: u32,
    fastest_sample: f64,
}

impl Accumulator {
    fn start(seed: &TrackPoint, is_fast: bool) -> Self {
        Self {
            is_fast,
            start_time: seed.timestamp,
            points: vec![*seed],
            coordinates: vec![seed.coordinate()],
            distance: 0.0,
            total_hr: 0,
            hr_count: 0,
            fastest_sample: f64::INFINITY,
        }
    }

    fn add(&mut self, sample: &IntervalSample) {
        self.points.push(sample.to);
        self.coordinates.push(sample.to.coordinate());
        self.distance += sample.distance;

        if let Some(hr) = sample.heart_rate.filter(|&hr| hr > 0) {
            self.total_hr += u64::from(hr);
            self.hr_count += 1;
        }

        if sample.pace.is_finite() && sample.pace > 0.0 {
            self.fastest_sample = self.fastest_sample.min(sample.pace);
        }
    }

    fn finalize(self) -> Option<Segment> {
        if self.coordinates.len() < 2 {
            return None;
        }
        let end_time = self.points.last()?.timestamp;

        let seconds = (end_time - self.start_time).num_milliseconds() as f64 / 1000.0;
        let time_diff = seconds / 60.0;

        let pace = if time_diff < 0.0 {
            f64::INFINITY
        } else if self.distance > MIN_TRUSTED_DISTANCE {
            time_diff / self.distance
        } else {
            let straight: f64 = self
                .points
                .windows(2)
                .map(|w| haversine_miles(w[0].latitude, w[0].longitude, w[1].latitude, w[1].longitude))
                .sum();

            if straight > self.distance {
                time_diff / straight
            } else {
                time_diff / self.distance.max(MIN_PACE_DISTANCE)
            }
        };

        let avg_hr = if self.hr_count > 0 {
            self.total_hr as f64 / f64::from(self.hr_count)
        } else {
            0.0
        };

        let best_pace = if self.fastest_sample.is_finite() {
            self.fastest_sample
        } else {
            pace
        };

        Some(Segment {
            is_fast: self.is_fast,
            start_time: self.start_time,
            end_time,
            elevations: self.points.iter().filter_map(|p| p.elevation).collect(),
            coordinates: self.coordinates,
            distance: self.distance,
            avg_hr,
            total_hr: self.total_hr,
            hr_count: self.hr_count,
            time_diff,
            pace,
            best_pace,
        })
    }
}

/// Folds the interval stream into contiguous same-class segments
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    current: Option<Accumulator>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample, peeking at the one after it
    ///
    /// Returns a finished segment when `next` switches class.
    pub fn push(&mut self, sample: &IntervalSample, next: Option<&IntervalSample>) -> Option<Segment> {
        let current = self
            .current
            .get_or_insert_with(|| Accumulator::start(&sample.from, sample.is_fast));
        current.add(sample);
        let class_changes = matches!(next, Some(next) if next.is_fast != current.is_fast);

        if class_changes {
            self.current.take().and_then(Accumulator::finalize)
        } else {
            None
        }
    }

    /// Close whatever is still open
    pub fn finish(&mut self) -> Option<Segment> {
        self.current.take().and_then(Accumulator::finalize)
    }

    /// Segment a whole sample stream
    pub fn build(samples: &[IntervalSample]) -> Vec<Segment> {
        let mut builder = SegmentBuilder::new();
        let mut segments = Vec::new();

        for (i, sample) in samples.iter().enumerate() {
            if let Some(segment) = builder.push(sample, samples.get(i + 1)) {
                segments.push(segment);
            }
        }
        segments.extend(builder.finish());

        debug!(
            samples = samples.len(),
            segments = segments.len(),
            "Built pace segments"
        );
        segments
    }
}

/// Split segments into (fast, slow), preserving order
pub fn partition(segments: &[Segment]) -> (Vec<Segment>, Vec<Segment>) {
    segments
        .iter()
        .filter(|s| s.coordinates.len() >= 2)
        .cloned()
        .partition(|s| s.is_fast)
}
