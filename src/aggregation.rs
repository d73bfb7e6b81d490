//! Merging of short segments on high-frequency tracks
//!
//! Dense recordings produce many tiny same-class segments. Each segment that
//! is too short (in distance or duration) absorbs the one after it until the
//! result is long enough to stand on its own.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::Segment;

/// Paces faster than this (min/mile) are treated as merge artefacts
pub const IMPLAUSIBLE_PACE: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Segments shorter than this many miles are merged forward
    pub min_distance_threshold: f64,

    /// Segments shorter than this many seconds are merged forward
    pub min_time_threshold_secs: f64,

    /// Emit the last accumulator even when it is still too short
    pub emit_short_tail: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_distance_threshold: 0.01,
            min_time_threshold_secs: 5.0,
            emit_short_tail: true,
        }
    }
}

impl AggregationConfig {
    fn is_too_short(&self, segment: &Segment) -> bool {
        segment.distance < self.min_distance_threshold
            || segment.duration_seconds() < self.min_time_threshold_secs
    }
}

/// Segment being grown by absorbing its successors
struct Merge {
    segment: Segment,
    distance: f64,
    seconds: f64,
}

impl Merge {
    fn new(segment: &Segment) -> Self {
        Self {
            distance: segment.distance,
            seconds: segment.duration_seconds(),
            segment: segment.clone(),
        }
    }

    fn absorb(&mut self, next: &Segment) {
        let current = &mut self.segment;
        current.end_time = next.end_time;
        current.distance += next.distance;
        current
            .coordinates
            .extend(next.coordinates.iter().skip(1).copied());
        current.elevations.extend(next.elevations.iter().copied());
        current.total_hr += next.total_hr;
        current.hr_count += next.hr_count;

        self.distance += next.distance;
        self.seconds += next.duration_seconds();

        current.time_diff = self.seconds / 60.0;
        if self.distance > 0.0 {
            current.pace = current.time_diff / self.distance;
        }
        current.best_pace = current.best_pace.min(next.best_pace).min(current.pace);
    }
}

/// Merge segments that are too short into their successors
///
/// Never returns more segments than it was given, and the merged distance is
/// the sum of its parts.
pub fn aggregate_short_segments(segments: &[Segment], config: &AggregationConfig) -> Vec<Segment> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut aggregated = Vec::with_capacity(segments.len());
    let mut current = Merge::new(first);

    for next in &segments[1..] {
        if config.is_too_short(&current.segment) {
            current.absorb(next);
        } else {
            aggregated.push(current.segment);
            current = Merge::new(next);
        }
    }

    if config.emit_short_tail || !config.is_too_short(&current.segment) {
        aggregated.push(current.segment);
    } else {
        debug!(
            distance = current.segment.distance,
            seconds = current.segment.duration_seconds(),
            "Dropping short trailing segment"
        );
    }

    for segment in &mut aggregated {
        if segment.hr_count > 0 {
            segment.avg_hr = segment.total_hr as f64 / f64::from(segment.hr_count);
        }

        if segment.pace < IMPLAUSIBLE_PACE {
            let minutes = segment.duration_seconds() / 60.0;
            if segment.distance > 0.0 && minutes > 0.0 {
                segment.pace = minutes / segment.distance;
                segment.best_pace = segment.pace;
            }
        }
    }

    info!(
        input = segments.len(),
        output = aggregated.len(),
        "Aggregated short segments"
    );
    aggregated
}
