use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// `[latitude, longitude]` pair as emitted for route rendering
pub type Coordinate = [f64; 2];

/// Single GPS sample parsed from an activity file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// Elevation in meters above sea level
    pub elevation: Option<f64>,

    /// Sample time, already converted to the display offset
    pub timestamp: DateTime<FixedOffset>,

    /// Heart rate in beats per minute
    pub heart_rate: Option<u16>,
}

impl TrackPoint {
    pub fn coordinate(&self) -> Coordinate {
        [self.latitude, self.longitude]
    }

    /// Seconds elapsed from `earlier` to this point (negative if out of order)
    pub fn seconds_since(&self, earlier: &TrackPoint) -> f64 {
        (self.timestamp - earlier.timestamp).num_milliseconds() as f64 / 1000.0
    }
}

/// Ordered sequence of track points plus the document metadata we keep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    /// Timestamped points in document order
    pub points: Vec<TrackPoint>,

    /// For each point, its ordinal among all `trkpt` elements of the source
    pub source_ordinals: Vec<usize>,

    /// Number of `trkpt` elements seen, including skipped ones
    pub total_trackpoints: usize,

    /// Points dropped because a coordinate or timestamp was unusable
    pub skipped_points: usize,

    /// Application that wrote the file (`creator` attribute)
    pub creator: Option<String>,

    /// First track name in the document
    pub name: Option<String>,
}

impl Track {
    /// Build a track from points that did not come from a document
    pub fn from_points(points: Vec<TrackPoint>) -> Self {
        let count = points.len();
        Self {
            points,
            source_ordinals: (0..count).collect(),
            total_trackpoints: count,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Track points in the source document, timestamped or not
    pub fn document_points(&self) -> usize {
        self.total_trackpoints.max(self.points.len())
    }

    /// Elapsed seconds between the first and last point
    pub fn duration_seconds(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.seconds_since(first),
            _ => 0.0,
        }
    }

    /// Every recorded heart rate, in order
    pub fn heart_rates(&self) -> Vec<u16> {
        self.points.iter().filter_map(|p| p.heart_rate).collect()
    }

    /// New track holding only the points at `indices`; metadata is preserved
    pub fn select(&self, indices: &BTreeSet<usize>) -> Track {
        let mut points = Vec::with_capacity(indices.len());
        let mut source_ordinals = Vec::with_capacity(indices.len());

        for &i in indices.iter().filter(|&&i| i < self.points.len()) {
            points.push(self.points[i]);
            source_ordinals.push(self.source_ordinals.get(i).copied().unwrap_or(i));
        }

        Track {
            points,
            source_ordinals,
            total_trackpoints: self.total_trackpoints,
            skipped_points: self.skipped_points,
            creator: self.creator.clone(),
            name: self.name.clone(),
        }
    }

    /// Source ordinals of the points at `indices`
    pub fn ordinals_for(&self, indices: &BTreeSet<usize>) -> BTreeSet<usize> {
        indices
            .iter()
            .filter_map(|&i| self.source_ordinals.get(i).copied())
            .collect()
    }
}

/// Contiguous stretch of same-class effort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Whether the stretch was at or under the pace limit
    pub is_fast: bool,

    pub start_time: DateTime<FixedOffset>,

    pub end_time: DateTime<FixedOffset>,

    /// Route coordinates, always at least two
    pub coordinates: Vec<Coordinate>,

    /// Distance in miles
    pub distance: f64,

    /// Average heart rate, 0 when no samples carried one
    pub avg_hr: f64,

    /// Sum of heart-rate samples, kept so merges can re-average
    pub total_hr: u64,

    /// Number of heart-rate samples in `total_hr`
    pub hr_count: u32,

    /// Moving time in minutes
    pub time_diff: f64,

    /// Minutes per mile
    pub pace: f64,

    /// Fastest interval pace inside the segment (minutes per mile)
    ///
    /// Unlike `pace`, which is total time over total distance, this is the
    /// single quickest point-to-point interval, so it is never slower.
    pub best_pace: f64,

    /// Elevations (meters) of the points that make up the segment
    pub elevations: Vec<f64>,
}

impl Segment {
    /// Wall-clock span of the segment in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn start_point(&self) -> Option<Coordinate> {
        self.coordinates.first().copied()
    }

    pub fn end_point(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }

    pub fn effort(&self) -> Effort {
        if self.is_fast {
            Effort::Fast
        } else {
            Effort::Slow
        }
    }
}

/// Fast/slow classification relative to the pace limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Fast,
    Slow,
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effort::Fast => write!(f, "fast"),
            Effort::Slow => write!(f, "slow"),
        }
    }
}

/// Route-rendering view of a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    #[serde(rename = "type")]
    pub effort: Effort,
    pub coordinates: Vec<Coordinate>,
    pub pace: f64,
    pub distance: f64,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

impl From<&Segment> for RouteSegment {
    fn from(segment: &Segment) -> Self {
        RouteSegment {
            effort: segment.effort(),
            coordinates: segment.coordinates.clone(),
            pace: segment.pace,
            distance: segment.distance,
            start_time: segment.start_time,
            end_time: segment.end_time,
        }
    }
}

/// Athlete gender, accepted for future formula variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

/// Optional athlete inputs for the derived metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteMetrics {
    /// Age in years
    pub age: Option<u32>,

    /// Resting heart rate in bpm
    pub resting_hr: Option<u16>,

    /// Body weight in pounds
    pub weight_lbs: Option<f64>,

    pub gender: Option<Gender>,
}

impl AthleteMetrics {
    /// Age, treating zero as "not supplied"
    pub fn age(&self) -> Option<u32> {
        self.age.filter(|&a| a > 0)
    }

    /// Resting HR, treating zero as "not supplied"
    pub fn resting_hr(&self) -> Option<u16> {
        self.resting_hr.filter(|&hr| hr > 0)
    }

    /// Body weight converted to kilograms
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight_lbs
            .filter(|w| w.is_finite() && *w > 0.0)
            .map(|w| w * crate::geo::LBS_TO_KG)
    }
}
