//! End-to-end run analysis
//!
//! raw GPX bytes → [`GpxLoader`] → density check → (optional) [`Downsampler`]
//! → interval samples → [`SegmentBuilder`] → (high-frequency only)
//! aggregation → metrics → [`AnalysisResult`].
//!
//! Each call is self-contained: nothing is shared between analyses, so
//! independent runs can be analyzed from different threads.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::aggregation::{aggregate_short_segments, AggregationConfig};
use crate::downsample::{DownsampleConfig, DownsampleOutcome, Downsampler};
use crate::elevation::{elevation_impact, elevation_summary, ElevationImpact, ElevationSummary};
use crate::error::{PacersError, Result};
use crate::geo::MILES_TO_KM;
use crate::import::{read_track_file, GpxLoader, TrackLoader};
use crate::models::{AthleteMetrics, RouteSegment, Segment, Track};
use crate::running::{pace_recommendations, predict_race_times, PaceRecommendations, RacePredictions};
use crate::segments::{interval_samples, partition, IntervalSample, SegmentBuilder};
use crate::splits::{mile_splits, MileSplit};
use crate::training_load::{recovery_time, training_load};
use crate::vo2max::{estimate_vo2max, Vo2MaxInputs};
use crate::zones::{calculate_training_zones, sample_interval_secs, TrainingZones};

/// Pipeline tuning shared by every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Pace limit (min/mile) used when a caller does not supply one
    pub default_pace_limit: f64,

    /// Reduce high-frequency tracks before segmenting
    pub downsample_enabled: bool,

    pub downsample: DownsampleConfig,

    pub aggregation: AggregationConfig,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_pace_limit: 8.0,
            downsample_enabled: true,
            downsample: DownsampleConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

/// Per-call inputs
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Minutes per mile separating fast from slow
    pub pace_limit: f64,
    pub athlete: AthleteMetrics,
}

impl AnalysisRequest {
    pub fn new(pace_limit: f64) -> Self {
        Self {
            pace_limit,
            athlete: AthleteMetrics::default(),
        }
    }

    pub fn with_athlete(mut self, athlete: AthleteMetrics) -> Self {
        self.athlete = athlete;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pace_limit.is_finite() && self.pace_limit > 0.0) {
            return Err(PacersError::invalid_parameter(
                "pace_limit",
                self.pace_limit,
                "must be a positive number of minutes per mile",
            ));
        }
        Ok(())
    }
}

/// Everything derived from one run
///
/// Distances are in miles and paces in minutes per mile. Undefined paces are
/// `f64::INFINITY`; metrics whose inputs were missing are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// File the run came from, when analyzed from disk
    pub source: Option<String>,
    pub creator: Option<String>,
    pub name: Option<String>,
    pub pace_limit: f64,

    pub total_distance: f64,
    pub fast_distance: f64,
    pub slow_distance: f64,
    pub percentage_fast: f64,
    pub percentage_slow: f64,
    pub duration_minutes: f64,

    pub avg_hr_all: f64,
    pub avg_hr_fast: f64,
    pub avg_hr_slow: f64,
    pub max_hr: Option<u16>,

    pub fast_segments: Vec<Segment>,
    pub slow_segments: Vec<Segment>,
    pub route_data: Vec<RouteSegment>,

    pub training_zones: Option<TrainingZones>,
    pub pace_recommendations: Option<PaceRecommendations>,
    pub vo2max: Option<f64>,
    pub training_load: Option<f64>,
    pub recovery_time: Option<f64>,
    pub race_predictions: Option<RacePredictions>,

    pub mile_splits: Vec<MileSplit>,
    pub elevation: ElevationSummary,
    pub elevation_impact: Vec<ElevationImpact>,

    pub is_high_frequency: bool,
    /// Present when a downsampling attempt succeeded
    pub downsampling: Option<DownsampleOutcome>,
    /// Points that went into segmentation
    pub point_count: usize,
    /// Track points dropped while parsing
    pub skipped_points: usize,
}

impl AnalysisResult {
    /// Fast and slow segments in time order
    pub fn segments(&self) -> Vec<&Segment> {
        let mut all: Vec<&Segment> = self
            .fast_segments
            .iter()
            .chain(self.slow_segments.iter())
            .collect();
        all.sort_by_key(|s| s.start_time);
        all
    }

    /// Minutes summed over all segments
    pub fn segment_minutes(&self) -> f64 {
        self.fast_segments
            .iter()
            .chain(self.slow_segments.iter())
            .map(|s| s.time_diff)
            .sum()
    }

    /// Average pace over the whole run
    pub fn average_pace(&self) -> f64 {
        crate::geo::pace_min_per_mile(self.segment_minutes(), self.total_distance)
    }
}

/// Runs the full pipeline
#[derive(Debug, Clone, Default)]
pub struct RunAnalyzer {
    pub settings: AnalysisSettings,
    loader: GpxLoader,
}

impl RunAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            loader: GpxLoader::new(),
        }
    }

    /// Use a loader that converts timestamps to a different display offset
    pub fn with_loader(mut self, loader: GpxLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Analyze an in-memory GPX document
    pub fn analyze(&self, bytes: &[u8], request: &AnalysisRequest) -> Result<AnalysisResult> {
        request.validate()?;
        let track = self.loader.load(bytes)?;
        self.analyze_track(track, request)
    }

    /// Read and analyze a GPX file
    pub fn analyze_file(&self, path: &Path, request: &AnalysisRequest) -> Result<AnalysisResult> {
        request.validate()?;
        let (_, track) = read_track_file(&self.loader, path)?;
        let mut result = self.analyze_track(track, request)?;
        result.source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(result)
    }

    /// Analyze an already-parsed track
    pub fn analyze_track(&self, track: Track, request: &AnalysisRequest) -> Result<AnalysisResult> {
        request.validate()?;
        let pace_limit = request.pace_limit;

        if track.len() < 2 {
            return Err(PacersError::InsufficientData(format!(
                "{} timestamped track point(s), at least 2 are required",
                track.len()
            )));
        }

        info!(
            points = track.len(),
            skipped = track.skipped_points,
            pace_limit,
            "Starting run analysis"
        );

        let downsampler = Downsampler::new(self.settings.downsample.clone());
        let is_high_frequency = downsampler.needs_downsampling(&track);
        let (track, downsampling) = if is_high_frequency && self.settings.downsample_enabled {
            self.reduce(&downsampler, track, pace_limit)
        } else {
            (track, None)
        };

        let samples = interval_samples(&track, pace_limit, is_high_frequency);
        let segments = SegmentBuilder::build(&samples);
        let (mut fast_segments, mut slow_segments) = partition(&segments);

        if is_high_frequency {
            fast_segments = aggregate_short_segments(&fast_segments, &self.settings.aggregation);
            slow_segments = aggregate_short_segments(&slow_segments, &self.settings.aggregation);
        }

        let result = self.summarize(
            &track,
            &samples,
            &segments,
            fast_segments,
            slow_segments,
            request,
            is_high_frequency,
            downsampling,
        );

        info!(
            total_distance = result.total_distance,
            fast_distance = result.fast_distance,
            slow_distance = result.slow_distance,
            fast_segments = result.fast_segments.len(),
            slow_segments = result.slow_segments.len(),
            "Run analysis complete"
        );

        Ok(result)
    }

    /// Downsample, falling back to the original track on failure
    fn reduce(
        &self,
        downsampler: &Downsampler,
        track: Track,
        pace_limit: f64,
    ) -> (Track, Option<DownsampleOutcome>) {
        match downsampler.downsample(&track, Some(pace_limit)) {
            Ok(outcome) if outcome.applied => {
                let reduced = track.select(&outcome.kept);
                (reduced, Some(outcome))
            }
            Ok(outcome) => (track, Some(outcome)),
            Err(e) => {
                warn!(error = %e, "Downsampling failed, using original track");
                (track, None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn summarize(
        &self,
        track: &Track,
        samples: &[IntervalSample],
        segments: &[Segment],
        fast_segments: Vec<Segment>,
        slow_segments: Vec<Segment>,
        request: &AnalysisRequest,
        is_high_frequency: bool,
        downsampling: Option<DownsampleOutcome>,
    ) -> AnalysisResult {
        let athlete = &request.athlete;

        let total_distance: f64 = samples.iter().map(|s| s.distance).sum();
        let fast_distance: f64 = fast_segments.iter().map(|s| s.distance).sum();
        let slow_distance: f64 = slow_segments.iter().map(|s| s.distance).sum();
        let share = |part: f64| {
            if total_distance > 0.0 {
                part / total_distance * 100.0
            } else {
                0.0
            }
        };

        let heart_rates = track.heart_rates();
        let avg_hr = mean(heart_rates.iter().map(|&hr| f64::from(hr)));
        let max_hr = heart_rates.iter().copied().max();
        let duration_minutes = track.duration_seconds() / 60.0;

        let interval = sample_interval_secs(track.duration_seconds(), heart_rates.len());
        let training_zones =
            calculate_training_zones(&heart_rates, athlete.age(), athlete.resting_hr(), interval);

        let vo2max = estimate_vo2max(&Vo2MaxInputs {
            age: athlete.age(),
            weight_kg: athlete.weight_kg(),
            gender: athlete.gender,
            duration_minutes: Some(duration_minutes),
            distance_km: Some(total_distance * MILES_TO_KM),
            max_hr,
        });

        let resting_hr = athlete.resting_hr().map(f64::from);
        let load = training_load(
            Some(duration_minutes),
            avg_hr,
            max_hr.map(f64::from),
            resting_hr,
        );
        let recovery = recovery_time(load, resting_hr, athlete.age());

        let fast_paces: Vec<f64> = fast_segments.iter().map(|s| s.pace).collect();
        let race_predictions = predict_race_times(&fast_paces);
        let recommendations = pace_recommendations(&fast_paces);

        if training_zones.is_none() || vo2max.is_none() || load.is_none() {
            debug!(
                zones = training_zones.is_some(),
                vo2max = vo2max.is_some(),
                training_load = load.is_some(),
                "Some derived metrics were skipped"
            );
        }

        AnalysisResult {
            source: None,
            creator: track.creator.clone(),
            name: track.name.clone(),
            pace_limit: request.pace_limit,
            total_distance,
            fast_distance,
            slow_distance,
            percentage_fast: share(fast_distance),
            percentage_slow: share(slow_distance),
            duration_minutes,
            avg_hr_all: avg_hr.unwrap_or(0.0),
            avg_hr_fast: mean_segment_hr(&fast_segments),
            avg_hr_slow: mean_segment_hr(&slow_segments),
            max_hr,
            route_data: segments.iter().map(RouteSegment::from).collect(),
            training_zones,
            pace_recommendations: recommendations,
            vo2max,
            training_load: load,
            recovery_time: recovery,
            race_predictions,
            mile_splits: mile_splits(samples),
            elevation: elevation_summary(track, samples),
            elevation_impact: elevation_impact(samples),
            is_high_frequency,
            downsampling,
            point_count: track.len(),
            skipped_points: track.skipped_points,
            fast_segments,
            slow_segments,
        }
    }
}

/// Analyze a GPX document with default settings
pub fn analyze_run(bytes: &[u8], request: &AnalysisRequest) -> Result<AnalysisResult> {
    RunAnalyzer::default().analyze(bytes, request)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of the segment averages that carried heart-rate data, 0 if none did
fn mean_segment_hr(segments: &[Segment]) -> f64 {
    mean(segments.iter().map(|s| s.avg_hr).filter(|&hr| hr > 0.0)).unwrap_or(0.0)
}
