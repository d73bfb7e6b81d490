//! Side-by-side comparison of analyzed runs

use serde::Serialize;

use crate::analysis::AnalysisResult;
use crate::splits::MileSplit;

/// Headline numbers of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub distance: f64,
    /// Segment time over total distance, min/mile
    pub avg_pace: f64,
    pub avg_hr: f64,
    /// Meters climbed
    pub elevation_gain: f64,
    pub duration_minutes: f64,
    pub fast_percentage: f64,
    pub mile_splits: Vec<MileSplit>,
}

impl RunSummary {
    pub fn from_result(label: impl Into<String>, result: &AnalysisResult) -> Self {
        Self {
            label: label.into(),
            distance: result.total_distance,
            avg_pace: result.average_pace(),
            avg_hr: result.avg_hr_all,
            elevation_gain: result.elevation.gain,
            duration_minutes: result.duration_minutes,
            fast_percentage: result.percentage_fast,
            mile_splits: result.mile_splits.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunComparison {
    pub runs: Vec<RunSummary>,
}

impl RunComparison {
    /// Summaries in the order given; runs without a source are labelled by position
    pub fn new(results: &[AnalysisResult]) -> Self {
        let runs = results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let label = result
                    .source
                    .clone()
                    .unwrap_or_else(|| format!("Run {}", i + 1));
                RunSummary::from_result(label, result)
            })
            .collect();
        Self { runs }
    }

    /// Run with the lowest finite average pace
    pub fn fastest(&self) -> Option<&RunSummary> {
        self.runs
            .iter()
            .filter(|r| r.avg_pace.is_finite())
            .min_by(|a, b| a.avg_pace.total_cmp(&b.avg_pace))
    }

    /// Run with the greatest distance
    pub fn longest(&self) -> Option<&RunSummary> {
        self.runs
            .iter()
            .max_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Pace of mile `mile` (1-based) for each run, `None` where a run is shorter
    pub fn split_paces(&self, mile: u32) -> Vec<Option<f64>> {
        self.runs
            .iter()
            .map(|r| r.mile_splits.iter().find(|s| s.mile == mile).map(|s| s.pace))
            .collect()
    }
}
