use super::ExportError;
use crate::analysis::AnalysisResult;
use crate::models::Segment;
use serde::Serialize;
use std::path::Path;

/// One CSV row per segment
#[derive(Debug, Serialize)]
struct SegmentRow {
    index: usize,
    #[serde(rename = "type")]
    effort: String,
    start_time: String,
    end_time: String,
    distance_miles: f64,
    duration_minutes: f64,
    /// Empty when the pace is undefined
    pace: Option<f64>,
    best_pace: Option<f64>,
    avg_hr: Option<f64>,
}

impl SegmentRow {
    fn new(index: usize, segment: &Segment) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            index,
            effort: segment.effort().to_string(),
            start_time: segment.start_time.to_rfc3339(),
            end_time: segment.end_time.to_rfc3339(),
            distance_miles: segment.distance,
            duration_minutes: segment.time_diff,
            pace: finite(segment.pace),
            best_pace: finite(segment.best_pace),
            avg_hr: (segment.avg_hr > 0.0).then_some(segment.avg_hr),
        }
    }
}

/// Write the report's segments, in time order, as CSV
pub fn write_segments<W: std::io::Write>(result: &AnalysisResult, out: W) -> Result<(), ExportError> {
    let mut writer = ::csv::Writer::from_writer(out);
    for (i, segment) in result.segments().into_iter().enumerate() {
        writer.serialize(SegmentRow::new(i + 1, segment))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn segments_to_string(result: &AnalysisResult) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_segments(result, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ExportError::SerializationError(e.to_string()))
}

/// Export segments to a CSV file
pub fn export_segments<P: AsRef<Path>>(result: &AnalysisResult, output_path: P) -> Result<(), ExportError> {
    let file = std::fs::File::create(output_path)?;
    write_segments(result, file)
}
