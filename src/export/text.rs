use crate::analysis::AnalysisResult;
use crate::geo::format_pace;
use crate::models::Segment;
use chrono::{DateTime, FixedOffset};
use std::fmt::{self, Write};

use super::ExportError;

fn clock(time: &DateTime<FixedOffset>) -> String {
    time.format("%I:%M:%S %p").to_string()
}

fn write_segments(
    out: &mut impl Write,
    title: &str,
    empty: &str,
    segments: &[Segment],
) -> fmt::Result {
    if segments.is_empty() {
        return writeln!(out, "\n{}", empty);
    }

    writeln!(out, "\n{}:", title)?;
    for (i, segment) in segments.iter().enumerate() {
        writeln!(
            out,
            "Segment {}: {:.2} miles at {} min/mile pace (Best: {}, Avg HR: {:.0} bpm)",
            i + 1,
            segment.distance,
            format_pace(segment.pace),
            format_pace(segment.best_pace),
            segment.avg_hr
        )?;
        writeln!(
            out,
            "  Time: {} to {}",
            clock(&segment.start_time),
            clock(&segment.end_time)
        )?;
    }
    Ok(())
}

fn write_run_log(out: &mut impl Write, result: &AnalysisResult) -> fmt::Result {
    let limit = result.pace_limit;

    writeln!(out, "{}", "=".repeat(80))?;
    writeln!(out, "Run Analysis")?;
    if let Some(source) = &result.source {
        writeln!(out, "File: {}", source)?;
    }
    if let Some(name) = &result.name {
        writeln!(out, "Name: {}", name)?;
    }
    writeln!(out, "Pace Limit: {} min/mile", limit)?;
    writeln!(out, "Total Distance: {:.2} miles", result.total_distance)?;
    writeln!(
        out,
        "Distance under {} min/mile: {:.2} miles ({:.1}%)",
        limit, result.fast_distance, result.percentage_fast
    )?;
    writeln!(
        out,
        "Distance over {} min/mile: {:.2} miles ({:.1}%)",
        limit, result.slow_distance, result.percentage_slow
    )?;
    writeln!(out, "Average Heart Rate (Overall): {:.0} bpm", result.avg_hr_all)?;
    writeln!(out, "Average Heart Rate (Fast Segments): {:.0} bpm", result.avg_hr_fast)?;
    writeln!(out, "Average Heart Rate (Slow Segments): {:.0} bpm", result.avg_hr_slow)?;

    write_segments(
        out,
        "Fast Segments",
        "No segments under target pace",
        &result.fast_segments,
    )?;
    write_segments(
        out,
        "Slow Segments",
        "No segments over target pace",
        &result.slow_segments,
    )?;

    if let Some(predictions) = &result.race_predictions {
        writeln!(out, "\nRace Predictions:")?;
        for (label, minutes) in &predictions.times {
            writeln!(out, "  {}: {}", label, format_duration(*minutes))?;
        }
    }

    if !result.mile_splits.is_empty() {
        writeln!(out, "\nMile Splits:")?;
        for split in &result.mile_splits {
            writeln!(
                out,
                "  Mile {}{}: {} min/mile",
                split.mile,
                if split.partial { " (partial)" } else { "" },
                format_pace(split.pace)
            )?;
        }
    }

    writeln!(out)
}

/// Human-readable run log
pub fn run_log(result: &AnalysisResult) -> Result<String, ExportError> {
    let mut out = String::new();
    write_run_log(&mut out, result)?;
    Ok(out)
}

/// `h:mm:ss` or `m:ss`
pub fn format_duration(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "--".to_string();
    }
    let total = (minutes * 60.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
