//! Report export: JSON, CSV segment tables and the plain-text run log

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::analysis::AnalysisResult;

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Text => write!(f, "text"),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Render a report in the requested format
pub fn render(result: &AnalysisResult, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => json::to_json_string(result),
        ExportFormat::Csv => csv::segments_to_string(result),
        ExportFormat::Text => text::run_log(result),
    }
}

/// Render and write a report to `output_path`
pub fn export_result<P: AsRef<Path>>(
    result: &AnalysisResult,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let rendered = render(result, format)?;
    std::fs::write(output_path.as_ref(), rendered)?;
    info!(
        format = %format,
        path = %output_path.as_ref().display(),
        "Exported run report"
    );
    Ok(())
}
