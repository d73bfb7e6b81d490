//! Unified error hierarchy for pacers
//!
//! Hard failures (unreadable input, too few points, bad parameters) are
//! errors. Metrics whose prerequisites are missing are not: they come back
//! as `None` from their calculators.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all pacers operations
#[derive(Debug, Error)]
pub enum PacersError {
    /// Activity file could not be parsed into track points
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Not enough timestamped points to compute distance or pace
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Caller supplied an unusable parameter
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Downsampling errors
    #[error("Downsampling error: {0}")]
    Downsample(#[from] DownsampleError),

    /// Report export errors
    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Track file parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Document is not valid UTF-8
    #[error("Invalid UTF-8 in document: {reason}")]
    InvalidEncoding { reason: String },

    /// Malformed XML
    #[error("Malformed XML at byte {position}: {reason}")]
    Xml { position: usize, reason: String },

    /// Document contained no usable track points
    #[error("No parseable track points found ({skipped} skipped)")]
    NoTrackPoints { skipped: usize },
}

/// Downsampling errors
#[derive(Debug, Error)]
pub enum DownsampleError {
    /// Configuration value out of range
    #[error("Invalid downsampling setting {setting}: {value}")]
    InvalidSetting { setting: String, value: String },

    /// Reduced document could not be written
    #[error("Failed to rewrite GPX document: {reason}")]
    Rewrite { reason: String },
}

/// Result type alias for pacers operations
pub type Result<T> = std::result::Result<T, PacersError>;

impl PacersError {
    /// Shorthand for an out-of-range parameter
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        PacersError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PacersError::Parse(ParseError::FileNotFound { .. }) => ErrorSeverity::Warning,
            PacersError::InsufficientData(_) => ErrorSeverity::Warning,
            PacersError::InvalidParameter { .. } => ErrorSeverity::Warning,
            PacersError::Downsample(_) => ErrorSeverity::Info,
            PacersError::Configuration(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PacersError::Parse(ParseError::FileNotFound { path }) => {
                format!("Could not find activity file: {}", path.display())
            }
            PacersError::Parse(ParseError::NoTrackPoints { .. }) => {
                "The uploaded file does not contain any usable GPS track points.".to_string()
            }
            PacersError::Parse(_) => {
                "The uploaded file is not a valid GPX document.".to_string()
            }
            PacersError::InsufficientData(_) => {
                "Not enough timestamped points to compute distance and pace. Please upload a longer recording.".to_string()
            }
            PacersError::InvalidParameter { parameter, .. } => {
                format!("Please check the value supplied for {}.", parameter)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = PacersError::Parse(ParseError::FileNotFound {
            path: PathBuf::from("/runs/morning.gpx"),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = PacersError::Configuration("bad toml".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_user_messages() {
        let err = PacersError::Parse(ParseError::NoTrackPoints { skipped: 3 });
        assert!(err.user_message().contains("track points"));

        let err = PacersError::invalid_parameter("pace_limit", -1.0, "must be positive");
        assert!(err.user_message().contains("pace_limit"));
        assert!(err.to_string().contains("pace_limit=-1"));
    }

    #[test]
    fn test_from_conversions() {
        let err: PacersError = ParseError::Xml {
            position: 12,
            reason: "unexpected end".to_string(),
        }
        .into();
        assert!(matches!(err, PacersError::Parse(ParseError::Xml { position: 12, .. })));

        let err: PacersError = DownsampleError::InvalidSetting {
            setting: "min_time_gap_secs".to_string(),
            value: "0".to_string(),
        }
        .into();
        assert_eq!(err.severity(), ErrorSeverity::Info);
    }
}
