// Library interface for pacers
// This allows the CLI, integration tests and benches to share the pipeline

pub mod aggregation;
pub mod analysis;
pub mod batch;
pub mod compare;
pub mod config;
pub mod downsample;
pub mod elevation;
pub mod error;
pub mod export;
pub mod geo;
pub mod import;
pub mod logging;
pub mod models;
pub mod running;
pub mod segments;
pub mod splits;
pub mod training_load;
pub mod vo2max;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use analysis::{analyze_run, AnalysisRequest, AnalysisResult, AnalysisSettings, RunAnalyzer};
pub use batch::{BatchAnalyzer, BatchConfig, BatchSummary};
pub use compare::RunComparison;
pub use downsample::{DownsampleConfig, DownsampleOutcome, Downsampler};
pub use export::{ExportError, ExportFormat};
pub use import::{GpxLoader, TrackLoader};
pub use error::{PacersError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
