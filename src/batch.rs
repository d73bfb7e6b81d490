//! Parallel analysis of many GPX files using rayon
//!
//! Every file is analyzed independently; a failure in one file is recorded
//! in the summary and does not stop the others.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisRequest, AnalysisResult, RunAnalyzer};
use crate::error::{PacersError, Result};
use crate::import::{GpxLoader, TrackLoader};

/// Configuration for batch analysis
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Worker threads; `None` uses one per CPU
    pub num_threads: Option<usize>,
    /// Show progress bar while analyzing
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            show_progress: true,
        }
    }
}

/// Outcome for one file
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    pub result: Option<AnalysisResult>,
    pub duration_ms: u128,
    pub error: Option<String>,
}

impl FileAnalysis {
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// Summary of a batch run, files in input order
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub files: Vec<FileAnalysis>,
    pub total_duration_ms: u128,
}

impl BatchSummary {
    pub fn successful(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.files.iter().filter_map(|f| f.result.as_ref())
    }

    pub fn successful_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.len() - self.successful_files()
    }

    /// Miles across every successfully analyzed run
    pub fn total_distance(&self) -> f64 {
        self.successful().map(|r| r.total_distance).sum()
    }

    /// Get throughput (files per second)
    pub fn throughput_files_per_sec(&self) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        (self.successful_files() as f64 / self.total_duration_ms as f64) * 1000.0
    }

    pub fn to_string_pretty(&self) -> String {
        format!(
            "Batch Analysis Summary\n  \
             Total Files: {}\n  \
             Successful: {}\n  \
             Failed: {}\n  \
             Total Distance: {:.2} mi\n  \
             Total Time: {:.2}s\n  \
             Throughput: {:.2} files/sec",
            self.files.len(),
            self.successful_files(),
            self.failed_files(),
            self.total_distance(),
            self.total_duration_ms as f64 / 1000.0,
            self.throughput_files_per_sec(),
        )
    }
}

/// Runs [`RunAnalyzer`] over many files in parallel
pub struct BatchAnalyzer {
    pub config: BatchConfig,
    analyzer: RunAnalyzer,
}

impl BatchAnalyzer {
    pub fn new(analyzer: RunAnalyzer) -> Self {
        Self::with_config(analyzer, BatchConfig::default())
    }

    pub fn with_config(analyzer: RunAnalyzer, config: BatchConfig) -> Self {
        Self { config, analyzer }
    }

    /// Analyze the given files with the same request
    pub fn analyze_files(&self, files: &[PathBuf], request: &AnalysisRequest) -> Result<BatchSummary> {
        request.validate()?;
        let start = Instant::now();
        info!(files = files.len(), "Starting batch analysis");

        let progress = self.config.show_progress.then(|| {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        });

        let results = match self.config.num_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        PacersError::Configuration(format!("Failed to create thread pool: {}", e))
                    })?;
                pool.install(|| self.process(files, request, progress.as_ref()))
            }
            None => self.process(files, request, progress.as_ref()),
        };

        if let Some(pb) = progress {
            pb.finish_with_message("Complete");
        }

        let summary = BatchSummary {
            files: results,
            total_duration_ms: start.elapsed().as_millis(),
        };
        info!("{}", summary.to_string_pretty());
        Ok(summary)
    }

    /// Analyze every GPX file directly inside `dir`
    pub fn analyze_directory(&self, dir: &Path, request: &AnalysisRequest) -> Result<BatchSummary> {
        let files = gpx_files_in(dir)?;
        if files.is_empty() {
            warn!(dir = %dir.display(), "No GPX files found in directory");
            return Ok(BatchSummary::default());
        }
        self.analyze_files(&files, request)
    }

    fn process(
        &self,
        files: &[PathBuf],
        request: &AnalysisRequest,
        progress: Option<&ProgressBar>,
    ) -> Vec<FileAnalysis> {
        files
            .par_iter()
            .map(|path| {
                let file_start = Instant::now();
                let outcome = self.analyzer.analyze_file(path, request);
                let duration_ms = file_start.elapsed().as_millis();

                if let Some(pb) = progress {
                    pb.inc(1);
                }

                match outcome {
                    Ok(result) => {
                        debug!(file = %path.display(), duration_ms, "Analyzed file");
                        FileAnalysis {
                            file_path: path.clone(),
                            result: Some(result),
                            duration_ms,
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Failed to analyze file");
                        FileAnalysis {
                            file_path: path.clone(),
                            result: None,
                            duration_ms,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect()
    }
}

/// GPX files directly inside `dir`, sorted by name
pub fn gpx_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PacersError::invalid_parameter(
            "dir",
            dir.display(),
            "not a directory",
        ));
    }

    let loader = GpxLoader::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && loader.can_load(&path) {
            files.push(path);
        }
    }
    files.sort();

    debug!(dir = %dir.display(), count = files.len(), "Scanned directory for GPX files");
    Ok(files)
}
