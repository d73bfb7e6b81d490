use anyhow::{Context, Result};
use chrono::{Local, Offset};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use pacers::batch::{BatchAnalyzer, BatchConfig};
use pacers::compare::RunComparison;
use pacers::config::AppConfig;
use pacers::downsample::{density_per_minute, Downsampler};
use pacers::export::{self, text::format_duration, ExportFormat};
use pacers::geo::format_pace;
use pacers::import::{read_track_file, GpxLoader};
use pacers::logging::init_logging;
use pacers::running::{pace_recommendations_from_history, RACE_DISTANCES};
use pacers::{AnalysisRequest, AnalysisResult, AthleteMetrics, Gender, PacersError, RunAnalyzer};

/// pacers - GPX running analysis CLI
///
/// Splits a run into fast and slow stretches around a pace limit and derives
/// heart-rate zones, training load and race predictions from it.
#[derive(Parser)]
#[command(name = "pacers")]
#[command(author = "pacers contributors")]
#[command(version)]
#[command(about = "GPX running analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Text,
    Csv,
}

/// Athlete inputs that override the config file
#[derive(clap::Args, Debug, Default)]
struct AthleteArgs {
    /// Age in years
    #[arg(long)]
    age: Option<u32>,

    /// Resting heart rate in bpm
    #[arg(long)]
    resting_hr: Option<u16>,

    /// Body weight in pounds
    #[arg(long)]
    weight: Option<f64>,

    /// male or female
    #[arg(long)]
    gender: Option<Gender>,
}

impl AthleteArgs {
    fn merged_with(&self, base: &AthleteMetrics) -> AthleteMetrics {
        AthleteMetrics {
            age: self.age.or(base.age),
            resting_hr: self.resting_hr.or(base.resting_hr),
            weight_lbs: self.weight.or(base.weight_lbs),
            gender: self.gender.or(base.gender),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one GPX run
    Analyze {
        /// Input GPX file
        #[arg(short, long)]
        file: PathBuf,

        /// Pace limit in minutes per mile (config default if omitted)
        #[arg(short, long)]
        pace_limit: Option<f64>,

        #[command(flatten)]
        athlete: AthleteArgs,

        /// Report format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write the report to a file instead of the terminal
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report point count and density of a GPX file
    Check {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write a reduced copy of a high-frequency GPX file
    Downsample {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Keep points where the run crosses this pace (min/mile)
        #[arg(short, long)]
        pace_limit: Option<f64>,

        /// Minimum seconds between kept points
        #[arg(long)]
        min_gap: Option<f64>,
    },

    /// Analyze every GPX file in a directory in parallel
    Batch {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(short, long)]
        pace_limit: Option<f64>,

        /// Worker threads (one per CPU if omitted)
        #[arg(short, long)]
        threads: Option<usize>,

        #[command(flatten)]
        athlete: AthleteArgs,
    },

    /// Compare several runs side by side
    Compare {
        /// GPX files to compare
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        pace_limit: Option<f64>,
    },

    /// Show or create the configuration file
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        list: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct SegmentRow {
    #[tabled(rename = "Type")]
    effort: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Miles")]
    distance: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "Pace")]
    pace: String,
    #[tabled(rename = "Best")]
    best_pace: String,
    #[tabled(rename = "Avg HR")]
    avg_hr: String,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    label: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "BPM")]
    range: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "%")]
    percentage: String,
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run")]
    label: String,
    #[tabled(rename = "Miles")]
    distance: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Avg pace")]
    pace: String,
    #[tabled(rename = "Avg HR")]
    avg_hr: String,
    #[tabled(rename = "Gain (m)")]
    gain: String,
    #[tabled(rename = "Fast %")]
    fast: String,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        match e.downcast_ref::<PacersError>() {
            Some(inner) => {
                eprintln!("{} {}", "Error:".red().bold(), inner.user_message());
                tracing::debug!(error = ?e, severity = ?inner.severity(), "Command failed");
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised(cli.verbose);
    init_logging(&log_config)?;

    let loader = GpxLoader::with_offset(Local::now().offset().fix());
    let analyzer = RunAnalyzer::new(config.analysis.clone()).with_loader(loader.clone());
    let pace_or_default = |pace: Option<f64>| pace.unwrap_or(config.analysis.default_pace_limit);

    match cli.command {
        Commands::Analyze {
            file,
            pace_limit,
            athlete,
            format,
            output,
        } => {
            let request = AnalysisRequest::new(pace_or_default(pace_limit))
                .with_athlete(athlete.merged_with(&config.athlete));
            let result = analyzer
                .analyze_file(&file, &request)
                .with_context(|| format!("Failed to analyze {}", file.display()))?;

            match (format, output) {
                (OutputFormat::Table, None) => print_report(&result),
                (format, Some(path)) => {
                    let format = export_format(format);
                    export::export_result(&result, format, &path)?;
                    println!(
                        "{} {}",
                        "✓ Report written to".green(),
                        path.display().to_string().bold()
                    );
                }
                (format, None) => print!("{}", export::render(&result, export_format(format))?),
            }
        }

        Commands::Check { file } => {
            let (_, track) = read_track_file(&loader, &file)?;
            let downsampler = Downsampler::new(config.analysis.downsample.clone());
            let density = density_per_minute(&track, config.analysis.downsample.sample_window_minutes);

            println!("{}", file.display().to_string().bold());
            println!("  Points: {}", track.len());
            if track.skipped_points > 0 {
                println!("  Skipped: {}", track.skipped_points.to_string().yellow());
            }
            println!("  Duration: {}", format_duration(track.duration_seconds() / 60.0));
            match density {
                Some(d) => println!("  Density: {:.1} points/min", d),
                None => println!("  Density: {}", "n/a".dimmed()),
            }
            if downsampler.needs_downsampling(&track) {
                println!("  {}", "High-frequency track: will be downsampled".yellow());
            } else {
                println!("  {}", "Normal sampling rate".green());
            }
        }

        Commands::Downsample {
            file,
            output,
            pace_limit,
            min_gap,
        } => {
            let (bytes, track) = read_track_file(&loader, &file)?;
            let mut settings = config.analysis.downsample.clone();
            if let Some(gap) = min_gap {
                settings.min_time_gap_secs = gap;
            }

            let (outcome, document) =
                Downsampler::new(settings).downsample_document(&bytes, &track, pace_limit)?;
            if !outcome.applied {
                println!(
                    "{}",
                    format!("Only {} points; nothing to reduce", outcome.original_points).yellow()
                );
            }
            std::fs::write(&output, document)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!(
                "{} {} → {} points ({:.1}% reduction, {} transitions kept)",
                "✓".green(),
                outcome.original_points,
                outcome.kept_points,
                outcome.reduction_percent(),
                outcome.transitions
            );
        }

        Commands::Batch {
            dir,
            pace_limit,
            threads,
            athlete,
        } => {
            let request = AnalysisRequest::new(pace_or_default(pace_limit))
                .with_athlete(athlete.merged_with(&config.athlete));
            let batch = BatchAnalyzer::with_config(
                analyzer,
                BatchConfig {
                    num_threads: threads,
                    show_progress: true,
                },
            );
            let summary = batch.analyze_directory(&dir, &request)?;

            let results: Vec<AnalysisResult> = summary.successful().cloned().collect();
            if !results.is_empty() {
                print_runs(&RunComparison::new(&results));
            }
            for failed in summary.files.iter().filter(|f| !f.is_success()) {
                println!(
                    "{} {}: {}",
                    "✗".red(),
                    failed.file_path.display(),
                    failed.error.as_deref().unwrap_or("unknown error")
                );
            }
            println!("{}", summary.to_string_pretty());
        }

        Commands::Compare { files, pace_limit } => {
            let request = AnalysisRequest::new(pace_or_default(pace_limit))
                .with_athlete(config.athlete.clone());
            let results = files
                .iter()
                .map(|f| {
                    analyzer
                        .analyze_file(f, &request)
                        .with_context(|| format!("Failed to analyze {}", f.display()))
                })
                .collect::<Result<Vec<_>>>()?;

            let comparison = RunComparison::new(&results);
            print_runs(&comparison);
            if let Some(fastest) = comparison.fastest() {
                println!("Fastest: {}", fastest.label.green().bold());
            }
            if let Some(longest) = comparison.longest() {
                println!("Longest: {}", longest.label.bold());
            }
            if let Some(recommendations) = pace_recommendations_from_history(&results) {
                println!("\n{}", "Pace zones from these runs".bold());
                for zone in &recommendations.zones {
                    println!(
                        "  {:<10} {} - {}  {}",
                        zone.name,
                        format_pace(zone.range.0),
                        format_pace(zone.range.1),
                        zone.description.dimmed()
                    );
                }
            }
        }

        Commands::Config { list, init } => {
            let path = cli.config.unwrap_or_else(AppConfig::default_config_path);
            if init {
                init_config(&path)?;
            }
            if list || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn export_format(format: OutputFormat) -> ExportFormat {
    match format {
        OutputFormat::Json => ExportFormat::Json,
        OutputFormat::Csv => ExportFormat::Csv,
        OutputFormat::Table | OutputFormat::Text => ExportFormat::Text,
    }
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("{} {}", "Config already exists:".yellow(), path.display());
        return Ok(());
    }
    AppConfig::default().save_to_file(path)?;
    println!("{} {}", "✓ Created".green(), path.display());
    Ok(())
}

fn optional_hr(hr: f64) -> String {
    if hr > 0.0 {
        format!("{:.0}", hr)
    } else {
        "--".to_string()
    }
}

fn print_report(result: &AnalysisResult) {
    let title = result
        .name
        .clone()
        .or_else(|| result.source.clone())
        .unwrap_or_else(|| "Run".to_string());
    println!("{}", title.bold());
    println!(
        "  {:.2} mi in {}  (avg pace {})",
        result.total_distance,
        format_duration(result.duration_minutes),
        format_pace(result.average_pace())
    );
    println!(
        "  Fast: {:.2} mi ({:.1}%)  Slow: {:.2} mi ({:.1}%)  at {} min/mi",
        result.fast_distance,
        result.percentage_fast,
        result.slow_distance,
        result.percentage_slow,
        format_pace(result.pace_limit)
    );
    if result.avg_hr_all > 0.0 {
        println!(
            "  Avg HR: {:.0} (fast {}, slow {})  Max HR: {}",
            result.avg_hr_all,
            optional_hr(result.avg_hr_fast),
            optional_hr(result.avg_hr_slow),
            result.max_hr.map_or("--".to_string(), |hr| hr.to_string())
        );
    }
    if let Some(ds) = &result.downsampling {
        println!(
            "  {}",
            format!(
                "Downsampled {} → {} points ({:.1}%)",
                ds.original_points,
                ds.kept_points,
                ds.reduction_percent()
            )
            .dimmed()
        );
    }

    let rows: Vec<SegmentRow> = result
        .segments()
        .into_iter()
        .map(|s| SegmentRow {
            effort: if s.is_fast {
                "fast".green().to_string()
            } else {
                "slow".yellow().to_string()
            },
            start: s.start_time.format("%H:%M:%S").to_string(),
            distance: format!("{:.2}", s.distance),
            minutes: format!("{:.1}", s.time_diff),
            pace: format_pace(s.pace),
            best_pace: format_pace(s.best_pace),
            avg_hr: optional_hr(s.avg_hr),
        })
        .collect();
    if !rows.is_empty() {
        println!("\n{}", Table::new(rows).with(Style::rounded()));
    }

    if let Some(zones) = &result.training_zones {
        let rows: Vec<ZoneRow> = zones
            .zones
            .iter()
            .map(|z| ZoneRow {
                label: z.label.clone(),
                name: z.name.clone(),
                range: format!("{}-{}", z.hr_range.0, z.hr_range.1),
                minutes: format!("{:.1}", z.time_spent_minutes),
                percentage: format!("{:.1}", z.percentage),
            })
            .collect();
        println!("\n{}", "Heart rate zones".bold());
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    let mut extras = Vec::new();
    if let Some(vo2) = result.vo2max {
        extras.push(format!("VO2max {:.1}", vo2));
    }
    if let Some(load) = result.training_load {
        extras.push(format!("Training load {:.0}", load));
    }
    if let Some(hours) = result.recovery_time {
        extras.push(format!("Recovery {:.0} h", hours));
    }
    if !extras.is_empty() {
        println!("\n{}", extras.join("  |  "));
    }

    if let Some(predictions) = &result.race_predictions {
        println!("\n{}", "Race predictions".bold());
        for (race, _) in RACE_DISTANCES {
            if let Some(minutes) = predictions.get(race) {
                println!("  {:<6} {}", race, format_duration(minutes));
            }
        }
    }
}

fn print_runs(comparison: &RunComparison) {
    let rows: Vec<RunRow> = comparison
        .runs
        .iter()
        .map(|r| RunRow {
            label: r.label.clone(),
            distance: format!("{:.2}", r.distance),
            duration: format_duration(r.duration_minutes),
            pace: format_pace(r.avg_pace),
            avg_hr: optional_hr(r.avg_hr),
            gain: format!("{:.0}", r.elevation_gain),
            fast: format!("{:.1}", r.fast_percentage),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}
