use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use pacers::downsample::Downsampler;
use pacers::error::{PacersError, ParseError};
use pacers::export::{self, ExportFormat};
use pacers::import::{gpx::write_reduced, GpxLoader, TrackLoader};
use pacers::running::predict_race_times;
use pacers::{analyze_run, AnalysisRequest, AnalysisSettings, AthleteMetrics, Gender, RunAnalyzer};

/// Integration tests that drive the whole pipeline from GPX bytes

/// One generated track point: miles north of the start, seconds after it
#[derive(Clone, Copy)]
struct Fix {
    miles: f64,
    secs: i64,
    hr: Option<u16>,
    ele: Option<f64>,
}

fn fix(miles: f64, secs: i64) -> Fix {
    Fix {
        miles,
        secs,
        hr: None,
        ele: None,
    }
}

fn gpx(fixes: &[Fix]) -> String {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
    let mut doc = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Integration Watch" xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <metadata><name>Morning Run</name></metadata>
  <trk><name>Morning Run</name><trkseg>
"#,
    );
    for f in fixes {
        let lat = 40.0 + (f.miles / pacers::geo::EARTH_RADIUS_MILES).to_degrees();
        let time = (start + Duration::seconds(f.secs)).to_rfc3339_opts(SecondsFormat::Secs, true);
        doc.push_str(&format!(r#"    <trkpt lat="{lat:.10}" lon="-105.0000000000">"#));
        if let Some(ele) = f.ele {
            doc.push_str(&format!("<ele>{ele:.1}</ele>"));
        }
        doc.push_str(&format!("<time>{time}</time>"));
        if let Some(hr) = f.hr {
            doc.push_str(&format!(
                "<extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>{hr}</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>"
            ));
        }
        doc.push_str("</trkpt>\n");
    }
    doc.push_str("  </trkseg></trk>\n</gpx>\n");
    doc
}

/// `count` points one second apart, 0.003 miles each (about 5:33/mile)
fn dense_run(count: usize) -> String {
    let fixes: Vec<Fix> = (0..count)
        .map(|i| Fix {
            miles: i as f64 * 0.003,
            secs: i as i64,
            hr: Some(150 + (i % 20) as u16),
            ele: Some(1600.0 + (i % 7) as f64),
        })
        .collect();
    gpx(&fixes)
}

fn athlete() -> AthleteMetrics {
    AthleteMetrics {
        age: Some(30),
        resting_hr: Some(60),
        weight_lbs: Some(150.0),
        gender: Some(Gender::Male),
    }
}

#[test]
fn test_slow_three_point_run() {
    // 0.2 miles in 2 minutes at a pace limit of 8:00 → 10:00/mile, slow
    let doc = gpx(&[fix(0.0, 0), fix(0.1, 60), fix(0.2, 120)]);
    let result = analyze_run(doc.as_bytes(), &AnalysisRequest::new(8.0)).unwrap();

    assert!((result.total_distance - 0.2).abs() < 1e-6);
    assert_eq!(result.fast_distance, 0.0);
    assert!(result.fast_segments.is_empty());
    assert_eq!(result.slow_segments.len(), 1);

    let segment = &result.slow_segments[0];
    assert!(!segment.is_fast);
    assert!((segment.pace - 10.0).abs() < 1e-6);
    assert_eq!(segment.coordinates.len(), 3);
    assert_eq!(result.percentage_slow, 100.0);
    assert!(!result.is_high_frequency);
    assert_eq!(result.creator.as_deref(), Some("Integration Watch"));
    assert_eq!(result.name.as_deref(), Some("Morning Run"));
}

#[test]
fn test_high_frequency_run_is_downsampled() {
    let doc = dense_run(150);
    let track = GpxLoader::new().load(doc.as_bytes()).unwrap();
    assert_eq!(track.len(), 150);
    assert!(Downsampler::default().needs_downsampling(&track));

    let result = analyze_run(doc.as_bytes(), &AnalysisRequest::new(8.0)).unwrap();
    assert!(result.is_high_frequency);

    let outcome = result.downsampling.as_ref().unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.original_points, 150);
    assert!(outcome.kept_points < 150);
    assert_eq!(result.point_count, outcome.kept_points);

    // The reduced track still spans the whole run
    assert!((result.total_distance - 149.0 * 0.003).abs() < 1e-3);
    assert!((result.total_distance - result.fast_distance - result.slow_distance).abs() < 1e-9);
}

#[test]
fn test_downsampling_can_be_disabled() {
    let settings = AnalysisSettings {
        downsample_enabled: false,
        ..AnalysisSettings::default()
    };
    let result = RunAnalyzer::new(settings)
        .analyze(dense_run(150).as_bytes(), &AnalysisRequest::new(8.0))
        .unwrap();

    assert!(result.is_high_frequency);
    assert!(result.downsampling.is_none());
    assert_eq!(result.point_count, 150);
}

#[test]
fn test_heart_rate_zones_exclude_out_of_range_samples() {
    let hrs = [100, 100, 100, 200, 200];
    let fixes: Vec<Fix> = hrs
        .iter()
        .enumerate()
        .map(|(i, &hr)| Fix {
            hr: Some(hr),
            ..fix(i as f64 * 0.002, i as i64)
        })
        .collect();

    let request = AnalysisRequest::new(8.0).with_athlete(AthleteMetrics {
        age: Some(30),
        resting_hr: Some(60),
        ..AthleteMetrics::default()
    });
    let result = analyze_run(gpx(&fixes).as_bytes(), &request).unwrap();

    let zones = result.training_zones.as_ref().unwrap();
    assert_eq!(zones.max_hr, 190);
    assert_eq!(zones.heart_rate_reserve, 130.0);
    assert_eq!(zones.zone("Zone 1").unwrap().sample_count, 3);
    assert_eq!(zones.zone("Zone 5").unwrap().sample_count, 0);
    assert_eq!(zones.unzoned_samples, 2);
    assert_eq!(result.max_hr, Some(200));
}

#[test]
fn test_race_prediction_from_best_pace() {
    let predictions = predict_race_times(&[6.0, 7.5, f64::INFINITY]).unwrap();
    assert_eq!(predictions.best_pace, 6.0);
    assert!((predictions.get("5k").unwrap() - 30.0).abs() < 1e-9);
    let ten_k = predictions.get("10k").unwrap();
    assert!((ten_k - 30.0 * 2f64.powf(1.06)).abs() < 1e-9);
    assert!((ten_k - 62.5).abs() < 0.1);
}

#[test]
fn test_metrics_need_athlete_inputs() {
    // 1 mile at 7:00 with heart rate, every 0.05 miles
    let fixes: Vec<Fix> = (0..=20)
        .map(|i| Fix {
            hr: Some(140 + i as u16),
            ..fix(i as f64 * 0.05, i as i64 * 21)
        })
        .collect();
    let doc = gpx(&fixes);

    let bare = analyze_run(doc.as_bytes(), &AnalysisRequest::new(8.0)).unwrap();
    assert!(bare.training_zones.is_none());
    assert!(bare.vo2max.is_none());
    assert!(bare.training_load.is_none());
    assert!(bare.recovery_time.is_none());
    assert!(bare.race_predictions.is_some());

    let full = analyze_run(doc.as_bytes(), &AnalysisRequest::new(8.0).with_athlete(athlete())).unwrap();
    assert!(full.training_zones.is_some());
    assert!(full.vo2max.unwrap() > 0.0);
    assert!(full.training_load.unwrap() > 0.0);
    assert!(full.recovery_time.unwrap() > 0.0);
    assert_eq!(full.fast_segments.len(), 1);
    assert_eq!(full.mile_splits.len(), 1);
    assert!((full.fast_segments[0].pace - 7.0).abs() < 1e-6);
}

#[test]
fn test_fast_and_slow_alternate() {
    // 7:00 for 0.3 miles, 10:00 for 0.3 miles, 7:00 again
    let mut fixes = Vec::new();
    let (mut miles, mut secs) = (0.0, 0);
    fixes.push(fix(miles, secs));
    for step_secs in [42, 42, 42, 60, 60, 60, 42, 42, 42] {
        miles += 0.1;
        secs += step_secs;
        fixes.push(fix(miles, secs));
    }
    let result = analyze_run(gpx(&fixes).as_bytes(), &AnalysisRequest::new(8.0)).unwrap();

    assert_eq!(result.fast_segments.len(), 2);
    assert_eq!(result.slow_segments.len(), 1);
    assert!((result.fast_distance - 0.6).abs() < 1e-6);
    assert!((result.slow_distance - 0.3).abs() < 1e-6);

    let ordered = result.segments();
    assert!(ordered[0].is_fast && !ordered[1].is_fast && ordered[2].is_fast);
    assert_eq!(result.route_data.len(), 3);
    for segment in ordered {
        assert!(segment.coordinates.len() >= 2);
    }
}

#[test]
fn test_malformed_points_are_skipped() {
    let doc = r#"<gpx creator="x"><trk><trkseg>
        <trkpt lat="40.0" lon="-105.0"><time>2024-05-01T07:00:00Z</time></trkpt>
        <trkpt lat="north" lon="-105.0"><time>2024-05-01T07:00:30Z</time></trkpt>
        <trkpt lat="40.0015" lon="-105.0"><time>not a time</time></trkpt>
        <trkpt lat="40.0029" lon="-105.0"><time>2024-05-01T07:01:00Z</time></trkpt>
    </trkseg></trk></gpx>"#;
    let result = analyze_run(doc.as_bytes(), &AnalysisRequest::new(8.0)).unwrap();
    assert_eq!(result.point_count, 2);
    assert_eq!(result.skipped_points, 2);
}

/// Dense run where every fourth point has lost its timestamp
fn dense_run_with_gaps(count: usize) -> String {
    let mut index = 0;
    dense_run(count)
        .lines()
        .map(|line| {
            if !line.contains("<trkpt") {
                return format!("{line}\n");
            }
            index += 1;
            match (index % 4 == 0, line.find("<time>"), line.find("</time>")) {
                (true, Some(open), Some(close)) => {
                    format!("{}{}\n", &line[..open], &line[close + "</time>".len()..])
                }
                _ => format!("{line}\n"),
            }
        })
        .collect()
}

#[test]
fn test_untimed_points_count_towards_density() {
    let track = GpxLoader::new().load(dense_run_with_gaps(60).as_bytes()).unwrap();
    assert_eq!(track.total_trackpoints, 60);
    assert_eq!(track.len(), 45);
    assert_eq!(track.skipped_points, 15);
    assert!(Downsampler::default().needs_downsampling(&track));

    let track = GpxLoader::new().load(dense_run_with_gaps(120).as_bytes()).unwrap();
    assert_eq!(track.len(), 90);
    let outcome = Downsampler::default().downsample(&track, Some(8.0)).unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.original_points, 90);

    let result = analyze_run(dense_run_with_gaps(120).as_bytes(), &AnalysisRequest::new(8.0)).unwrap();
    assert!(result.is_high_frequency);
    assert_eq!(result.skipped_points, 30);
}

#[test]
fn test_input_errors() {
    let request = AnalysisRequest::new(8.0);

    let empty = analyze_run(b"<gpx><trk><trkseg></trkseg></trk></gpx>", &request);
    assert!(matches!(
        empty,
        Err(PacersError::Parse(ParseError::NoTrackPoints { .. }))
    ));

    let single = gpx(&[fix(0.0, 0)]);
    assert!(matches!(
        analyze_run(single.as_bytes(), &request),
        Err(PacersError::InsufficientData(_))
    ));

    let doc = gpx(&[fix(0.0, 0), fix(0.1, 60)]);
    assert!(matches!(
        analyze_run(doc.as_bytes(), &AnalysisRequest::new(0.0)),
        Err(PacersError::InvalidParameter { .. })
    ));
}

#[test]
fn test_reduced_document_reparses() {
    let doc = dense_run(300);
    let loader = GpxLoader::new();
    let track = loader.load(doc.as_bytes()).unwrap();

    let (outcome, reduced) = Downsampler::default()
        .downsample_document(doc.as_bytes(), &track, Some(8.0))
        .unwrap();
    let reparsed = loader.load(&reduced).unwrap();

    assert_eq!(reparsed.len(), outcome.kept_points);
    assert_eq!(reparsed.points.first(), track.points.first());
    assert_eq!(reparsed.points.last(), track.points.last());
    assert_eq!(reparsed.name.as_deref(), Some("Morning Run"));
    assert_eq!(reparsed.heart_rates().len(), outcome.kept_points);

    let everything = track.ordinals_for(&(0..track.len()).collect());
    let unchanged = loader.load(&write_reduced(doc.as_bytes(), &everything).unwrap()).unwrap();
    assert_eq!(unchanged.len(), 300);
}

#[test]
fn test_exports_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.gpx");
    std::fs::write(&path, gpx(&[fix(0.0, 0), fix(0.1, 42), fix(0.2, 84), fix(0.3, 144)])).unwrap();

    let result = RunAnalyzer::default()
        .analyze_file(&path, &AnalysisRequest::new(8.0))
        .unwrap();
    assert_eq!(result.source.as_deref(), Some("run.gpx"));

    let json_path = dir.path().join("run.json");
    export::export_result(&result, ExportFormat::Json, &json_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["fast_segments"].as_array().unwrap().len(), 1);
    assert!(value["vo2max"].is_null());

    let csv_path = dir.path().join("run.csv");
    export::export_result(&result, ExportFormat::Csv, &csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let text = export::render(&result, ExportFormat::Text).unwrap();
    assert!(text.contains("run.gpx") || text.contains("Morning Run"));
}
