//! GPX track loading and rewriting with quick-xml
//!
//! Only `trkpt` elements are read. Heart rate is taken from any element whose
//! local name is `hr`, which covers the Garmin `TrackPointExtension` under
//! whatever prefix the writer chose (`gpxtpx:`, `ns3:`) as well as bare `hr`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

use super::TrackLoader;
use crate::error::{DownsampleError, ParseError, Result};
use crate::models::{Track, TrackPoint};

/// GPX importer producing timestamped track points
#[derive(Debug, Clone)]
pub struct GpxLoader {
    display_offset: FixedOffset,
}

impl GpxLoader {
    /// Loader that reports timestamps in UTC
    pub fn new() -> Self {
        Self {
            display_offset: Utc.fix(),
        }
    }

    /// Loader that converts timestamps to `offset` for display
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            display_offset: offset,
        }
    }

    /// Parse a GPX document held in memory
    pub fn parse(&self, bytes: &[u8]) -> std::result::Result<Track, ParseError> {
        let content = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidEncoding {
            reason: e.to_string(),
        })?;

        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut track = Track::default();
        let mut stack: Vec<String> = Vec::new();
        let mut pending: Option<PendingPoint> = None;
        let mut field: Option<Field> = None;
        let mut ordinal = 0usize;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = local_name(e);
                    match name.as_str() {
                        "gpx" => track.creator = attribute(e, b"creator"),
                        "trkpt" => {
                            pending = Some(PendingPoint::from_element(e, ordinal));
                            ordinal += 1;
                        }
                        "time" if pending.is_some() => field = Some(Field::Time),
                        "ele" if pending.is_some() => field = Some(Field::Elevation),
                        "hr" if pending.is_some() => field = Some(Field::HeartRate),
                        "name" if track.name.is_none()
                            && stack.last().map(String::as_str) == Some("trk") =>
                        {
                            field = Some(Field::TrackName)
                        }
                        _ => {}
                    }
                    stack.push(name);
                }
                Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == b"trkpt" {
                        // A self-closing point cannot carry a timestamp
                        ordinal += 1;
                        track.skipped_points += 1;
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(f) = field {
                        let text = t.unescape().map_err(|e| ParseError::Xml {
                            position: reader.buffer_position(),
                            reason: e.to_string(),
                        })?;
                        match f {
                            Field::TrackName => track.name = Some(text.trim().to_string()),
                            _ => {
                                if let Some(point) = pending.as_mut() {
                                    point.apply(f, text.trim(), &self.display_offset);
                                }
                            }
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    stack.pop();
                    field = None;
                    if e.local_name().as_ref() == b"trkpt" {
                        if let Some(point) = pending.take() {
                            let ordinal = point.ordinal;
                            match point.finish() {
                                Ok(p) => {
                                    track.points.push(p);
                                    track.source_ordinals.push(ordinal);
                                }
                                Err(reason) => {
                                    debug!(ordinal, reason, "Skipping track point");
                                    track.skipped_points += 1;
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::Xml {
                        position: reader.buffer_position(),
                        reason: e.to_string(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        track.total_trackpoints = ordinal;

        if track.points.is_empty() {
            return Err(ParseError::NoTrackPoints {
                skipped: track.skipped_points,
            });
        }

        if track.skipped_points > 0 {
            warn!(
                skipped = track.skipped_points,
                kept = track.points.len(),
                "Some track points were unusable and have been skipped"
            );
        }

        debug!(
            points = track.points.len(),
            creator = ?track.creator,
            "Parsed GPX track"
        );

        Ok(track)
    }
}

impl Default for GpxLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader for GpxLoader {
    fn can_load(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase() == "gpx")
            .unwrap_or(false)
    }

    fn load(&self, bytes: &[u8]) -> Result<Track> {
        Ok(self.parse(bytes)?)
    }

    fn format_name(&self) -> &'static str {
        "GPX"
    }
}

/// Re-emit `bytes` keeping only the `trkpt` elements whose ordinal is in `keep`
///
/// Every other event is copied through untouched, so metadata, track names
/// and the extensions of kept points survive as written.
pub fn write_reduced(
    bytes: &[u8],
    keep: &BTreeSet<usize>,
) -> std::result::Result<Vec<u8>, DownsampleError> {
    let content = std::str::from_utf8(bytes).map_err(|e| DownsampleError::Rewrite {
        reason: e.to_string(),
    })?;

    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::with_capacity(bytes.len()));
    let mut buf = Vec::new();
    let mut ordinal = 0usize;
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| DownsampleError::Rewrite {
                reason: e.to_string(),
            })?;

        if matches!(event, Event::Eof) {
            break;
        }

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            buf.clear();
            continue;
        }

        let dropped = match &event {
            Event::Start(e) if e.local_name().as_ref() == b"trkpt" => {
                let kept = keep.contains(&ordinal);
                ordinal += 1;
                if !kept {
                    skip_depth = 1;
                }
                !kept
            }
            Event::Empty(e) if e.local_name().as_ref() == b"trkpt" => {
                let kept = keep.contains(&ordinal);
                ordinal += 1;
                !kept
            }
            _ => false,
        };

        if !dropped {
            writer
                .write_event(event)
                .map_err(|e| DownsampleError::Rewrite {
                    reason: e.to_string(),
                })?;
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Time,
    Elevation,
    HeartRate,
    TrackName,
}

#[derive(Debug, Default)]
struct PendingPoint {
    ordinal: usize,
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    timestamp: Option<DateTime<FixedOffset>>,
    heart_rate: Option<u16>,
    bad_time: bool,
}

impl PendingPoint {
    fn from_element(e: &BytesStart<'_>, ordinal: usize) -> Self {
        let coordinate = |key: &[u8]| attribute(e, key).and_then(|v| v.trim().parse::<f64>().ok());
        PendingPoint {
            ordinal,
            latitude: coordinate(b"lat"),
            longitude: coordinate(b"lon"),
            ..Default::default()
        }
    }

    fn apply(&mut self, field: Field, text: &str, offset: &FixedOffset) {
        match field {
            Field::Time => match parse_timestamp(text) {
                Some(ts) => self.timestamp = Some(ts.with_timezone(offset)),
                None => self.bad_time = true,
            },
            Field::Elevation => self.elevation = text.parse::<f64>().ok().filter(|e| e.is_finite()),
            Field::HeartRate => self.heart_rate = parse_heart_rate(text),
            Field::TrackName => {}
        }
    }

    fn finish(self) -> std::result::Result<TrackPoint, &'static str> {
        let latitude = self
            .latitude
            .filter(|lat| lat.is_finite() && (-90.0..=90.0).contains(lat))
            .ok_or("invalid latitude")?;
        let longitude = self
            .longitude
            .filter(|lon| lon.is_finite() && (-180.0..=180.0).contains(lon))
            .ok_or("invalid longitude")?;
        let timestamp = self.timestamp.ok_or(if self.bad_time {
            "unparseable timestamp"
        } else {
            "missing timestamp"
        })?;

        Ok(TrackPoint {
            latitude,
            longitude,
            elevation: self.elevation,
            timestamp,
            heart_rate: self.heart_rate,
        })
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// RFC 3339 timestamps, or naive ISO timestamps taken as UTC
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

fn parse_heart_rate(text: &str) -> Option<u16> {
    if let Ok(hr) = text.parse::<u16>() {
        return Some(hr).filter(|&hr| hr > 0);
    }
    text.parse::<f64>()
        .ok()
        .filter(|hr| hr.is_finite() && *hr > 0.0 && *hr <= u16::MAX as f64)
        .map(|hr| hr.round() as u16)
}
