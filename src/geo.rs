//! Geodesic distance and pace arithmetic
//!
//! Distances are in statute miles and paces in minutes per mile throughout
//! the crate; kilometre values are only derived at the metrics boundary.

/// Mean Earth radius in miles used by the haversine formula
pub const EARTH_RADIUS_MILES: f64 = 3956.0;

/// Miles to kilometres
pub const MILES_TO_KM: f64 = 1.60934;

/// Pounds to kilograms
pub const LBS_TO_KG: f64 = 0.453592;

/// Great-circle distance between two coordinates in miles
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Pace in minutes per mile
///
/// Returns `f64::INFINITY` when either the elapsed time or the distance is
/// not positive, so callers never see NaN for a degenerate interval.
pub fn pace_min_per_mile(time_minutes: f64, distance_miles: f64) -> f64 {
    if distance_miles > 0.0 && time_minutes > 0.0 {
        time_minutes / distance_miles
    } else {
        f64::INFINITY
    }
}

/// Format a pace as `m:ss`, or `--` when it is not a finite number
pub fn format_pace(pace: f64) -> String {
    if !pace.is_finite() || pace < 0.0 {
        return "--".to_string();
    }
    let total_seconds = (pace * 60.0).round() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
