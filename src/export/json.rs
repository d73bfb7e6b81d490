use super::ExportError;
use crate::analysis::AnalysisResult;

/// Serialize a report as pretty JSON
///
/// Non-finite numbers (undefined paces, degenerate loads) are written as
/// `null`.
pub fn to_json_string(result: &AnalysisResult) -> Result<String, ExportError> {
    to_json(result)
}

/// Serialize any report fragment as pretty JSON
pub fn to_json<T: serde::Serialize>(data: &T) -> Result<String, ExportError> {
    serde_json::to_string_pretty(data).map_err(|e| ExportError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_result;

    #[test]
    fn test_report_json() {
        let result = sample_result();
        let json = to_json_string(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["creator"], "Test Watch");
        assert_eq!(value["pace_limit"], 8.0);
        assert_eq!(value["route_data"][0]["type"], "fast");
        assert_eq!(value["route_data"][1]["type"], "slow");
        assert!(value["vo2max"].is_null());
        assert!(value["fast_segments"][0]["coordinates"][0].is_array());
    }

    #[test]
    fn test_non_finite_numbers_become_null() {
        #[derive(serde::Serialize)]
        struct Pace {
            pace: f64,
        }

        let json = to_json(&Pace { pace: f64::INFINITY }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["pace"].is_null());
    }
}
