use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Raw parallel reading arrays of a day. Arrays may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entries {
    #[serde(default)]
    pub temp: Vec<Option<f64>>,
    #[serde(default)]
    pub humid: Vec<Option<f64>>,
    #[serde(default)]
    pub heat_index: Vec<Option<f64>>,
    /// Sample times as `HH:mm`
    #[serde(default)]
    pub time: Vec<String>,
}

/// A daily extreme (peak or lowest temperature) and when it happened
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub value: f64,
    #[serde(default)]
    pub time: String,
}

/// One day of readings, as stored in the daily collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDocument {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub entries: Entries,
    #[serde(default)]
    pub peak_temp: Option<Extreme>,
    #[serde(default)]
    pub lowest_temp: Option<Extreme>,
    /// Average temperature per hour of day, keyed by hour
    #[serde(default)]
    pub hourly_temp: BTreeMap<String, f64>,
    /// Average humidity per hour of day, keyed by hour
    #[serde(default)]
    pub hourly_humid: BTreeMap<String, f64>,
    #[serde(default)]
    pub data_point_count: u32,
}

/// All-time aggregates, as stored in the overall collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallDocument {
    #[serde(default)]
    pub correlation_peak_low_temperature: f64,
    #[serde(default)]
    pub overall_hourly_average: BTreeMap<String, f64>,
}

/// Most recent sample of a day
#[derive(Debug, Clone, PartialEq)]
pub struct LastReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heat_index: Option<f64>,
    /// `HH:mm` as recorded
    pub time: String,
    /// Document date combined with `time`, if both parse
    pub datetime: Option<NaiveDateTime>,
}

/// Document decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Malformed document {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document {0} has no readings")]
    Empty(String),
}

impl DailyDocument {
    /// Decode a raw document body
    pub fn from_value(id: &str, data: &serde_json::Value) -> Result<Self, DocumentError> {
        serde_json::from_value(data.clone()).map_err(|source| DocumentError::Malformed {
            id: id.to_string(),
            source,
        })
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// The last element of each reading array
    pub fn last_reading(&self) -> Option<LastReading> {
        let time = self.entries.time.last()?.clone();
        let datetime = match (self.parsed_date(), parse_time(&time)) {
            (Some(date), Some(t)) => Some(date.and_time(t)),
            _ => None,
        };

        Some(LastReading {
            temperature: self.entries.temp.last().copied().flatten(),
            humidity: self.entries.humid.last().copied().flatten(),
            heat_index: self.entries.heat_index.last().copied().flatten(),
            time,
            datetime,
        })
    }
}

impl OverallDocument {
    pub fn from_value(id: &str, data: &serde_json::Value) -> Result<Self, DocumentError> {
        serde_json::from_value(data.clone()).map_err(|source| DocumentError::Malformed {
            id: id.to_string(),
            source,
        })
    }
}

/// Hourly averages in three shapes for charting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlySeries {
    /// Gap-filled averages from midnight to the last recorded hour
    pub filled: Vec<f64>,
    /// `filled` with the first raw reading prepended as the series origin
    pub adjusted: Vec<f64>,
    /// Averages exactly as stored
    pub raw: BTreeMap<String, f64>,
}

/// A day's readings reshaped for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayEntry {
    pub date: String,
    pub temperatures: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    /// Sample timestamps, aligned with `temperatures`; `None` where the time didn't parse
    pub datetime: Vec<Option<NaiveDateTime>>,
    pub data_point_count: u32,
    pub hourly_temperature: HourlySeries,
    pub hourly_humidity: HourlySeries,
    /// 288 slots at 5-minute resolution, `None` where no sample landed
    pub expanded_temperature: Vec<Option<f64>>,
    pub expanded_humidity: Vec<Option<f64>>,
    pub expanded_datetime: Vec<NaiveDateTime>,
}

/// Output of grid alignment
#[derive(Debug, Clone, PartialEq)]
pub struct GridSeries {
    pub temperature: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    pub datetime: Vec<NaiveDateTime>,
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse `HH:mm`, tolerating a trailing `:ss`
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_document() {
        let doc = DailyDocument::from_value(
            "2024-03-01",
            &json!({
                "date": "2024-03-01",
                "entries": {
                    "temp": [24.1, 24.3, null],
                    "humid": [60.0, 61.5, 62.0],
                    "heat_index": [24.5, 24.8, 25.0],
                    "time": ["00:00", "00:05", "00:10"]
                },
                "peak_temp": { "value": 31.2, "time": "13:40" },
                "lowest_temp": { "value": 22.8, "time": "05:15" },
                "hourly_temp": { "0": 24.2 },
                "hourly_humid": { "0": 61.0 },
                "data_point_count": 3
            }),
        )
        .unwrap();

        assert_eq!(doc.entries.temp, vec![Some(24.1), Some(24.3), None]);
        assert_eq!(doc.peak_temp.as_ref().map(|p| p.value), Some(31.2));
        assert_eq!(doc.data_point_count, 3);
    }

    #[test]
    fn test_decode_missing_optional_fields() {
        let doc = DailyDocument::from_value("d", &json!({ "date": "2024-03-01" })).unwrap();
        assert!(doc.entries.time.is_empty());
        assert!(doc.peak_temp.is_none());
        assert!(doc.last_reading().is_none());
    }

    #[test]
    fn test_decode_error_names_document() {
        let err = DailyDocument::from_value("bad-doc", &json!({ "entries": {} })).unwrap_err();
        assert!(err.to_string().contains("bad-doc"));
    }

    #[test]
    fn test_last_reading() {
        let doc = DailyDocument::from_value(
            "d",
            &json!({
                "date": "2024-03-01",
                "entries": {
                    "temp": [24.1, 25.0],
                    "humid": [60.0],
                    "heat_index": [24.5, 25.6],
                    "time": ["09:00", "09:05"]
                }
            }),
        )
        .unwrap();

        let last = doc.last_reading().unwrap();
        assert_eq!(last.temperature, Some(25.0));
        assert_eq!(last.humidity, Some(60.0));
        assert_eq!(last.heat_index, Some(25.6));
        assert_eq!(last.time, "09:05");
        assert_eq!(
            last.datetime,
            NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(9, 5, 0))
        );
    }

    #[test]
    fn test_parse_time_variants() {
        assert_eq!(parse_time("07:35"), NaiveTime::from_hms_opt(7, 35, 0));
        assert_eq!(parse_time("7:35"), NaiveTime::from_hms_opt(7, 35, 0));
        assert_eq!(parse_time("07:35:20"), NaiveTime::from_hms_opt(7, 35, 20));
        assert_eq!(parse_time("noon"), None);
    }
}
