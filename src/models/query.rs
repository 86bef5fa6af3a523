//! Query model and host query envelope

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::{ModelError, ModelResult};
use super::interval::round_interval;

/// Used when the host sends no data point limit
pub const DEFAULT_MAX_DATA_POINTS: i64 = 1024;

/// How the host wants results laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum FormatOption {
    /// One field per column
    #[default]
    Table = 0,
    /// Long results reshaped into one field per series
    TimeSeries = 1,
}

impl Serialize for FormatOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(*self as u32)
    }
}

impl<'de> Deserialize<'de> for FormatOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u32::deserialize(deserializer)? {
            1 => Ok(FormatOption::TimeSeries),
            _ => Ok(FormatOption::Table),
        }
    }
}

/// Query time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Window ending now
    pub fn last(duration: chrono::Duration) -> Self {
        let to = Utc::now();
        Self {
            from: to - duration,
            to,
        }
    }

    pub fn from_ms(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_ms(&self) -> i64 {
        self.to.timestamp_millis()
    }

    pub fn duration_ms(&self) -> i64 {
        self.to_ms() - self.from_ms()
    }
}

/// One query as the host sends it
///
/// `json` is the query editor's document; the rest is filled in by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataQuery {
    pub ref_id: String,
    pub time_range: TimeRange,
    pub interval_ms: i64,
    pub max_data_points: i64,
    pub json: serde_json::Value,
}

/// A parsed, normalized query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryModel {
    /// Query template text, never rewritten in place
    pub raw_query: String,
    /// Continuation token from a previous page; empty starts a new query
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_token: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub database: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub table: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub measure: String,

    /// Drain all pages before responding
    pub wait_for_result: bool,
    pub format: FormatOption,

    #[serde(skip)]
    pub time_range: TimeRange,
    #[serde(skip)]
    pub interval: Duration,
    #[serde(skip)]
    pub max_data_points: i64,
}

/// Queries saved before `format` became numeric
fn is_legacy_query(text: &str) -> bool {
    static LEGACY: OnceLock<Option<Regex>> = OnceLock::new();
    LEGACY
        .get_or_init(|| Regex::new(r#""format":\s*"table""#).ok())
        .as_ref()
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

impl QueryModel {
    /// Create a query for the given text with default options
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            max_data_points: DEFAULT_MAX_DATA_POINTS,
            ..Default::default()
        }
    }

    /// Parse the host envelope and fill in derived fields
    ///
    /// A zero `maxDataPoints` becomes 1024; a zero interval is derived from
    /// the time range and rounded to a canonical step.
    pub fn from_data_query(query: &DataQuery) -> ModelResult<Self> {
        let json = match &query.json {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        };
        let mut model: QueryModel = match serde_json::from_value(json) {
            Ok(model) => model,
            Err(err) => {
                if is_legacy_query(&query.json.to_string()) {
                    return Err(ModelError::LegacyQuery(err.to_string()));
                }
                return Err(ModelError::InvalidQuery(err.to_string()));
            }
        };

        model.time_range = query.time_range;
        model.max_data_points = query.max_data_points;
        model.interval = Duration::from_millis(query.interval_ms.max(0) as u64);
        model.normalize();
        Ok(model)
    }

    /// Apply the data point and interval defaults
    pub fn normalize(&mut self) {
        if self.max_data_points == 0 {
            self.max_data_points = DEFAULT_MAX_DATA_POINTS;
        }
        if self.interval.is_zero() && self.max_data_points > 0 {
            let millis = self.time_range.duration_ms() / self.max_data_points;
            self.interval = Duration::from_millis(round_interval(millis) as u64);
        }
    }

    /// Builder method: set the continuation token
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = token.into();
        self
    }

    /// Builder method: set the time window
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Builder method: set the interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method: set the output format
    pub fn with_format(mut self, format: FormatOption) -> Self {
        self.format = format;
        self
    }

    /// Builder method: drain all pages before responding
    pub fn wait_for_result(mut self, wait: bool) -> Self {
        self.wait_for_result = wait;
        self
    }
}

/// Body of the `cancel` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelRequest {
    pub query_id: String,
}

/// Body of the `tables` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesRequest {
    pub database: String,
}

/// Body of the `measures` and `dimensions` resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasuresRequest {
    pub database: String,
    pub table: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_automatic_interval() {
        let query = DataQuery {
            json: json!({}),
            ..Default::default()
        };
        let model = QueryModel::from_data_query(&query).unwrap();
        assert_eq!(model.max_data_points, 1024);
        assert_eq!(model.interval, Duration::from_millis(10));
    }

    #[test]
    fn test_interval_from_range() {
        let from = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let query = DataQuery {
            ref_id: "A".to_string(),
            time_range: TimeRange::new(from, from + chrono::Duration::hours(6)),
            interval_ms: 0,
            max_data_points: 1024,
            json: json!({"rawQuery": "SELECT 1"}),
        };
        let model = QueryModel::from_data_query(&query).unwrap();
        assert_eq!(model.interval, Duration::from_millis(20_000));
        assert_eq!(model.raw_query, "SELECT 1");
    }

    #[test]
    fn test_explicit_interval_kept() {
        let query = DataQuery {
            interval_ms: 60_000,
            json: json!({"rawQuery": "x"}),
            ..Default::default()
        };
        let model = QueryModel::from_data_query(&query).unwrap();
        assert_eq!(model.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_fields() {
        let query = DataQuery {
            json: json!({
                "rawQuery": "SELECT * FROM $__database.$__table",
                "database": "db",
                "table": "t",
                "measure": "m",
                "nextToken": "T1",
                "waitForResult": true,
                "format": 1
            }),
            ..Default::default()
        };
        let model = QueryModel::from_data_query(&query).unwrap();
        assert_eq!(model.database, "db");
        assert_eq!(model.table, "t");
        assert_eq!(model.measure, "m");
        assert_eq!(model.next_token, "T1");
        assert!(model.wait_for_result);
        assert_eq!(model.format, FormatOption::TimeSeries);
    }

    #[test]
    fn test_legacy_query() {
        let query = DataQuery {
            json: json!({"rawQuery": "SELECT 1", "format": "table"}),
            ..Default::default()
        };
        let err = QueryModel::from_data_query(&query).unwrap_err();
        assert!(matches!(err, ModelError::LegacyQuery(_)));
        assert!(err.to_string().contains("please rebuild it"));
    }

    #[test]
    fn test_invalid_query() {
        let query = DataQuery {
            json: json!({"rawQuery": 5}),
            ..Default::default()
        };
        let err = QueryModel::from_data_query(&query).unwrap_err();
        assert!(matches!(err, ModelError::InvalidQuery(_)));
        assert!(err.to_string().starts_with("error reading query"));
    }

    #[test]
    fn test_envelope_from_host_json() {
        let query: DataQuery = serde_json::from_value(json!({
            "refId": "B",
            "timeRange": {"from": "2020-01-01T00:00:00Z", "to": "2020-01-01T01:00:00Z"},
            "intervalMs": 1000,
            "maxDataPoints": 500,
            "json": {"rawQuery": "SELECT 1"}
        }))
        .unwrap();
        assert_eq!(query.ref_id, "B");
        assert_eq!(query.time_range.duration_ms(), 3_600_000);
        assert_eq!(query.max_data_points, 500);
    }
}
