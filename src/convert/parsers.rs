//! Datum parsers
//!
//! Pure functions from one scalar cell (`None` when the cell carries no
//! scalar) to a typed value. Every parser maps `None` to `Ok(None)`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use super::error::ParseError;
use crate::frame::Value;

/// `2020-03-18 17:26:30.000000000`, fraction optional, up to 9 digits
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

pub type ParseResult = Result<Option<Value>, ParseError>;

pub fn parse_bool(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    raw.parse::<bool>()
        .map(|b| Some(Value::Bool(b)))
        .map_err(|_| ParseError::Bool(raw.to_string()))
}

pub fn parse_int32(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    raw.parse::<i32>()
        .map(|i| Some(Value::Int32(i)))
        .map_err(|_| ParseError::Int {
            value: raw.to_string(),
            bits: 32,
        })
}

pub fn parse_int64(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    raw.parse::<i64>()
        .map(|i| Some(Value::Int64(i)))
        .map_err(|_| ParseError::Int {
            value: raw.to_string(),
            bits: 64,
        })
}

pub fn parse_float64(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    raw.parse::<f64>()
        .map(|f| Some(Value::Float64(f)))
        .map_err(|_| ParseError::Float(raw.to_string()))
}

pub fn parse_varchar(raw: Option<&str>) -> ParseResult {
    Ok(raw.map(|s| Value::String(s.to_string())))
}

/// Intervals stay as the service prints them
pub fn parse_interval(raw: Option<&str>) -> ParseResult {
    parse_varchar(raw)
}

pub fn parse_timestamp(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    timestamp(raw).map(|t| Some(Value::Time(t)))
}

/// Midnight UTC of the given day
pub fn parse_date(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    let invalid = || ParseError::Temporal {
        kind: "date",
        value: raw.to_string(),
    };
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Some(Value::Time(Utc.from_utc_datetime(&midnight))))
}

/// Time of day, anchored to 1970-01-01 UTC
pub fn parse_time(raw: Option<&str>) -> ParseResult {
    let Some(raw) = raw else { return Ok(None) };
    let invalid = || ParseError::Temporal {
        kind: "time",
        value: raw.to_string(),
    };
    let time = NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|_| invalid())?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).ok_or_else(invalid)?;
    Ok(Some(Value::Time(Utc.from_utc_datetime(&epoch.and_time(time)))))
}

/// Parse a service timestamp; used for series time axes as well
pub fn timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ParseError::Temporal {
            kind: "timestamp",
            value: raw.to_string(),
        })
}
