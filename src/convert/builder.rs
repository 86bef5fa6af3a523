//! Field builder resolution
//!
//! A `FieldBuilder` is derived once per column from its `ColumnType` and
//! knows the output field type and how to parse every cell of the column.
//! Row and array columns are parsed recursively into JSON and stored as text.

use chrono::SecondsFormat;

use super::error::ParseError;
use super::parsers::{self, ParseResult};
use crate::frame::{FieldConfig, FieldType, Value};
use crate::wire::{ColumnType, Datum, ScalarKind, WireError};

/// How one cell of a column is parsed
#[derive(Debug, Clone, PartialEq)]
pub enum DatumParser {
    Bool,
    Int32,
    Int64,
    Float64,
    Varchar,
    Timestamp,
    Date,
    Time,
    Interval,
    /// Named members, parsed positionally from the row's data
    Row(Vec<(String, DatumParser)>),
    Array(Box<DatumParser>),
    /// A series nested inside a row or array
    Series(Box<DatumParser>),
}

impl DatumParser {
    fn resolve(column_type: &ColumnType) -> Result<Self, WireError> {
        let parser = match column_type {
            ColumnType::Scalar(kind) => match kind {
                ScalarKind::Boolean => DatumParser::Bool,
                ScalarKind::Integer => DatumParser::Int32,
                ScalarKind::Bigint => DatumParser::Int64,
                ScalarKind::Double => DatumParser::Float64,
                ScalarKind::Varchar => DatumParser::Varchar,
                ScalarKind::Timestamp => DatumParser::Timestamp,
                ScalarKind::Date => DatumParser::Date,
                ScalarKind::Time => DatumParser::Time,
                ScalarKind::IntervalDayToSecond | ScalarKind::IntervalYearToMonth => {
                    DatumParser::Interval
                }
                ScalarKind::Unknown(name) => {
                    return Err(WireError::UnsupportedColumnType(format!(
                        "scalar value {}",
                        name
                    )))
                }
            },
            ColumnType::TimeSeries(inner) => DatumParser::Series(Box::new(Self::resolve(inner)?)),
            ColumnType::Array(element) => DatumParser::Array(Box::new(Self::resolve(element)?)),
            ColumnType::Row(columns) => DatumParser::Row(
                columns
                    .iter()
                    .map(|c| Ok((c.name.clone(), Self::resolve(&c.column_type)?)))
                    .collect::<Result<Vec<_>, WireError>>()?,
            ),
        };
        Ok(parser)
    }

    /// Parse one cell into a field value
    pub fn parse(&self, datum: &Datum) -> ParseResult {
        let raw = datum.scalar_value.as_deref();
        match self {
            DatumParser::Bool => parsers::parse_bool(raw),
            DatumParser::Int32 => parsers::parse_int32(raw),
            DatumParser::Int64 => parsers::parse_int64(raw),
            DatumParser::Float64 => parsers::parse_float64(raw),
            DatumParser::Varchar => parsers::parse_varchar(raw),
            DatumParser::Timestamp => parsers::parse_timestamp(raw),
            DatumParser::Date => parsers::parse_date(raw),
            DatumParser::Time => parsers::parse_time(raw),
            DatumParser::Interval => parsers::parse_interval(raw),
            DatumParser::Row(_) | DatumParser::Array(_) | DatumParser::Series(_) => {
                match self.to_json(datum)? {
                    serde_json::Value::Null => Ok(None),
                    json => Ok(Some(Value::String(json.to_string()))),
                }
            }
        }
    }

    /// Parse one cell into JSON; nested values keep their structure
    pub fn to_json(&self, datum: &Datum) -> Result<serde_json::Value, ParseError> {
        match self {
            DatumParser::Row(members) => {
                let Some(row) = &datum.row_value else {
                    return Ok(serde_json::Value::Null);
                };
                if row.data.len() > members.len() {
                    return Err(ParseError::RowArity {
                        found: row.data.len(),
                        expected: members.len(),
                    });
                }
                let mut map = serde_json::Map::new();
                for ((name, parser), value) in members.iter().zip(&row.data) {
                    map.insert(name.clone(), parser.to_json(value)?);
                }
                Ok(serde_json::Value::Object(map))
            }
            DatumParser::Array(element) => {
                let Some(values) = &datum.array_value else {
                    return Ok(serde_json::Value::Null);
                };
                values
                    .iter()
                    .map(|v| element.to_json(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(serde_json::Value::Array)
            }
            DatumParser::Series(value) => {
                let Some(points) = &datum.time_series_value else {
                    return Ok(serde_json::Value::Null);
                };
                let mut out = Vec::with_capacity(points.len());
                for point in points {
                    let time = match &point.time {
                        Some(t) => json_scalar(Some(Value::Time(parsers::timestamp(t)?))),
                        None => serde_json::Value::Null,
                    };
                    let value = match &point.value {
                        Some(d) => value.to_json(d)?,
                        None => serde_json::Value::Null,
                    };
                    out.push(serde_json::json!({ "time": time, "value": value }));
                }
                Ok(serde_json::Value::Array(out))
            }
            scalar => scalar.parse(datum).map(json_scalar),
        }
    }
}

fn json_scalar(value: Option<Value>) -> serde_json::Value {
    match value {
        None => serde_json::Value::Null,
        Some(Value::Time(t)) => t.to_rfc3339_opts(SecondsFormat::Nanos, true).into(),
        Some(Value::Bool(b)) => b.into(),
        Some(Value::Int32(i)) => i.into(),
        Some(Value::Int64(i)) => i.into(),
        Some(Value::Float64(f)) => f.into(),
        Some(Value::String(s)) => s.into(),
    }
}

/// Everything needed to turn one column into a field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuilder {
    pub field_type: FieldType,
    pub parser: DatumParser,
    /// Each cell holds a whole series; `parser` then applies to point values
    pub is_time_series: bool,
    /// Cells are rendered to JSON text
    pub serialize_as_json: bool,
    pub config: Option<FieldConfig>,
}

impl FieldBuilder {
    /// Resolve a builder for a column type
    pub fn resolve(column_type: &ColumnType) -> Result<Self, WireError> {
        match column_type {
            ColumnType::Scalar(kind) => {
                let field_type = match kind {
                    ScalarKind::Boolean => FieldType::NullableBool,
                    ScalarKind::Integer => FieldType::NullableInt32,
                    ScalarKind::Bigint => FieldType::NullableInt64,
                    ScalarKind::Double => FieldType::NullableFloat64,
                    ScalarKind::Timestamp | ScalarKind::Date | ScalarKind::Time => {
                        FieldType::NullableTime
                    }
                    _ => FieldType::NullableString,
                };
                Ok(Self {
                    field_type,
                    parser: DatumParser::resolve(column_type)?,
                    is_time_series: false,
                    serialize_as_json: false,
                    config: None,
                })
            }
            ColumnType::TimeSeries(inner) => {
                let mut builder = Self::resolve(inner)?;
                builder.is_time_series = true;
                Ok(builder)
            }
            ColumnType::Array(_) => Ok(Self {
                field_type: FieldType::NullableString,
                parser: DatumParser::resolve(column_type)?,
                is_time_series: false,
                serialize_as_json: true,
                config: Some(FieldConfig::default().custom("displayMode", "json-view")),
            }),
            ColumnType::Row(_) => Ok(Self {
                field_type: FieldType::NullableString,
                parser: DatumParser::resolve(column_type)?,
                is_time_series: false,
                serialize_as_json: true,
                config: Some(FieldConfig::default()),
            }),
        }
    }

    /// Parse one cell of this column
    pub fn parse(&self, datum: &Datum) -> ParseResult {
        self.parser.parse(datum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{NamedColumn, TimeSeriesDataPoint};

    fn scalar(kind: ScalarKind) -> ColumnType {
        ColumnType::Scalar(kind)
    }

    #[test]
    fn test_scalar_field_types() {
        let cases = [
            (ScalarKind::Timestamp, FieldType::NullableTime),
            (ScalarKind::Boolean, FieldType::NullableBool),
            (ScalarKind::Varchar, FieldType::NullableString),
            (ScalarKind::Double, FieldType::NullableFloat64),
            (ScalarKind::Bigint, FieldType::NullableInt64),
            (ScalarKind::Integer, FieldType::NullableInt32),
            (ScalarKind::Date, FieldType::NullableTime),
            (ScalarKind::Time, FieldType::NullableTime),
            (ScalarKind::IntervalDayToSecond, FieldType::NullableString),
            (ScalarKind::IntervalYearToMonth, FieldType::NullableString),
        ];
        for (kind, expected) in cases {
            let builder = FieldBuilder::resolve(&scalar(kind.clone())).unwrap();
            assert_eq!(builder.field_type, expected, "{}", kind);
            assert!(!builder.is_time_series);
            assert!(!builder.serialize_as_json);
            assert_eq!(builder.parse(&Datum::null()), Ok(None), "{}", kind);
        }
    }

    #[test]
    fn test_unknown_scalar() {
        let err = FieldBuilder::resolve(&scalar(ScalarKind::Unknown("UNKNOWN".to_string())))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported column type: scalar value UNKNOWN"
        );
    }

    #[test]
    fn test_time_series_reuses_inner_builder() {
        let builder =
            FieldBuilder::resolve(&ColumnType::TimeSeries(Box::new(scalar(ScalarKind::Double))))
                .unwrap();
        assert!(builder.is_time_series);
        assert_eq!(builder.field_type, FieldType::NullableFloat64);
        assert_eq!(
            builder.parse(&Datum::scalar("2.5")),
            Ok(Some(Value::Float64(2.5)))
        );
    }

    #[test]
    fn test_array_as_json() {
        let builder =
            FieldBuilder::resolve(&ColumnType::Array(Box::new(scalar(ScalarKind::Bigint))))
                .unwrap();
        assert!(builder.serialize_as_json);
        assert_eq!(builder.field_type, FieldType::NullableString);
        let config = builder.config.as_ref().unwrap();
        assert_eq!(config.custom["displayMode"], "json-view");

        let datum = Datum::array(vec![Datum::scalar("1"), Datum::null(), Datum::scalar("3")]);
        assert_eq!(
            builder.parse(&datum),
            Ok(Some(Value::String("[1,null,3]".to_string())))
        );
        assert!(builder.parse(&Datum::array(vec![Datum::scalar("x")])).is_err());
    }

    #[test]
    fn test_row_as_json() {
        let column = ColumnType::Row(vec![
            NamedColumn {
                name: "name".to_string(),
                column_type: scalar(ScalarKind::Varchar),
            },
            NamedColumn {
                name: "at".to_string(),
                column_type: scalar(ScalarKind::Timestamp),
            },
        ]);
        let builder = FieldBuilder::resolve(&column).unwrap();
        assert!(builder.serialize_as_json);
        assert!(builder.config.as_ref().unwrap().custom.is_empty());

        let datum = Datum::row(vec![
            Datum::scalar("cpu"),
            Datum::scalar("2020-01-01 00:00:00.000000000"),
        ]);
        assert_eq!(
            builder.parse(&datum),
            Ok(Some(Value::String(
                r#"{"at":"2020-01-01T00:00:00.000000000Z","name":"cpu"}"#.to_string()
            )))
        );

        let too_wide = Datum::row(vec![Datum::null(), Datum::null(), Datum::null()]);
        assert_eq!(
            builder.parse(&too_wide),
            Err(ParseError::RowArity {
                found: 3,
                expected: 2
            })
        );
        assert_eq!(builder.parse(&Datum::null()), Ok(None));
    }

    #[test]
    fn test_nested_series_in_array() {
        let column = ColumnType::Array(Box::new(ColumnType::TimeSeries(Box::new(scalar(
            ScalarKind::Integer,
        )))));
        let builder = FieldBuilder::resolve(&column).unwrap();
        assert!(!builder.is_time_series);

        let datum = Datum::array(vec![Datum::series(vec![TimeSeriesDataPoint::new(
            "2020-01-01 00:00:01",
            Datum::scalar("7"),
        )])]);
        assert_eq!(
            builder.parse(&datum),
            Ok(Some(Value::String(
                r#"[[{"time":"2020-01-01T00:00:01.000000000Z","value":7}]]"#.to_string()
            )))
        );
    }
}
