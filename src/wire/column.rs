//! Closed column type tree
//!
//! The service describes every column with a `WireType` where exactly one
//! member is populated. `ColumnType` is the resolved, exhaustively matched
//! form the converters work on.

use std::fmt;

use thiserror::Error;

use super::types::WireType;

/// Column type resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("unsupported column type: {0}")]
    UnsupportedColumnType(String),

    #[error("column {0:?} has no type")]
    MissingType(String),
}

/// Scalar column kinds known to the service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Timestamp,
    Boolean,
    Varchar,
    Double,
    Bigint,
    Integer,
    Date,
    Time,
    IntervalDayToSecond,
    IntervalYearToMonth,
    /// A kind this adapter has no parser for (includes the service's own `UNKNOWN`)
    Unknown(String),
}

impl ScalarKind {
    /// Parse the service's scalar type name
    pub fn from_wire(name: &str) -> Self {
        match name {
            "TIMESTAMP" => ScalarKind::Timestamp,
            "BOOLEAN" => ScalarKind::Boolean,
            "VARCHAR" => ScalarKind::Varchar,
            "DOUBLE" => ScalarKind::Double,
            "BIGINT" => ScalarKind::Bigint,
            "INTEGER" => ScalarKind::Integer,
            "DATE" => ScalarKind::Date,
            "TIME" => ScalarKind::Time,
            "INTERVAL_DAY_TO_SECOND" => ScalarKind::IntervalDayToSecond,
            "INTERVAL_YEAR_TO_MONTH" => ScalarKind::IntervalYearToMonth,
            other => ScalarKind::Unknown(other.to_string()),
        }
    }

    /// The service's name for this kind
    pub fn as_str(&self) -> &str {
        match self {
            ScalarKind::Timestamp => "TIMESTAMP",
            ScalarKind::Boolean => "BOOLEAN",
            ScalarKind::Varchar => "VARCHAR",
            ScalarKind::Double => "DOUBLE",
            ScalarKind::Bigint => "BIGINT",
            ScalarKind::Integer => "INTEGER",
            ScalarKind::Date => "DATE",
            ScalarKind::Time => "TIME",
            ScalarKind::IntervalDayToSecond => "INTERVAL_DAY_TO_SECOND",
            ScalarKind::IntervalYearToMonth => "INTERVAL_YEAR_TO_MONTH",
            ScalarKind::Unknown(name) => name,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named member of a row column
#[derive(Debug, Clone, PartialEq)]
pub struct NamedColumn {
    pub name: String,
    pub column_type: ColumnType,
}

/// Resolved column type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Scalar(ScalarKind),
    TimeSeries(Box<ColumnType>),
    Row(Vec<NamedColumn>),
    Array(Box<ColumnType>),
}

impl ColumnType {
    /// Check if this column holds one series per cell
    pub fn is_time_series(&self) -> bool {
        matches!(self, ColumnType::TimeSeries(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar(kind) => write!(f, "{}", kind),
            ColumnType::TimeSeries(inner) => write!(f, "timeseries({})", inner),
            ColumnType::Array(inner) => write!(f, "array({})", inner),
            ColumnType::Row(columns) => {
                f.write_str("row(")?;
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", column.name, column.column_type)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl TryFrom<&WireType> for ColumnType {
    type Error = WireError;

    fn try_from(wire: &WireType) -> Result<Self, Self::Error> {
        if let Some(scalar) = &wire.scalar_type {
            return Ok(ColumnType::Scalar(ScalarKind::from_wire(scalar)));
        }
        if let Some(info) = &wire.time_series_measure_value_column_info {
            return Ok(ColumnType::TimeSeries(Box::new(info.column_type()?)));
        }
        if let Some(info) = &wire.array_column_info {
            return Ok(ColumnType::Array(Box::new(info.column_type()?)));
        }
        if let Some(columns) = &wire.row_column_info {
            let columns = columns
                .iter()
                .map(|c| {
                    Ok(NamedColumn {
                        name: c.name().to_string(),
                        column_type: c.column_type()?,
                    })
                })
                .collect::<Result<Vec<_>, WireError>>()?;
            return Ok(ColumnType::Row(columns));
        }
        Err(WireError::UnsupportedColumnType("empty type".to_string()))
    }
}
