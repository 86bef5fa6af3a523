//! Result-set types as the query service sends them
//!
//! Every field is optional on the wire; absent keys and explicit `null`
//! both deserialize to `None`.

use serde::{Deserialize, Serialize};

use super::column::{ColumnType, WireError};

/// One page of a query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueryOutput {
    /// Service-assigned query identifier
    pub query_id: Option<String>,
    /// Continuation token; absent or empty means the result is complete
    pub next_token: Option<String>,
    /// Column metadata, one entry per column in every row
    pub column_info: Vec<ColumnInfo>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Progress and metering block, passed through to the host untouched
    pub query_status: Option<QueryStatus>,
}

impl QueryOutput {
    /// The continuation token, if a further page exists
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Number of rows in this page
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if this page holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the rows of a continuation page, taking over its token and status
    pub fn append_page(&mut self, page: QueryOutput) {
        self.rows.extend(page.rows);
        self.next_token = page.next_token;
        if page.query_status.is_some() {
            self.query_status = page.query_status;
        }
        if self.query_id.is_none() {
            self.query_id = page.query_id;
        }
    }
}

/// Query progress reported by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueryStatus {
    pub progress_percentage: Option<f64>,
    pub cumulative_bytes_scanned: Option<i64>,
    pub cumulative_bytes_metered: Option<i64>,
}

/// Result of a cancel request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CancelOutput {
    pub cancellation_message: Option<String>,
}

/// A result row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Row {
    pub data: Vec<Datum>,
}

impl Row {
    pub fn new(data: Vec<Datum>) -> Self {
        Self { data }
    }
}

/// One cell: a scalar, a series, an array, a nested row, or an explicit null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Datum {
    pub scalar_value: Option<String>,
    pub time_series_value: Option<Vec<TimeSeriesDataPoint>>,
    pub array_value: Option<Vec<Datum>>,
    pub row_value: Option<Row>,
    pub null_value: Option<bool>,
}

impl Datum {
    /// A scalar cell holding the given text
    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            scalar_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// An explicit null cell
    pub fn null() -> Self {
        Self {
            null_value: Some(true),
            ..Default::default()
        }
    }

    /// A time-series cell
    pub fn series(points: Vec<TimeSeriesDataPoint>) -> Self {
        Self {
            time_series_value: Some(points),
            ..Default::default()
        }
    }

    /// An array cell
    pub fn array(values: Vec<Datum>) -> Self {
        Self {
            array_value: Some(values),
            ..Default::default()
        }
    }

    /// A nested row cell
    pub fn row(values: Vec<Datum>) -> Self {
        Self {
            row_value: Some(Row::new(values)),
            ..Default::default()
        }
    }

    /// True when the service marked this cell as null
    pub fn is_null(&self) -> bool {
        self.null_value.unwrap_or(false)
    }
}

/// One point of a time-series cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TimeSeriesDataPoint {
    pub time: Option<String>,
    pub value: Option<Datum>,
}

impl TimeSeriesDataPoint {
    pub fn new(time: impl Into<String>, value: Datum) -> Self {
        Self {
            time: Some(time.into()),
            value: Some(value),
        }
    }
}

/// Metadata of one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ColumnInfo {
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub column_type: Option<WireType>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: WireType) -> Self {
        Self {
            name: Some(name.into()),
            column_type: Some(column_type),
        }
    }

    /// Column name, empty when the service left it out
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Resolve the declared type into a `ColumnType` tree
    pub fn column_type(&self) -> Result<ColumnType, WireError> {
        match &self.column_type {
            Some(t) => ColumnType::try_from(t),
            None => Err(WireError::MissingType(self.name().to_string())),
        }
    }
}

/// Declared column type; exactly one member is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WireType {
    pub scalar_type: Option<String>,
    pub array_column_info: Option<Box<ColumnInfo>>,
    pub time_series_measure_value_column_info: Option<Box<ColumnInfo>>,
    pub row_column_info: Option<Vec<ColumnInfo>>,
}

impl WireType {
    pub fn scalar(kind: impl Into<String>) -> Self {
        Self {
            scalar_type: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn time_series(value: WireType) -> Self {
        Self {
            time_series_measure_value_column_info: Some(Box::new(ColumnInfo {
                name: None,
                column_type: Some(value),
            })),
            ..Default::default()
        }
    }

    pub fn array(element: WireType) -> Self {
        Self {
            array_column_info: Some(Box::new(ColumnInfo {
                name: None,
                column_type: Some(element),
            })),
            ..Default::default()
        }
    }

    pub fn row(columns: Vec<ColumnInfo>) -> Self {
        Self {
            row_column_info: Some(columns),
            ..Default::default()
        }
    }
}
