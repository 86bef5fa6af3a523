//! Backing Service Wire Model
//!
//! Serde model of the result set returned by the managed time-series query
//! service, in the service's own JSON shape (PascalCase keys). Recorded
//! responses in `testdata/` deserialize straight into these types.
//!
//! - **Types**: `QueryOutput`, `Row`, `Datum`, `TimeSeriesDataPoint`, `ColumnInfo`
//! - **Column**: the closed `ColumnType` tree resolved from `WireType`
//!
//! # Example
//!
//! ```rust
//! use timestream_datasource::wire::{ColumnInfo, ColumnType, ScalarKind, WireType};
//!
//! let column = ColumnInfo::new("value", WireType::scalar("DOUBLE"));
//! let column_type = column.column_type().unwrap();
//! assert_eq!(column_type, ColumnType::Scalar(ScalarKind::Double));
//! ```

mod column;
mod types;

pub use column::{ColumnType, NamedColumn, ScalarKind, WireError};
pub use types::{
    CancelOutput, ColumnInfo, Datum, QueryOutput, QueryStatus, Row, TimeSeriesDataPoint,
    WireType,
};
