//! Request, settings and metadata models
//!
//! Everything the host sends in (queries, resource bodies, datasource
//! settings) and the custom metadata sent back on the first frame.

mod error;
mod interval;
mod meta;
mod query;
mod settings;

pub use error::{ModelError, ModelResult};
pub use interval::round_interval;
pub use meta::{QueryResultMeta, QueryStatusMeta};
pub use query::{
    CancelRequest, DataQuery, FormatOption, MeasuresRequest, QueryModel, TablesRequest,
    TimeRange, DEFAULT_MAX_DATA_POINTS,
};
pub use settings::DatasourceSettings;
