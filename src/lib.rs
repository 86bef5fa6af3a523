//! # Timestream Datasource
//!
//! Backend adapter between a dashboard host and a managed time-series query
//! service: runs templated queries, pages through continuation tokens and
//! converts the service's self-describing result sets into columnar frames.
//!
//! ## Features
//!
//! - **Frame assembly**: scalar, array, row and time-series columns mapped to typed fields
//! - **Macros**: `$__timeFilter`, `$__interval`, `$__database` and friends
//! - **Pagination**: drain on request, or stream continuation pages to a subscriber
//! - **Catalog lookups**: databases, tables, measures, dimensions; query cancellation
//!
//! ## Modules
//!
//! - [`wire`]: The service's result set model
//! - [`frame`]: Columnar frames, long-to-wide reshape, text rendering
//! - [`convert`]: Cell parsers, field builders, the frame assembler
//! - [`macros`]: Macro interpolation
//! - [`models`]: Query and settings models
//! - [`runner`]: The query runner trait and its implementations
//! - [`datasource`]: Query execution, streams and resource calls
//! - [`api`]: HTTP API with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use timestream_datasource::datasource::{Datasource, QueryDataRequest};
//! use timestream_datasource::models::{DataQuery, DatasourceSettings};
//! use timestream_datasource::runner::FixtureRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Arc::new(FixtureRunner::from_files(&["testdata/table.json"])?);
//!     let datasource = Datasource::new("local", DatasourceSettings::default(), runner);
//!
//!     let request = QueryDataRequest {
//!         queries: vec![DataQuery {
//!             ref_id: "A".to_string(),
//!             json: serde_json::json!({"rawQuery": "SELECT * FROM $__database.$__table"}),
//!             ..Default::default()
//!         }],
//!     };
//!     let response = datasource.query_data(&request).await;
//!
//!     for frame in &response.responses["A"].frames {
//!         print!("{}", timestream_datasource::frame::table::render(frame));
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod convert;
pub mod datasource;
pub mod frame;
pub mod macros;
pub mod models;
pub mod runner;
pub mod wire;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    ApiConfig, Config, ConfigError, DatasourceConfig, LoggingConfig, StreamingConfig,
};

pub use convert::{assemble, AssembleError, ParseError};

pub use datasource::{
    CheckHealthResult, DataResponse, Datasource, ErrorSource, HealthStatus, QueryDataRequest,
    QueryDataResponse, QueryError, ResourceError, StreamError,
};

pub use frame::{Field, FieldType, Frame, FrameError, Value};

pub use macros::{interpolate, MacroError, MacroTable};

pub use models::{DataQuery, DatasourceSettings, FormatOption, QueryModel, TimeRange};

pub use runner::{FixtureRunner, QueryRunner, RunnerError};

pub use wire::{ColumnType, QueryOutput, WireError};
