//! Columnar Frame Model
//!
//! The host-facing result format: a frame is a set of named, equal-length
//! typed fields plus metadata. Every response carries at least one frame.
//!
//! # Architecture
//!
//! - **Field**: typed nullable column vectors (`FieldValues`) with labels and display config
//! - **Frame**: fields plus `FrameMeta` (notices, stats, channel, custom query meta)
//! - **Reshape**: time-series schema detection and long-to-wide conversion
//! - **Table**: plain-text rendering for terminals

mod data;
mod error;
mod field;
pub mod reshape;
pub mod table;

pub use data::{Frame, FrameMeta, Notice, NoticeSeverity, Stat};
pub use error::{FrameError, FrameResult};
pub use field::{Field, FieldConfig, FieldType, FieldValues, Labels, Value};
pub use reshape::{long_to_wide, TimeSeriesSchema, TimeSeriesType};
