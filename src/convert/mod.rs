//! Result Set Conversion
//!
//! Converts the service's self-describing result set into host frames.
//!
//! # Architecture
//!
//! ```text
//! ColumnInfo ──▶ ColumnType ──▶ FieldBuilder ──┐
//!                                              ▼
//! Rows ─────────────────────────────────▶ assemble() ──▶ Vec<Frame>
//! ```
//!
//! - **Parsers**: scalar text to typed values, null-preserving
//! - **Builder**: per-column output type and recursive datum parser
//! - **Assembler**: table vs. series layout, notices, result metadata

mod assembler;
mod builder;
mod error;
pub mod parsers;

pub use assembler::assemble;
pub use builder::{DatumParser, FieldBuilder};
pub use error::{AssembleError, ParseError};
