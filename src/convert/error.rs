//! Conversion error types

use thiserror::Error;

use crate::frame::FrameError;

/// A single cell failed to parse
///
/// Never fatal: the assembler records a notice and leaves the cell null.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid boolean: {0:?}")]
    Bool(String),

    #[error("invalid {bits}-bit integer: {value:?}")]
    Int { value: String, bits: u8 },

    #[error("invalid float: {0:?}")]
    Float(String),

    #[error("invalid {kind}: {value:?}")]
    Temporal { kind: &'static str, value: String },

    #[error("row has {found} values, expected {expected}")]
    RowArity { found: usize, expected: usize },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Structural failures that abort frame assembly
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssembleError {
    /// A time-series column holds a cell that is neither a series nor null
    #[error("expecting timeseries column at: {0}")]
    MalformedSeries(usize),

    /// Long-to-wide conversion failed
    #[error("error formatting as timeseries: {0}")]
    Reshape(FrameError),
}
