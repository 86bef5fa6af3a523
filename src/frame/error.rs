//! Frame error types

use thiserror::Error;

use super::field::FieldType;

/// Errors raised while building or reshaping frames
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A value of the wrong type was written into a field
    #[error("type mismatch: cannot set {value} in {field_type} field")]
    TypeMismatch {
        field_type: FieldType,
        value: &'static str,
    },

    /// Null written into a non-nullable field
    #[error("field of type {0} is not nullable")]
    NotNullable(FieldType),

    /// Index past the end of a field
    #[error("index {index} out of range for field of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Fields of one frame have different lengths
    #[error("frame has fields of different lengths: field {name} has {len}, expected {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    /// Long-to-wide conversion rejected the input frame
    #[error("can not convert to wide series: {0}")]
    Reshape(String),
}

/// Result type alias for frame operations
pub type FrameResult<T> = Result<T, FrameError>;
