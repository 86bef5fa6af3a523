//! Model parsing errors

use thiserror::Error;

/// Errors reading host-supplied JSON
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Query JSON does not match the current query structure
    #[error("error reading query: {0}")]
    InvalidQuery(String),

    /// Query was saved by an older editor and must be rebuilt
    #[error("query is incompatible with current structure, please rebuild it: {0}")]
    LegacyQuery(String),

    /// Datasource settings JSON is malformed
    #[error("could not unmarshal DatasourceSettings json: {0}")]
    Settings(String),
}

/// Result type alias for model parsing
pub type ModelResult<T> = Result<T, ModelError>;
