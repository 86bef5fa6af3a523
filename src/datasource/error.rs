//! Datasource error types
//!
//! Every failure is classified so the host can tell a broken query from a
//! broken adapter.

use serde::Serialize;
use thiserror::Error;

use crate::convert::AssembleError;
use crate::macros::MacroError;
use crate::models::ModelError;
use crate::runner::RunnerError;

/// Who is to blame for a failed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// The adapter itself failed
    Plugin,
    /// The query, its data or the backing service failed
    Downstream,
}

/// Errors that fail one query of a request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl QueryError {
    pub fn error_source(&self) -> ErrorSource {
        match self {
            QueryError::Model(ModelError::LegacyQuery(_)) => ErrorSource::Downstream,
            QueryError::Model(_) => ErrorSource::Plugin,
            QueryError::Macro(_) => ErrorSource::Downstream,
            QueryError::Runner(RunnerError::Service(_)) => ErrorSource::Downstream,
            QueryError::Runner(_) => ErrorSource::Plugin,
            QueryError::Assemble(_) => ErrorSource::Plugin,
        }
    }
}

/// Errors from resource calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("unknown resource: {0}")]
    NotFound(String),

    #[error("{0} requires a post command")]
    MethodNotAllowed(String),

    #[error("error reading {resource} request: {message}")]
    BadRequest { resource: String, message: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<RunnerError> for ResourceError {
    fn from(err: RunnerError) -> Self {
        ResourceError::Query(QueryError::Runner(err))
    }
}

/// Errors from stream subscriptions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("no open query for stream path: {0}")]
    NotFound(String),

    #[error("streams are read-only")]
    PermissionDenied,

    #[error(transparent)]
    Query(#[from] QueryError),
}
