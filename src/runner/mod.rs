//! Query Runners
//!
//! The backing query service behind one narrow trait:
//! - `FixtureRunner`: replays recorded responses, for tests and offline use
//! - `TimestreamRunner` (feature `aws`): the managed service via the AWS SDK

#[cfg(feature = "aws")]
mod aws;
mod fixture;

#[cfg(feature = "aws")]
pub use aws::TimestreamRunner;
pub use fixture::{FixtureRunner, RunnerCall};

use async_trait::async_trait;

use crate::wire::{CancelOutput, QueryOutput};

/// Executes query text against the backing service
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run a query, or fetch the next page when `next_token` is set
    async fn query(&self, query: &str, next_token: Option<&str>)
        -> Result<QueryOutput, RunnerError>;

    /// Ask the service to cancel a running query
    async fn cancel_query(&self, query_id: &str) -> Result<CancelOutput, RunnerError>;
}

/// Errors that can occur talking to the backing service
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunnerError {
    /// The service rejected or failed the request
    #[error("{0}")]
    Service(String),

    /// A recorded response could not be loaded
    #[error("fixture {path}: {message}")]
    Fixture { path: String, message: String },

    /// A fixture runner has no scripted response left
    #[error("no recorded response left for query: {0}")]
    Exhausted(String),
}
