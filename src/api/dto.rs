//! Data Transfer Objects
//!
//! Response types for the API endpoints that are not datasource types
//! themselves. Query requests and responses are served as-is.

use serde::Serialize;

use crate::datasource::HealthStatus;
use crate::frame::Frame;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "OK" or "ERROR"
    pub status: HealthStatus,
    /// Result of the connection check
    pub message: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Messages pushed to a stream subscriber
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Frames of one continuation page
    Frame { frame: Frame },
    /// The stream failed; no more frames follow
    Error { message: String },
    /// The query is exhausted or was cancelled
    Done,
}
