//! Custom frame metadata for query results

use serde::{Deserialize, Serialize};

use crate::wire::QueryStatus;

/// Progress block of the backing service, passed through as-is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatusMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_bytes_scanned: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_bytes_metered: Option<i64>,
}

impl From<&QueryStatus> for QueryStatusMeta {
    fn from(status: &QueryStatus) -> Self {
        Self {
            progress_percentage: status.progress_percentage,
            cumulative_bytes_scanned: status.cumulative_bytes_scanned,
            cumulative_bytes_metered: status.cumulative_bytes_metered,
        }
    }
}

/// Query metadata attached to the first frame of a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResultMeta {
    /// Epoch ms; set on the first page of a fresh query only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_start_time: Option<i64>,
    /// Epoch ms; set once no further page is pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_finish_time: Option<i64>,
    /// Empty when the result is complete
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_series: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QueryStatusMeta>,
}

impl QueryResultMeta {
    /// Check if further pages are pending
    pub fn has_more(&self) -> bool {
        !self.next_token.is_empty()
    }
}
