//! Query Routes
//!
//! - POST /api/v1/query - Run a batch of queries
//!
//! Failed queries are reported per ref id inside a 200 response.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::datasource::{QueryDataRequest, QueryDataResponse};

/// POST /api/v1/query
pub async fn query_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryDataRequest>,
) -> ApiResult<Json<QueryDataResponse>> {
    if req.queries.is_empty() {
        return Err(ApiError::Validation("queries cannot be empty".to_string()));
    }
    if let Some(q) = req.queries.iter().find(|q| q.ref_id.is_empty()) {
        return Err(ApiError::Validation(format!(
            "query without refId: {}",
            q.json
        )));
    }

    tracing::debug!(queries = req.queries.len(), "query request");
    Ok(Json(state.datasource.query_data(&req).await))
}
