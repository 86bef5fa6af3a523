//! Resource Routes
//!
//! - GET /api/v1/resources/:name - Catalog lookups
//! - POST /api/v1/resources/:name - Catalog lookups with a body, cancellation

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::datasource::{ResourceMethod, ResourceResponse};

/// GET|POST /api/v1/resources/:name
pub async fn call_resource(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    method: Method,
    body: Bytes,
) -> ApiResult<Response> {
    let method = if method == Method::POST {
        ResourceMethod::Post
    } else {
        ResourceMethod::Get
    };

    let response = state.datasource.call_resource(&name, method, &body).await?;
    Ok(match response {
        ResourceResponse::Json(value) => Json(value).into_response(),
        ResourceResponse::Text(text) => text.into_response(),
    })
}
