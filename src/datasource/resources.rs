//! Resource calls
//!
//! Named catalog lookups the query editor uses to fill its pickers, plus
//! query cancellation. Catalog queries always drain every page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{QueryError, ResourceError};
use super::executor::PageState;
use super::Datasource;
use crate::models::{CancelRequest, MeasuresRequest, TablesRequest};
use crate::wire::{Datum, QueryOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceMethod {
    Get,
    Post,
}

/// Body of a resource reply
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceResponse {
    Json(serde_json::Value),
    Text(String),
}

/// Wrap an identifier in double quotes unless it already is
pub fn apply_quotes_if_needed(name: &str) -> String {
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        name.to_string()
    } else {
        format!("\"{}\"", name)
    }
}

fn parse_body<T: DeserializeOwned + Default>(resource: &str, body: &[u8]) -> Result<T, ResourceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ResourceError::BadRequest {
        resource: resource.to_string(),
        message: e.to_string(),
    })
}

fn first_scalar(datum: &Datum) -> Option<&str> {
    datum.scalar_value.as_deref()
}

fn first_column(output: &QueryOutput) -> impl Iterator<Item = &str> {
    output
        .rows
        .iter()
        .filter_map(|row| row.data.first().and_then(first_scalar))
}

impl Datasource {
    /// Dispatch a named resource call
    pub async fn call_resource(
        &self,
        name: &str,
        method: ResourceMethod,
        body: &[u8],
    ) -> Result<ResourceResponse, ResourceError> {
        debug!(resource = name, ?method, "resource call");
        match name {
            "hello" => Ok(ResourceResponse::Text("world".to_string())),
            "databases" => self.databases().await,
            "tables" => {
                let request: TablesRequest = parse_body(name, body)?;
                self.tables(&request).await
            }
            "measures" => {
                let request: MeasuresRequest = parse_body(name, body)?;
                self.measures(&request).await
            }
            "dimensions" => {
                let request: MeasuresRequest = parse_body(name, body)?;
                self.dimensions(&request).await
            }
            "cancel" => {
                if method != ResourceMethod::Post {
                    return Err(ResourceError::MethodNotAllowed("Cancel".to_string()));
                }
                let request: CancelRequest = parse_body(name, body)?;
                Ok(ResourceResponse::Text(self.cancel(&request.query_id).await))
            }
            other => Err(ResourceError::NotFound(other.to_string())),
        }
    }

    async fn run_catalog_query(&self, query: &str) -> Result<QueryOutput, QueryError> {
        let (output, _) = self.fetch(query, PageState::Fresh, true).await?;
        Ok(output)
    }

    async fn databases(&self) -> Result<ResourceResponse, ResourceError> {
        let output = self.run_catalog_query("SHOW DATABASES").await?;
        let names: Vec<String> = first_column(&output).map(apply_quotes_if_needed).collect();
        Ok(ResourceResponse::Json(serde_json::json!(names)))
    }

    async fn tables(&self, request: &TablesRequest) -> Result<ResourceResponse, ResourceError> {
        let query = format!("SHOW TABLES FROM {}", apply_quotes_if_needed(&request.database));
        let output = self.run_catalog_query(&query).await?;
        let names: Vec<String> = first_column(&output).map(apply_quotes_if_needed).collect();
        Ok(ResourceResponse::Json(serde_json::json!(names)))
    }

    fn measures_query(request: &MeasuresRequest) -> String {
        format!(
            "SHOW MEASURES FROM {}.{}",
            apply_quotes_if_needed(&request.database),
            apply_quotes_if_needed(&request.table)
        )
    }

    async fn measures(&self, request: &MeasuresRequest) -> Result<ResourceResponse, ResourceError> {
        let output = self.run_catalog_query(&Self::measures_query(request)).await?;
        let names: Vec<&str> = first_column(&output).collect();
        Ok(ResourceResponse::Json(serde_json::json!(names)))
    }

    /// Dimension names from the third column of `SHOW MEASURES`, first seen first
    async fn dimensions(&self, request: &MeasuresRequest) -> Result<ResourceResponse, ResourceError> {
        let output = self.run_catalog_query(&Self::measures_query(request)).await?;
        let mut names: Vec<&str> = Vec::new();
        for row in &output.rows {
            let Some(dims) = row.data.get(2).and_then(|d| d.array_value.as_ref()) else {
                continue;
            };
            for dim in dims {
                let name = dim
                    .row_value
                    .as_ref()
                    .and_then(|r| r.data.first())
                    .and_then(first_scalar);
                if let Some(name) = name {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(ResourceResponse::Json(serde_json::json!(names)))
    }

    /// Forward a cancel to the service and forget the open query
    async fn cancel(&self, query_id: &str) -> String {
        if self.streams.remove(query_id).await.is_some() {
            info!(query_id, "removed open query");
        }
        match self.runner.cancel_query(query_id).await {
            Ok(output) => output
                .cancellation_message
                .unwrap_or_else(|| format!("cancel: {}", query_id)),
            Err(err) => err.to_string(),
        }
    }
}
