//! Datasource Instance
//!
//! Ties macro interpolation, the query runner, frame assembly and the open
//! query registry into the operations a host calls.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Datasource                          │
//! │  query_data ──▶ QueryModel ──▶ execute_query ──▶ frames   │
//! │                                     │                     │
//! │                   token pending ────┴──▶ StreamRegistry   │
//! │                                               │           │
//! │  run_stream ◀── tick ◀────────────────────────┘           │
//! │  call_resource ──▶ SHOW ... / cancel                      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Executor**: one request/response cycle and the page state machine
//! - **Streams**: open queries awaiting further pages
//! - **Resources**: catalog lookups and cancellation

mod error;
mod executor;
mod resources;
mod streams;

pub use error::{ErrorSource, QueryError, ResourceError, StreamError};
pub use executor::{Execution, PageState};
pub use resources::{apply_quotes_if_needed, ResourceMethod, ResourceResponse};
pub use streams::{OpenQuery, StreamRegistry, SubscribeStatus};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::frame::Frame;
use crate::macros::MacroTable;
use crate::models::{DataQuery, DatasourceSettings, QueryModel};
use crate::runner::QueryRunner;

/// Fixed delay between stream page fetches
pub const DEFAULT_STREAM_TICK: Duration = Duration::from_secs(2);

/// Query used by the health check
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// A batch of queries from the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// Result of one query; errors are data, never a failed request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_source: Option<ErrorSource>,
}

impl DataResponse {
    pub fn from_error(err: &QueryError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(err.to_string()),
            error_source: Some(err.error_source()),
        }
    }
}

/// Responses keyed by the host's query ref id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    pub message: String,
}

impl CheckHealthResult {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }
}

/// One configured datasource
pub struct Datasource {
    uid: String,
    settings: DatasourceSettings,
    runner: Arc<dyn QueryRunner>,
    streams: StreamRegistry,
    macros: MacroTable,
    tick: Duration,
}

impl Datasource {
    pub fn new(
        uid: impl Into<String>,
        settings: DatasourceSettings,
        runner: Arc<dyn QueryRunner>,
    ) -> Self {
        let uid = uid.into();
        info!(uid = %uid, region = %settings.region, "new datasource instance");
        Self {
            uid,
            settings,
            runner,
            streams: StreamRegistry::new(),
            macros: MacroTable::default(),
            tick: DEFAULT_STREAM_TICK,
        }
    }

    /// Builder method: set the stream tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    /// Channel a host subscribes to for further pages of a query
    pub fn channel_for(&self, query_id: &str) -> String {
        format!("ds/{}/{}", self.uid, query_id)
    }

    /// Run every query of a request
    pub async fn query_data(&self, request: &QueryDataRequest) -> QueryDataResponse {
        let mut response = QueryDataResponse::default();
        for query in &request.queries {
            let result = match QueryModel::from_data_query(query) {
                Ok(model) => self.query_one(model).await,
                Err(err) => DataResponse::from_error(&err.into()),
            };
            if let Some(err) = &result.error {
                warn!(ref_id = %query.ref_id, error = %err, "query failed");
            }
            response.responses.insert(query.ref_id.clone(), result);
        }
        response
    }

    async fn query_one(&self, model: QueryModel) -> DataResponse {
        let execution = match self.execute_query(&model).await {
            Ok(execution) => execution,
            Err(err) => return DataResponse::from_error(&err),
        };
        let mut frames = execution.frames;

        if let Some(token) = execution.next_token {
            match execution.query_id {
                Some(query_id) if !query_id.is_empty() => {
                    if let Some(first) = frames.first_mut() {
                        first.meta_mut().channel = Some(self.channel_for(&query_id));
                    }
                    info!(query_id = %query_id, token = %token, "registering paging query");
                    self.streams
                        .register(OpenQuery {
                            query_id,
                            continuation_token: token,
                            query: model,
                            owner: self.uid.clone(),
                        })
                        .await;
                }
                _ => warn!("continuation token without query id, not streaming"),
            }
        }

        DataResponse {
            frames,
            error: None,
            error_source: None,
        }
    }

    /// Check the connection by running `SELECT 1`
    pub async fn check_health(&self) -> CheckHealthResult {
        let output = match self.runner.query(HEALTH_CHECK_QUERY, None).await {
            Ok(output) => output,
            Err(err) => return CheckHealthResult::error(err.to_string()),
        };
        let value = output
            .rows
            .first()
            .and_then(|r| r.data.first())
            .and_then(|d| d.scalar_value.as_deref());
        match value {
            None => CheckHealthResult::error("missing response"),
            Some("1") => CheckHealthResult {
                status: HealthStatus::Ok,
                message: "Connection success".to_string(),
            },
            Some(_) => CheckHealthResult::error("should be one"),
        }
    }

    /// Found iff an open query is registered under `path`
    pub async fn subscribe_stream(&self, path: &str) -> SubscribeStatus {
        if self.streams.contains(path).await {
            SubscribeStatus::Ok
        } else {
            SubscribeStatus::NotFound
        }
    }

    /// Streams are server-push only
    pub fn publish_stream(&self, _path: &str) -> Result<(), StreamError> {
        Err(StreamError::PermissionDenied)
    }

    /// Fetch further pages of an open query on every tick and send their frames
    ///
    /// Stops when the query is exhausted, cancelled, fails, or the receiver
    /// is dropped. The registry entry is removed in every case.
    pub async fn run_stream(
        &self,
        path: &str,
        sender: mpsc::UnboundedSender<Frame>,
    ) -> Result<(), StreamError> {
        let Some(open) = self.streams.get(path).await else {
            return Err(StreamError::NotFound(path.to_string()));
        };
        info!(query_id = %open.query_id, token = %open.continuation_token, "starting stream");

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                _ = sender.closed() => {
                    info!(query_id = %open.query_id, "stop streaming (subscriber gone)");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    let Some(current) = self.streams.get(path).await else {
                        info!(query_id = %open.query_id, "stop streaming (query cancelled)");
                        break Ok(());
                    };
                    let query = current.query.with_next_token(current.continuation_token);

                    let execution = match self.execute_query(&query).await {
                        Ok(execution) => execution,
                        Err(err) => {
                            error!(query_id = %open.query_id, error = %err, "error running streaming query");
                            break Err(StreamError::Query(err));
                        }
                    };
                    for frame in execution.frames {
                        if sender.send(frame).is_err() {
                            warn!(query_id = %open.query_id, "unable to send frame");
                        }
                    }

                    match execution.next_token {
                        Some(token) => {
                            self.streams.advance(path, token).await;
                        }
                        None => {
                            info!(query_id = %open.query_id, "stream exhausted");
                            break Ok(());
                        }
                    }
                }
            }
        };

        self.streams.remove(path).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{FixtureRunner, RunnerError};
    use crate::wire::{ColumnInfo, Datum, QueryOutput, Row, WireType};
    use serde_json::json;

    fn page(token: Option<&str>) -> QueryOutput {
        QueryOutput {
            query_id: Some("q1".to_string()),
            next_token: token.map(String::from),
            column_info: vec![ColumnInfo::new("v", WireType::scalar("INTEGER"))],
            rows: vec![Row::new(vec![Datum::scalar("1")])],
            ..Default::default()
        }
    }

    fn request(json: serde_json::Value) -> QueryDataRequest {
        QueryDataRequest {
            queries: vec![DataQuery {
                ref_id: "A".to_string(),
                json,
                ..Default::default()
            }],
        }
    }

    fn datasource(runner: FixtureRunner) -> (Arc<FixtureRunner>, Datasource) {
        let runner = Arc::new(runner);
        let ds = Datasource::new("uid1", DatasourceSettings::default(), runner.clone())
            .with_tick(Duration::from_millis(10));
        (runner, ds)
    }

    #[tokio::test]
    async fn test_pagination_registers_and_stream_drains() {
        let (runner, ds) = datasource(FixtureRunner::new(vec![page(Some("T1")), page(None)]));

        let response = ds.query_data(&request(json!({"rawQuery": "SELECT v"}))).await;
        let result = &response.responses["A"];
        assert!(result.error.is_none());
        let channel = result.frames[0].meta.as_ref().unwrap().channel.clone();
        assert_eq!(channel.as_deref(), Some("ds/uid1/q1"));
        assert_eq!(ds.subscribe_stream("q1").await, SubscribeStatus::Ok);
        assert_eq!(ds.streams().get("q1").await.unwrap().continuation_token, "T1");

        let (tx, mut rx) = mpsc::unbounded_channel();
        ds.run_stream("q1", tx).await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert!(frame.custom_meta().unwrap().execution_finish_time.is_some());
        assert_eq!(ds.subscribe_stream("q1").await, SubscribeStatus::NotFound);
        assert!(ds.streams().is_empty().await);

        let calls = runner.calls().await;
        assert_eq!(calls[1].next_token.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_stream_advances_token() {
        let (runner, ds) = datasource(FixtureRunner::new(vec![
            page(Some("T1")),
            page(Some("T2")),
            page(None),
        ]));
        ds.query_data(&request(json!({"rawQuery": "SELECT v"}))).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        ds.run_stream("q1", tx).await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());

        let tokens: Vec<Option<String>> =
            runner.calls().await.into_iter().map(|c| c.next_token).collect();
        assert_eq!(
            tokens,
            vec![None, Some("T1".to_string()), Some("T2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stream_stops_when_subscriber_leaves() {
        let (_runner, ds) = datasource(FixtureRunner::new(vec![page(Some("T1"))]));
        let ds = ds.with_tick(Duration::from_secs(3600));
        ds.query_data(&request(json!({"rawQuery": "SELECT v"}))).await;

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ds.run_stream("q1", tx).await.unwrap();
        assert!(ds.streams().is_empty().await);
    }

    #[tokio::test]
    async fn test_stream_failure_deregisters() {
        let (_runner, ds) = datasource(FixtureRunner::scripted(vec![
            Ok(page(Some("T1"))),
            Err(RunnerError::Service("boom".to_string())),
        ]));
        ds.query_data(&request(json!({"rawQuery": "SELECT v"}))).await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = ds.run_stream("q1", tx).await.unwrap_err();
        assert!(matches!(err, StreamError::Query(_)));
        assert!(ds.streams().is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_stream() {
        let (_runner, ds) = datasource(FixtureRunner::new(vec![]));
        assert_eq!(ds.subscribe_stream("nope").await, SubscribeStatus::NotFound);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            ds.run_stream("nope", tx).await,
            Err(StreamError::NotFound("nope".to_string()))
        );
        assert_eq!(ds.publish_stream("nope"), Err(StreamError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_wait_for_result_does_not_register() {
        let (_runner, ds) = datasource(FixtureRunner::new(vec![page(Some("T1")), page(None)]));
        let response = ds
            .query_data(&request(json!({"rawQuery": "SELECT v", "waitForResult": true})))
            .await;
        let frame = &response.responses["A"].frames[0];
        assert!(frame.meta.as_ref().unwrap().channel.is_none());
        assert_eq!(frame.row_len().unwrap(), 2);
        assert!(ds.streams().is_empty().await);
    }

    #[tokio::test]
    async fn test_errors_are_data() {
        let (_runner, ds) = datasource(FixtureRunner::scripted(vec![Err(
            RunnerError::Service("syntax error".to_string()),
        )]));

        let response = ds.query_data(&request(json!({"rawQuery": "SELEC"}))).await;
        let result = &response.responses["A"];
        assert_eq!(result.error.as_deref(), Some("syntax error"));
        assert_eq!(result.error_source, Some(ErrorSource::Downstream));

        let response = ds
            .query_data(&request(json!({"rawQuery": "x", "format": "table"})))
            .await;
        let result = &response.responses["A"];
        assert!(result.error.as_deref().unwrap().contains("please rebuild it"));
        assert_eq!(result.error_source, Some(ErrorSource::Downstream));

        let response = ds.query_data(&request(json!({"rawQuery": 1}))).await;
        assert_eq!(response.responses["A"].error_source, Some(ErrorSource::Plugin));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (runner, ds) = datasource(FixtureRunner::new(vec![page(None)]));
        let result = ds.check_health().await;
        assert_eq!(result.status, HealthStatus::Ok);
        assert_eq!(result.message, "Connection success");
        assert_eq!(runner.calls().await[0].query, "SELECT 1");

        let mut two = page(None);
        two.rows[0].data[0] = Datum::scalar("2");
        let (_, ds) = datasource(FixtureRunner::new(vec![two]));
        assert_eq!(ds.check_health().await.message, "should be one");

        let (_, ds) = datasource(FixtureRunner::new(vec![QueryOutput::default()]));
        assert_eq!(ds.check_health().await.message, "missing response");

        let (_, ds) = datasource(FixtureRunner::scripted(vec![Err(RunnerError::Service(
            "access denied".to_string(),
        ))]));
        let result = ds.check_health().await;
        assert_eq!(result.status, HealthStatus::Error);
        assert_eq!(result.message, "access denied");
    }

    fn recorded(names: &[&str]) -> FixtureRunner {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata");
        let paths: Vec<_> = names.iter().map(|n| dir.join(n)).collect();
        FixtureRunner::from_files(&paths).unwrap()
    }

    #[tokio::test]
    async fn test_recorded_table() {
        let (_, ds) = datasource(recorded(&["table.json"]));
        let response = ds.query_data(&request(json!({"rawQuery": "SELECT *"}))).await;
        let frames = &response.responses["A"].frames;
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(frame.fields.len(), 4);
        assert_eq!(frame.row_len().unwrap(), 3);
        assert_eq!(frame.fields[1].field_type(), crate::frame::FieldType::NullableTime);
        assert_eq!(frame.fields[2].get(2), None);
        assert_eq!(frame.fields[3].get(2), Some(crate::frame::Value::Bool(false)));

        let status = frame.custom_meta().unwrap().status.clone().unwrap();
        assert_eq!(status.progress_percentage, Some(100.0));
        assert_eq!(status.cumulative_bytes_scanned, Some(2048));
    }

    #[tokio::test]
    async fn test_recorded_time_series() {
        let (_, ds) = datasource(recorded(&["timeseries.json"]));
        let response = ds.query_data(&request(json!({"rawQuery": "SELECT *"}))).await;
        let frames = &response.responses["A"].frames;
        assert_eq!(frames.len(), 2);

        assert_eq!(frames[0].fields[1].labels["hostname"], "host-1");
        assert_eq!(frames[0].row_len().unwrap(), 2);
        assert_eq!(frames[1].fields[1].labels["hostname"], "host-2");
        assert_eq!(frames[1].row_len().unwrap(), 1);
        assert!(frames[0].custom_meta().unwrap().has_series);
    }

    #[tokio::test]
    async fn test_recorded_pages_drain() {
        let (runner, ds) = datasource(recorded(&["page-1.json", "page-2.json"]));
        let response = ds
            .query_data(&request(json!({"rawQuery": "SELECT *", "waitForResult": true})))
            .await;
        let frame = &response.responses["A"].frames[0];
        assert_eq!(frame.row_len().unwrap(), 2);
        assert_eq!(
            frame.fields[0].get(1),
            Some(crate::frame::Value::String("memory_utilization".to_string()))
        );
        let status = frame.custom_meta().unwrap().status.clone().unwrap();
        assert_eq!(status.cumulative_bytes_scanned, Some(4096));
        assert_eq!(runner.remaining().await, 0);
    }
}
