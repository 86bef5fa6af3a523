//! Query execution and pagination
//!
//! One request/response cycle: interpolate, fetch, assemble, stamp metadata.
//!
//! ```text
//! Fresh ──▶ Executing ──▶ HasMore ──┬─ wait_for_result ──▶ (fetch next) ──▶ ...
//!                │                  └─ otherwise ─────────▶ Suspended (token returned)
//!                └──▶ Exhausted
//! ```
//!
//! Pages of one query are fetched strictly in token order. A failed page
//! fails the whole query; rows already accumulated are discarded.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use super::error::QueryError;
use super::Datasource;
use crate::convert::assemble;
use crate::frame::{Frame, Stat};
use crate::models::QueryModel;
use crate::wire::QueryOutput;

/// Where a logical query is in its page sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// No page fetched yet, no token
    Fresh,
    /// Another page exists behind this token
    HasMore(String),
    /// No further pages
    Exhausted,
}

impl PageState {
    /// State of a query about to run with the given token
    pub fn start(token: &str) -> Self {
        if token.is_empty() {
            PageState::Fresh
        } else {
            PageState::HasMore(token.to_string())
        }
    }

    /// State after receiving a page
    pub fn after(page: &QueryOutput) -> Self {
        match page.continuation() {
            Some(token) => PageState::HasMore(token.to_string()),
            None => PageState::Exhausted,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            PageState::HasMore(token) => Some(token),
            _ => None,
        }
    }
}

/// Frames of one execution plus what is needed to continue it
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub frames: Vec<Frame>,
    /// The query text after interpolation
    pub executed_query: String,
    pub query_id: Option<String>,
    /// Token for the next page when the query is not exhausted
    pub next_token: Option<String>,
}

impl Datasource {
    /// Run one query, draining every page when `wait_for_result` is set
    pub async fn execute_query(&self, query: &QueryModel) -> Result<Execution, QueryError> {
        let started = Instant::now();
        let start_ms = Utc::now().timestamp_millis();
        let raw = self.macros.interpolate(query, &self.settings, Utc::now())?;

        let initial = PageState::start(&query.next_token);
        let fresh = initial == PageState::Fresh;
        info!(token = %query.next_token, wait = query.wait_for_result, "running query");

        let (output, state) = self
            .fetch(&raw, initial, query.wait_for_result)
            .await?;

        let mut frames = assemble(&output, query.format)?;
        let first = &mut frames[0];
        let meta = first.meta_mut();
        meta.executed_query_string = Some(raw.clone());
        meta.stats = vec![Stat {
            display_name: "Execution time".to_string(),
            value: started.elapsed().as_millis() as f64,
            unit: "ms".to_string(),
        }];
        if let Some(custom) = meta.custom.as_mut() {
            if fresh {
                custom.execution_start_time = Some(start_ms);
            }
            if state == PageState::Exhausted {
                custom.execution_finish_time = Some(Utc::now().timestamp_millis());
            }
        }

        Ok(Execution {
            frames,
            executed_query: raw,
            query_id: output.query_id.clone(),
            next_token: state.token().map(String::from),
        })
    }

    /// Fetch one page, or all remaining pages when `drain` is set
    pub(crate) async fn fetch(
        &self,
        raw: &str,
        state: PageState,
        drain: bool,
    ) -> Result<(QueryOutput, PageState), QueryError> {
        let mut output = self.runner.query(raw, state.token()).await?;
        let mut state = PageState::after(&output);
        debug!(query_id = ?output.query_id, rows = output.len(), token = ?state.token(), "fetched page");

        while drain {
            let PageState::HasMore(token) = &state else {
                break;
            };
            let page = self.runner.query(raw, Some(token)).await?;
            state = PageState::after(&page);
            debug!(rows = page.len(), token = ?state.token(), "fetched continuation page");
            output.append_page(page);
        }
        Ok((output, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::frame::Value;
    use crate::models::DatasourceSettings;
    use crate::runner::{FixtureRunner, RunnerError};
    use crate::wire::{ColumnInfo, Datum, Row, WireType};

    fn page(rows: &[&str], token: Option<&str>) -> QueryOutput {
        QueryOutput {
            query_id: Some("q1".to_string()),
            next_token: token.map(String::from),
            column_info: vec![ColumnInfo::new("v", WireType::scalar("BIGINT"))],
            rows: rows.iter().map(|r| Row::new(vec![Datum::scalar(*r)])).collect(),
            ..Default::default()
        }
    }

    fn datasource(runner: Arc<FixtureRunner>) -> Datasource {
        Datasource::new("ds1", DatasourceSettings::default(), runner)
    }

    #[test]
    fn test_page_state() {
        assert_eq!(PageState::start(""), PageState::Fresh);
        assert_eq!(PageState::start("T1").token(), Some("T1"));
        assert_eq!(PageState::after(&page(&[], None)), PageState::Exhausted);
        assert_eq!(PageState::after(&page(&[], Some(""))), PageState::Exhausted);
        assert_eq!(
            PageState::after(&page(&[], Some("T2"))),
            PageState::HasMore("T2".to_string())
        );
    }

    #[tokio::test]
    async fn test_single_page_suspends() {
        let runner = Arc::new(FixtureRunner::new(vec![page(&["1"], Some("T1"))]));
        let ds = datasource(runner.clone());

        let exec = ds.execute_query(&QueryModel::new("SELECT v")).await.unwrap();
        assert_eq!(exec.next_token.as_deref(), Some("T1"));
        assert_eq!(exec.query_id.as_deref(), Some("q1"));

        let meta = exec.frames[0].custom_meta().unwrap();
        assert!(meta.execution_start_time.is_some());
        assert!(meta.execution_finish_time.is_none());
        assert_eq!(meta.next_token, "T1");
        assert_eq!(runner.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_result_drains_in_order() {
        let runner = Arc::new(FixtureRunner::new(vec![
            page(&["1"], Some("T1")),
            page(&["2", "3"], Some("T2")),
            page(&["4"], None),
        ]));
        let ds = datasource(runner.clone());

        let query = QueryModel::new("SELECT v").wait_for_result(true);
        let exec = ds.execute_query(&query).await.unwrap();
        assert_eq!(exec.next_token, None);

        let frame = &exec.frames[0];
        assert_eq!(frame.row_len().unwrap(), 4);
        assert_eq!(frame.fields[0].get(3), Some(Value::Int64(4)));

        let meta = frame.custom_meta().unwrap();
        assert!(meta.execution_start_time.is_some());
        assert!(meta.execution_finish_time.is_some());
        assert!(!meta.has_more());

        let tokens: Vec<Option<String>> =
            runner.calls().await.into_iter().map(|c| c.next_token).collect();
        assert_eq!(
            tokens,
            vec![None, Some("T1".to_string()), Some("T2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_page_fails_query() {
        let runner = Arc::new(FixtureRunner::scripted(vec![
            Ok(page(&["1"], Some("T1"))),
            Err(RunnerError::Service("throttled".to_string())),
        ]));
        let ds = datasource(runner);

        let query = QueryModel::new("SELECT v").wait_for_result(true);
        let err = ds.execute_query(&query).await.unwrap_err();
        assert_eq!(err, QueryError::Runner(RunnerError::Service("throttled".to_string())));
    }

    #[tokio::test]
    async fn test_continuation_page_not_restamped() {
        let runner = Arc::new(FixtureRunner::new(vec![page(&["9"], None)]));
        let ds = datasource(runner.clone());

        let query = QueryModel::new("SELECT v").with_next_token("T1");
        let exec = ds.execute_query(&query).await.unwrap();

        let meta = exec.frames[0].custom_meta().unwrap();
        assert!(meta.execution_start_time.is_none());
        assert!(meta.execution_finish_time.is_some());
        assert_eq!(runner.calls().await[0].next_token.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_executed_query_and_stats() {
        let runner = Arc::new(FixtureRunner::new(vec![page(&[], None)]));
        let settings = DatasourceSettings {
            default_database: "db".to_string(),
            ..Default::default()
        };
        let ds = Datasource::new("ds1", settings, runner.clone());

        let exec = ds
            .execute_query(&QueryModel::new("SELECT * FROM $__database.t"))
            .await
            .unwrap();
        let meta = exec.frames[0].meta.as_ref().unwrap();
        assert_eq!(meta.executed_query_string.as_deref(), Some("SELECT * FROM db.t"));
        assert_eq!(meta.stats[0].display_name, "Execution time");
        assert_eq!(meta.stats[0].unit, "ms");
        assert_eq!(runner.calls().await[0].query, "SELECT * FROM db.t");
    }
}
