//! Replay runner
//!
//! Serves scripted responses in order and records every call, so tests can
//! assert on the exact query text and continuation tokens that were sent.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{QueryRunner, RunnerError};
use crate::wire::{CancelOutput, QueryOutput};

/// One recorded `query` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
    pub query: String,
    pub next_token: Option<String>,
}

/// Runner that replays recorded pages
pub struct FixtureRunner {
    pages: Mutex<VecDeque<Result<QueryOutput, RunnerError>>>,
    calls: Mutex<Vec<RunnerCall>>,
    cancels: Mutex<Vec<String>>,
    cancel_response: Result<CancelOutput, RunnerError>,
    repeat_last: bool,
}

impl FixtureRunner {
    /// Serve the given pages in order
    pub fn new(pages: Vec<QueryOutput>) -> Self {
        Self::scripted(pages.into_iter().map(Ok).collect())
    }

    /// Serve pages and failures in order
    pub fn scripted(pages: Vec<Result<QueryOutput, RunnerError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            calls: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            cancel_response: Ok(CancelOutput::default()),
            repeat_last: false,
        }
    }

    /// Load pages from recorded service responses, one JSON file per page
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, RunnerError> {
        let pages = paths
            .iter()
            .map(|p| load_page(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(pages))
    }

    /// Builder method: keep serving the final page once the script runs out
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Builder method: set the cancel outcome
    pub fn with_cancel_response(mut self, response: Result<CancelOutput, RunnerError>) -> Self {
        self.cancel_response = response;
        self
    }

    /// All `query` calls so far
    pub async fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().await.clone()
    }

    /// All cancelled query ids so far
    pub async fn cancelled(&self) -> Vec<String> {
        self.cancels.lock().await.clone()
    }

    /// Number of scripted responses not yet served
    pub async fn remaining(&self) -> usize {
        self.pages.lock().await.len()
    }
}

fn load_page(path: &Path) -> Result<QueryOutput, RunnerError> {
    let fixture_error = |message: String| RunnerError::Fixture {
        path: path.display().to_string(),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| fixture_error(e.to_string()))
}

#[async_trait]
impl QueryRunner for FixtureRunner {
    async fn query(
        &self,
        query: &str,
        next_token: Option<&str>,
    ) -> Result<QueryOutput, RunnerError> {
        self.calls.lock().await.push(RunnerCall {
            query: query.to_string(),
            next_token: next_token.map(String::from),
        });

        let mut pages = self.pages.lock().await;
        if self.repeat_last && pages.len() == 1 {
            if let Some(page) = pages.front() {
                return page.clone();
            }
        }
        pages
            .pop_front()
            .unwrap_or_else(|| Err(RunnerError::Exhausted(query.to_string())))
    }

    async fn cancel_query(&self, query_id: &str) -> Result<CancelOutput, RunnerError> {
        self.cancels.lock().await.push(query_id.to_string());
        self.cancel_response.clone()
    }
}
