//! Open query registry
//!
//! Queries whose first response still carries a continuation token are kept
//! here, keyed by query id, until a stream drains them, the subscriber goes
//! away, or the query is cancelled. One `RwLock` guards the whole map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::QueryModel;

/// A paginated query waiting for more pages
#[derive(Debug, Clone, PartialEq)]
pub struct OpenQuery {
    pub query_id: String,
    /// Token for the next page; advanced after every fetch
    pub continuation_token: String,
    /// The query as first submitted
    pub query: QueryModel,
    /// Uid of the datasource instance that registered it
    pub owner: String,
}

/// Outcome of a subscription request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeStatus {
    Ok,
    NotFound,
}

/// Shared map of open queries
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    streams: Arc<RwLock<HashMap<String, OpenQuery>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, open: OpenQuery) {
        self.streams
            .write()
            .await
            .insert(open.query_id.clone(), open);
    }

    pub async fn get(&self, query_id: &str) -> Option<OpenQuery> {
        self.streams.read().await.get(query_id).cloned()
    }

    pub async fn contains(&self, query_id: &str) -> bool {
        self.streams.read().await.contains_key(query_id)
    }

    /// Store the token for the next page; false if the query is gone
    pub async fn advance(&self, query_id: &str, token: String) -> bool {
        match self.streams.write().await.get_mut(query_id) {
            Some(open) => {
                open.continuation_token = token;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, query_id: &str) -> Option<OpenQuery> {
        self.streams.write().await.remove(query_id)
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(id: &str, token: &str) -> OpenQuery {
        OpenQuery {
            query_id: id.to_string(),
            continuation_token: token.to_string(),
            query: QueryModel::new("SELECT 1"),
            owner: "ds1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_advance_remove() {
        let registry = StreamRegistry::new();
        assert!(registry.is_empty().await);

        registry.register(open("q1", "T1")).await;
        assert!(registry.contains("q1").await);
        assert_eq!(registry.len().await, 1);

        assert!(registry.advance("q1", "T2".to_string()).await);
        assert_eq!(registry.get("q1").await.unwrap().continuation_token, "T2");

        assert!(registry.remove("q1").await.is_some());
        assert!(!registry.advance("q1", "T3".to_string()).await);
        assert!(registry.get("q1").await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = StreamRegistry::new();
        let other = registry.clone();
        registry.register(open("q1", "T1")).await;
        assert!(other.contains("q1").await);
    }
}
