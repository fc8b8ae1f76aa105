//! Path retrieval from the graph store.
//!
//! The pipeline reaches the store only through `PathStore`, so it can run
//! against Neo4j in production and an in-memory store in tests.

use std::future::Future;
use std::sync::Arc;

use encore_core::{GraphPath, PathQuery};
use encore_graph::{GraphClient, GraphError};

/// A read-only executor of bounded-hop path queries.
pub trait PathStore: Send + Sync {
    /// Execute one query. An empty vector means the store found no path.
    fn fetch_paths(
        &self,
        query: &PathQuery,
    ) -> impl Future<Output = Result<Vec<GraphPath>, GraphError>> + Send;
}

impl PathStore for GraphClient {
    async fn fetch_paths(&self, query: &PathQuery) -> Result<Vec<GraphPath>, GraphError> {
        self.find_paths(query).await
    }
}

impl<T: PathStore> PathStore for Arc<T> {
    fn fetch_paths(
        &self,
        query: &PathQuery,
    ) -> impl Future<Output = Result<Vec<GraphPath>, GraphError>> + Send {
        (**self).fetch_paths(query)
    }
}
