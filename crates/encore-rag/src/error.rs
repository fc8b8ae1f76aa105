//! Error types for the encore-rag crate.

use thiserror::Error;

/// Hard failures of a retrieval request.
///
/// Empty answers (no entities, no paths) are not errors; they come back as
/// degraded `RetrievalResult`s.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Graph store query exceeded {timeout_ms}ms deadline")]
    StoreTimeout { timeout_ms: u64 },

    #[error("Entity index error: {0}")]
    Index(String),
}

impl From<encore_graph::GraphError> for RetrievalError {
    fn from(e: encore_graph::GraphError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
