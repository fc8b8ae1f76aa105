//! Request and analysis types for the retrieval pipeline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use encore_core::{ComplexityLevel, EntityRef, RelationType};

/// Input to `GraphRagOrchestrator::retrieve_context`.
///
/// Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalRequest {
    pub question: String,
    pub max_hops: Option<u32>,
    pub relation_filter: Option<BTreeSet<RelationType>>,
    /// Per-query store deadline override.
    pub timeout_ms: Option<u64>,
}

impl RetrievalRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn with_relation_filter<I>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = RelationType>,
    {
        self.relation_filter = Some(relations.into_iter().collect());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Store-free estimate of how hard a question is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryComplexity {
    pub entity_count: usize,
    pub entities: Vec<EntityRef>,
    pub estimated_hops: usize,
    pub level: ComplexityLevel,
}
