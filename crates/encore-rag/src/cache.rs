//! Bounded result cache keyed by `(normalized question, max_hops, relation_filter)`.
//!
//! The question is normalized exactly as the resolver sees it, so two
//! questions share an entry only if they resolve to the same entities.

use std::collections::BTreeSet;

use moka::sync::Cache;

use encore_core::{RelationType, RetrievalResult};

use crate::resolver::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    question: String,
    max_hops: u32,
    relation_filter: Vec<RelationType>,
}

impl CacheKey {
    pub fn new(question: &str, max_hops: u32, relation_filter: &BTreeSet<RelationType>) -> Self {
        Self {
            question: normalize(question),
            max_hops,
            relation_filter: relation_filter.iter().cloned().collect(),
        }
    }
}

/// Thread-safe bounded cache. A capacity of 0 disables it.
#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Cache<CacheKey, RetrievalResult>>,
}

impl ResultCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: (capacity > 0).then(|| Cache::new(capacity)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, key: &CacheKey) -> Option<RetrievalResult> {
        self.inner.as_ref()?.get(key)
    }

    pub fn insert(&self, key: CacheKey, result: RetrievalResult) {
        if let Some(cache) = &self.inner {
            cache.insert(key, result);
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }
}
