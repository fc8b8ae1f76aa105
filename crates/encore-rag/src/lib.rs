//! encore-rag: GraphRAG retrieval for the Encore music knowledge graph.
//!
//! Resolves the entities a question names, asks the graph store for the
//! bounded-hop paths connecting them, ranks the paths, and renders the best
//! ones into a length-bounded natural-language context for the answer
//! generator. Stages run strictly in sequence per request:
//! resolve → plan → fetch → rank → assemble → classify.

pub mod cache;
pub mod context;
pub mod error;
pub mod query;
pub mod ranking;
pub mod resolver;
pub mod store;
pub mod types;
pub mod verbalizer;

pub use context::{ContextBuilder, ContextStats, NO_INFORMATION};
pub use error::RetrievalError;
pub use query::QueryGenerator;
pub use ranking::PathRanker;
pub use resolver::{EntityIndex, EntityResolver, IndexEntry};
pub use store::PathStore;
pub use types::{QueryComplexity, RetrievalRequest};
pub use verbalizer::{RelationSummary, TripleVerbalizer};

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::try_join_all;
use tracing::Instrument;
use uuid::Uuid;

use encore_core::{
    ComplexityLevel, EntityRef, GraphPath, PathQuery, RelationType, RetrievalConfig,
    RetrievalOutcome, RetrievalResult,
};

use crate::cache::{CacheKey, ResultCache};

/// The public entry point of the retrieval pipeline.
///
/// Holds only read-mostly state (entity index, configuration) plus the
/// result cache, so one orchestrator serves concurrent requests.
pub struct GraphRagOrchestrator<S: PathStore> {
    store: S,
    resolver: EntityResolver,
    generator: QueryGenerator,
    ranker: PathRanker,
    context_builder: ContextBuilder,
    cache: ResultCache,
    config: RetrievalConfig,
}

impl<S: PathStore> GraphRagOrchestrator<S> {
    pub fn new(store: S, index: Arc<EntityIndex>, config: RetrievalConfig) -> Self {
        Self {
            store,
            resolver: EntityResolver::new(index),
            generator: QueryGenerator::new(&config),
            ranker: PathRanker::new(&config),
            context_builder: ContextBuilder::new(config.max_context_paths),
            cache: ResultCache::new(config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn context_builder(&self) -> &ContextBuilder {
        &self.context_builder
    }

    /// Drop every cached result, e.g. after the graph was reloaded.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Retrieve graph-grounded context for a question.
    ///
    /// Finding no entity or no path is a successful, degraded result; only
    /// bad arguments and store failures are errors. Dropping the returned
    /// future abandons every in-flight store query.
    pub async fn retrieve_context(
        &self,
        request: RetrievalRequest,
    ) -> error::Result<RetrievalResult> {
        let span = tracing::info_span!("retrieve_context", request_id = %Uuid::new_v4());
        self.retrieve_inner(request).instrument(span).await
    }

    async fn retrieve_inner(&self, request: RetrievalRequest) -> error::Result<RetrievalResult> {
        let start = std::time::Instant::now();
        let question = request.question.trim();
        if question.is_empty() {
            return Err(RetrievalError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let max_hops = self
            .generator
            .effective_hops(request.max_hops.unwrap_or(self.config.default_max_hops))?;
        let relation_filter = request.relation_filter.unwrap_or_default();
        QueryGenerator::check_filter(&relation_filter)?;
        let timeout_ms = request.timeout_ms.unwrap_or(self.config.query_timeout_ms);
        if timeout_ms == 0 {
            return Err(RetrievalError::InvalidArgument(
                "timeout_ms must be positive".to_string(),
            ));
        }

        let cache_key = CacheKey::new(question, max_hops, &relation_filter);
        if let Some(hit) = self.cache.get(&cache_key) {
            tracing::debug!("Result served from cache");
            return Ok(hit);
        }

        // Stage 1: entities.
        let entities = self.resolver.resolve(question);
        if entities.is_empty() {
            tracing::info!("No entities resolved");
            let result = self.degraded(
                NO_INFORMATION.to_string(),
                Vec::new(),
                RetrievalOutcome::NoEntitiesResolved,
                0,
                0,
                0,
            );
            self.cache.insert(cache_key, result.clone());
            return Ok(result);
        }

        // Stage 2 + 3: plan and fetch.
        let plan = self
            .generator
            .build_path_query(&entities, max_hops, Some(&relation_filter))?;
        let raw = self
            .execute_plan(&plan, Duration::from_millis(timeout_ms), timeout_ms)
            .await?;
        let (paths, paths_dropped) = validate_paths(raw);

        if paths.is_empty() {
            tracing::info!(
                entities = entities.len(),
                queries = plan.len(),
                paths_dropped,
                "No path found"
            );
            let text = no_path_message(&entities, max_hops);
            let result = self.degraded(
                text,
                entities,
                RetrievalOutcome::NoPathFound,
                plan.len(),
                0,
                paths_dropped,
            );
            self.cache.insert(cache_key, result.clone());
            return Ok(result);
        }

        // Stage 4 + 5: rank and assemble.
        let paths_considered = paths.len();
        let ranked = self.ranker.rank(paths, question, &entities);
        let built = self
            .context_builder
            .assemble(&ranked, question, self.config.max_context_length)?;

        if built.paths_used == 0 {
            tracing::info!(
                entities = entities.len(),
                paths_considered,
                max_context_length = self.config.max_context_length,
                "No path fits the context budget"
            );
            let result = self.degraded(
                built.text,
                entities,
                RetrievalOutcome::NoPathFound,
                plan.len(),
                paths_considered,
                paths_dropped,
            );
            self.cache.insert(cache_key, result.clone());
            return Ok(result);
        }

        let summary = RelationSummary::from_paths(ranked.iter().map(|s| &s.path));
        let stats = ContextStats::of(&built.text);
        tracing::debug!(
            triples = summary.total_triples,
            unique_entities = summary.unique_entities,
            context_chars = stats.length,
            sentences = stats.sentences,
            "Context assembled"
        );

        let complexity_level = self.classify(entities.len(), built.max_path_len);

        tracing::info!(
            entities = entities.len(),
            queries = plan.len(),
            paths_considered,
            paths_used = built.paths_used,
            paths_dropped,
            complexity = ?complexity_level,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );

        let result = RetrievalResult {
            context_text: built.text,
            entities,
            paths_considered,
            paths_used: built.paths_used,
            complexity_level,
            outcome: RetrievalOutcome::Answered,
            queries_executed: plan.len(),
            paths_dropped,
            retrieved_at: Utc::now(),
        };
        self.cache.insert(cache_key, result.clone());
        Ok(result)
    }

    /// Estimate question complexity from its entities alone; the store is
    /// not consulted.
    pub fn analyze_complexity(&self, question: &str) -> QueryComplexity {
        let entities = self.resolver.resolve(question);
        let entity_count = entities.len();
        let estimated_hops = entity_count.min(3);
        QueryComplexity {
            entity_count,
            entities,
            estimated_hops,
            level: self.classify(entity_count, estimated_hops),
        }
    }

    /// Run every query of the plan concurrently under a per-query deadline.
    /// The first failure aborts the rest.
    async fn execute_plan(
        &self,
        plan: &[PathQuery],
        deadline: Duration,
        timeout_ms: u64,
    ) -> error::Result<Vec<GraphPath>> {
        let fetches = plan.iter().map(move |query| async move {
            match tokio::time::timeout(deadline, self.store.fetch_paths(query)).await {
                Ok(Ok(paths)) => Ok(paths),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Graph store query failed");
                    Err(RetrievalError::from(e))
                }
                Err(_) => {
                    tracing::warn!(timeout_ms, "Graph store query timed out");
                    Err(RetrievalError::StoreTimeout { timeout_ms })
                }
            }
        });

        let batches = try_join_all(fetches).await?;
        let paths: Vec<GraphPath> = batches.into_iter().flatten().collect();
        tracing::debug!(queries = plan.len(), paths = paths.len(), "Store queries finished");
        Ok(paths)
    }

    fn classify(&self, entity_count: usize, max_path_len: usize) -> ComplexityLevel {
        let c = &self.config;
        if entity_count >= c.complex_entity_count || max_path_len >= c.complex_hops {
            ComplexityLevel::Complex
        } else if entity_count == 2 && max_path_len <= c.moderate_max_hops {
            ComplexityLevel::Moderate
        } else {
            ComplexityLevel::Simple
        }
    }

    fn degraded(
        &self,
        context_text: String,
        entities: Vec<EntityRef>,
        outcome: RetrievalOutcome,
        queries_executed: usize,
        paths_considered: usize,
        paths_dropped: usize,
    ) -> RetrievalResult {
        RetrievalResult {
            context_text,
            entities,
            paths_considered,
            paths_used: 0,
            complexity_level: ComplexityLevel::Simple,
            outcome,
            queries_executed,
            paths_dropped,
            retrieved_at: Utc::now(),
        }
    }
}

/// Drop malformed and duplicate paths, keeping store order.
/// Returns the surviving paths and the number of malformed ones.
fn validate_paths(raw: Vec<GraphPath>) -> (Vec<GraphPath>, usize) {
    let mut seen: HashSet<(Vec<String>, Vec<String>)> = HashSet::new();
    let mut dropped = 0;
    let mut kept = Vec::with_capacity(raw.len());

    for path in raw {
        if let Err(e) = path.validate() {
            tracing::warn!(error = %e, "Dropping malformed path");
            dropped += 1;
            continue;
        }
        let signature = (
            path.node_ids().into_iter().map(str::to_string).collect(),
            path.relations().map(|r| r.as_str().to_string()).collect(),
        );
        if seen.insert(signature) {
            kept.push(path);
        }
    }

    (kept, dropped)
}

fn no_path_message(entities: &[EntityRef], max_hops: u32) -> String {
    let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    let hops = if max_hops == 1 { "hop" } else { "hops" };
    match names.as_slice() {
        [single] => format!(
            "No connections were found for {single} within {max_hops} {hops} in the knowledge graph."
        ),
        [init @ .., last] => format!(
            "No connections were found between {} and {last} within {max_hops} {hops} in the knowledge graph.",
            init.join(", ")
        ),
        [] => NO_INFORMATION.to_string(),
    }
}

/// Relation labels the store can filter on, for argument parsing.
pub fn parse_relation_filter<I, T>(labels: I) -> error::Result<BTreeSet<RelationType>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let filter: BTreeSet<RelationType> = labels
        .into_iter()
        .map(|label| RelationType::from_label(label.as_ref()))
        .collect();
    QueryGenerator::check_filter(&filter)?;
    Ok(filter)
}
