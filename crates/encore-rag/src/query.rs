//! Path query planning.
//!
//! Turns resolved entities into store-agnostic `PathQuery` values: one
//! neighborhood query for a lone entity, one shortest-path query per
//! unordered pair otherwise.

use std::collections::BTreeSet;

use encore_core::{EntityRef, PathQuery, QueryShape, RelationType, RetrievalConfig};

use crate::error::{Result, RetrievalError};

/// Plans the graph queries for a set of resolved entities.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    max_hops_ceiling: u32,
    max_pairs: usize,
    neighborhood_limit: usize,
    paths_per_query: usize,
    all_shortest_paths: bool,
}

impl QueryGenerator {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            max_hops_ceiling: config.max_hops_ceiling.max(1),
            max_pairs: config.max_pairs,
            neighborhood_limit: config.neighborhood_limit,
            paths_per_query: config.paths_per_query,
            all_shortest_paths: config.all_shortest_paths,
        }
    }

    /// Validate a requested hop bound and clamp it to the ceiling.
    pub fn effective_hops(&self, max_hops: u32) -> Result<u32> {
        if max_hops == 0 {
            return Err(RetrievalError::InvalidArgument(
                "max_hops must be at least 1".to_string(),
            ));
        }
        if max_hops > self.max_hops_ceiling {
            tracing::debug!(
                requested = max_hops,
                ceiling = self.max_hops_ceiling,
                "Clamping max_hops"
            );
        }
        Ok(max_hops.min(self.max_hops_ceiling))
    }

    /// Only relation types the store knows can be filtered on.
    pub fn check_filter(filter: &BTreeSet<RelationType>) -> Result<()> {
        match filter.iter().find(|r| r.is_unknown()) {
            Some(unknown) => Err(RetrievalError::InvalidArgument(format!(
                "unknown relation type in filter: {unknown}"
            ))),
            None => Ok(()),
        }
    }

    /// Build the query plan. Zero entities yield an empty plan.
    ///
    /// Pairs are emitted in entity order `(0,1), (0,2), .., (1,2), ..` and
    /// capped at `max_pairs`. Pairs naming the same entity twice are skipped.
    pub fn build_path_query(
        &self,
        entities: &[EntityRef],
        max_hops: u32,
        relation_filter: Option<&BTreeSet<RelationType>>,
    ) -> Result<Vec<PathQuery>> {
        let max_hops = self.effective_hops(max_hops)?;
        let relation_filter = relation_filter.cloned().unwrap_or_default();
        Self::check_filter(&relation_filter)?;

        let query = |shape| PathQuery {
            shape,
            max_hops,
            relation_filter: relation_filter.clone(),
        };

        let queries = match entities {
            [] => Vec::new(),
            [center] => vec![query(QueryShape::Neighborhood {
                center: center.clone(),
                limit: self.neighborhood_limit,
            })],
            _ => {
                let mut queries = Vec::new();
                'pairs: for (i, from) in entities.iter().enumerate() {
                    for to in &entities[i + 1..] {
                        if queries.len() >= self.max_pairs {
                            break 'pairs;
                        }
                        if same_entity(from, to) {
                            continue;
                        }
                        queries.push(query(QueryShape::ShortestPath {
                            from: from.clone(),
                            to: to.clone(),
                            all_shortest: self.all_shortest_paths,
                            limit: self.paths_per_query,
                        }));
                    }
                }
                queries
            }
        };

        tracing::debug!(
            entities = entities.len(),
            queries = queries.len(),
            max_hops,
            "Planned path queries"
        );
        Ok(queries)
    }
}

fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    match (&a.id, &b.id) {
        (Some(x), Some(y)) => x == y,
        _ => a.name.eq_ignore_ascii_case(&b.name),
    }
}
