//! Configuration management for Encore retrieval.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`ENCORE__` prefix, `__` separator)
//! 2. Config file (`encore.toml`, `[retrieval]` section)
//! 3. Defaults

use serde::Deserialize;

use crate::error::CoreError;
use crate::types::RelationType;

/// Weights of the four path-ranking signals.
///
/// They sum to 1.0 by convention; nothing enforces it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankingWeights {
    #[serde(default = "default_length_weight")]
    pub length: f64,
    #[serde(default = "default_coverage_weight")]
    pub coverage: f64,
    #[serde(default = "default_relation_weight")]
    pub relation: f64,
    #[serde(default = "default_salience_weight")]
    pub salience: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            length: default_length_weight(),
            coverage: default_coverage_weight(),
            relation: default_relation_weight(),
            salience: default_salience_weight(),
        }
    }
}

/// Static relevance of each relation type, in `[0, 1]`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelationWeights {
    pub collaborates_with: f64,
    pub performs_on: f64,
    pub similar_genre: f64,
    pub has_genre: f64,
    pub member_of: f64,
    pub signed_with: f64,
    pub part_of: f64,
    pub award_nomination: f64,
    pub unknown: f64,
}

impl RelationWeights {
    pub fn weight(&self, relation: &RelationType) -> f64 {
        match relation {
            RelationType::CollaboratesWith => self.collaborates_with,
            RelationType::PerformsOn => self.performs_on,
            RelationType::SimilarGenre => self.similar_genre,
            RelationType::HasGenre => self.has_genre,
            RelationType::MemberOf => self.member_of,
            RelationType::SignedWith => self.signed_with,
            RelationType::PartOf => self.part_of,
            RelationType::AwardNomination => self.award_nomination,
            RelationType::Unknown(_) => self.unknown,
        }
    }
}

impl Default for RelationWeights {
    fn default() -> Self {
        Self {
            collaborates_with: 1.0,
            member_of: 0.9,
            performs_on: 0.8,
            award_nomination: 0.7,
            signed_with: 0.6,
            part_of: 0.6,
            has_genre: 0.5,
            similar_genre: 0.4,
            unknown: 0.3,
        }
    }
}

/// Every tunable of the retrieval pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub weights: RankingWeights,

    #[serde(default)]
    pub relation_weights: RelationWeights,

    /// Hop bound used when a request does not name one.
    #[serde(default = "default_max_hops")]
    pub default_max_hops: u32,

    /// Requests above this bound are clamped to it.
    #[serde(default = "default_max_hops_ceiling")]
    pub max_hops_ceiling: u32,

    /// Maximum entity pairs queried for a multi-entity question.
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,

    /// Result cap for single-entity neighborhood queries.
    #[serde(default = "default_neighborhood_limit")]
    pub neighborhood_limit: usize,

    /// Result cap for each pair query.
    #[serde(default = "default_paths_per_query")]
    pub paths_per_query: usize,

    /// Ask for all shortest paths per pair instead of a single one.
    #[serde(default)]
    pub all_shortest_paths: bool,

    /// Context budget in characters.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,

    /// Maximum ranked paths rendered into the context.
    #[serde(default = "default_max_context_paths")]
    pub max_context_paths: usize,

    /// Result cache capacity; 0 disables the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Per-query graph store deadline.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Entity count at or above which a question is complex.
    #[serde(default = "default_complex_entity_count")]
    pub complex_entity_count: usize,

    /// Path length at or above which a question is complex.
    #[serde(default = "default_complex_hops")]
    pub complex_hops: usize,

    /// Longest path a two-entity question may use and still be moderate.
    #[serde(default = "default_moderate_max_hops")]
    pub moderate_max_hops: usize,
}

fn default_length_weight() -> f64 {
    0.4
}

fn default_coverage_weight() -> f64 {
    0.3
}

fn default_relation_weight() -> f64 {
    0.2
}

fn default_salience_weight() -> f64 {
    0.1
}

fn default_max_hops() -> u32 {
    3
}

fn default_max_hops_ceiling() -> u32 {
    10
}

fn default_max_pairs() -> usize {
    10
}

fn default_neighborhood_limit() -> usize {
    50
}

fn default_paths_per_query() -> usize {
    25
}

fn default_max_context_length() -> usize {
    2000
}

fn default_max_context_paths() -> usize {
    5
}

fn default_cache_capacity() -> u64 {
    256
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_complex_entity_count() -> usize {
    3
}

fn default_complex_hops() -> usize {
    3
}

fn default_moderate_max_hops() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            relation_weights: RelationWeights::default(),
            default_max_hops: default_max_hops(),
            max_hops_ceiling: default_max_hops_ceiling(),
            max_pairs: default_max_pairs(),
            neighborhood_limit: default_neighborhood_limit(),
            paths_per_query: default_paths_per_query(),
            all_shortest_paths: false,
            max_context_length: default_max_context_length(),
            max_context_paths: default_max_context_paths(),
            cache_capacity: default_cache_capacity(),
            query_timeout_ms: default_query_timeout_ms(),
            complex_entity_count: default_complex_entity_count(),
            complex_hops: default_complex_hops(),
            moderate_max_hops: default_moderate_max_hops(),
        }
    }
}

impl RetrievalConfig {
    /// Load the `[retrieval]` section from `<file_prefix>.toml` and
    /// `ENCORE__RETRIEVAL__*` variables, falling back to defaults.
    pub fn load(file_prefix: &str) -> Result<Self, CoreError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("ENCORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<RetrievalConfig>("retrieval") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => {
                tracing::debug!(file_prefix, "No retrieval config found, using defaults");
                Ok(RetrievalConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.default_max_hops, 3);
        assert_eq!(config.max_hops_ceiling, 10);
        assert_eq!(config.weights, RankingWeights::default());
        let w = &config.weights;
        assert!((w.length + w.coverage + w.relation + w.salience - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relation_weight_lookup() {
        let weights = RelationWeights::default();
        assert!(
            weights.weight(&RelationType::CollaboratesWith)
                > weights.weight(&RelationType::SimilarGenre)
        );
        assert_eq!(
            weights.weight(&RelationType::Unknown("X".to_string())),
            weights.unknown
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("missing");
        let config = RetrievalConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.max_context_length, 2000);
    }

    #[test]
    fn test_load_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encore.toml");
        std::fs::write(
            &path,
            r#"
[retrieval]
max_pairs = 4
cache_capacity = 0

[retrieval.weights]
length = 0.25
coverage = 0.25
relation = 0.25
salience = 0.25
"#,
        )
        .unwrap();

        let prefix = dir.path().join("encore");
        let config = RetrievalConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.max_pairs, 4);
        assert_eq!(config.cache_capacity, 0);
        assert!((config.weights.length - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.default_max_hops, 3);
    }
}
