//! Core domain types for the Encore music knowledge graph.
//!
//! These types describe the entities a question refers to, the paths the
//! graph store returns, and the retrieval result handed to the generator.
//! All of them are request-scoped values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Entities ──────────────────────────────────────────────────────

/// The kind of graph node an entity reference points at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityType {
    Artist,
    Band,
    Album,
    Song,
    Genre,
    Award,
    RecordLabel,
    #[default]
    Unknown,
}

impl EntityType {
    /// Map a Neo4j node label to an entity type (case-insensitive).
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "artist" | "person" => Self::Artist,
            "band" | "group" => Self::Band,
            "album" => Self::Album,
            "song" | "track" => Self::Song,
            "genre" => Self::Genre,
            "award" => Self::Award,
            "recordlabel" | "record_label" | "label" => Self::RecordLabel,
            _ => Self::Unknown,
        }
    }

    /// First recognised label wins; `Unknown` if none is recognised.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .map(Self::from_label)
            .find(|t| *t != Self::Unknown)
            .unwrap_or_default()
    }

    /// The canonical Neo4j label for this type.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Artist => "Artist",
            Self::Band => "Band",
            Self::Album => "Album",
            Self::Song => "Song",
            Self::Genre => "Genre",
            Self::Award => "Award",
            Self::RecordLabel => "RecordLabel",
            Self::Unknown => "Unknown",
        }
    }
}

/// A reference to a graph entity recognised in a question.
///
/// `name` is never empty. `id` is only set when the name resolved to a
/// concrete node in the entity index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub name: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl EntityRef {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            id: None,
            entity_type,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// ── Relations ─────────────────────────────────────────────────────

/// The closed set of relationship types in the music graph.
///
/// Any label outside the set becomes `Unknown`, carrying the raw label so it
/// can still be verbalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    CollaboratesWith,
    PerformsOn,
    SimilarGenre,
    HasGenre,
    MemberOf,
    SignedWith,
    PartOf,
    AwardNomination,
    Unknown(String),
}

impl RelationType {
    /// Every relation type the store can be asked to filter on.
    pub const KNOWN: [RelationType; 8] = [
        RelationType::CollaboratesWith,
        RelationType::PerformsOn,
        RelationType::SimilarGenre,
        RelationType::HasGenre,
        RelationType::MemberOf,
        RelationType::SignedWith,
        RelationType::PartOf,
        RelationType::AwardNomination,
    ];

    /// Parse a relationship label as returned by `type(r)`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "COLLABORATES_WITH" => Self::CollaboratesWith,
            "PERFORMS_ON" => Self::PerformsOn,
            "SIMILAR_GENRE" => Self::SimilarGenre,
            "HAS_GENRE" => Self::HasGenre,
            "MEMBER_OF" => Self::MemberOf,
            "SIGNED_WITH" => Self::SignedWith,
            "PART_OF" => Self::PartOf,
            "AWARD_NOMINATION" => Self::AwardNomination,
            _ => Self::Unknown(label.to_string()),
        }
    }

    /// The Cypher relationship type, or `None` for `Unknown`.
    pub fn cypher_name(&self) -> Option<&'static str> {
        match self {
            Self::CollaboratesWith => Some("COLLABORATES_WITH"),
            Self::PerformsOn => Some("PERFORMS_ON"),
            Self::SimilarGenre => Some("SIMILAR_GENRE"),
            Self::HasGenre => Some("HAS_GENRE"),
            Self::MemberOf => Some("MEMBER_OF"),
            Self::SignedWith => Some("SIGNED_WITH"),
            Self::PartOf => Some("PART_OF"),
            Self::AwardNomination => Some("AWARD_NOMINATION"),
            Self::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown(label) => label,
            known => known.cypher_name().unwrap_or_default(),
        }
    }

    /// Symmetric relations read the same in both traversal directions.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::CollaboratesWith | Self::SimilarGenre)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RelationType {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<RelationType> for String {
    fn from(rel: RelationType) -> Self {
        rel.as_str().to_string()
    }
}

// ── Graph Nodes ───────────────────────────────────────────────────

/// A scalar node property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A node as returned by the graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub labels: BTreeSet<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Human-readable name: `name`, then `title`, then the node id.
    pub fn display_name(&self) -> &str {
        ["name", "title"]
            .iter()
            .find_map(|key| {
                self.properties
                    .get(*key)
                    .and_then(PropertyValue::as_str)
                    .filter(|s| !s.trim().is_empty())
            })
            .unwrap_or(self.id.as_str())
    }

    pub fn entity_type(&self) -> EntityType {
        EntityType::from_labels(self.labels.iter().map(String::as_str))
    }

    /// Precomputed popularity, if the node carries one.
    pub fn popularity(&self) -> Option<f64> {
        self.properties
            .get("popularity")
            .and_then(PropertyValue::as_f64)
            .filter(|p| p.is_finite() && *p >= 0.0)
    }
}

// ── Paths ─────────────────────────────────────────────────────────

/// Orientation of the stored relationship relative to traversal order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Stored as `from -[r]-> to`.
    Outgoing,
    /// Stored as `from <-[r]- to`.
    Incoming,
    Undirected,
}

/// One hop of a path. `from` and `to` are always in traversal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathStep {
    pub from: GraphNode,
    pub relation: RelationType,
    pub to: GraphNode,
    pub direction: Direction,
}

impl PathStep {
    pub fn new(
        from: GraphNode,
        relation: RelationType,
        to: GraphNode,
        direction: Direction,
    ) -> Self {
        Self {
            from,
            relation,
            to,
            direction,
        }
    }

    /// The stored (source, target) of the relationship.
    pub fn source_target(&self) -> (&GraphNode, &GraphNode) {
        match self.direction {
            Direction::Incoming => (&self.to, &self.from),
            Direction::Outgoing | Direction::Undirected => (&self.from, &self.to),
        }
    }
}

/// An ordered sequence of steps connecting two entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphPath {
    pub steps: Vec<PathStep>,
}

impl GraphPath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All nodes in traversal order (`len() + 1` of them for a non-empty path).
    pub fn nodes(&self) -> Vec<&GraphNode> {
        let mut nodes = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            nodes.push(&first.from);
        }
        nodes.extend(self.steps.iter().map(|s| &s.to));
        nodes
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes().into_iter().map(|n| n.id.as_str()).collect()
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationType> {
        self.steps.iter().map(|s| &s.relation)
    }

    /// Check the adjacency and acyclicity invariants.
    ///
    /// Steps are in traversal order, so `steps[i].to` must be the same node as
    /// `steps[i + 1].from` regardless of each step's direction.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps.is_empty() {
            return Err(CoreError::MalformedPath {
                step: 0,
                reason: "path has no steps".to_string(),
            });
        }

        for (i, pair) in self.steps.windows(2).enumerate() {
            if pair[0].to.id != pair[1].from.id {
                return Err(CoreError::MalformedPath {
                    step: i + 1,
                    reason: format!(
                        "step starts at '{}' but previous step ended at '{}'",
                        pair[1].from.id, pair[0].to.id
                    ),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for (i, id) in self.node_ids().into_iter().enumerate() {
            if !seen.insert(id) {
                return Err(CoreError::MalformedPath {
                    step: i.saturating_sub(1),
                    reason: format!("path revisits node '{id}'"),
                });
            }
        }

        Ok(())
    }
}

/// A path with its relevance score and dense 0-based rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPath {
    pub path: GraphPath,
    pub score: f64,
    pub rank: usize,
}

// ── Queries ───────────────────────────────────────────────────────

/// Informational shape of one bounded-hop path query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryShape {
    /// All paths of length `1..=max_hops` leaving `center`.
    Neighborhood { center: EntityRef, limit: usize },
    /// Shortest path(s) between two entities.
    ShortestPath {
        from: EntityRef,
        to: EntityRef,
        all_shortest: bool,
        limit: usize,
    },
}

/// A store-agnostic path query: endpoints, hop bound, and relation filter.
///
/// An empty `relation_filter` means every relation type is eligible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathQuery {
    pub shape: QueryShape,
    pub max_hops: u32,
    pub relation_filter: BTreeSet<RelationType>,
}

// ── Retrieval Result ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
}

/// How a retrieval ended. Degraded outcomes are still successful results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Answered,
    NoEntitiesResolved,
    NoPathFound,
}

/// The context payload handed to the generation component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub context_text: String,
    pub entities: Vec<EntityRef>,
    pub paths_considered: usize,
    pub paths_used: usize,
    pub complexity_level: ComplexityLevel,
    pub outcome: RetrievalOutcome,
    pub queries_executed: usize,
    /// Paths the store returned that broke the adjacency invariant.
    pub paths_dropped: usize,
    pub retrieved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str) -> GraphNode {
        GraphNode::new(id)
            .with_label("Artist")
            .with_property("name", PropertyValue::Text(name.to_string()))
    }

    fn step(from: &GraphNode, to: &GraphNode) -> PathStep {
        PathStep::new(
            from.clone(),
            RelationType::CollaboratesWith,
            to.clone(),
            Direction::Outgoing,
        )
    }

    #[test]
    fn relation_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&RelationType::MemberOf).unwrap();
        assert_eq!(json, "\"MEMBER_OF\"");

        let parsed: RelationType = serde_json::from_str("\"award_nomination\"").unwrap();
        assert_eq!(parsed, RelationType::AwardNomination);
    }

    #[test]
    fn unknown_relation_keeps_raw_label() {
        let rel = RelationType::from_label("PRODUCED_BY");
        assert_eq!(rel, RelationType::Unknown("PRODUCED_BY".to_string()));
        assert_eq!(rel.as_str(), "PRODUCED_BY");
        assert!(rel.cypher_name().is_none());
    }

    #[test]
    fn entity_type_from_labels() {
        assert_eq!(EntityType::from_labels(["Node", "Band"]), EntityType::Band);
        assert_eq!(EntityType::from_label("Label"), EntityType::RecordLabel);
        assert_eq!(EntityType::from_labels(["Thing"]), EntityType::Unknown);
    }

    #[test]
    fn display_name_falls_back_to_title_then_id() {
        let named = node("a1", "Adele");
        assert_eq!(named.display_name(), "Adele");

        let titled =
            GraphNode::new("s1").with_property("title", PropertyValue::Text("Hello".into()));
        assert_eq!(titled.display_name(), "Hello");

        assert_eq!(GraphNode::new("bare").display_name(), "bare");
    }

    #[test]
    fn popularity_reads_int_or_float() {
        let int = GraphNode::new("a").with_property("popularity", PropertyValue::Int(80));
        assert_eq!(int.popularity(), Some(80.0));
        let neg = GraphNode::new("b").with_property("popularity", PropertyValue::Float(-1.0));
        assert_eq!(neg.popularity(), None);
    }

    #[test]
    fn valid_path_passes_validation() {
        let a = node("a", "A");
        let b = node("b", "B");
        let c = node("c", "C");
        let path = GraphPath::new(vec![step(&a, &b), step(&b, &c)]);
        assert!(path.validate().is_ok());
        assert_eq!(path.node_ids(), vec!["a", "b", "c"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn broken_adjacency_is_malformed() {
        let a = node("a", "A");
        let b = node("b", "B");
        let c = node("c", "C");
        let path = GraphPath::new(vec![step(&a, &b), step(&c, &a)]);
        match path.validate() {
            Err(CoreError::MalformedPath { step, .. }) => assert_eq!(step, 1),
            other => panic!("expected malformed path, got {other:?}"),
        }
    }

    #[test]
    fn cycles_and_empty_paths_are_malformed() {
        let a = node("a", "A");
        let b = node("b", "B");
        let cyclic = GraphPath::new(vec![step(&a, &b), step(&b, &a)]);
        assert!(cyclic.validate().is_err());
        assert!(GraphPath::default().validate().is_err());
    }

    #[test]
    fn incoming_step_swaps_source_and_target() {
        let member = node("m", "Chris Martin");
        let band = node("b", "Coldplay");
        let step = PathStep::new(
            band.clone(),
            RelationType::MemberOf,
            member.clone(),
            Direction::Incoming,
        );
        let (source, target) = step.source_target();
        assert_eq!(source.id, "m");
        assert_eq!(target.id, "b");
    }
}
