//! Path relevance scoring.
//!
//! Score = `w_len * length + w_cov * coverage + w_rel * relation + w_sal * salience`,
//! each signal in `[0, 1]`:
//!
//! - length: `1 / (1 + hops)`, shorter paths score higher
//! - coverage: fraction of the question's entities that appear on the path
//! - relation: mean per-step relevance, 1.0 when the question mentions the
//!   relation, its static weight otherwise
//! - salience: mean node importance, from `popularity` when the node has one
//!   and from degree within the result set when it does not
//!
//! Ties are broken deterministically: shorter path, then node ids, then
//! relation labels.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use encore_core::config::RelationWeights;
use encore_core::{
    EntityRef, GraphNode, GraphPath, RankingWeights, RelationType, RetrievalConfig, ScoredPath,
};

use crate::resolver::normalize;

/// Question phrases that signal interest in a relation type.
fn relation_keywords(relation: &RelationType) -> &'static [&'static str] {
    match relation {
        RelationType::CollaboratesWith => &[
            "collaborat",
            "work with",
            "worked with",
            "together",
            "feat",
            "duet",
        ],
        RelationType::PerformsOn => &["album", "song", "track", "perform", "release"],
        RelationType::HasGenre => &["genre", "style"],
        RelationType::SimilarGenre => &["similar"],
        RelationType::MemberOf => &["member", "band", "group"],
        RelationType::SignedWith => &["label", "signed"],
        RelationType::PartOf => &["part of", "belong"],
        RelationType::AwardNomination => &["award", "nominat", "grammy", "prize"],
        RelationType::Unknown(_) => &[],
    }
}

/// Scores and orders candidate paths.
#[derive(Debug, Clone)]
pub struct PathRanker {
    weights: RankingWeights,
    relation_weights: RelationWeights,
}

impl PathRanker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            relation_weights: config.relation_weights.clone(),
        }
    }

    /// Score every path and return them best first with dense ranks `0..n`.
    pub fn rank(
        &self,
        paths: Vec<GraphPath>,
        question: &str,
        entities: &[EntityRef],
    ) -> Vec<ScoredPath> {
        if paths.is_empty() {
            return Vec::new();
        }

        let question = normalize(question);
        let degrees = DegreeTable::build(&paths);

        let mut scored: Vec<ScoredPath> = paths
            .into_iter()
            .map(|path| {
                let score = self.score(&path, &question, entities, &degrees);
                ScoredPath {
                    path,
                    score,
                    rank: 0,
                }
            })
            .collect();

        scored.sort_by(compare_scored);
        for (rank, sp) in scored.iter_mut().enumerate() {
            sp.rank = rank;
        }

        tracing::debug!(
            paths = scored.len(),
            best = scored.first().map(|s| s.score).unwrap_or_default(),
            "Ranked paths"
        );
        scored
    }

    /// Rank and keep the best `k`.
    pub fn top_k(
        &self,
        paths: Vec<GraphPath>,
        question: &str,
        entities: &[EntityRef],
        k: usize,
    ) -> Vec<ScoredPath> {
        let mut ranked = self.rank(paths, question, entities);
        ranked.truncate(k);
        ranked
    }

    fn score(
        &self,
        path: &GraphPath,
        question: &str,
        entities: &[EntityRef],
        degrees: &DegreeTable,
    ) -> f64 {
        let w = &self.weights;
        w.length * length_signal(path)
            + w.coverage * coverage_signal(path, entities)
            + w.relation * self.relation_signal(path, question)
            + w.salience * salience_signal(path, degrees)
    }

    fn relation_signal(&self, path: &GraphPath, question: &str) -> f64 {
        if path.is_empty() {
            return 0.0;
        }
        let total: f64 = path
            .relations()
            .map(|relation| {
                let mentioned = relation_keywords(relation)
                    .iter()
                    .any(|kw| question.contains(kw));
                if mentioned {
                    1.0
                } else {
                    self.relation_weights.weight(relation).clamp(0.0, 1.0)
                }
            })
            .sum();
        total / path.len() as f64
    }
}

fn length_signal(path: &GraphPath) -> f64 {
    1.0 / (1.0 + path.len() as f64)
}

fn coverage_signal(path: &GraphPath, entities: &[EntityRef]) -> f64 {
    if entities.is_empty() {
        return 0.0;
    }
    let nodes = path.nodes();
    let covered = entities
        .iter()
        .filter(|entity| nodes.iter().any(|node| refers_to(entity, node)))
        .count();
    covered as f64 / entities.len() as f64
}

fn refers_to(entity: &EntityRef, node: &GraphNode) -> bool {
    if entity.id.as_deref() == Some(node.id.as_str()) {
        return true;
    }
    normalize(&entity.name) == normalize(node.display_name())
}

fn salience_signal(path: &GraphPath, degrees: &DegreeTable) -> f64 {
    let nodes = path.nodes();
    if nodes.is_empty() {
        return 0.0;
    }
    let total: f64 = nodes
        .iter()
        .map(|node| match node.popularity() {
            // Popularity is either a 0-1 fraction or a 0-100 score.
            Some(p) if p > 1.0 => (p / 100.0).clamp(0.0, 1.0),
            Some(p) => p,
            None => degrees.normalized(&node.id),
        })
        .sum();
    total / nodes.len() as f64
}

/// Distinct-neighbor counts across every candidate path.
struct DegreeTable {
    degree: BTreeMap<String, usize>,
    max: usize,
}

impl DegreeTable {
    fn build(paths: &[GraphPath]) -> Self {
        let mut neighbors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for step in paths.iter().flat_map(|p| p.steps.iter()) {
            neighbors
                .entry(step.from.id.as_str())
                .or_default()
                .insert(step.to.id.as_str());
            neighbors
                .entry(step.to.id.as_str())
                .or_default()
                .insert(step.from.id.as_str());
        }
        let degree: BTreeMap<String, usize> = neighbors
            .into_iter()
            .map(|(id, set)| (id.to_string(), set.len()))
            .collect();
        let max = degree.values().copied().max().unwrap_or(0);
        Self { degree, max }
    }

    fn normalized(&self, id: &str) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        self.degree.get(id).copied().unwrap_or(0) as f64 / self.max as f64
    }
}

fn compare_scored(a: &ScoredPath, b: &ScoredPath) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.path.len().cmp(&b.path.len()))
        .then_with(|| a.path.node_ids().cmp(&b.path.node_ids()))
        .then_with(|| {
            let ra: Vec<&str> = a.path.relations().map(RelationType::as_str).collect();
            let rb: Vec<&str> = b.path.relations().map(RelationType::as_str).collect();
            ra.cmp(&rb)
        })
}
