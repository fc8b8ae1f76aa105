//! Natural-language rendering of graph triples.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use encore_core::{Direction, GraphPath, PathStep, RelationType};

/// Renders one step as a sentence fragment, without a trailing period.
///
/// Subject and object follow traversal order. When the stored relationship
/// points against traversal (`Direction::Incoming`), the inverse phrasing is
/// used so the sentence stays true.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripleVerbalizer;

impl TripleVerbalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn verbalize(&self, step: &PathStep) -> String {
        let s = step.from.display_name();
        let o = step.to.display_name();
        let reversed = step.direction == Direction::Incoming && !step.relation.is_symmetric();

        match (&step.relation, reversed) {
            (RelationType::CollaboratesWith, _) => format!("{s} collaborated with {o}"),
            (RelationType::SimilarGenre, _) => format!("{s} is a genre similar to {o}"),
            (RelationType::PerformsOn, false) => format!("{s} performs on {o}"),
            (RelationType::PerformsOn, true) => format!("{s} features a performance by {o}"),
            (RelationType::HasGenre, false) => format!("{s} has the genre {o}"),
            (RelationType::HasGenre, true) => format!("{s} is the genre of {o}"),
            (RelationType::MemberOf, false) => format!("{s} is a member of {o}"),
            (RelationType::MemberOf, true) => format!("{s} has {o} as a member"),
            (RelationType::SignedWith, false) => format!("{s} is signed with {o}"),
            (RelationType::SignedWith, true) => format!("{s} has signed {o}"),
            (RelationType::PartOf, false) => format!("{s} is part of {o}"),
            (RelationType::PartOf, true) => format!("{s} includes {o}"),
            (RelationType::AwardNomination, false) => format!("{s} was nominated for {o}"),
            (RelationType::AwardNomination, true) => {
                format!("{s} counts {o} among its nominees")
            }
            (RelationType::Unknown(label), _) => format!("{s} is related to {o} via {label}"),
        }
    }

    /// Every step of the path, in order.
    pub fn verbalize_path(&self, path: &GraphPath) -> Vec<String> {
        path.steps.iter().map(|step| self.verbalize(step)).collect()
    }
}

/// Aggregate view of the triples in a set of paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationSummary {
    pub total_triples: usize,
    pub unique_entities: usize,
    pub relation_distribution: BTreeMap<String, usize>,
}

impl RelationSummary {
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a GraphPath>,
    {
        let mut summary = Self::default();
        let mut entities = BTreeSet::new();
        for step in paths.into_iter().flat_map(|p| p.steps.iter()) {
            summary.total_triples += 1;
            entities.insert(step.from.id.as_str());
            entities.insert(step.to.id.as_str());
            *summary
                .relation_distribution
                .entry(step.relation.as_str().to_string())
                .or_default() += 1;
        }
        summary.unique_entities = entities.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::{GraphNode, PropertyValue};

    fn node(id: &str, name: &str) -> GraphNode {
        GraphNode::new(id).with_property("name", PropertyValue::Text(name.to_string()))
    }

    fn step(from: &str, relation: RelationType, to: &str, direction: Direction) -> PathStep {
        PathStep::new(node(from, from), relation, node(to, to), direction)
    }

    #[test]
    fn test_forward_templates() {
        let v = TripleVerbalizer::new();
        assert_eq!(
            v.verbalize(&step(
                "Taylor Swift",
                RelationType::CollaboratesWith,
                "Ed Sheeran",
                Direction::Outgoing,
            )),
            "Taylor Swift collaborated with Ed Sheeran"
        );
        assert_eq!(
            v.verbalize(&step(
                "Chris Martin",
                RelationType::MemberOf,
                "Coldplay",
                Direction::Outgoing,
            )),
            "Chris Martin is a member of Coldplay"
        );
        assert_eq!(
            v.verbalize(&step(
                "Adele",
                RelationType::AwardNomination,
                "Grammy",
                Direction::Outgoing,
            )),
            "Adele was nominated for Grammy"
        );
    }

    #[test]
    fn test_incoming_uses_inverse_phrasing() {
        let v = TripleVerbalizer::new();
        assert_eq!(
            v.verbalize(&step(
                "Coldplay",
                RelationType::MemberOf,
                "Chris Martin",
                Direction::Incoming,
            )),
            "Coldplay has Chris Martin as a member"
        );
        assert_eq!(
            v.verbalize(&step("Pop", RelationType::HasGenre, "1989", Direction::Incoming)),
            "Pop is the genre of 1989"
        );
    }

    #[test]
    fn test_symmetric_relations_ignore_direction() {
        let v = TripleVerbalizer::new();
        assert_eq!(
            v.verbalize(&step(
                "Ed Sheeran",
                RelationType::CollaboratesWith,
                "Taylor Swift",
                Direction::Incoming,
            )),
            "Ed Sheeran collaborated with Taylor Swift"
        );
    }

    #[test]
    fn test_unknown_relation_generic_sentence() {
        let v = TripleVerbalizer::new();
        let s = v.verbalize(&step(
            "Max Martin",
            RelationType::Unknown("PRODUCED".to_string()),
            "Blank Space",
            Direction::Outgoing,
        ));
        assert_eq!(s, "Max Martin is related to Blank Space via PRODUCED");
    }

    #[test]
    fn test_falls_back_to_title_then_id() {
        let v = TripleVerbalizer::new();
        let song = GraphNode::new("s1")
            .with_property("title", PropertyValue::Text("Shake It Off".into()));
        let bare = GraphNode::new("album-7");
        let s = v.verbalize(&PathStep::new(song, RelationType::PartOf, bare, Direction::Outgoing));
        assert_eq!(s, "Shake It Off is part of album-7");
    }

    #[test]
    fn test_relation_summary() {
        let path = GraphPath::new(vec![
            step("a", RelationType::CollaboratesWith, "b", Direction::Outgoing),
            step("b", RelationType::CollaboratesWith, "c", Direction::Outgoing),
        ]);
        let other = GraphPath::new(vec![step(
            "a",
            RelationType::MemberOf,
            "d",
            Direction::Outgoing,
        )]);
        let summary = RelationSummary::from_paths([&path, &other]);
        assert_eq!(summary.total_triples, 3);
        assert_eq!(summary.unique_entities, 4);
        assert_eq!(summary.relation_distribution["COLLABORATES_WITH"], 2);
        assert_eq!(summary.relation_distribution["MEMBER_OF"], 1);
    }
}
