//! Read operations and Cypher query builder for the music knowledge graph.

use std::collections::BTreeSet;

use neo4rs::{query, Query};

use encore_core::{
    Direction, EntityRef, GraphNode, GraphPath, PathQuery, PathStep, PropertyValue, QueryShape,
    RelationType,
};

use crate::client::{GraphClient, GraphError};

/// Properties copied off a node for entity lookups.
const NODE_PROPERTY_KEYS: &[&str] = &[
    "name",
    "title",
    "genre",
    "country",
    "year",
    "release_date",
    "formed_year",
    "popularity",
    "description",
];

/// Columns shared by every path query.
const PATH_PROJECTION: &str = "RETURN [n IN nodes(p) | toString(coalesce(n.id, id(n)))] AS node_ids,
        [n IN nodes(p) | coalesce(n.name, n.title, '')] AS node_names,
        [n IN nodes(p) | labels(n)] AS node_labels,
        [n IN nodes(p) | toFloat(coalesce(n.popularity, -1))] AS node_popularity,
        [r IN relationships(p) | type(r)] AS rel_types,
        [r IN relationships(p) | toString(coalesce(startNode(r).id, id(startNode(r))))] AS rel_starts";

/// One path row as returned by the store, before conversion.
#[derive(Debug, Clone, Default)]
pub struct PathRecord {
    pub node_ids: Vec<String>,
    pub node_names: Vec<String>,
    pub node_labels: Vec<Vec<String>>,
    pub node_popularity: Vec<f64>,
    pub rel_types: Vec<String>,
    pub rel_starts: Vec<String>,
}

impl PathRecord {
    fn from_row(row: &neo4rs::Row) -> Result<Self, GraphError> {
        Ok(Self {
            node_ids: row.get("node_ids").map_err(|e| column_error("node_ids", e))?,
            node_names: row.get("node_names").map_err(|e| column_error("node_names", e))?,
            node_labels: row.get("node_labels").map_err(|e| column_error("node_labels", e))?,
            node_popularity: row.get("node_popularity").unwrap_or_default(),
            rel_types: row.get("rel_types").map_err(|e| column_error("rel_types", e))?,
            rel_starts: row.get("rel_starts").unwrap_or_default(),
        })
    }

    /// Convert into a `GraphPath`.
    ///
    /// Returns `None` when the column lengths disagree (n nodes need n-1
    /// relationships) or the path has no relationships.
    pub fn into_path(self) -> Option<GraphPath> {
        let node_count = self.node_ids.len();
        if node_count < 2
            || self.rel_types.len() != node_count - 1
            || self.node_names.len() != node_count
        {
            return None;
        }

        let nodes: Vec<GraphNode> = self
            .node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut node = GraphNode::new(id.clone());
                if let Some(labels) = self.node_labels.get(i) {
                    node.labels = labels.iter().cloned().collect::<BTreeSet<_>>();
                }
                let name = &self.node_names[i];
                if !name.is_empty() {
                    node = node.with_property("name", PropertyValue::Text(name.clone()));
                }
                if let Some(&popularity) = self.node_popularity.get(i) {
                    if popularity >= 0.0 {
                        node = node.with_property("popularity", PropertyValue::Float(popularity));
                    }
                }
                node
            })
            .collect();

        let steps = self
            .rel_types
            .iter()
            .enumerate()
            .map(|(i, rel_type)| {
                let direction = match self.rel_starts.get(i) {
                    Some(start) if *start == nodes[i].id => Direction::Outgoing,
                    Some(start) if *start == nodes[i + 1].id => Direction::Incoming,
                    _ => Direction::Undirected,
                };
                PathStep::new(
                    nodes[i].clone(),
                    RelationType::from_label(rel_type),
                    nodes[i + 1].clone(),
                    direction,
                )
            })
            .collect();

        Some(GraphPath::new(steps))
    }
}

/// Convert decoded rows into paths. A row that fails to decode or cannot
/// form a path is dropped with a warning; the rest of the result stands.
pub fn paths_from_records<I>(records: I) -> Vec<GraphPath>
where
    I: IntoIterator<Item = Result<PathRecord, GraphError>>,
{
    let mut paths = Vec::new();
    for (row, record) in records.into_iter().enumerate() {
        match record.map(PathRecord::into_path) {
            Ok(Some(path)) => paths.push(path),
            Ok(None) => tracing::warn!(
                row,
                "Skipping path row with inconsistent node/relationship columns"
            ),
            Err(e) => tracing::warn!(row, error = %e, "Skipping undecodable path row"),
        }
    }
    paths
}

/// A named node used to build the entity name index.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub labels: Vec<String>,
}

impl GraphClient {
    // ── Path Queries ─────────────────────────────────────────────

    /// Execute a bounded-hop path query and convert the rows into paths.
    ///
    /// Rows whose columns cannot form a path are skipped with a warning.
    pub async fn find_paths(&self, path_query: &PathQuery) -> Result<Vec<GraphPath>, GraphError> {
        let rows = self.query_rows(build_path_query(path_query)).await?;
        let paths = paths_from_records(rows.iter().map(PathRecord::from_row));

        tracing::debug!(rows = rows.len(), paths = paths.len(), "Path query executed");
        Ok(paths)
    }

    // ── Entity Lookups ───────────────────────────────────────────

    /// List named nodes for the entity name index.
    pub async fn fetch_index_entries(&self, limit: u32) -> Result<Vec<IndexRecord>, GraphError> {
        let q = query(
            "MATCH (n)
             WHERE n.name IS NOT NULL
             RETURN toString(coalesce(n.id, id(n))) AS id, toString(n.name) AS name,
                    coalesce(n.aliases, []) AS aliases, labels(n) AS labels
             ORDER BY name
             LIMIT $limit",
        )
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name").map_err(|e| {
                GraphError::Serialization(format!("Failed to read index entry name: {e}"))
            })?;
            results.push(IndexRecord {
                id: row.get("id").unwrap_or_default(),
                name,
                aliases: row.get("aliases").unwrap_or_default(),
                labels: row.get("labels").unwrap_or_default(),
            });
        }
        Ok(results)
    }

    /// Look up a single entity by exact (case-insensitive) name.
    pub async fn entity_info(&self, name: &str) -> Result<Option<GraphNode>, GraphError> {
        let q = query(
            "MATCH (n)
             WHERE toLower(n.name) = toLower($name)
             RETURN n, labels(n) AS labels
             LIMIT 1",
        )
        .param("name", name.to_string());

        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get("n").map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize node: {e}"))
                })?;
                let labels: Vec<String> = row.get("labels").unwrap_or_default();
                Ok(Some(neo4j_node_to_graph_node(&node, labels)))
            }
            None => Ok(None),
        }
    }

    /// Names containing `name` (case-insensitive), excluding the exact name.
    pub async fn similar_entities(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<String>, GraphError> {
        let q = query(
            "MATCH (n)
             WHERE toLower(n.name) CONTAINS toLower($name)
               AND toLower(n.name) <> toLower($name)
             RETURN DISTINCT n.name AS name
             ORDER BY name
             LIMIT $limit",
        )
        .param("name", name.to_string())
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get::<String>("name").ok())
            .collect())
    }
}

// ── Cypher Rendering ─────────────────────────────────────────────

/// Build the parameterized neo4rs query for a `PathQuery`.
pub fn build_path_query(path_query: &PathQuery) -> Query {
    let mut q = query(&path_query_cypher(path_query));

    match &path_query.shape {
        QueryShape::Neighborhood { center, limit } => {
            q = bind_endpoint(q, "a", center).param("limit", *limit as i64);
        }
        QueryShape::ShortestPath {
            from, to, limit, ..
        } => {
            q = bind_endpoint(q, "a", from);
            q = bind_endpoint(q, "b", to).param("limit", *limit as i64);
        }
    }

    q
}

/// Render the Cypher text for a `PathQuery`.
///
/// Hop bounds and relationship types cannot be parameters in Cypher, so they
/// are interpolated. Both come from closed sets (`u32`, known relation
/// names), never from user text.
pub fn path_query_cypher(path_query: &PathQuery) -> String {
    let rel = relationship_pattern(&path_query.relation_filter, path_query.max_hops);

    match &path_query.shape {
        QueryShape::Neighborhood { center, .. } => format!(
            "MATCH (a) WHERE {a_cond}
             MATCH p = (a)-[{rel}]-(b)
             WHERE a <> b
               AND ALL(n IN nodes(p) WHERE single(m IN nodes(p) WHERE m = n))
             {PATH_PROJECTION}
             LIMIT $limit",
            a_cond = endpoint_condition("a", center),
        ),
        QueryShape::ShortestPath {
            from,
            to,
            all_shortest,
            ..
        } => {
            let function = if *all_shortest {
                "allShortestPaths"
            } else {
                "shortestPath"
            };
            format!(
                "MATCH (a) WHERE {a_cond}
                 MATCH (b) WHERE {b_cond}
                 WITH a, b WHERE a <> b
                 MATCH p = {function}((a)-[{rel}]-(b))
                 {PATH_PROJECTION}
                 LIMIT $limit",
                a_cond = endpoint_condition("a", from),
                b_cond = endpoint_condition("b", to),
            )
        }
    }
}

/// `:A|B*1..N`, or `*1..N` when every relation type is eligible.
fn relationship_pattern(filter: &BTreeSet<RelationType>, max_hops: u32) -> String {
    let types: Vec<&str> = filter.iter().filter_map(RelationType::cypher_name).collect();
    if types.is_empty() {
        format!("*1..{max_hops}")
    } else {
        format!(":{}*1..{max_hops}", types.join("|"))
    }
}

/// Resolved entities match on id; unresolved ones on lower-cased name.
fn endpoint_condition(var: &str, entity: &EntityRef) -> String {
    match entity.id {
        Some(_) => format!("toString(coalesce({var}.id, id({var}))) = ${var}_id"),
        None => format!("toLower({var}.name) = ${var}_name"),
    }
}

fn bind_endpoint(q: Query, var: &str, entity: &EntityRef) -> Query {
    match &entity.id {
        Some(id) => q.param(&format!("{var}_id"), id.clone()),
        None => q.param(&format!("{var}_name"), entity.name.to_lowercase()),
    }
}

fn column_error(column: &str, e: impl std::fmt::Display) -> GraphError {
    GraphError::Serialization(format!("Failed to read path column {column}: {e}"))
}

/// Convert a neo4rs::Node into a `GraphNode` with its scalar properties.
fn neo4j_node_to_graph_node(node: &neo4rs::Node, labels: Vec<String>) -> GraphNode {
    let id = node
        .get::<String>("id")
        .unwrap_or_else(|_| node.id().to_string());

    let mut graph_node = GraphNode::new(id);
    graph_node.labels = labels.into_iter().collect();

    for key in NODE_PROPERTY_KEYS {
        let value = if let Ok(s) = node.get::<String>(key) {
            PropertyValue::Text(s)
        } else if let Ok(i) = node.get::<i64>(key) {
            PropertyValue::Int(i)
        } else if let Ok(f) = node.get::<f64>(key) {
            PropertyValue::Float(f)
        } else if let Ok(b) = node.get::<bool>(key) {
            PropertyValue::Bool(b)
        } else {
            continue;
        };
        graph_node.properties.insert((*key).to_string(), value);
    }

    graph_node
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::EntityType;

    fn artist(name: &str) -> EntityRef {
        EntityRef::new(name, EntityType::Artist)
    }

    fn record(ids: &[&str], rels: &[&str], starts: &[&str]) -> PathRecord {
        PathRecord {
            node_ids: ids.iter().map(|s| s.to_string()).collect(),
            node_names: ids.iter().map(|s| format!("Name {s}")).collect(),
            node_labels: ids.iter().map(|_| vec!["Artist".to_string()]).collect(),
            node_popularity: ids.iter().map(|_| -1.0).collect(),
            rel_types: rels.iter().map(|s| s.to_string()).collect(),
            rel_starts: starts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_shortest_path_cypher_with_filter() {
        let mut filter = BTreeSet::new();
        filter.insert(RelationType::MemberOf);
        filter.insert(RelationType::CollaboratesWith);

        let q = PathQuery {
            shape: QueryShape::ShortestPath {
                from: artist("Taylor Swift").with_id("a1"),
                to: artist("Ed Sheeran"),
                all_shortest: false,
                limit: 25,
            },
            max_hops: 3,
            relation_filter: filter,
        };

        let cypher = path_query_cypher(&q);
        assert!(cypher.contains("shortestPath((a)-[:COLLABORATES_WITH|MEMBER_OF*1..3]-(b))"));
        assert!(cypher.contains("= $a_id"));
        assert!(cypher.contains("toLower(b.name) = $b_name"));
        assert!(!cypher.contains("allShortestPaths"));
    }

    #[test]
    fn test_all_shortest_paths_cypher() {
        let q = PathQuery {
            shape: QueryShape::ShortestPath {
                from: artist("A"),
                to: artist("B"),
                all_shortest: true,
                limit: 10,
            },
            max_hops: 4,
            relation_filter: BTreeSet::new(),
        };
        let cypher = path_query_cypher(&q);
        assert!(cypher.contains("allShortestPaths((a)-[*1..4]-(b))"));
    }

    #[test]
    fn test_neighborhood_cypher() {
        let q = PathQuery {
            shape: QueryShape::Neighborhood {
                center: artist("Adele"),
                limit: 50,
            },
            max_hops: 2,
            relation_filter: BTreeSet::new(),
        };
        let cypher = path_query_cypher(&q);
        assert!(cypher.contains("MATCH p = (a)-[*1..2]-(b)"));
        assert!(cypher.contains("LIMIT $limit"));
        assert!(!cypher.contains("shortestPath"));
        // Sorting would force the store to enumerate every path before LIMIT.
        assert!(!cypher.contains("ORDER BY"));
    }

    #[test]
    fn test_record_into_path_directions() {
        // a -> b, then c -> b (traversed b to c against the arrow)
        let path = record(&["a", "b", "c"], &["COLLABORATES_WITH", "MEMBER_OF"], &["a", "c"])
            .into_path()
            .unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path.steps[0].direction, Direction::Outgoing);
        assert_eq!(path.steps[1].direction, Direction::Incoming);
        assert_eq!(path.steps[1].relation, RelationType::MemberOf);
        assert_eq!(path.steps[0].from.display_name(), "Name a");
        assert!(path.validate().is_ok());
    }

    #[test]
    fn test_record_without_starts_is_undirected() {
        let path = record(&["a", "b"], &["PRODUCED"], &[]).into_path().unwrap();
        assert_eq!(path.steps[0].direction, Direction::Undirected);
        assert!(path.steps[0].relation.is_unknown());
    }

    #[test]
    fn test_record_with_mismatched_columns_is_rejected() {
        assert!(record(&["a", "b", "c"], &["MEMBER_OF"], &[]).into_path().is_none());
        assert!(record(&["a"], &[], &[]).into_path().is_none());
    }

    #[test]
    fn test_undecodable_row_skipped_not_fatal() {
        let rows = vec![
            Ok(record(&["a", "b"], &["COLLABORATES_WITH"], &["a"])),
            Err(column_error("node_names", "expected String, got Integer")),
            Ok(record(&["a", "b", "c"], &["MEMBER_OF"], &[])),
            Ok(record(&["c", "d"], &["PART_OF"], &["c"])),
        ];
        let paths = paths_from_records(rows);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].node_ids(), vec!["a", "b"]);
        assert_eq!(paths[1].node_ids(), vec!["c", "d"]);
    }

    #[test]
    fn test_popularity_only_kept_when_present() {
        let mut rec = record(&["a", "b"], &["HAS_GENRE"], &["a"]);
        rec.node_popularity = vec![72.0, -1.0];
        let path = rec.into_path().unwrap();
        assert_eq!(path.steps[0].from.popularity(), Some(72.0));
        assert_eq!(path.steps[0].to.popularity(), None);
    }
}
