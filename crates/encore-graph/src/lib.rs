//! encore-graph: Neo4j client for the music knowledge graph.
//!
//! This crate is the only place that speaks Cypher. It renders the
//! store-agnostic `PathQuery` shapes into bounded-hop path queries, executes
//! them, and converts the returned rows into `GraphPath` values. It also
//! serves the entity lookups used to build the name index.

pub mod client;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use queries::{IndexRecord, PathRecord};
