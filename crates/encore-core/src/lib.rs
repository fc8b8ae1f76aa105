//! encore-core: Shared types, configuration, and error handling for Encore.
//!
//! This crate provides the foundational types used across all Encore components:
//! - Entity and relation enumerations for the music knowledge graph
//! - Path types (nodes, steps, paths) returned by the graph store
//! - The retrieval result handed to the generation component
//! - Retrieval configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{RankingWeights, RetrievalConfig};
pub use error::CoreError;
pub use types::{
    ComplexityLevel, Direction, EntityRef, EntityType, GraphNode, GraphPath, PathQuery,
    PathStep, PropertyValue, QueryShape, RelationType, RetrievalOutcome, RetrievalResult,
    ScoredPath,
};
