//! dbt artifact model and dependency graph
//!
//! This crate handles:
//! - Parsing manifest.json (dbt-generated artifacts)
//! - Typed resource types and node configuration trees
//! - The dependency graph (DAG) and its traversal queries

pub mod manifest;
pub mod graph;

pub use manifest::{
    ColumnDefinition, ConfigValue, DependsOn, Manifest, ManifestError, ManifestMetadata,
    ManifestNode, ManifestSource, NodeConfig, NodeRef, ResourceType, SourceConfig, TestMetadata,
};
pub use graph::{Graph, GraphLookupError, Traversal, UniqueId};
