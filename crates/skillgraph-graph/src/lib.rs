//! skillgraph-graph: the knowledge graph of people, skills and projects.
//!
//! This crate is the single mutation point for the graph. Writes go through
//! [`UpsertEngine`], which only ever merges by normalized key; reads go
//! through the fixed template table in [`templates`]. [`GraphStore`] is the
//! backend seam, implemented by the Neo4j [`GraphClient`] and by the
//! in-process [`MemoryGraph`].

pub mod client;
pub mod memory;
pub mod mutations;
pub mod projection;
pub mod queries;
pub mod store;
pub mod templates;
pub mod upsert;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryGraph;
pub use projection::{GraphProjector, GraphView, ViewLink, ViewNode, ViewStats, MAX_NODE_LIMIT};
pub use store::{
    Assignment, GraphCounts, GraphSnapshot, GraphStore, MergeOp, MergeOutcome, RawRecord,
    SnapshotEdge, SnapshotNode,
};
pub use templates::{BoundQuery, QueryParams, QueryTemplate};
pub use upsert::{plan_merges, UpsertEngine, UpsertStats};
