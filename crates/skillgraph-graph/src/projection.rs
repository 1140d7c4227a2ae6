//! Bounded node/link export of the graph for visualization.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::GraphError;
use crate::store::{GraphSnapshot, GraphStore, SnapshotNode};

/// Node cap applied when the caller gives none, and the most ever returned.
pub const MAX_NODE_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub links: Vec<ViewLink>,
    pub stats: ViewStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    /// `"{Label}:{key}"`, unique across kinds.
    pub id: String,
    /// Display name.
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub node_count: usize,
    pub link_count: usize,
    pub truncated: bool,
}

/// Clamp a requested node cap to `1..=MAX_NODE_LIMIT`.
pub fn clamp_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(MAX_NODE_LIMIT).clamp(1, MAX_NODE_LIMIT)
}

/// Read-only projector over any graph store.
pub struct GraphProjector<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> GraphProjector<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Project up to `limit` nodes (creation order) and the links among them.
    pub async fn project(&self, limit: Option<usize>) -> Result<GraphView, GraphError> {
        let limit = clamp_limit(limit);
        let snapshot = self.store.snapshot(limit).await?;
        let view = build_view(snapshot);

        tracing::debug!(
            nodes = view.stats.node_count,
            links = view.stats.link_count,
            truncated = view.stats.truncated,
            "Graph projected"
        );
        Ok(view)
    }
}

fn node_id(label: &str, key: &str) -> String {
    format!("{label}:{key}")
}

fn view_node(node: SnapshotNode) -> ViewNode {
    let mut properties = Map::new();
    properties.insert("key".to_string(), Value::String(node.key.clone()));
    properties.insert("name".to_string(), Value::String(node.name.clone()));
    if let Some(category) = node.category {
        properties.insert("category".to_string(), Value::String(category));
    }
    if let Some(description) = node.description.filter(|d| !d.is_empty()) {
        properties.insert("description".to_string(), Value::String(description));
    }

    ViewNode {
        id: node_id(node.kind.label(), &node.key),
        label: node.name,
        kind: node.kind.label().to_string(),
        properties,
    }
}

fn build_view(snapshot: GraphSnapshot) -> GraphView {
    let total = snapshot.total_nodes;
    let nodes: Vec<ViewNode> = snapshot.nodes.into_iter().map(view_node).collect();

    let links: Vec<ViewLink> = snapshot
        .edges
        .into_iter()
        .map(|edge| ViewLink {
            source: node_id(edge.from.0.label(), &edge.from.1),
            target: node_id(edge.to.0.label(), &edge.to.1),
            relation: edge.relation.as_cypher().to_string(),
            label: edge.relation.display_label(),
        })
        .filter(|link| {
            nodes.iter().any(|n| n.id == link.source) && nodes.iter().any(|n| n.id == link.target)
        })
        .collect();

    let stats = ViewStats {
        node_count: nodes.len(),
        link_count: links.len(),
        truncated: total > nodes.len(),
    };
    GraphView {
        nodes,
        links,
        stats,
    }
}
