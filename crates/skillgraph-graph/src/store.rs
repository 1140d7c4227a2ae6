//! The storage seam between the pipeline and a concrete graph backend.
//!
//! Writes arrive as an ordered batch of [`MergeOp`]s that must be applied
//! atomically. Reads go through fixed [`BoundQuery`] templates and come
//! back as [`RawRecord`]s, which the search side ranks and shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use skillgraph_core::{normalize_key, EntityKind, NodeKey, RelationType, SkillCategory};

use crate::client::{GraphClient, GraphError};
use crate::templates::BoundQuery;

/// A single idempotent merge against the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOp {
    Person {
        key: NodeKey,
        name: String,
    },
    /// `category` is recorded only when the skill node is first created.
    Skill {
        key: NodeKey,
        name: String,
        category: SkillCategory,
    },
    /// An empty or missing description never clears an existing one.
    Project {
        key: NodeKey,
        name: String,
        description: Option<String>,
    },
    /// Endpoints must already exist (earlier in the batch or in the graph).
    Relation {
        relation: RelationType,
        from: NodeKey,
        to: NodeKey,
        role: Option<String>,
    },
}

/// Whether a merge created something new or matched an existing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Merged,
}

/// A person's role on a project, as returned by read templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub person: String,
    pub project: String,
    #[serde(default)]
    pub role: String,
}

/// One unranked row returned by a query template.
///
/// For people, `skills` holds every skill the person has; for projects, the
/// technologies it uses. `matched` holds the names that satisfied the query
/// (skills, technologies or shared projects) and is empty for templates that
/// do not match on names.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: EntityKind,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub matched: Vec<String>,
    pub skills: Vec<String>,
    pub assignments: Vec<Assignment>,
}

impl RawRecord {
    /// Count of name, skill, linked node and role fields containing any of
    /// the normalized `terms`. Repeated fields count once.
    pub fn matching_fields(&self, terms: &[String]) -> usize {
        let hits = |field: &str| terms.iter().any(|t| field.contains(t.as_str()));

        let name = normalize_key(&self.name);
        let mut count = usize::from(!name.is_empty() && hits(name.as_str()));
        count += distinct_keys(self.skills.iter())
            .iter()
            .filter(|s| hits(s.as_str()))
            .count();

        let linked = self.assignments.iter().map(|a| match self.kind {
            EntityKind::Project => &a.person,
            _ => &a.project,
        });
        count += distinct_keys(linked).iter().filter(|l| hits(l.as_str())).count();
        count += distinct_keys(self.assignments.iter().map(|a| &a.role))
            .iter()
            .filter(|r| hits(r.as_str()))
            .count();
        count
    }
}

fn distinct_keys<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = names
        .map(|n| normalize_key(n))
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// A node selected for graph projection.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotNode {
    pub kind: EntityKind,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// A relationship between two selected nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEdge {
    pub relation: RelationType,
    pub from: (EntityKind, String),
    pub to: (EntityKind, String),
    pub role: Option<String>,
}

/// A bounded slice of the graph, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
    /// Node count of the whole graph, regardless of the limit.
    pub total_nodes: usize,
}

/// Element counts for the whole graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub people: usize,
    pub skills: usize,
    pub projects: usize,
    pub hard_skill_links: usize,
    pub soft_skill_links: usize,
    pub project_assignments: usize,
    pub technology_links: usize,
}

impl GraphCounts {
    pub fn nodes(&self) -> usize {
        self.people + self.skills + self.projects
    }

    pub fn relationships(&self) -> usize {
        self.hard_skill_links + self.soft_skill_links + self.project_assignments + self.technology_links
    }
}

/// A graph backend.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply a batch of merges atomically, returning one outcome per op.
    ///
    /// On error nothing from the batch is visible.
    async fn apply_merges(&self, ops: &[MergeOp]) -> Result<Vec<MergeOutcome>, GraphError>;

    /// Run a bound read template.
    async fn fetch_records(&self, query: &BoundQuery) -> Result<Vec<RawRecord>, GraphError>;

    /// Up to `node_limit` nodes in creation order plus the relationships among them.
    async fn snapshot(&self, node_limit: usize) -> Result<GraphSnapshot, GraphError>;

    async fn counts(&self) -> Result<GraphCounts, GraphError>;
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn apply_merges(&self, ops: &[MergeOp]) -> Result<Vec<MergeOutcome>, GraphError> {
        self.merge_batch(ops).await
    }

    async fn fetch_records(&self, query: &BoundQuery) -> Result<Vec<RawRecord>, GraphError> {
        GraphClient::fetch_records(self, query).await
    }

    async fn snapshot(&self, node_limit: usize) -> Result<GraphSnapshot, GraphError> {
        GraphClient::snapshot(self, node_limit).await
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        self.graph_counts().await
    }
}
