//! Read operations against Neo4j: template execution, snapshots, counts.

use neo4rs::{query, Query, Row, Txn};

use skillgraph_core::{EntityKind, RelationType};

use crate::client::{GraphClient, GraphError};
use crate::store::{Assignment, GraphCounts, GraphSnapshot, RawRecord, SnapshotEdge, SnapshotNode};
use crate::templates::BoundQuery;

const SNAPSHOT_TOTAL: &str = "MATCH (n) WHERE n:Person OR n:Skill OR n:Project
RETURN count(n) AS total";

const SNAPSHOT_NODES: &str = "MATCH (n) WHERE n:Person OR n:Skill OR n:Project
WITH n, [l IN labels(n) WHERE l IN ['Person', 'Skill', 'Project']][0] AS label
RETURN label, n.key AS key, n.name AS name, n.description AS description,
       n.category AS category, n.first_seen AS first_seen
ORDER BY first_seen, label, key
LIMIT $limit";

const SNAPSHOT_EDGES: &str = "MATCH (a:Person)-[r:HAS_HARD_SKILL|HAS_SOFT_SKILL]->(b:Skill)
WHERE a.key IN $people AND b.key IN $skills
RETURN a.key AS from_key, b.key AS to_key, type(r) AS rel_type, r.role AS role
UNION ALL
MATCH (a:Person)-[r:WORKS_ON]->(b:Project)
WHERE a.key IN $people AND b.key IN $projects
RETURN a.key AS from_key, b.key AS to_key, type(r) AS rel_type, r.role AS role
UNION ALL
MATCH (a:Project)-[r:USES_TECH]->(b:Skill)
WHERE a.key IN $projects AND b.key IN $skills
RETURN a.key AS from_key, b.key AS to_key, type(r) AS rel_type, r.role AS role";

impl GraphClient {
    // ── Template Execution ───────────────────────────────────────

    /// Run a bound read template and decode its rows.
    pub async fn fetch_records(&self, bound: &BoundQuery) -> Result<Vec<RawRecord>, GraphError> {
        let rows = self.query_rows(bound.to_query()).await?;
        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            template = bound.template.name(),
            rows = records.len(),
            "Template executed"
        );
        Ok(records)
    }

    // ── Snapshot ─────────────────────────────────────────────────

    /// Read a bounded, creation-ordered slice of the graph in one transaction.
    pub async fn snapshot(&self, node_limit: usize) -> Result<GraphSnapshot, GraphError> {
        let mut txn = self.start_txn().await?;

        let total = txn_rows(&mut txn, query(SNAPSHOT_TOTAL))
            .await?
            .first()
            .and_then(|row| row.get::<i64>("total").ok())
            .unwrap_or(0);

        let node_rows = txn_rows(
            &mut txn,
            query(SNAPSHOT_NODES).param("limit", node_limit as i64),
        )
        .await?;
        let nodes = node_rows
            .iter()
            .map(row_to_snapshot_node)
            .collect::<Result<Vec<_>, _>>()?;

        let keys_of = |kind: EntityKind| -> Vec<String> {
            nodes
                .iter()
                .filter(|n| n.kind == kind)
                .map(|n| n.key.clone())
                .collect()
        };
        let edge_query = query(SNAPSHOT_EDGES)
            .param("people", keys_of(EntityKind::Person))
            .param("skills", keys_of(EntityKind::Skill))
            .param("projects", keys_of(EntityKind::Project));
        let edge_rows = txn_rows(&mut txn, edge_query).await?;
        txn.commit().await?;

        let mut edges = edge_rows
            .iter()
            .map(row_to_snapshot_edge)
            .collect::<Result<Vec<_>, _>>()?;
        edges.sort_by(|a, b| {
            (&a.from.1, a.relation, &a.to.1).cmp(&(&b.from.1, b.relation, &b.to.1))
        });

        Ok(GraphSnapshot {
            nodes,
            edges,
            total_nodes: total.max(0) as usize,
        })
    }

    // ── Counts ───────────────────────────────────────────────────

    /// Count nodes with a given label.
    pub async fn count_nodes(&self, kind: EntityKind) -> Result<usize, GraphError> {
        let cypher = format!("MATCH (n:{label}) RETURN count(n) AS cnt", label = kind.label());
        self.count(query(&cypher)).await
    }

    /// Count relationships of a given type.
    pub async fn count_relationships(&self, relation: RelationType) -> Result<usize, GraphError> {
        let cypher = format!(
            "MATCH ()-[r:{rel}]->() RETURN count(r) AS cnt",
            rel = relation.as_cypher()
        );
        self.count(query(&cypher)).await
    }

    pub async fn graph_counts(&self) -> Result<GraphCounts, GraphError> {
        Ok(GraphCounts {
            people: self.count_nodes(EntityKind::Person).await?,
            skills: self.count_nodes(EntityKind::Skill).await?,
            projects: self.count_nodes(EntityKind::Project).await?,
            hard_skill_links: self.count_relationships(RelationType::HasHardSkill).await?,
            soft_skill_links: self.count_relationships(RelationType::HasSoftSkill).await?,
            project_assignments: self.count_relationships(RelationType::WorksOn).await?,
            technology_links: self.count_relationships(RelationType::UsesTech).await?,
        })
    }

    async fn count(&self, q: Query) -> Result<usize, GraphError> {
        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0).max(0) as usize),
            None => Ok(0),
        }
    }
}

async fn txn_rows(txn: &mut Txn, q: Query) -> Result<Vec<Row>, GraphError> {
    let mut stream = txn.execute(q).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

fn decode_err(column: &str, e: impl std::fmt::Display) -> GraphError {
    GraphError::Serialization(format!("Failed to read column {column}: {e}"))
}

fn entity_kind(label: &str) -> Result<EntityKind, GraphError> {
    EntityKind::from_label(label)
        .ok_or_else(|| GraphError::Serialization(format!("Unknown node label: {label}")))
}

fn row_to_record(row: &Row) -> Result<RawRecord, GraphError> {
    let kind: String = row.get("kind").map_err(|e| decode_err("kind", e))?;
    Ok(RawRecord {
        kind: entity_kind(&kind)?,
        key: row.get("key").map_err(|e| decode_err("key", e))?,
        name: row.get("name").map_err(|e| decode_err("name", e))?,
        description: row
            .get::<Option<String>>("description")
            .map_err(|e| decode_err("description", e))?
            .filter(|d| !d.is_empty()),
        matched: row.get("matched").map_err(|e| decode_err("matched", e))?,
        skills: row.get("skills").map_err(|e| decode_err("skills", e))?,
        assignments: row
            .get::<Vec<Assignment>>("assignments")
            .map_err(|e| decode_err("assignments", e))?,
    })
}

fn row_to_snapshot_node(row: &Row) -> Result<SnapshotNode, GraphError> {
    let label: String = row.get("label").map_err(|e| decode_err("label", e))?;
    Ok(SnapshotNode {
        kind: entity_kind(&label)?,
        key: row.get("key").map_err(|e| decode_err("key", e))?,
        name: row.get("name").map_err(|e| decode_err("name", e))?,
        description: row.get::<Option<String>>("description").ok().flatten(),
        category: row.get::<Option<String>>("category").ok().flatten(),
    })
}

fn row_to_snapshot_edge(row: &Row) -> Result<SnapshotEdge, GraphError> {
    let rel_type: String = row.get("rel_type").map_err(|e| decode_err("rel_type", e))?;
    let relation = RelationType::from_cypher(&rel_type).ok_or_else(|| {
        GraphError::Serialization(format!("Unknown relationship type: {rel_type}"))
    })?;
    let (from_kind, to_kind) = relation.endpoints();
    Ok(SnapshotEdge {
        relation,
        from: (from_kind, row.get("from_key").map_err(|e| decode_err("from_key", e))?),
        to: (to_kind, row.get("to_key").map_err(|e| decode_err("to_key", e))?),
        role: row.get::<Option<String>>("role").ok().flatten(),
    })
}
