//! Write operations for the knowledge graph.
//!
//! All mutations use MERGE on the node's normalized `key`, so re-ingesting a
//! name never creates a second node. Whether an op created its element is
//! read from a marker set by `ON CREATE` and removed in the same statement,
//! so the answer comes from the MERGE that holds the lock rather than from
//! an earlier read. Of two batches racing to create the same key, only one
//! reports it as inserted.
//!
//! Only `first_seen` is timestamped. Re-applying a batch with the same
//! content leaves every stored property unchanged.

use chrono::{SecondsFormat, Utc};
use neo4rs::{query, Query, Txn};

use skillgraph_core::RelationType;

use crate::client::{GraphClient, GraphError};
use crate::store::{MergeOp, MergeOutcome};

impl GraphClient {
    /// Apply a merge batch in one transaction; any failure rolls the whole batch back.
    pub async fn merge_batch(&self, ops: &[MergeOp]) -> Result<Vec<MergeOutcome>, GraphError> {
        let now = timestamp();
        let mut txn = self.start_txn().await?;
        let mut outcomes = Vec::with_capacity(ops.len());

        for op in ops {
            match merge_one(&mut txn, op, &now).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    if let Err(rollback) = txn.rollback().await {
                        tracing::warn!(error = %rollback, "Rollback after failed merge also failed");
                    }
                    return Err(e);
                }
            }
        }

        txn.commit().await?;
        tracing::debug!(merges = ops.len(), "Merge batch committed");
        Ok(outcomes)
    }
}

/// Fixed-width UTC timestamp so stored values sort chronologically as strings.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

async fn merge_one(txn: &mut Txn, op: &MergeOp, now: &str) -> Result<MergeOutcome, GraphError> {
    let q = merge_query(op, now);
    let mut stream = txn.execute(q).await?;

    let mut created = None;
    while let Some(row) = stream.next(txn.handle()).await? {
        if created.is_none() {
            created = Some(row.get::<bool>("created").map_err(|e| {
                GraphError::Serialization(format!("Failed to read merge outcome: {e}"))
            })?);
        }
    }

    match created {
        Some(true) => Ok(MergeOutcome::Inserted),
        Some(false) => Ok(MergeOutcome::Merged),
        // MATCH on an endpoint produced no row.
        None => {
            let MergeOp::Relation { relation, from, to, .. } = op else {
                return Err(GraphError::Serialization(
                    "node merge returned no row".to_string(),
                ));
            };
            Err(GraphError::MissingEndpoint {
                relation: relation.as_cypher().to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

/// Run after the MERGE. Reads and clears the create marker.
const REPORT_CREATED: &str = "
WITH n, coalesce(n.pending_create, false) AS created
REMOVE n.pending_create
RETURN created";

fn merge_cypher(op: &MergeOp) -> String {
    match op {
        MergeOp::Person { .. } => format!(
            "MERGE (n:Person {{key: $key}})
ON CREATE SET n.first_seen = $now, n.pending_create = true
SET n.name = $name{REPORT_CREATED}"
        ),

        MergeOp::Skill { .. } => format!(
            "MERGE (n:Skill {{key: $key}})
ON CREATE SET n.first_seen = $now, n.category = $category, n.pending_create = true
SET n.name = $name{REPORT_CREATED}"
        ),

        MergeOp::Project { .. } => format!(
            "MERGE (n:Project {{key: $key}})
ON CREATE SET n.first_seen = $now, n.pending_create = true
SET n.name = $name,
    n.description = CASE WHEN $description = '' THEN n.description
                         ELSE $description END{REPORT_CREATED}"
        ),

        MergeOp::Relation { relation, .. } => {
            let (from_kind, to_kind) = relation.endpoints();
            let rel = relation.as_cypher();
            let role_clause = match relation {
                RelationType::WorksOn => "\nSET n.role = $role",
                _ => "",
            };
            format!(
                "MATCH (a:{from_label} {{key: $from}})
MATCH (b:{to_label} {{key: $to}})
MERGE (a)-[n:{rel}]->(b)
ON CREATE SET n.first_seen = $now, n.pending_create = true{role_clause}{REPORT_CREATED}",
                from_label = from_kind.label(),
                to_label = to_kind.label(),
            )
        }
    }
}

fn merge_query(op: &MergeOp, now: &str) -> Query {
    let q = query(&merge_cypher(op)).param("now", now.to_string());
    match op {
        MergeOp::Person { key, name } => q
            .param("key", key.to_string())
            .param("name", name.clone()),

        MergeOp::Skill {
            key,
            name,
            category,
        } => q
            .param("key", key.to_string())
            .param("name", name.clone())
            .param("category", category.as_str().to_string()),

        MergeOp::Project {
            key,
            name,
            description,
        } => q
            .param("key", key.to_string())
            .param("name", name.clone())
            .param("description", description.clone().unwrap_or_default()),

        MergeOp::Relation { from, to, role, .. } => q
            .param("from", from.to_string())
            .param("to", to.to_string())
            .param("role", role.clone().unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{NodeKey, SkillCategory};

    #[test]
    fn timestamps_are_fixed_width() {
        let a = timestamp();
        let b = timestamp();
        assert_eq!(a.len(), b.len());
        assert!(a.ends_with('Z'));
        assert!(a <= b);
    }

    fn all_ops() -> Vec<MergeOp> {
        let key = NodeKey::new("Atlas");
        let mut ops = vec![
            MergeOp::Person {
                key: key.clone(),
                name: "Atlas".to_string(),
            },
            MergeOp::Skill {
                key: key.clone(),
                name: "Atlas".to_string(),
                category: SkillCategory::Hard,
            },
            MergeOp::Project {
                key: key.clone(),
                name: "Atlas".to_string(),
                description: None,
            },
        ];
        let relations = [
            RelationType::HasHardSkill,
            RelationType::HasSoftSkill,
            RelationType::WorksOn,
            RelationType::UsesTech,
        ];
        ops.extend(relations.into_iter().map(|relation| MergeOp::Relation {
            relation,
            from: key.clone(),
            to: key.clone(),
            role: None,
        }));
        ops
    }

    #[test]
    fn created_is_decided_by_the_merge() {
        for op in all_ops() {
            let cypher = merge_cypher(&op);
            let merge = cypher.find("MERGE").unwrap();
            let marker = cypher.find("ON CREATE SET").unwrap();
            assert!(merge < marker, "{cypher}");
            assert!(cypher.contains("pending_create = true"), "{cypher}");
            assert!(cypher.contains("REMOVE n.pending_create"), "{cypher}");
            assert!(!cypher.contains("OPTIONAL MATCH"), "{cypher}");
        }
    }

    #[test]
    fn remerge_only_writes_content() {
        for op in all_ops() {
            let cypher = merge_cypher(&op);
            assert!(!cypher.contains("last_seen"), "{cypher}");
            let on_create = cypher.find("ON CREATE SET").unwrap();
            let first_seen = cypher.find("first_seen").unwrap();
            assert!(first_seen > on_create, "{cypher}");
            assert_eq!(cypher.matches("first_seen").count(), 1, "{cypher}");
        }
    }
}
