//! Idempotent ingestion of one extraction batch.
//!
//! [`plan_merges`] turns an extraction result into an ordered, deduplicated
//! list of merge operations; [`UpsertEngine::upsert`] applies that list as a
//! single atomic batch and tallies what was inserted versus what existed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use skillgraph_core::{EntityKind, ExtractionResult, NodeKey, RelationType, SkillCategory};

use crate::client::GraphError;
use crate::store::{GraphStore, MergeOp, MergeOutcome};

/// Inserted-versus-existing counts for one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertStats {
    pub people_inserted: usize,
    pub people_merged: usize,
    pub projects_inserted: usize,
    pub projects_merged: usize,
    pub skills_inserted: usize,
    pub skills_merged: usize,
    /// New person → skill links (hard or soft).
    pub skills_linked: usize,
    pub skill_links_existing: usize,
    /// New project → technology links.
    pub technologies_linked: usize,
    pub technology_links_existing: usize,
    /// New person → project assignments.
    pub relationships_created: usize,
    pub relationships_updated: usize,
}

impl UpsertStats {
    fn record(&mut self, op: &MergeOp, outcome: MergeOutcome) {
        let inserted = outcome == MergeOutcome::Inserted;
        let (new, existing) = match op {
            MergeOp::Person { .. } => (&mut self.people_inserted, &mut self.people_merged),
            MergeOp::Project { .. } => (&mut self.projects_inserted, &mut self.projects_merged),
            MergeOp::Skill { .. } => (&mut self.skills_inserted, &mut self.skills_merged),
            MergeOp::Relation { relation, .. } => match relation {
                RelationType::HasHardSkill | RelationType::HasSoftSkill => {
                    (&mut self.skills_linked, &mut self.skill_links_existing)
                }
                RelationType::UsesTech => (
                    &mut self.technologies_linked,
                    &mut self.technology_links_existing,
                ),
                RelationType::WorksOn => (
                    &mut self.relationships_created,
                    &mut self.relationships_updated,
                ),
            },
        };
        if inserted {
            *new += 1;
        } else {
            *existing += 1;
        }
    }

    pub fn inserted_total(&self) -> usize {
        self.people_inserted
            + self.projects_inserted
            + self.skills_inserted
            + self.skills_linked
            + self.technologies_linked
            + self.relationships_created
    }
}

/// Accumulates ops, emitting each node and edge once.
#[derive(Default)]
struct Planner {
    ops: Vec<MergeOp>,
    nodes: HashSet<(EntityKind, NodeKey)>,
    edges: HashMap<(RelationType, NodeKey, NodeKey), usize>,
    descriptions: HashMap<NodeKey, String>,
}

impl Planner {
    fn person(&mut self, name: &str) -> NodeKey {
        let key = NodeKey::new(name);
        if self.nodes.insert((EntityKind::Person, key.clone())) {
            self.ops.push(MergeOp::Person {
                key: key.clone(),
                name: name.to_string(),
            });
        }
        key
    }

    fn skill(&mut self, name: &str, category: SkillCategory) -> NodeKey {
        let key = NodeKey::new(name);
        if self.nodes.insert((EntityKind::Skill, key.clone())) {
            self.ops.push(MergeOp::Skill {
                key: key.clone(),
                name: name.to_string(),
                category,
            });
        }
        key
    }

    fn project(&mut self, name: &str) -> NodeKey {
        let key = NodeKey::new(name);
        if self.nodes.insert((EntityKind::Project, key.clone())) {
            self.ops.push(MergeOp::Project {
                key: key.clone(),
                name: name.to_string(),
                description: self.descriptions.get(&key).cloned(),
            });
        }
        key
    }

    /// A repeated edge keeps its first position; a later role replaces the earlier one.
    fn relation(&mut self, relation: RelationType, from: NodeKey, to: NodeKey, role: Option<String>) {
        let edge = (relation, from.clone(), to.clone());
        if let Some(&index) = self.edges.get(&edge) {
            if let MergeOp::Relation { role: existing, .. } = &mut self.ops[index] {
                *existing = role;
            }
            return;
        }
        self.edges.insert(edge, self.ops.len());
        self.ops.push(MergeOp::Relation {
            relation,
            from,
            to,
            role,
        });
    }
}

/// The ordered merge list for one extraction batch.
///
/// Nodes precede the edges that reference them, each node and edge appears
/// once, and a project's description is the last non-empty one given for it
/// anywhere in the batch.
pub fn plan_merges(extraction: &ExtractionResult) -> Vec<MergeOp> {
    let mut planner = Planner::default();

    for project in &extraction.projects {
        if let Some(description) = project.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                planner
                    .descriptions
                    .insert(NodeKey::new(&project.name), description.to_string());
            }
        }
    }

    for person in &extraction.people {
        let person_key = planner.person(&person.name);

        for (skills, category) in [
            (&person.hard_skills, SkillCategory::Hard),
            (&person.soft_skills, SkillCategory::Soft),
        ] {
            for skill in skills {
                let skill_key = planner.skill(skill, category);
                planner.relation(category.relation(), person_key.clone(), skill_key, None);
            }
        }

        for assignment in &person.projects {
            let project_key = planner.project(&assignment.project);
            planner.relation(
                RelationType::WorksOn,
                person_key.clone(),
                project_key,
                Some(assignment.role.clone()),
            );
        }
    }

    for project in &extraction.projects {
        let project_key = planner.project(&project.name);
        for tech in &project.technologies {
            let skill_key = planner.skill(tech, SkillCategory::Hard);
            planner.relation(RelationType::UsesTech, project_key.clone(), skill_key, None);
        }
    }

    planner.ops
}

/// The only write path into the graph.
#[derive(Clone)]
pub struct UpsertEngine {
    store: Arc<dyn GraphStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Merge one extraction batch atomically.
    ///
    /// Storage failures are returned as-is; retrying is the caller's call.
    pub async fn upsert(&self, extraction: &ExtractionResult) -> Result<UpsertStats, GraphError> {
        let ops = plan_merges(extraction);
        if ops.is_empty() {
            return Ok(UpsertStats::default());
        }

        let outcomes = self.store.apply_merges(&ops).await?;
        if outcomes.len() != ops.len() {
            return Err(GraphError::Serialization(format!(
                "store returned {} outcomes for {} merges",
                outcomes.len(),
                ops.len()
            )));
        }

        let mut stats = UpsertStats::default();
        for (op, outcome) in ops.iter().zip(outcomes) {
            stats.record(op, outcome);
        }

        tracing::info!(
            merges = ops.len(),
            people_inserted = stats.people_inserted,
            projects_inserted = stats.projects_inserted,
            skills_linked = stats.skills_linked,
            relationships_created = stats.relationships_created,
            "Extraction batch committed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{PersonRecord, ProjectAssignment, ProjectRecord};

    fn person(name: &str, hard: &[&str], soft: &[&str], projects: &[(&str, &str)]) -> PersonRecord {
        PersonRecord {
            name: name.to_string(),
            hard_skills: hard.iter().map(|s| s.to_string()).collect(),
            soft_skills: soft.iter().map(|s| s.to_string()).collect(),
            projects: projects
                .iter()
                .map(|(p, r)| ProjectAssignment {
                    project: p.to_string(),
                    role: r.to_string(),
                })
                .collect(),
        }
    }

    fn project(name: &str, description: Option<&str>, tech: &[&str]) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            description: description.map(str::to_string),
            technologies: tech.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn count(ops: &[MergeOp], pred: impl Fn(&MergeOp) -> bool) -> usize {
        ops.iter().filter(|op| pred(op)).count()
    }

    #[test]
    fn nodes_precede_their_edges() {
        let extraction = ExtractionResult {
            people: vec![person("Sarah Chen", &["React"], &["leadership"], &[("API Migration", "Lead")])],
            projects: vec![project("API Migration", Some("Move to REST"), &["Go"])],
        };
        let ops = plan_merges(&extraction);

        let mut seen = HashSet::new();
        for op in &ops {
            match op {
                MergeOp::Person { key, .. } => {
                    seen.insert((EntityKind::Person, key.clone()));
                }
                MergeOp::Skill { key, .. } => {
                    seen.insert((EntityKind::Skill, key.clone()));
                }
                MergeOp::Project { key, .. } => {
                    seen.insert((EntityKind::Project, key.clone()));
                }
                MergeOp::Relation { relation, from, to, .. } => {
                    let (from_kind, to_kind) = relation.endpoints();
                    assert!(seen.contains(&(from_kind, from.clone())));
                    assert!(seen.contains(&(to_kind, to.clone())));
                }
            }
        }
        assert_eq!(ops.len(), 9);
    }

    #[test]
    fn duplicates_collapse_by_key() {
        let extraction = ExtractionResult {
            people: vec![
                person("Sarah Chen", &["React", "react"], &[], &[("API Migration", "Lead")]),
                person("sarah  chen", &["React"], &[], &[("api migration", "Architect")]),
            ],
            projects: vec![],
        };
        let ops = plan_merges(&extraction);

        assert_eq!(count(&ops, |op| matches!(op, MergeOp::Person { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, MergeOp::Skill { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, MergeOp::Project { .. })), 1);

        let works_on: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                MergeOp::Relation {
                    relation: RelationType::WorksOn,
                    role,
                    ..
                } => role.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(works_on, vec!["Architect".to_string()]);
    }

    #[test]
    fn description_reaches_assignment_only_projects() {
        let extraction = ExtractionResult {
            people: vec![person("Ada", &[], &[], &[("Atlas", "Dev")])],
            projects: vec![
                project("Atlas", Some("first"), &[]),
                project("atlas", Some("  "), &[]),
                project("ATLAS", Some("second"), &[]),
            ],
        };
        let ops = plan_merges(&extraction);
        let descriptions: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                MergeOp::Project { description, .. } => Some(description.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(descriptions, vec![Some("second".to_string())]);
    }

    #[test]
    fn same_skill_hard_and_soft_yields_two_edges() {
        let extraction = ExtractionResult {
            people: vec![person("Ada", &["communication"], &["communication"], &[])],
            projects: vec![],
        };
        let ops = plan_merges(&extraction);
        assert_eq!(count(&ops, |op| matches!(op, MergeOp::Skill { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, MergeOp::Relation { .. })), 2);
    }

    #[test]
    fn stats_split_by_outcome() {
        let mut stats = UpsertStats::default();
        let person = MergeOp::Person {
            key: NodeKey::new("Ada"),
            name: "Ada".to_string(),
        };
        let link = MergeOp::Relation {
            relation: RelationType::HasSoftSkill,
            from: NodeKey::new("Ada"),
            to: NodeKey::new("mentoring"),
            role: None,
        };
        stats.record(&person, MergeOutcome::Merged);
        stats.record(&link, MergeOutcome::Inserted);
        assert_eq!(stats.people_merged, 1);
        assert_eq!(stats.people_inserted, 0);
        assert_eq!(stats.skills_linked, 1);
        assert_eq!(stats.inserted_total(), 1);
    }
}
