//! An in-process [`GraphStore`] with the same merge and template semantics
//! as the Neo4j backend.
//!
//! Batches are applied to a copy of the state and swapped in under the write
//! lock, so readers see either the whole batch or none of it.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use skillgraph_core::{EntityKind, NodeKey, RelationType, SkillCategory};

use crate::client::GraphError;
use crate::store::{
    Assignment, GraphCounts, GraphSnapshot, GraphStore, MergeOp, MergeOutcome, RawRecord,
    SnapshotEdge, SnapshotNode,
};
use crate::templates::{BoundQuery, QueryTemplate};

#[derive(Debug, Clone)]
struct StoredNode {
    name: String,
    description: Option<String>,
    category: Option<SkillCategory>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    role: Option<String>,
}

type EdgeKey = (RelationType, NodeKey, NodeKey);

const SKILL_LINKS: &[RelationType] = &[RelationType::HasHardSkill, RelationType::HasSoftSkill];
const WORKS_ON: &[RelationType] = &[RelationType::WorksOn];
const USES_TECH: &[RelationType] = &[RelationType::UsesTech];
const PERSON_LINKS: &[RelationType] = &[
    RelationType::HasHardSkill,
    RelationType::HasSoftSkill,
    RelationType::WorksOn,
];

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: BTreeMap<(EntityKind, NodeKey), StoredNode>,
    edges: BTreeMap<EdgeKey, StoredEdge>,
    next_seq: u64,
}

impl GraphState {
    fn merge_node(
        &mut self,
        kind: EntityKind,
        key: &NodeKey,
        name: &str,
        update: impl FnOnce(&mut StoredNode, bool),
    ) -> MergeOutcome {
        let seq = self.next_seq;
        let mut created = false;
        let node = self.nodes.entry((kind, key.clone())).or_insert_with(|| {
            created = true;
            StoredNode {
                name: name.to_string(),
                description: None,
                category: None,
                seq,
            }
        });
        node.name = name.to_string();
        update(node, created);

        if created {
            self.next_seq += 1;
            MergeOutcome::Inserted
        } else {
            MergeOutcome::Merged
        }
    }

    fn apply(&mut self, op: &MergeOp) -> Result<MergeOutcome, GraphError> {
        let outcome = match op {
            MergeOp::Person { key, name } => self.merge_node(EntityKind::Person, key, name, |_, _| {}),
            MergeOp::Skill {
                key,
                name,
                category,
            } => self.merge_node(EntityKind::Skill, key, name, |node, created| {
                if created {
                    node.category = Some(*category);
                }
            }),
            MergeOp::Project {
                key,
                name,
                description,
            } => self.merge_node(EntityKind::Project, key, name, |node, _| {
                if let Some(description) = description.as_deref().filter(|d| !d.trim().is_empty()) {
                    node.description = Some(description.to_string());
                }
            }),
            MergeOp::Relation {
                relation,
                from,
                to,
                role,
            } => {
                let (from_kind, to_kind) = relation.endpoints();
                if !self.nodes.contains_key(&(from_kind, from.clone()))
                    || !self.nodes.contains_key(&(to_kind, to.clone()))
                {
                    return Err(GraphError::MissingEndpoint {
                        relation: relation.as_cypher().to_string(),
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }

                let role = match relation {
                    RelationType::WorksOn => Some(role.clone().unwrap_or_default()),
                    _ => None,
                };
                match self.edges.get_mut(&(*relation, from.clone(), to.clone())) {
                    Some(edge) => {
                        edge.role = role;
                        MergeOutcome::Merged
                    }
                    None => {
                        self.edges
                            .insert((*relation, from.clone(), to.clone()), StoredEdge { role });
                        MergeOutcome::Inserted
                    }
                }
            }
        };
        Ok(outcome)
    }

    fn node(&self, kind: EntityKind, key: &NodeKey) -> Option<&StoredNode> {
        self.nodes.get(&(kind, key.clone()))
    }

    fn name_of(&self, kind: EntityKind, key: &NodeKey) -> String {
        self.node(kind, key)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    fn outgoing<'a>(
        &'a self,
        relations: &'static [RelationType],
        from: &'a NodeKey,
    ) -> impl Iterator<Item = (&'a EdgeKey, &'a StoredEdge)> + 'a {
        self.edges
            .iter()
            .filter(move |((rel, f, _), _)| f == from && relations.contains(rel))
    }

    fn person_record(&self, key: &NodeKey, matched: Vec<String>) -> RawRecord {
        let person_name = self.name_of(EntityKind::Person, key);
        let skills = self
            .outgoing(SKILL_LINKS, key)
            .map(|((_, _, skill), _)| self.name_of(EntityKind::Skill, skill))
            .fold(Vec::new(), push_distinct);
        let assignments = self
            .outgoing(WORKS_ON, key)
            .map(|((_, _, project), edge)| Assignment {
                person: person_name.clone(),
                project: self.name_of(EntityKind::Project, project),
                role: edge.role.clone().unwrap_or_default(),
            })
            .collect();

        RawRecord {
            kind: EntityKind::Person,
            key: key.to_string(),
            name: person_name,
            description: None,
            matched,
            skills,
            assignments,
        }
    }

    fn project_record(&self, key: &NodeKey, matched: Vec<String>) -> RawRecord {
        let project = self.node(EntityKind::Project, key);
        let project_name = self.name_of(EntityKind::Project, key);
        let skills = self
            .outgoing(USES_TECH, key)
            .map(|((_, _, tech), _)| self.name_of(EntityKind::Skill, tech))
            .fold(Vec::new(), push_distinct);
        let assignments = self
            .edges
            .iter()
            .filter(|((rel, _, to), _)| *rel == RelationType::WorksOn && to == key)
            .map(|((_, person, _), edge)| Assignment {
                person: self.name_of(EntityKind::Person, person),
                project: project_name.clone(),
                role: edge.role.clone().unwrap_or_default(),
            })
            .collect();

        RawRecord {
            kind: EntityKind::Project,
            key: key.to_string(),
            name: project_name,
            description: project.and_then(|p| p.description.clone()),
            matched,
            skills,
            assignments,
        }
    }

    fn keys(&self, kind: EntityKind) -> impl Iterator<Item = &NodeKey> + '_ {
        self.nodes
            .keys()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, key)| key)
    }

    /// Names of `to` nodes reached from `from` whose keys are in `terms`.
    fn matched_names(
        &self,
        relations: &'static [RelationType],
        from: &NodeKey,
        to_kind: EntityKind,
        terms: &[String],
    ) -> Vec<String> {
        self.outgoing(relations, from)
            .filter(|((_, _, to), _)| terms.iter().any(|t| t == to.as_str()))
            .map(|((_, _, to), _)| self.name_of(to_kind, to))
            .fold(Vec::new(), push_distinct)
    }

    fn run_template(&self, bound: &BoundQuery) -> Vec<RawRecord> {
        let params = &bound.params;
        let terms = &params.terms;

        let mut records: Vec<RawRecord> = match bound.template {
            QueryTemplate::PersonBySkill => self
                .keys(EntityKind::Person)
                .filter_map(|person| {
                    let matched = self.matched_names(SKILL_LINKS, person, EntityKind::Skill, terms);
                    (!matched.is_empty() && matched.len() >= params.required_matches)
                        .then(|| self.person_record(person, matched))
                })
                .collect(),

            QueryTemplate::ProjectByTechnology => self
                .keys(EntityKind::Project)
                .filter_map(|project| {
                    let matched = self.matched_names(USES_TECH, project, EntityKind::Skill, terms);
                    (!matched.is_empty() && matched.len() >= params.required_matches)
                        .then(|| self.project_record(project, matched))
                })
                .collect(),

            QueryTemplate::CollaboratorsOfPerson => {
                let Some(target) = params.target.as_deref().map(NodeKey::new) else {
                    return Vec::new();
                };
                let target_projects: Vec<&NodeKey> = self
                    .outgoing(WORKS_ON, &target)
                    .map(|((_, _, project), _)| project)
                    .collect();
                self.keys(EntityKind::Person)
                    .filter(|person| **person != target)
                    .filter_map(|person| {
                        let shared = self
                            .outgoing(WORKS_ON, person)
                            .filter(|((_, _, project), _)| target_projects.contains(&project))
                            .map(|((_, _, project), _)| self.name_of(EntityKind::Project, project))
                            .fold(Vec::new(), push_distinct);
                        (!shared.is_empty()).then(|| self.person_record(person, shared))
                    })
                    .collect()
            }

            QueryTemplate::PersonDetails => {
                let Some(target) = params.target.as_deref().map(NodeKey::new) else {
                    return Vec::new();
                };
                match self.node(EntityKind::Person, &target) {
                    Some(_) => vec![self.person_record(&target, Vec::new())],
                    None => Vec::new(),
                }
            }

            QueryTemplate::PersonByRole => self
                .keys(EntityKind::Person)
                .filter(|person| {
                    self.outgoing(WORKS_ON, person).any(|(_, edge)| {
                        let role = edge.role.as_deref().unwrap_or_default().to_lowercase();
                        terms.iter().any(|t| role.contains(t.as_str()))
                    })
                })
                .map(|person| self.person_record(person, Vec::new()))
                .collect(),

            QueryTemplate::KeywordSearch => self
                .keys(EntityKind::Person)
                .filter(|person| {
                    let mut fields = vec![person.to_string()];
                    for ((rel, _, to), edge) in self.outgoing(PERSON_LINKS, person) {
                        fields.push(to.to_string());
                        if *rel == RelationType::WorksOn {
                            let role = edge.role.as_deref().unwrap_or_default().to_lowercase();
                            if !role.is_empty() {
                                fields.push(role);
                            }
                        }
                    }
                    terms
                        .iter()
                        .any(|t| fields.iter().any(|f| f.contains(t.as_str())))
                })
                .map(|person| self.person_record(person, Vec::new()))
                .collect(),
        };

        let score = |record: &RawRecord| match bound.template {
            QueryTemplate::PersonByRole | QueryTemplate::KeywordSearch => {
                record.matching_fields(terms)
            }
            _ => record.matched.len(),
        };
        records.sort_by_cached_key(|record| (Reverse(score(record)), record.key.clone()));
        records.truncate(params.limit);
        records
    }
}

fn push_distinct(mut acc: Vec<String>, item: String) -> Vec<String> {
    if !acc.contains(&item) {
        acc.push(item);
    }
    acc
}

/// In-process graph store.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
    unavailable: AtomicBool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GraphError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GraphError::Connection(
                "in-memory graph marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn apply_merges(&self, ops: &[MergeOp]) -> Result<Vec<MergeOutcome>, GraphError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        let mut next = state.clone();
        let outcomes = ops
            .iter()
            .map(|op| next.apply(op))
            .collect::<Result<Vec<_>, _>>()?;
        *state = next;
        Ok(outcomes)
    }

    async fn fetch_records(&self, query: &BoundQuery) -> Result<Vec<RawRecord>, GraphError> {
        self.check_available()?;
        Ok(self.state.read().await.run_template(query))
    }

    async fn snapshot(&self, node_limit: usize) -> Result<GraphSnapshot, GraphError> {
        self.check_available()?;
        let state = self.state.read().await;

        let mut ordered: Vec<(&(EntityKind, NodeKey), &StoredNode)> = state.nodes.iter().collect();
        ordered.sort_by_key(|(_, node)| node.seq);

        let nodes: Vec<SnapshotNode> = ordered
            .into_iter()
            .take(node_limit)
            .map(|((kind, key), node)| SnapshotNode {
                kind: *kind,
                key: key.to_string(),
                name: node.name.clone(),
                description: node.description.clone(),
                category: node.category.map(|c| c.as_str().to_string()),
            })
            .collect();

        let selected = |kind: EntityKind, key: &NodeKey| {
            nodes
                .iter()
                .any(|n| n.kind == kind && n.key == key.as_str())
        };
        let mut edges: Vec<SnapshotEdge> = state
            .edges
            .iter()
            .filter(|((rel, from, to), _)| {
                let (from_kind, to_kind) = rel.endpoints();
                selected(from_kind, from) && selected(to_kind, to)
            })
            .map(|((rel, from, to), edge)| {
                let (from_kind, to_kind) = rel.endpoints();
                SnapshotEdge {
                    relation: *rel,
                    from: (from_kind, from.to_string()),
                    to: (to_kind, to.to_string()),
                    role: edge.role.clone(),
                }
            })
            .collect();
        edges.sort_by(|a, b| {
            (&a.from.1, a.relation, &a.to.1).cmp(&(&b.from.1, b.relation, &b.to.1))
        });

        Ok(GraphSnapshot {
            nodes,
            edges,
            total_nodes: state.nodes.len(),
        })
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        self.check_available()?;
        let state = self.state.read().await;

        let nodes = |kind: EntityKind| state.nodes.keys().filter(|(k, _)| *k == kind).count();
        let edges = |relation: RelationType| {
            state
                .edges
                .keys()
                .filter(|(rel, _, _)| *rel == relation)
                .count()
        };

        Ok(GraphCounts {
            people: nodes(EntityKind::Person),
            skills: nodes(EntityKind::Skill),
            projects: nodes(EntityKind::Project),
            hard_skill_links: edges(RelationType::HasHardSkill),
            soft_skill_links: edges(RelationType::HasSoftSkill),
            project_assignments: edges(RelationType::WorksOn),
            technology_links: edges(RelationType::UsesTech),
        })
    }
}
