//! Core domain types for the Skillgraph knowledge graph.
//!
//! Two families live here: the graph vocabulary (entity kinds, relation
//! types, normalized keys) and the two validated payloads produced from
//! language-model output (extraction results and query intents).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_key;

// ── Graph Vocabulary ──────────────────────────────────────────────

/// The three node kinds stored in the graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Person,
    Skill,
    Project,
}

impl EntityKind {
    /// The Neo4j label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Skill => "Skill",
            Self::Project => "Project",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Person" => Some(Self::Person),
            "Skill" => Some(Self::Skill),
            "Project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The four directed relationship types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    HasHardSkill,
    HasSoftSkill,
    WorksOn,
    UsesTech,
}

impl RelationType {
    /// The Cypher relationship type string.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            Self::HasHardSkill => "HAS_HARD_SKILL",
            Self::HasSoftSkill => "HAS_SOFT_SKILL",
            Self::WorksOn => "WORKS_ON",
            Self::UsesTech => "USES_TECH",
        }
    }

    pub fn from_cypher(s: &str) -> Option<Self> {
        match s {
            "HAS_HARD_SKILL" => Some(Self::HasHardSkill),
            "HAS_SOFT_SKILL" => Some(Self::HasSoftSkill),
            "WORKS_ON" => Some(Self::WorksOn),
            "USES_TECH" => Some(Self::UsesTech),
            _ => None,
        }
    }

    /// Human-readable link label, e.g. "has hard skill".
    pub fn display_label(&self) -> String {
        self.as_cypher().to_lowercase().replace('_', " ")
    }

    /// Endpoint kinds as (source, target).
    pub fn endpoints(&self) -> (EntityKind, EntityKind) {
        match self {
            Self::HasHardSkill | Self::HasSoftSkill => (EntityKind::Person, EntityKind::Skill),
            Self::WorksOn => (EntityKind::Person, EntityKind::Project),
            Self::UsesTech => (EntityKind::Project, EntityKind::Skill),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cypher())
    }
}

/// Hard (technical) or soft (interpersonal) skill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Hard,
    Soft,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    pub fn relation(&self) -> RelationType {
        match self {
            Self::Hard => RelationType::HasHardSkill,
            Self::Soft => RelationType::HasSoftSkill,
        }
    }
}

/// Canonical identity of a node: its normalized name.
///
/// Constructed only through [`NodeKey::new`], so two keys compare equal
/// exactly when their source names fold to the same string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(name: &str) -> Self {
        Self(normalize_key(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Extraction Result ─────────────────────────────────────────────

/// A validated extraction batch for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub people: Vec<PersonRecord>,
    pub projects: Vec<ProjectRecord>,
}

/// A person mentioned in a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonRecord {
    pub name: String,
    pub hard_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub projects: Vec<ProjectAssignment>,
}

/// A person's role on a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProjectAssignment {
    pub project: String,
    pub role: String,
}

/// A project mentioned in a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    pub name: String,
    pub description: Option<String>,
    pub technologies: Vec<String>,
}

impl ExtractionResult {
    /// Number of distinct projects, counting those only referenced by assignments.
    pub fn project_count(&self) -> usize {
        let mut keys: Vec<NodeKey> = self
            .projects
            .iter()
            .map(|p| NodeKey::new(&p.name))
            .chain(
                self.people
                    .iter()
                    .flat_map(|p| p.projects.iter().map(|a| NodeKey::new(&a.project))),
            )
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    /// Number of person → project assignments.
    pub fn relationship_count(&self) -> usize {
        self.people.iter().map(|p| p.projects.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.projects.is_empty()
    }
}

// ── Intent ────────────────────────────────────────────────────────

/// Classified intent of a natural-language query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentKind {
    FindPersonBySkill,
    FindProjectByTechnology,
    FindCollaborators,
    FindPersonByRole,
    FindPersonDetails,
    /// Generic keyword search, used for unrecognized or missing labels.
    GenericFallback {
        /// The label the model returned, if any.
        unrecognized: Option<String>,
    },
}

impl IntentKind {
    /// Resolve a model-supplied label. Returns `None` for unknown labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let folded: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match folded.as_str() {
            "find_person_by_skill" | "skill_search" => Some(Self::FindPersonBySkill),
            "find_project_by_technology" | "project_search" => {
                Some(Self::FindProjectByTechnology)
            }
            "find_collaborators" | "find_collaborators_of_person" | "collaborator_search" => {
                Some(Self::FindCollaborators)
            }
            "find_person_by_role" | "find_person_by_role_or_keyword" | "role_search" => {
                Some(Self::FindPersonByRole)
            }
            "find_person_details" | "person_details" => Some(Self::FindPersonDetails),
            "keyword_search" | "generic_keyword_search" => {
                Some(Self::GenericFallback { unrecognized: None })
            }
            _ => None,
        }
    }

    /// Stable label reported back to API callers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FindPersonBySkill => "find_person_by_skill",
            Self::FindProjectByTechnology => "find_project_by_technology",
            Self::FindCollaborators => "find_collaborators",
            Self::FindPersonByRole => "find_person_by_role",
            Self::FindPersonDetails => "find_person_details",
            Self::GenericFallback { .. } => "keyword_search",
        }
    }
}

/// A validated intent: a kind plus the parameters the model extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    pub skills: Vec<String>,
    pub keywords: Vec<String>,
    pub target_person: Option<String>,
    pub match_all: bool,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            skills: Vec::new(),
            keywords: Vec::new(),
            target_person: None,
            match_all: false,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target(mut self, person: impl Into<String>) -> Self {
        self.target_person = Some(person.into());
        self
    }

    pub fn match_all(mut self, match_all: bool) -> Self {
        self.match_all = match_all;
        self
    }
}
