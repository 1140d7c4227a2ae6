//! Search-facing response shapes.

use serde::Serialize;

/// A person's role on one project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProjectRole {
    pub project: String,
    pub role: String,
}

/// A person working on a project, and their role there.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TeamMember {
    pub person: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonHit {
    pub name: String,
    pub skills: Vec<String>,
    pub projects: Vec<ProjectRole>,
    pub roles: Vec<String>,
    /// Skills or shared projects that satisfied the query.
    pub matched: Vec<String>,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectHit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub team: Vec<TeamMember>,
    pub matched: Vec<String>,
    pub match_count: usize,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SearchHit {
    Person(PersonHit),
    Project(ProjectHit),
}

impl SearchHit {
    pub fn name(&self) -> &str {
        match self {
            Self::Person(hit) => &hit.name,
            Self::Project(hit) => &hit.name,
        }
    }

    pub fn match_count(&self) -> usize {
        match self {
            Self::Person(hit) => hit.match_count,
            Self::Project(hit) => hit.match_count,
        }
    }

    pub fn as_person(&self) -> Option<&PersonHit> {
        match self {
            Self::Person(hit) => Some(hit),
            Self::Project(_) => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectHit> {
        match self {
            Self::Project(hit) => Some(hit),
            Self::Person(_) => None,
        }
    }
}

/// The answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    /// Intent label, `keyword_search` for the fallback.
    pub intent: String,
    /// The label the model gave when it was not recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrecognized_intent: Option<String>,
    pub results: Vec<SearchHit>,
    pub result_count: usize,
    pub explanation: String,
    /// Literal query text that was executed, empty when nothing ran.
    pub query: String,
}
