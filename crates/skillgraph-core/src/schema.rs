//! Schema validation for language-model output.
//!
//! The model is asked for a single JSON object but may wrap it in prose or
//! Markdown code fences. Validation locates the object, checks it against
//! one of the two fixed shapes (extraction result or intent), and returns
//! typed values. Structurally wrong kinds (a skill list delivered as a
//! string, a name delivered as a number) are rejected; absent optional
//! fields and explicit `null`s become empty lists.
//!
//! Everything in this module is pure.

use serde::{Deserialize, Deserializer};

use crate::error::SchemaError;
use crate::types::{
    ExtractionResult, Intent, IntentKind, NodeKey, PersonRecord, ProjectAssignment, ProjectRecord,
};

// ── JSON Location ────────────────────────────────────────────────

/// Locate the first complete JSON object inside `raw`.
///
/// Code fences are stripped first. Each `{` is matched against its closing
/// brace, skipping braces inside string literals; a balanced span that is
/// not valid JSON (prose such as `{people, projects}`) is skipped and the
/// search resumes after it.
pub fn extract_json_object(raw: &str) -> Result<&str, SchemaError> {
    locate_object(raw).map(|(span, _)| span)
}

fn locate_object(
    raw: &str,
) -> Result<(&str, serde_json::Map<String, serde_json::Value>), SchemaError> {
    let body = strip_code_fence(raw);
    let mut cursor = 0;
    let mut first_error: Option<SchemaError> = None;

    while let Some(found) = body[cursor..].find('{') {
        let start = cursor + found;
        let Some(span) = balanced_span(&body[start..]) else {
            break;
        };
        match serde_json::from_str::<serde_json::Value>(span) {
            Ok(serde_json::Value::Object(map)) => return Ok((span, map)),
            Ok(_) => {}
            Err(e) => {
                first_error
                    .get_or_insert_with(|| SchemaError::malformed(format!("invalid JSON: {e}"), raw));
            }
        }
        cursor = start + span.len();
    }

    Err(first_error.unwrap_or_else(|| {
        if body.contains('{') {
            SchemaError::malformed("unterminated JSON object", raw)
        } else {
            SchemaError::malformed("no JSON object found", raw)
        }
    }))
}

/// The text from the leading `{` of `text` through its matching `}`.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Return the contents of the first fenced block, or `raw` if there is none.
fn strip_code_fence(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };
    let after_fence = &raw[open + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line.
    let content = match after_fence.find('\n') {
        Some(nl) => &after_fence[nl + 1..],
        None => after_fence,
    };
    match content.find("```") {
        Some(close) => &content[..close],
        None => content,
    }
}

fn parse_object(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, SchemaError> {
    locate_object(raw).map(|(_, map)| map)
}

/// Treat an explicit `null` list the same as an absent one.
fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Extraction Shape ─────────────────────────────────────────────

#[derive(Deserialize)]
struct RawExtraction {
    #[serde(default, deserialize_with = "nullable_list")]
    people: Vec<RawPerson>,
    #[serde(default, deserialize_with = "nullable_list")]
    projects: Vec<RawProject>,
    #[serde(default, deserialize_with = "nullable_list")]
    relationships: Vec<RawRelationship>,
}

#[derive(Deserialize)]
struct RawPerson {
    name: String,
    #[serde(default, deserialize_with = "nullable_list")]
    hard_skills: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    soft_skills: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    projects: Vec<RawAssignment>,
}

#[derive(Deserialize)]
struct RawAssignment {
    #[serde(alias = "name")]
    project: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(alias = "project")]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    technologies: Vec<String>,
}

#[derive(Deserialize)]
struct RawRelationship {
    person: String,
    project: String,
    #[serde(default)]
    role: Option<String>,
}

/// Validate raw model output as an extraction result.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult, SchemaError> {
    let map = parse_object(raw)?;
    if !map.contains_key("people") && !map.contains_key("projects") {
        return Err(SchemaError::malformed(
            "extraction result has neither `people` nor `projects`",
            raw,
        ));
    }

    let parsed: RawExtraction = serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| SchemaError::malformed(format!("extraction shape mismatch: {e}"), raw))?;

    let mut people: Vec<PersonRecord> = Vec::with_capacity(parsed.people.len());
    for (idx, person) in parsed.people.into_iter().enumerate() {
        let name = person.name.trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::malformed(
                format!("people[{idx}].name is empty"),
                raw,
            ));
        }

        let mut assignments = Vec::with_capacity(person.projects.len());
        for (pidx, a) in person.projects.into_iter().enumerate() {
            let project = a.project.trim().to_string();
            if project.is_empty() {
                return Err(SchemaError::malformed(
                    format!("people[{idx}].projects[{pidx}].project is empty"),
                    raw,
                ));
            }
            assignments.push(ProjectAssignment {
                project,
                role: clean_opt(a.role).unwrap_or_default(),
            });
        }

        people.push(PersonRecord {
            name,
            hard_skills: clean_list(person.hard_skills),
            soft_skills: clean_list(person.soft_skills),
            projects: assignments,
        });
    }

    let mut projects = Vec::with_capacity(parsed.projects.len());
    for (idx, project) in parsed.projects.into_iter().enumerate() {
        let name = project.name.trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::malformed(
                format!("projects[{idx}].name is empty"),
                raw,
            ));
        }
        projects.push(ProjectRecord {
            name,
            description: clean_opt(project.description),
            technologies: clean_list(project.technologies),
        });
    }

    for (idx, rel) in parsed.relationships.into_iter().enumerate() {
        let person = rel.person.trim();
        let project = rel.project.trim();
        if person.is_empty() || project.is_empty() {
            return Err(SchemaError::malformed(
                format!("relationships[{idx}] is missing `person` or `project`"),
                raw,
            ));
        }
        let assignment = ProjectAssignment {
            project: project.to_string(),
            role: clean_opt(rel.role).unwrap_or_default(),
        };

        let key = NodeKey::new(person);
        match people.iter_mut().find(|p| NodeKey::new(&p.name) == key) {
            Some(existing) => existing.projects.push(assignment),
            None => people.push(PersonRecord {
                name: person.to_string(),
                hard_skills: Vec::new(),
                soft_skills: Vec::new(),
                projects: vec![assignment],
            }),
        }
    }

    Ok(ExtractionResult { people, projects })
}

// ── Intent Shape ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawIntent {
    #[serde(rename = "type", alias = "intent", default)]
    kind: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    skills: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    keywords: Vec<String>,
    #[serde(default)]
    target_person: Option<String>,
    #[serde(default)]
    match_all: Option<bool>,
}

/// An intent object whose shape is valid but whose type is not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentPayload {
    pub type_label: Option<String>,
    pub skills: Vec<String>,
    pub keywords: Vec<String>,
    pub target_person: Option<String>,
    pub match_all: bool,
}

impl IntentPayload {
    /// Resolve the type label against the closed set of intent kinds.
    pub fn classify(&self) -> Result<IntentKind, SchemaError> {
        self.type_label
            .as_deref()
            .and_then(IntentKind::from_label)
            .ok_or_else(|| SchemaError::UnrecognizedIntent {
                label: self.type_label.clone(),
            })
    }

    pub fn into_intent(self, kind: IntentKind) -> Intent {
        Intent {
            kind,
            skills: self.skills,
            keywords: self.keywords,
            target_person: self.target_person,
            match_all: self.match_all,
        }
    }

    /// Downgrade to the generic keyword search, keeping the original label.
    pub fn into_fallback(self) -> Intent {
        let unrecognized = self.type_label.clone();
        self.into_intent(IntentKind::GenericFallback { unrecognized })
    }
}

/// Validate raw model output as an intent object without resolving its type.
pub fn parse_intent_payload(raw: &str) -> Result<IntentPayload, SchemaError> {
    let map = parse_object(raw)?;
    let parsed: RawIntent = serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| SchemaError::malformed(format!("intent shape mismatch: {e}"), raw))?;

    Ok(IntentPayload {
        type_label: clean_opt(parsed.kind),
        skills: clean_list(parsed.skills),
        keywords: clean_list(parsed.keywords),
        target_person: clean_opt(parsed.target_person),
        match_all: parsed.match_all.unwrap_or(false),
    })
}

/// Strict intent validation: unknown or missing types are rejected.
pub fn parse_intent(raw: &str) -> Result<Intent, SchemaError> {
    let payload = parse_intent_payload(raw)?;
    let kind = payload.classify()?;
    Ok(payload.into_intent(kind))
}
