//! The fixed table of parameterized read templates.
//!
//! Every search runs one of these Cypher texts with bound parameters.
//! Nothing user-supplied is ever spliced into the query structure; the
//! rendered text produced by [`BoundQuery::render`] is for display only.
//!
//! All templates return the same columns: `kind`, `key`, `name`,
//! `description`, `matched`, `skills`, `assignments` and `score`. Rows are
//! ordered by `score` (descending) before `LIMIT`, so the cap never drops a
//! better match in favour of a worse one.

use neo4rs::{query, Query};

use skillgraph_core::normalize_key;

macro_rules! person_profile {
    () => {
        "
OPTIONAL MATCH (p)-[:HAS_HARD_SKILL|HAS_SOFT_SKILL]->(sk:Skill)
WITH p, matched, score, collect(DISTINCT sk.name) AS skills
OPTIONAL MATCH (p)-[w:WORKS_ON]->(pr:Project)
WITH p, matched, score, skills,
     collect(DISTINCT CASE WHEN pr IS NULL THEN NULL
             ELSE {person: p.name, project: pr.name, role: coalesce(w.role, '')} END) AS assignments
RETURN 'Person' AS kind, p.key AS key, p.name AS name, NULL AS description,
       matched, skills, assignments, score"
    };
}

/// Field keys of `p` that keyword scoring looks at.
macro_rules! person_field_keys {
    () => {
        "
OPTIONAL MATCH (p)-[:HAS_HARD_SKILL|HAS_SOFT_SKILL]->(fs:Skill)
WITH p, collect(DISTINCT fs.key) AS skill_keys
OPTIONAL MATCH (p)-[fw:WORKS_ON]->(fp:Project)
WITH p, skill_keys, collect(DISTINCT fp.key) AS project_keys,
     [r IN collect(DISTINCT toLower(trim(coalesce(fw.role, '')))) WHERE r <> ''] AS role_keys"
    };
}

/// Number of name, skill, project and role fields containing any term.
macro_rules! matching_fields_score {
    () => {
        "
WITH p, [] AS matched,
     CASE WHEN any(term IN $terms WHERE p.key CONTAINS term) THEN 1 ELSE 0 END
     + size([x IN skill_keys WHERE any(term IN $terms WHERE x CONTAINS term)])
     + size([x IN project_keys WHERE any(term IN $terms WHERE x CONTAINS term)])
     + size([x IN role_keys WHERE any(term IN $terms WHERE x CONTAINS term)]) AS score"
    };
}

const PERSON_BY_SKILL: &str = concat!(
    "MATCH (p:Person)-[:HAS_HARD_SKILL|HAS_SOFT_SKILL]->(s:Skill)
WHERE s.key IN $terms
WITH p, collect(DISTINCT s.name) AS matched
WHERE size(matched) >= $required_matches
WITH p, matched, size(matched) AS score",
    person_profile!(),
    "
ORDER BY score DESC, key
LIMIT $limit"
);

const PROJECT_BY_TECHNOLOGY: &str = "MATCH (pr:Project)-[:USES_TECH]->(s:Skill)
WHERE s.key IN $terms
WITH pr, collect(DISTINCT s.name) AS matched
WHERE size(matched) >= $required_matches
OPTIONAL MATCH (pr)-[:USES_TECH]->(t:Skill)
WITH pr, matched, collect(DISTINCT t.name) AS skills
OPTIONAL MATCH (p:Person)-[w:WORKS_ON]->(pr)
WITH pr, matched, skills,
     collect(DISTINCT CASE WHEN p IS NULL THEN NULL
             ELSE {person: p.name, project: pr.name, role: coalesce(w.role, '')} END) AS assignments
RETURN 'Project' AS kind, pr.key AS key, pr.name AS name, pr.description AS description,
       matched, skills, assignments, size(matched) AS score
ORDER BY score DESC, key
LIMIT $limit";

const COLLABORATORS_OF_PERSON: &str = concat!(
    "MATCH (t:Person {key: $target})-[:WORKS_ON]->(shared:Project)<-[:WORKS_ON]-(p:Person)
WHERE p <> t
WITH p, collect(DISTINCT shared.name) AS matched
WITH p, matched, size(matched) AS score",
    person_profile!(),
    "
ORDER BY score DESC, key
LIMIT $limit"
);

const PERSON_DETAILS: &str = concat!(
    "MATCH (p:Person {key: $target})
WITH p, [] AS matched, 0 AS score",
    person_profile!(),
    "
LIMIT $limit"
);

const PERSON_BY_ROLE: &str = concat!(
    "MATCH (p:Person)-[w:WORKS_ON]->(:Project)
WHERE any(term IN $terms WHERE toLower(coalesce(w.role, '')) CONTAINS term)
WITH DISTINCT p",
    person_field_keys!(),
    matching_fields_score!(),
    person_profile!(),
    "
ORDER BY score DESC, key
LIMIT $limit"
);

const KEYWORD_SEARCH: &str = concat!(
    "MATCH (p:Person)",
    person_field_keys!(),
    matching_fields_score!(),
    "
WHERE score > 0",
    person_profile!(),
    "
ORDER BY score DESC, key
LIMIT $limit"
);

/// One pre-authored traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTemplate {
    /// People having any (or all) of `terms` as skills.
    PersonBySkill,
    /// Projects using any (or all) of `terms` as technologies.
    ProjectByTechnology,
    /// People sharing at least one project with `target`.
    CollaboratorsOfPerson,
    /// The profile of `target`.
    PersonDetails,
    /// People whose project role contains any of `terms`.
    PersonByRole,
    /// People whose name, skills, projects or roles contain any of `terms`.
    KeywordSearch,
}

impl QueryTemplate {
    pub const ALL: [QueryTemplate; 6] = [
        Self::PersonBySkill,
        Self::ProjectByTechnology,
        Self::CollaboratorsOfPerson,
        Self::PersonDetails,
        Self::PersonByRole,
        Self::KeywordSearch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PersonBySkill => "person_by_skill",
            Self::ProjectByTechnology => "project_by_technology",
            Self::CollaboratorsOfPerson => "collaborators_of_person",
            Self::PersonDetails => "person_details",
            Self::PersonByRole => "person_by_role",
            Self::KeywordSearch => "keyword_search",
        }
    }

    pub fn cypher(&self) -> &'static str {
        match self {
            Self::PersonBySkill => PERSON_BY_SKILL,
            Self::ProjectByTechnology => PROJECT_BY_TECHNOLOGY,
            Self::CollaboratorsOfPerson => COLLABORATORS_OF_PERSON,
            Self::PersonDetails => PERSON_DETAILS,
            Self::PersonByRole => PERSON_BY_ROLE,
            Self::KeywordSearch => KEYWORD_SEARCH,
        }
    }

    /// Whether the template needs `target` rather than `terms`.
    pub fn requires_target(&self) -> bool {
        matches!(self, Self::CollaboratorsOfPerson | Self::PersonDetails)
    }
}

/// Parameters bound into a template. Terms and target are normalized keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub terms: Vec<String>,
    pub target: Option<String>,
    pub required_matches: usize,
    pub limit: usize,
}

/// A template together with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    pub template: QueryTemplate,
    pub params: QueryParams,
}

impl BoundQuery {
    /// Bind raw terms and target, normalizing them to key form.
    pub fn new(
        template: QueryTemplate,
        terms: &[String],
        target: Option<&str>,
        required_matches: usize,
        limit: usize,
    ) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(terms.len());
        for term in terms {
            let key = normalize_key(term);
            if !key.is_empty() && !normalized.contains(&key) {
                normalized.push(key);
            }
        }

        Self {
            template,
            params: QueryParams {
                terms: normalized,
                target: target.map(normalize_key).filter(|t| !t.is_empty()),
                required_matches,
                limit,
            },
        }
    }

    /// The executable query with parameters attached.
    pub fn to_query(&self) -> Query {
        query(self.template.cypher())
            .param("terms", self.params.terms.clone())
            .param("target", self.params.target.clone().unwrap_or_default())
            .param("required_matches", self.params.required_matches as i64)
            .param("limit", self.params.limit as i64)
    }

    /// The template text with each `$param` replaced by its literal value.
    pub fn render(&self) -> String {
        let cypher = self.template.cypher();
        let mut out = String::with_capacity(cypher.len() + 64);
        let mut chars = cypher.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            match self.literal(&name) {
                Some(literal) => out.push_str(&literal),
                None => {
                    out.push('$');
                    out.push_str(&name);
                }
            }
        }
        out
    }

    fn literal(&self, name: &str) -> Option<String> {
        match name {
            "terms" => {
                let mut list = String::from("[");
                for (i, term) in self.params.terms.iter().enumerate() {
                    if i > 0 {
                        list.push_str(", ");
                    }
                    list.push_str(&quote(term));
                }
                list.push(']');
                Some(list)
            }
            "target" => Some(
                self.params
                    .target
                    .as_deref()
                    .map(quote)
                    .unwrap_or_else(|| "null".to_string()),
            ),
            "required_matches" => Some(self.params.required_matches.to_string()),
            "limit" => Some(self.params.limit.to_string()),
            _ => None,
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_template_returns_the_shared_columns() {
        for template in QueryTemplate::ALL {
            let cypher = template.cypher();
            for column in [
                "kind",
                "key",
                "name",
                "description",
                "matched",
                "skills",
                "assignments",
                "score",
            ] {
                assert!(
                    cypher.contains(column),
                    "{} is missing column {column}",
                    template.name()
                );
            }
            assert!(cypher.contains("$limit"), "{} has no limit", template.name());
        }
    }

    #[test]
    fn ranked_templates_order_by_score_before_limit() {
        for template in QueryTemplate::ALL {
            if template == QueryTemplate::PersonDetails {
                continue;
            }
            let cypher = template.cypher();
            let order = cypher
                .find("ORDER BY score DESC, key")
                .unwrap_or_else(|| panic!("{} is not ordered by score", template.name()));
            assert!(order < cypher.rfind("LIMIT $limit").unwrap(), "{}", template.name());
        }
    }

    #[test]
    fn keyword_templates_score_every_field() {
        for template in [QueryTemplate::KeywordSearch, QueryTemplate::PersonByRole] {
            let cypher = template.cypher();
            for field in ["p.key CONTAINS", "skill_keys", "project_keys", "role_keys"] {
                assert!(cypher.contains(field), "{} does not score {field}", template.name());
            }
        }
    }

    #[test]
    fn target_templates_bind_target() {
        for template in QueryTemplate::ALL {
            assert_eq!(
                template.cypher().contains("$target"),
                template.requires_target(),
                "{}",
                template.name()
            );
        }
    }

    #[test]
    fn terms_are_normalized_and_deduplicated() {
        let bound = BoundQuery::new(
            QueryTemplate::PersonBySkill,
            &terms(&["React", " react ", "Node.js", ""]),
            None,
            1,
            50,
        );
        assert_eq!(bound.params.terms, vec!["react", "node.js"]);
        assert_eq!(bound.params.target, None);
    }

    #[test]
    fn render_substitutes_literals() {
        let bound = BoundQuery::new(
            QueryTemplate::PersonBySkill,
            &terms(&["React", "Rust"]),
            None,
            2,
            50,
        );
        let text = bound.render();
        assert!(text.contains("WHERE s.key IN ['react', 'rust']"));
        assert!(text.contains("size(matched) >= 2"));
        assert!(text.contains("LIMIT 50"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn render_quotes_hostile_values() {
        let bound = BoundQuery::new(
            QueryTemplate::CollaboratorsOfPerson,
            &[],
            Some("O'Brien\\ }) DETACH DELETE p //"),
            1,
            10,
        );
        let text = bound.render();
        assert!(text.contains(r"{key: 'o\'brien\\ }) detach delete p //'}"));
    }

    #[test]
    fn render_is_stable() {
        let bound = BoundQuery::new(
            QueryTemplate::KeywordSearch,
            &terms(&["payments", "lead"]),
            None,
            1,
            25,
        );
        assert_eq!(bound.render(), bound.clone().render());
    }
}
