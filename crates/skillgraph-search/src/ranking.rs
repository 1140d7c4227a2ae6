//! Ranking & Shaper: raw template rows in, ordered hits and an explanation out.
//!
//! Every ordering ends with the normalized name, and keys are unique per
//! kind, so the same rows always come out in the same order.

use std::cmp::Reverse;

use skillgraph_core::{normalize_key, EntityKind};
use skillgraph_graph::{QueryTemplate, RawRecord};

use crate::planner::PlannedQuery;
use crate::types::{PersonHit, ProjectHit, ProjectRole, SearchHit, TeamMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPolicy {
    /// Most matched skills or technologies first.
    MatchCount,
    /// Most projects shared with the target person first.
    SharedProjects,
    /// Most fields (name, skill, project, role) containing a search term first.
    MatchingFields,
    /// By name only.
    Alphabetical,
}

/// Shape and order `records`. `terms` are the bound, normalized search terms.
pub fn rank(records: Vec<RawRecord>, policy: RankingPolicy, terms: &[String]) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, String, SearchHit)> = records
        .into_iter()
        .map(|record| {
            let score = match policy {
                RankingPolicy::MatchCount | RankingPolicy::SharedProjects => {
                    distinct_keys(&record.matched).len()
                }
                RankingPolicy::MatchingFields => record.matching_fields(terms),
                RankingPolicy::Alphabetical => 0,
            };
            (score, record.key.clone(), shape(record, score))
        })
        .collect();

    scored.sort_by(|a, b| {
        (Reverse(a.0), normalize_key(a.2.name()), &a.1).cmp(&(
            Reverse(b.0),
            normalize_key(b.2.name()),
            &b.1,
        ))
    });
    scored.into_iter().map(|(_, _, hit)| hit).collect()
}

fn shape(record: RawRecord, match_count: usize) -> SearchHit {
    let matched = sorted_names(record.matched);
    let skills = sorted_names(record.skills);

    match record.kind {
        EntityKind::Project => {
            let mut team: Vec<TeamMember> = record
                .assignments
                .into_iter()
                .map(|a| TeamMember {
                    person: a.person,
                    role: a.role,
                })
                .collect();
            team.sort();
            team.dedup();

            SearchHit::Project(ProjectHit {
                name: record.name,
                description: record.description.filter(|d| !d.trim().is_empty()),
                technologies: skills,
                team,
                matched,
                match_count,
            })
        }
        _ => {
            let mut projects: Vec<ProjectRole> = record
                .assignments
                .into_iter()
                .map(|a| ProjectRole {
                    project: a.project,
                    role: a.role,
                })
                .collect();
            projects.sort();
            projects.dedup();

            let mut roles: Vec<String> = projects
                .iter()
                .map(|p| p.role.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
            roles.sort_by_key(|r| normalize_key(r));
            roles.dedup_by_key(|r| normalize_key(r));

            SearchHit::Person(PersonHit {
                name: record.name,
                skills,
                projects,
                roles,
                matched,
                match_count,
            })
        }
    }
}

/// Names sorted by normalized key, one per key.
fn sorted_names(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| (normalize_key(a), a).cmp(&(normalize_key(b), b)));
    names.dedup_by_key(|n| normalize_key(n));
    names
}

fn distinct_keys(names: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = names.iter().map(|n| normalize_key(n)).collect();
    keys.sort();
    keys.dedup();
    keys
}

fn noun(template: QueryTemplate, count: usize) -> &'static str {
    match (template, count) {
        (QueryTemplate::ProjectByTechnology, 1) => "project",
        (QueryTemplate::ProjectByTechnology, _) => "projects",
        (_, 1) => "person",
        _ => "people",
    }
}

fn join(subject: &[String], match_all: bool) -> String {
    let list = subject.join(", ");
    match (subject.len(), match_all) {
        (0 | 1, _) => list,
        (_, true) => format!("all of {list}"),
        (_, false) => format!("any of {list}"),
    }
}

/// A one-line summary of what was searched and how much came back.
pub fn explain(planned: &PlannedQuery, total: usize, shown: usize) -> String {
    let template = planned.bound.template;
    let subject = join(&planned.subject, planned.match_all);
    // A full candidate page means the store may hold more matches.
    let capped = total > 0 && total >= planned.bound.params.limit;
    let count = match total {
        0 => "No".to_string(),
        _ if capped => format!("Found at least {total}"),
        _ => format!("Found {total}"),
    };
    let noun = noun(template, total);

    let mut text = match template {
        QueryTemplate::PersonBySkill => format!("{count} {noun} with skills: {subject}."),
        QueryTemplate::ProjectByTechnology => format!("{count} {noun} using: {subject}."),
        QueryTemplate::CollaboratorsOfPerson => {
            format!("{count} {noun} who worked on a project with {subject}.")
        }
        QueryTemplate::PersonDetails if total == 0 => format!("No person named {subject} found."),
        QueryTemplate::PersonDetails => format!("Found the profile of {subject}."),
        QueryTemplate::PersonByRole => format!("{count} {noun} with a role matching: {subject}."),
        QueryTemplate::KeywordSearch => format!("{count} {noun} matching keywords: {subject}."),
    };

    if let Some(reason) = &planned.fallback {
        text = format!("Searched by keyword ({reason}). {text}");
    }
    if shown < total {
        text.push_str(&format!(" Showing the top {shown}."));
    }
    text
}

/// Explanation for a plan that ran no query.
pub fn explain_noop(reason: &str) -> String {
    format!("Nothing to search for ({reason}); no results.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{QueryPlan, QueryPlanner};
    use skillgraph_core::{Intent, IntentKind};
    use skillgraph_graph::Assignment;

    fn person(name: &str, matched: &[&str], skills: &[&str], projects: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            kind: EntityKind::Person,
            key: normalize_key(name),
            name: name.to_string(),
            description: None,
            matched: matched.iter().map(|s| s.to_string()).collect(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            assignments: projects
                .iter()
                .map(|(project, role)| Assignment {
                    person: name.to_string(),
                    project: project.to_string(),
                    role: role.to_string(),
                })
                .collect(),
        }
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(SearchHit::name).collect()
    }

    #[test]
    fn match_count_then_name() {
        let records = vec![
            person("zoe", &["React"], &["React"], &[]),
            person("Omar Haddad", &["React", "Go"], &["Go", "React"], &[]),
            person("Ana", &["React"], &["React", "Rust"], &[]),
        ];
        let hits = rank(records, RankingPolicy::MatchCount, &[]);

        assert_eq!(names(&hits), vec!["Omar Haddad", "Ana", "zoe"]);
        assert_eq!(hits[0].match_count(), 2);
        assert_eq!(hits[2].match_count(), 1);
    }

    #[test]
    fn ranking_ignores_input_order() {
        let records = vec![
            person("B", &["x"], &[], &[]),
            person("a", &["x"], &[], &[]),
            person("C", &["x", "y"], &[], &[]),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(
            rank(records, RankingPolicy::MatchCount, &[]),
            rank(reversed, RankingPolicy::MatchCount, &[])
        );
    }

    #[test]
    fn keyword_ranking_counts_fields() {
        let terms = vec!["api".to_string()];
        let records = vec![
            person("Ana", &[], &["Rust"], &[("API Migration", "Backend")]),
            person("Bo", &[], &["REST API"], &[("API Migration", "API lead")]),
        ];
        let hits = rank(records, RankingPolicy::MatchingFields, &terms);

        assert_eq!(names(&hits), vec!["Bo", "Ana"]);
        assert_eq!(hits[0].match_count(), 3);
        assert_eq!(hits[1].match_count(), 1);
    }

    #[test]
    fn person_lists_are_sorted_and_roles_deduplicated() {
        let record = person(
            "Sarah Chen",
            &["React"],
            &["react native", "React"],
            &[("Zeta", "Lead"), ("API Migration", "lead"), ("Beta", "")],
        );
        let hits = rank(vec![record], RankingPolicy::MatchCount, &[]);
        let hit = hits[0].as_person().unwrap();

        assert_eq!(hit.skills, vec!["React", "react native"]);
        assert_eq!(
            hit.projects.iter().map(|p| p.project.as_str()).collect::<Vec<_>>(),
            vec!["API Migration", "Beta", "Zeta"]
        );
        assert_eq!(hit.roles.len(), 1);
    }

    #[test]
    fn hits_serialize_with_type_tag() {
        let hits = rank(
            vec![person("Sarah Chen", &["React"], &["React"], &[("API Migration", "Lead")])],
            RankingPolicy::MatchCount,
            &[],
        );
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["type"], "Person");
        assert_eq!(json["match_count"], 1);
        assert_eq!(json["projects"][0]["project"], "API Migration");
        assert_eq!(json["projects"][0]["role"], "Lead");
    }

    #[test]
    fn explanations_name_the_search() {
        let intent = Intent::new(IntentKind::FindPersonBySkill).with_skills(["React", "Go"]);
        let QueryPlan::Execute(planned) = QueryPlanner::default().plan(&intent) else {
            panic!("expected a query");
        };

        assert_eq!(explain(&planned, 0, 0), "No people with skills: any of React, Go.");
        assert_eq!(explain(&planned, 1, 1), "Found 1 person with skills: any of React, Go.");
        assert_eq!(
            explain(&planned, 80, 50),
            "Found 80 people with skills: any of React, Go. Showing the top 50."
        );
    }

    #[test]
    fn full_candidate_page_is_reported_as_a_lower_bound() {
        let intent =
            Intent::new(IntentKind::GenericFallback { unrecognized: None }).with_keywords(["dev"]);
        let planner = QueryPlanner::default().with_candidate_limit(5);
        let QueryPlan::Execute(planned) = planner.plan(&intent) else {
            panic!("expected a query");
        };

        assert_eq!(
            explain(&planned, 5, 3),
            "Found at least 5 people matching keywords: dev. Showing the top 3."
        );
        assert_eq!(explain(&planned, 4, 3), "Found 4 people matching keywords: dev. Showing the top 3.");
    }
}
