//! Query Planner: validated intent in, bound template out.
//!
//! Planning is pure. The same intent always yields the same template,
//! parameters and rendered text, and nothing here touches the store.

use skillgraph_core::{Intent, IntentKind, SkillRegistry};
use skillgraph_graph::{BoundQuery, QueryTemplate};

use crate::ranking::RankingPolicy;

/// Rows fetched per query before ranking. Results are cut to the response
/// limit afterwards.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 1000;

/// Which intent field feeds a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    Skills,
    Keywords,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Route {
    template: QueryTemplate,
    param: Param,
    ranking: RankingPolicy,
}

const KEYWORD_ROUTE: Route = Route {
    template: QueryTemplate::KeywordSearch,
    param: Param::Keywords,
    ranking: RankingPolicy::MatchingFields,
};

/// Intent type to template table.
fn route(kind: &IntentKind) -> Route {
    match kind {
        IntentKind::FindPersonBySkill => Route {
            template: QueryTemplate::PersonBySkill,
            param: Param::Skills,
            ranking: RankingPolicy::MatchCount,
        },
        IntentKind::FindProjectByTechnology => Route {
            template: QueryTemplate::ProjectByTechnology,
            param: Param::Skills,
            ranking: RankingPolicy::MatchCount,
        },
        IntentKind::FindCollaborators => Route {
            template: QueryTemplate::CollaboratorsOfPerson,
            param: Param::Target,
            ranking: RankingPolicy::SharedProjects,
        },
        IntentKind::FindPersonByRole => Route {
            template: QueryTemplate::PersonByRole,
            param: Param::Keywords,
            ranking: RankingPolicy::MatchingFields,
        },
        IntentKind::FindPersonDetails => Route {
            template: QueryTemplate::PersonDetails,
            param: Param::Target,
            ranking: RankingPolicy::Alphabetical,
        },
        IntentKind::GenericFallback { .. } => KEYWORD_ROUTE,
    }
}

/// A template ready to run, with what the shaper needs to explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub intent: IntentKind,
    pub bound: BoundQuery,
    pub ranking: RankingPolicy,
    /// The template with literal parameter values, for display.
    pub text: String,
    /// Requested skills, keywords or person, as the user would read them.
    pub subject: Vec<String>,
    pub match_all: bool,
    /// Why the keyword template replaced the intent's own, if it did.
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    Execute(PlannedQuery),
    /// Nothing to search for. Yields an empty result without a store call.
    NoOp { intent: IntentKind, reason: String },
}

impl QueryPlan {
    /// The literal query text, empty when nothing runs.
    pub fn text(&self) -> &str {
        match self {
            Self::Execute(planned) => &planned.text,
            Self::NoOp { .. } => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    registry: SkillRegistry,
    candidate_limit: usize,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(SkillRegistry::builtin())
    }
}

impl QueryPlanner {
    pub fn new(registry: SkillRegistry) -> Self {
        Self {
            registry,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    pub fn plan(&self, intent: &Intent) -> QueryPlan {
        let route = route(&intent.kind);
        let unrecognized = match &intent.kind {
            IntentKind::GenericFallback {
                unrecognized: Some(label),
            } => Some(format!("unrecognized intent {label:?}")),
            _ => None,
        };

        if let Some(planned) = self.bind(route, intent, unrecognized.clone()) {
            return QueryPlan::Execute(planned);
        }

        let missing = match route.param {
            Param::Skills => "no skills given",
            Param::Keywords => "no keywords given",
            Param::Target => "no target person given",
        };
        if route.template != QueryTemplate::KeywordSearch {
            let reason = format!("{} needs a parameter: {missing}", intent.kind.label());
            if let Some(planned) = self.bind(KEYWORD_ROUTE, intent, Some(reason)) {
                return QueryPlan::Execute(planned);
            }
        }

        QueryPlan::NoOp {
            intent: intent.kind.clone(),
            reason: missing.to_string(),
        }
    }

    fn bind(&self, route: Route, intent: &Intent, fallback: Option<String>) -> Option<PlannedQuery> {
        let (bound, subject) = match route.param {
            Param::Skills => {
                let skills = self.registry.canonicalize_all(&intent.skills);
                if skills.is_empty() {
                    return None;
                }
                if intent.match_all {
                    let mut bound = BoundQuery::new(route.template, &skills, None, 1, self.candidate_limit);
                    bound.params.required_matches = bound.params.terms.len().max(1);
                    (bound, skills)
                } else {
                    let expanded = self.registry.expand(&skills);
                    let bound = BoundQuery::new(route.template, &expanded, None, 1, self.candidate_limit);
                    (bound, skills)
                }
            }
            Param::Keywords => {
                let keywords: Vec<String> = intent
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                let bound = BoundQuery::new(route.template, &keywords, None, 1, self.candidate_limit);
                (bound, keywords)
            }
            Param::Target => {
                let target = intent.target_person.as_deref().map(str::trim).unwrap_or_default();
                let bound = BoundQuery::new(route.template, &[], Some(target), 1, self.candidate_limit);
                (bound, vec![target.to_string()])
            }
        };

        let has_params = match route.param {
            Param::Target => bound.params.target.is_some(),
            _ => !bound.params.terms.is_empty(),
        };
        if !has_params {
            return None;
        }

        Some(PlannedQuery {
            intent: intent.kind.clone(),
            text: bound.render(),
            bound,
            ranking: route.ranking,
            subject,
            match_all: intent.match_all && route.param == Param::Skills,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> QueryPlanner {
        QueryPlanner::default()
    }

    fn executed(plan: QueryPlan) -> PlannedQuery {
        match plan {
            QueryPlan::Execute(planned) => planned,
            QueryPlan::NoOp { reason, .. } => panic!("expected a query, got no-op: {reason}"),
        }
    }

    #[test]
    fn skill_search_expands_related_skills() {
        let intent = Intent::new(IntentKind::FindPersonBySkill).with_skills(["reactjs"]);
        let planned = executed(planner().plan(&intent));

        assert_eq!(planned.bound.template, QueryTemplate::PersonBySkill);
        assert_eq!(planned.bound.params.terms, vec!["react", "react native"]);
        assert_eq!(planned.bound.params.required_matches, 1);
        assert_eq!(planned.subject, vec!["React"]);
        assert_eq!(planned.ranking, RankingPolicy::MatchCount);
        assert!(planned.text.contains("['react', 'react native']"));
    }

    #[test]
    fn match_all_requires_every_skill_without_expansion() {
        let intent = Intent::new(IntentKind::FindPersonBySkill)
            .with_skills(["React", "Node", "react"])
            .match_all(true);
        let planned = executed(planner().plan(&intent));

        assert_eq!(planned.bound.params.terms, vec!["react", "node.js"]);
        assert_eq!(planned.bound.params.required_matches, 2);
        assert!(planned.match_all);
    }

    #[test]
    fn technology_search_uses_project_template() {
        let intent = Intent::new(IntentKind::FindProjectByTechnology).with_skills(["k8s"]);
        let planned = executed(planner().plan(&intent));
        assert_eq!(planned.bound.template, QueryTemplate::ProjectByTechnology);
        assert_eq!(planned.bound.params.terms, vec!["kubernetes"]);
    }

    #[test]
    fn target_templates_bind_normalized_person() {
        let intent = Intent::new(IntentKind::FindCollaborators).with_target("  Sarah  Chen ");
        let planned = executed(planner().plan(&intent));

        assert_eq!(planned.bound.template, QueryTemplate::CollaboratorsOfPerson);
        assert_eq!(planned.bound.params.target.as_deref(), Some("sarah chen"));
        assert_eq!(planned.ranking, RankingPolicy::SharedProjects);
        assert!(planned.text.contains("{key: 'sarah chen'}"));
    }

    #[test]
    fn missing_target_falls_back_to_keywords() {
        let intent = Intent::new(IntentKind::FindCollaborators).with_keywords(["API Migration"]);
        let planned = executed(planner().plan(&intent));

        assert_eq!(planned.bound.template, QueryTemplate::KeywordSearch);
        assert_eq!(planned.bound.params.terms, vec!["api migration"]);
        assert!(planned.fallback.unwrap().contains("no target person"));
    }

    #[test]
    fn missing_parameters_and_keywords_is_a_noop() {
        let intent = Intent::new(IntentKind::FindPersonBySkill).with_keywords(["  "]);
        let plan = planner().plan(&intent);
        assert!(matches!(plan, QueryPlan::NoOp { .. }));
        assert_eq!(plan.text(), "");
    }

    #[test]
    fn unrecognized_intent_searches_keywords() {
        let intent = Intent::new(IntentKind::GenericFallback {
            unrecognized: Some("find_salary".to_string()),
        })
        .with_keywords(["Omar"]);
        let planned = executed(planner().plan(&intent));

        assert_eq!(planned.bound.template, QueryTemplate::KeywordSearch);
        assert_eq!(planned.fallback.as_deref(), Some("unrecognized intent \"find_salary\""));
    }

    #[test]
    fn planning_is_pure() {
        let intent = Intent::new(IntentKind::FindPersonBySkill)
            .with_skills(["Python", "AWS"])
            .with_keywords(["backend"]);
        let planner = planner();
        let first = planner.plan(&intent);
        for _ in 0..5 {
            assert_eq!(planner.plan(&intent), first);
        }
        assert_eq!(first.text(), planner.plan(&intent.clone()).text());
    }

    #[test]
    fn injection_stays_inside_literal() {
        let intent = Intent::new(IntentKind::FindPersonDetails)
            .with_target("x'}) DETACH DELETE (n) //");
        let planned = executed(planner().plan(&intent));
        assert_eq!(
            planned.bound.params.target.as_deref(),
            Some("x'}) detach delete (n) //")
        );
        assert!(planned.text.contains(r"{key: 'x\'}) detach delete (n) //'}"));
        assert_eq!(planned.bound.template.cypher().matches("DELETE").count(), 0);
    }
}
