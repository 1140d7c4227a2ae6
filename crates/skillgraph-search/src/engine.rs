//! Search engine: question to intent to plan to ranked, shaped response.

use std::sync::Arc;

use skillgraph_core::{Intent, IntentKind};
use skillgraph_graph::GraphStore;

use crate::error::{Result, SearchError};
use crate::intent::IntentParser;
use crate::planner::{QueryPlan, QueryPlanner};
use crate::ranking::{explain, explain_noop, rank};
use crate::types::SearchResponse;

/// Results returned per query unless configured otherwise.
pub const DEFAULT_RESULT_LIMIT: usize = 50;

pub struct SearchEngine {
    parser: IntentParser,
    planner: QueryPlanner,
    store: Arc<dyn GraphStore>,
    result_limit: usize,
}

impl SearchEngine {
    pub fn new(parser: IntentParser, store: Arc<dyn GraphStore>) -> Self {
        Self {
            parser,
            planner: QueryPlanner::default(),
            store,
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_planner(mut self, planner: QueryPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    /// Answer a natural-language question.
    pub async fn search(&self, question: &str) -> Result<SearchResponse> {
        let intent = self.parser.parse(question).await?;
        self.answer(question.trim(), &intent).await
    }

    /// Answer an already classified intent.
    pub async fn search_intent(&self, intent: &Intent) -> Result<SearchResponse> {
        self.answer(intent.kind.label(), intent).await
    }

    async fn answer(&self, question: &str, intent: &Intent) -> Result<SearchResponse> {
        let unrecognized = match &intent.kind {
            IntentKind::GenericFallback { unrecognized } => unrecognized.clone(),
            _ => None,
        };

        let planned = match self.planner.plan(intent) {
            QueryPlan::Execute(planned) => planned,
            QueryPlan::NoOp { reason, .. } => {
                tracing::info!(query = question, intent = intent.kind.label(), reason = %reason, "Nothing to search");
                return Ok(SearchResponse {
                    intent: intent.kind.label().to_string(),
                    unrecognized_intent: unrecognized,
                    results: Vec::new(),
                    result_count: 0,
                    explanation: explain_noop(&reason),
                    query: String::new(),
                });
            }
        };

        let records = self
            .store
            .fetch_records(&planned.bound)
            .await
            .map_err(|source| {
                tracing::error!(query = question, template = planned.bound.template.name(), error = %source, "Search query failed");
                SearchError::Storage {
                    query: question.to_string(),
                    source,
                }
            })?;

        let mut results = rank(records, planned.ranking, &planned.bound.params.terms);
        let total = results.len();
        results.truncate(self.result_limit);

        tracing::info!(
            query = question,
            intent = intent.kind.label(),
            template = planned.bound.template.name(),
            result_count = results.len(),
            total,
            "Search answered"
        );

        Ok(SearchResponse {
            intent: intent.kind.label().to_string(),
            unrecognized_intent: unrecognized,
            result_count: results.len(),
            explanation: explain(&planned, total, results.len()),
            results,
            query: planned.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::{ErrorKind, NodeKey, RelationType, SkillCategory};
    use skillgraph_graph::{MemoryGraph, MergeOp};
    use skillgraph_llm::ScriptedModel;

    fn engine(graph: Arc<MemoryGraph>) -> SearchEngine {
        let parser = IntentParser::new(Arc::new(ScriptedModel::new(vec![])));
        SearchEngine::new(parser, graph)
    }

    async fn people_with_react(graph: &MemoryGraph, count: usize) {
        let mut ops = vec![MergeOp::Skill {
            key: NodeKey::new("React"),
            name: "React".to_string(),
            category: SkillCategory::Hard,
        }];
        for i in 0..count {
            let name = format!("Person {i:02}");
            ops.push(MergeOp::Person {
                key: NodeKey::new(&name),
                name: name.clone(),
            });
            ops.push(MergeOp::Relation {
                relation: RelationType::HasHardSkill,
                from: NodeKey::new(&name),
                to: NodeKey::new("React"),
                role: None,
            });
        }
        graph.apply_merges(&ops).await.unwrap();
    }

    #[tokio::test]
    async fn results_are_capped_after_ranking() {
        let graph = Arc::new(MemoryGraph::new());
        people_with_react(&graph, 5).await;
        let engine = engine(graph).with_result_limit(3);

        let intent = Intent::new(IntentKind::FindPersonBySkill).with_skills(["React"]);
        let response = engine.search_intent(&intent).await.unwrap();

        assert_eq!(response.result_count, 3);
        assert_eq!(response.results[0].name(), "Person 00");
        assert!(response.explanation.ends_with("Showing the top 3."));
    }

    #[tokio::test]
    async fn noop_plan_skips_the_store() {
        let graph = Arc::new(MemoryGraph::new());
        graph.set_unavailable(true);
        let intent = Intent::new(IntentKind::FindCollaborators);

        let response = engine(graph).search_intent(&intent).await.unwrap();
        assert_eq!(response.result_count, 0);
        assert_eq!(response.query, "");
        assert_eq!(response.intent, "find_collaborators");
    }

    #[tokio::test]
    async fn storage_errors_carry_the_query() {
        let graph = Arc::new(MemoryGraph::new());
        graph.set_unavailable(true);
        let intent = Intent::new(IntentKind::FindPersonBySkill).with_skills(["React"]);

        let err = engine(graph).search_intent(&intent).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(matches!(err, SearchError::Storage { ref query, .. } if query == "find_person_by_skill"));
    }
}
