//! skillgraph-search: natural-language questions over the knowledge graph.
//!
//! A question is classified by the language model into an [`Intent`],
//! mapped by the pure [`QueryPlanner`] onto one fixed graph template, run
//! against a [`GraphStore`], then ranked and shaped into a
//! [`SearchResponse`].
//!
//! [`Intent`]: skillgraph_core::Intent
//! [`GraphStore`]: skillgraph_graph::GraphStore

pub mod engine;
pub mod error;
pub mod intent;
pub mod planner;
pub mod prompts;
pub mod ranking;
pub mod types;

pub use engine::{SearchEngine, DEFAULT_RESULT_LIMIT};
pub use error::SearchError;
pub use intent::IntentParser;
pub use planner::{PlannedQuery, QueryPlan, QueryPlanner};
pub use ranking::RankingPolicy;
pub use types::{PersonHit, ProjectHit, ProjectRole, SearchHit, SearchResponse, TeamMember};
