//! Configuration management for Skillgraph services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (e.g. `SKILLGRAPH_NEO4J__URI`)
//! 2. Config file (skillgraph.toml, optional)
//! 3. Defaults
//!
//! `ANTHROPIC_API_KEY` is used when no `llm.api_key` is configured.

use serde::Deserialize;

use crate::error::SkillgraphError;
use crate::normalize::{SkillRegistry, DEFAULT_FUZZY_THRESHOLD};

/// Top-level configuration shared by the ingest and search binaries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub skills: SkillSettings,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,
    #[serde(default = "default_neo4j_user")]
    pub user: String,
    #[serde(default = "default_neo4j_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Language-model service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Token budget for extraction responses.
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,
    /// Token budget for intent responses.
    #[serde(default = "default_intent_max_tokens")]
    pub intent_max_tokens: u32,
    /// Per-call timeout. Extraction and intent parsing each get their own budget.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// Ingestion settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    /// Documents processed at the same time.
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,
}

/// Search and graph view settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    #[serde(default = "default_graph_node_limit")]
    pub graph_node_limit: usize,
    /// Rows fetched per query before ranking.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

/// Skill name resolution, shared by extraction and query planning.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillSettings {
    /// Minimum similarity for a misspelling to resolve to a known skill.
    /// `1.0` turns fuzzy matching off.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
}

impl SkillSettings {
    /// The built-in registry with this fuzzy threshold.
    pub fn registry(&self) -> SkillRegistry {
        SkillRegistry::builtin().with_fuzzy_threshold(self.fuzzy_threshold)
    }
}

fn default_neo4j_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_neo4j_password() -> String {
    "skillgraph-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_extraction_max_tokens() -> u32 {
    4000
}

fn default_intent_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_max_concurrent_documents() -> usize {
    4
}

fn default_result_limit() -> usize {
    50
}

fn default_graph_node_limit() -> usize {
    500
}

fn default_candidate_limit() -> usize {
    1000
}

fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            user: default_neo4j_user(),
            password: default_neo4j_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            model: default_model(),
            extraction_max_tokens: default_extraction_max_tokens(),
            intent_max_tokens: default_intent_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_concurrent_documents: default_max_concurrent_documents(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            graph_node_limit: default_graph_node_limit(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `<file_prefix>.toml` (optional) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, SkillgraphError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(environment())
            .build()?;

        let mut app: AppConfig = cfg.try_deserialize()?;
        if app.llm.api_key.is_empty() {
            if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
                app.llm.api_key = key;
            }
        }
        Ok(app)
    }
}

/// `SKILLGRAPH_<SECTION>__<KEY>`, e.g. `SKILLGRAPH_NEO4J__URI`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("SKILLGRAPH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
