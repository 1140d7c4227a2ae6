//! skillgraph-core: Shared types, schema validation, configuration, and error handling.
//!
//! This crate provides the foundations used across all Skillgraph components:
//! - Entity and relation vocabulary for the people/skills/projects graph
//! - Normalized keys and the skill registry
//! - Validation of language-model output (extraction results and intents)
//! - Configuration management
//! - The shared error taxonomy

pub mod config;
pub mod error;
pub mod normalize;
pub mod schema;
pub mod types;

pub use config::AppConfig;
pub use error::{ErrorKind, SchemaError, SkillgraphError};
pub use normalize::{normalize_key, SkillRegistry};
pub use types::{
    EntityKind, ExtractionResult, Intent, IntentKind, NodeKey, PersonRecord, ProjectAssignment,
    ProjectRecord, RelationType, SkillCategory,
};
