//! Error types for the skillgraph-search crate.

use thiserror::Error;

use skillgraph_core::ErrorKind;
use skillgraph_graph::GraphError;

/// A query that could not be answered. Carries the query text for retry.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Could not parse intent of {query:?} after {attempts} attempt(s): {reason}")]
    IntentParseFailed {
        query: String,
        attempts: u32,
        reason: String,
        /// Truncated model output from the last attempt, when it was malformed.
        raw_excerpt: Option<String>,
    },

    #[error("Graph store failed while answering {query:?}: {source}")]
    Storage {
        query: String,
        #[source]
        source: GraphError,
    },
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyQuery => ErrorKind::EmptyQuery,
            Self::IntentParseFailed { .. } => ErrorKind::IntentParseFailed,
            Self::Storage { source, .. } => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
