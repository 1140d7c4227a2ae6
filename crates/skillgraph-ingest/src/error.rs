//! Error types for the skillgraph-ingest crate.

use thiserror::Error;

use skillgraph_core::ErrorKind;
use skillgraph_graph::GraphError;

/// A document that could not be ingested. Always names the document.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Document {document} ({fingerprint}) contains no text")]
    EmptyDocument {
        document: String,
        fingerprint: String,
    },

    #[error("Extraction failed for {document} ({fingerprint}) after {attempts} attempt(s): {reason}")]
    ExtractionFailed {
        document: String,
        fingerprint: String,
        attempts: u32,
        reason: String,
        /// Truncated model output from the last attempt, when it was malformed.
        raw_excerpt: Option<String>,
    },

    #[error("Storing extraction for {document} failed: {source}")]
    Storage {
        document: String,
        #[source]
        source: GraphError,
    },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDocument { .. } | Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::Storage { source, .. } => source.kind(),
        }
    }

    pub fn document(&self) -> &str {
        match self {
            Self::EmptyDocument { document, .. }
            | Self::ExtractionFailed { document, .. }
            | Self::Storage { document, .. } => document,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
