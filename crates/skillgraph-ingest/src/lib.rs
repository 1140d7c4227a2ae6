//! skillgraph-ingest: turn free-text documents into graph state.
//!
//! A [`Document`] goes through the [`ExtractionAdapter`] (language model plus
//! schema validation and skill canonicalization) and then through the graph
//! crate's upsert engine as one atomic batch. [`IngestPipeline`] ties the two
//! together and reports an [`UploadSummary`] per document.

pub mod document;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod prompts;

pub use document::Document;
pub use error::IngestError;
pub use extractor::ExtractionAdapter;
pub use pipeline::{ExtractionSummary, IngestPipeline, UploadSummary};
