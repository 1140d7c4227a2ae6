//! Document ingestion: extraction followed by one atomic upsert.
//!
//! Extraction and storage are separate failure domains. A storage failure
//! never triggers a second model call for the same document.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use skillgraph_core::ExtractionResult;
use skillgraph_graph::{UpsertEngine, UpsertStats};

use crate::document::Document;
use crate::error::{IngestError, Result};
use crate::extractor::ExtractionAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    pub people_count: usize,
    pub projects_count: usize,
    pub relationships_count: usize,
}

impl ExtractionSummary {
    pub fn of(extraction: &ExtractionResult) -> Self {
        Self {
            people_count: extraction.people.len(),
            projects_count: extraction.project_count(),
            relationships_count: extraction.relationship_count(),
        }
    }
}

/// What one document contributed to the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub filename: String,
    pub fingerprint: String,
    pub text_length: usize,
    pub extraction: ExtractionSummary,
    pub storage: UpsertStats,
}

#[derive(Clone)]
pub struct IngestPipeline {
    adapter: ExtractionAdapter,
    engine: UpsertEngine,
}

impl IngestPipeline {
    pub fn new(adapter: ExtractionAdapter, engine: UpsertEngine) -> Self {
        Self { adapter, engine }
    }

    /// Extract and store one document.
    pub async fn ingest(&self, document: &Document) -> Result<UploadSummary> {
        tracing::info!(
            document = %document.name,
            fingerprint = %document.short_fingerprint(),
            chars = document.text_length(),
            "Ingesting document"
        );

        let extraction = self.adapter.extract(document).await?;
        let summary = ExtractionSummary::of(&extraction);

        let storage = self
            .engine
            .upsert(&extraction)
            .await
            .map_err(|source| {
                tracing::error!(document = %document.name, error = %source, "Upsert failed");
                IngestError::Storage {
                    document: document.name.clone(),
                    source,
                }
            })?;

        tracing::info!(
            document = %document.name,
            people = summary.people_count,
            projects = summary.projects_count,
            people_inserted = storage.people_inserted,
            skills_linked = storage.skills_linked,
            "Document ingested"
        );

        Ok(UploadSummary {
            filename: document.name.clone(),
            fingerprint: document.fingerprint.clone(),
            text_length: document.text_length(),
            extraction: summary,
            storage,
        })
    }

    /// Ingest documents concurrently, at most `concurrency` at a time.
    ///
    /// Results are returned in input order, one per document.
    pub async fn ingest_many(
        &self,
        documents: Vec<Document>,
        concurrency: usize,
    ) -> Vec<Result<UploadSummary>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(documents.len());

        for document in documents {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();
            let name = document.name.clone();
            let fingerprint = document.fingerprint.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                pipeline.ingest(&document).await
            });
            handles.push((name, fingerprint, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (name, fingerprint, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(document = %name, error = %e, "Ingestion task panicked");
                    Err(IngestError::ExtractionFailed {
                        document: name,
                        fingerprint,
                        attempts: 0,
                        reason: format!("ingestion task aborted: {e}"),
                        raw_excerpt: None,
                    })
                }
            };
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgraph_core::ErrorKind;
    use skillgraph_graph::{GraphStore, MemoryGraph};
    use skillgraph_llm::{RetryPolicy, ScriptedModel};
    use std::time::Duration;

    const SARAH: &str = r#"{"people": [{"name": "Sarah Chen", "hard_skills": ["React"], "soft_skills": [],
        "projects": [{"project": "API Migration", "role": "Lead"}]}], "projects": []}"#;

    const OMAR: &str = r#"{"people": [{"name": "Omar Haddad", "hard_skills": ["Go", "React"], "soft_skills": ["mentoring"],
        "projects": [{"project": "API Migration", "role": "Backend"}]}],
        "projects": [{"name": "API Migration", "description": "REST to gRPC", "technologies": ["Go"]}]}"#;

    fn pipeline(responses: Vec<&str>, graph: Arc<MemoryGraph>) -> (IngestPipeline, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(
            responses.into_iter().map(|r| Ok(r.to_string())).collect(),
        ));
        let adapter = ExtractionAdapter::new(model.clone())
            .with_policy(RetryPolicy::immediate(2, Duration::from_secs(1)));
        (IngestPipeline::new(adapter, UpsertEngine::new(graph)), model)
    }

    #[tokio::test]
    async fn reingesting_same_document_inserts_nothing() {
        let graph = Arc::new(MemoryGraph::new());
        let (pipeline, _) = pipeline(vec![SARAH, SARAH], graph.clone());
        let doc = Document::new("status.txt", "Sarah Chen leads the API Migration with React.");

        let first = pipeline.ingest(&doc).await.unwrap();
        assert_eq!(first.storage.people_inserted, 1);
        assert_eq!(first.storage.skills_linked, 1);
        assert_eq!(first.storage.relationships_created, 1);
        assert_eq!(first.extraction.people_count, 1);
        assert_eq!(first.extraction.projects_count, 1);
        assert_eq!(first.extraction.relationships_count, 1);

        let counts_after_first = graph.counts().await.unwrap();
        let second = pipeline.ingest(&doc).await.unwrap();
        assert_eq!(second.storage.people_inserted, 0);
        assert_eq!(second.storage.skills_linked, 0);
        assert_eq!(second.storage.inserted_total(), 0);
        assert_eq!(second.storage.people_merged, 1);
        assert_eq!(graph.counts().await.unwrap(), counts_after_first);
    }

    #[tokio::test]
    async fn storage_failure_is_not_retried_through_the_model() {
        let graph = Arc::new(MemoryGraph::new());
        graph.set_unavailable(true);
        let (pipeline, model) = pipeline(vec![SARAH, SARAH], graph.clone());

        let err = pipeline
            .ingest(&Document::new("status.txt", "Sarah Chen"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert_eq!(err.document(), "status.txt");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_ingest_keeps_input_order() {
        let graph = Arc::new(MemoryGraph::new());
        let (pipeline, _) = pipeline(vec![SARAH, OMAR, "not json"], graph.clone());
        let pipeline = IngestPipeline {
            adapter: pipeline
                .adapter
                .with_policy(RetryPolicy::immediate(0, Duration::from_secs(1))),
            ..pipeline
        };

        let docs = vec![
            Document::new("a.txt", "first"),
            Document::new("b.txt", "second"),
            Document::new("c.txt", "third"),
        ];
        let results = pipeline.ingest_many(docs, 2).await;

        assert_eq!(results.len(), 3);
        let failures: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
        assert_eq!(failures.len(), 1);
        for (result, name) in results.iter().zip(["a.txt", "b.txt", "c.txt"]) {
            match result {
                Ok(summary) => assert_eq!(summary.filename, name),
                Err(e) => assert_eq!(e.document(), name),
            }
        }

        let counts = graph.counts().await.unwrap();
        assert_eq!(counts.people, 2);
        assert_eq!(counts.projects, 1);
        assert_eq!(counts.project_assignments, 2);
    }

    #[test]
    fn upload_summary_shape() {
        let summary = UploadSummary {
            filename: "status.txt".to_string(),
            fingerprint: "abc".to_string(),
            text_length: 42,
            extraction: ExtractionSummary {
                people_count: 1,
                projects_count: 1,
                relationships_count: 1,
            },
            storage: UpsertStats::default(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["extraction"]["people_count"], 1);
        assert_eq!(json["storage"]["people_inserted"], 0);
        assert_eq!(json["storage"]["technologies_linked"], 0);
        assert_eq!(json["storage"]["relationships_created"], 0);
    }
}
