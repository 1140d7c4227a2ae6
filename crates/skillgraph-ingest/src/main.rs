//! CLI entry point for skillgraph-ingest.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use skillgraph_core::AppConfig;
use skillgraph_graph::{GraphClient, GraphConfig, UpsertEngine};
use skillgraph_llm::AnthropicClient;

use skillgraph_ingest::{Document, ExtractionAdapter, IngestPipeline};

#[derive(Parser)]
#[command(name = "skillgraph-ingest")]
#[command(about = "Extract people, skills and projects from documents into the knowledge graph")]
struct Cli {
    /// Plain-text documents to ingest.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum documents processed at once (default: ingest.max_concurrent_documents).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Config file prefix (default: skillgraph).
    #[arg(short, long, default_value = "skillgraph")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let model = AnthropicClient::from_settings(&config.llm)?;
    tracing::info!(model = %model.model(), "Language model configured");

    let graph = GraphClient::connect(&GraphConfig::from_settings(&config.neo4j)).await?;
    graph.ensure_schema().await?;

    let adapter = ExtractionAdapter::from_settings(Arc::new(model), &config.llm)
        .with_registry(config.skills.registry());
    let engine = UpsertEngine::new(Arc::new(graph));
    let pipeline = IngestPipeline::new(adapter, engine);

    let mut documents = Vec::with_capacity(cli.files.len());
    let mut failures = 0usize;
    for path in &cli.files {
        match Document::read(path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                failures += 1;
                tracing::error!(path = %path.display(), error = %e, "Failed to read document");
                println!(
                    "{}",
                    json!({ "filename": path.display().to_string(), "error": e.to_string() })
                );
            }
        }
    }

    let concurrency = cli
        .concurrency
        .unwrap_or(config.ingest.max_concurrent_documents);
    for result in pipeline.ingest_many(documents, concurrency).await {
        match result {
            Ok(summary) => println!("{}", serde_json::to_string(&summary)?),
            Err(e) => {
                failures += 1;
                println!(
                    "{}",
                    json!({ "filename": e.document(), "kind": e.kind(), "error": e.to_string() })
                );
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} document(s) failed", cli.files.len());
    }
    Ok(())
}
