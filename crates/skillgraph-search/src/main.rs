//! CLI entry point for skillgraph-search.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use skillgraph_core::AppConfig;
use skillgraph_graph::{GraphClient, GraphConfig, GraphProjector, GraphStore};
use skillgraph_llm::AnthropicClient;

use skillgraph_search::{IntentParser, QueryPlanner, SearchEngine};

#[derive(Parser)]
#[command(name = "skillgraph-search")]
#[command(about = "Ask questions about people, skills and projects in the knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file prefix (default: skillgraph).
    #[arg(short, long, default_value = "skillgraph", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a natural-language question.
    Query {
        /// The question, e.g. "Who knows React?".
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Print a bounded node/link view of the graph.
    Graph {
        /// Maximum nodes (default: search.graph_node_limit, at most 500).
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print node and relationship counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let graph = Arc::new(GraphClient::connect(&GraphConfig::from_settings(&config.neo4j)).await?);

    match cli.command {
        Commands::Query { question } => {
            let question = question.join(" ");
            let model = AnthropicClient::from_settings(&config.llm)?;
            let parser = IntentParser::from_settings(Arc::new(model), &config.llm);
            let planner = QueryPlanner::new(config.skills.registry())
                .with_candidate_limit(config.search.candidate_limit);
            let engine = SearchEngine::new(parser, graph)
                .with_planner(planner)
                .with_result_limit(config.search.result_limit);

            match engine.search(&question).await {
                Ok(response) => println!("{}", serde_json::to_string(&response)?),
                Err(e) => {
                    println!(
                        "{}",
                        json!({ "query": question, "kind": e.kind(), "error": e.to_string() })
                    );
                    anyhow::bail!("query failed: {e}");
                }
            }
        }
        Commands::Graph { limit } => {
            let limit = limit.unwrap_or(config.search.graph_node_limit);
            let view = GraphProjector::new(graph.as_ref()).project(Some(limit)).await?;
            println!("{}", serde_json::to_string(&view)?);
        }
        Commands::Stats => {
            let counts = graph.counts().await?;
            println!(
                "{}",
                json!({
                    "nodes": counts.nodes(),
                    "relationships": counts.relationships(),
                    "counts": counts,
                })
            );
        }
    }

    Ok(())
}
