//! CLI entry point for the encore-rag retrieval pipeline.
//!
//! Designed for subprocess invocation from the chat service:
//! reads a JSON request from stdin (or flags), writes a JSON result to stdout.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use encore_core::RetrievalConfig;
use encore_graph::{GraphClient, GraphConfig};
use encore_rag::{
    parse_relation_filter, EntityIndex, GraphRagOrchestrator, IndexEntry, RetrievalRequest,
};

#[derive(Parser)]
#[command(name = "encore-rag")]
#[command(about = "GraphRAG context retrieval for the Encore music knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: encore).
    #[arg(short, long, default_value = "encore", global = true)]
    config: String,

    /// Maximum named nodes loaded into the entity index.
    #[arg(long, default_value_t = 100_000, global = true)]
    index_limit: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve context for a question (reads a JSON request from stdin
    /// when --question is not given).
    Retrieve {
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        max_hops: Option<u32>,
        /// Restrict traversal to these relation types (repeatable).
        #[arg(long = "relation")]
        relations: Vec<String>,
        /// Also emit the answer prompt built from the context.
        #[arg(long)]
        prompt: bool,
    },
    /// Estimate question complexity without querying paths.
    Complexity {
        #[arg(long)]
        question: String,
    },
    /// Show the node stored under a name.
    Entity {
        #[arg(long)]
        name: String,
    },
    /// List entity names containing the given text.
    Similar {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let graph_config = load_graph_config(&cli.config);
    let graph = GraphClient::connect(&graph_config).await?;

    match cli.command {
        Command::Retrieve {
            question,
            max_hops,
            relations,
            prompt,
        } => {
            let request = match question {
                Some(question) => {
                    let mut request = RetrievalRequest::new(question);
                    request.max_hops = max_hops;
                    if !relations.is_empty() {
                        request.relation_filter = Some(parse_relation_filter(&relations)?);
                    }
                    request
                }
                None => {
                    let input = std::io::read_to_string(std::io::stdin())?;
                    serde_json::from_str(&input)?
                }
            };

            let orchestrator = build_orchestrator(graph, &cli.config, cli.index_limit).await?;
            let question = request.question.clone();
            let result = orchestrator.retrieve_context(request).await?;

            if prompt {
                let answer_prompt = orchestrator
                    .context_builder()
                    .answer_prompt(&result.context_text, &question);
                let output = serde_json::json!({ "result": result, "prompt": answer_prompt });
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("{}", serde_json::to_string(&result)?);
            }
        }
        Command::Complexity { ref question } => {
            let orchestrator = build_orchestrator(graph, &cli.config, cli.index_limit).await?;
            let complexity = orchestrator.analyze_complexity(question);
            println!("{}", serde_json::to_string(&complexity)?);
        }
        Command::Entity { ref name } => {
            let node = graph.entity_info(name).await?;
            println!("{}", serde_json::to_string(&node)?);
        }
        Command::Similar { ref name, limit } => {
            let names = graph.similar_entities(name, limit).await?;
            println!("{}", serde_json::to_string(&names)?);
        }
    }

    Ok(())
}

async fn build_orchestrator(
    graph: GraphClient,
    file_prefix: &str,
    index_limit: u32,
) -> anyhow::Result<GraphRagOrchestrator<GraphClient>> {
    let config = RetrievalConfig::load(file_prefix)?;
    let records = graph.fetch_index_entries(index_limit).await?;
    let index = EntityIndex::new(records.into_iter().map(IndexEntry::from).collect())?;
    tracing::info!(entities = index.len(), "Entity index loaded");
    Ok(GraphRagOrchestrator::new(graph, Arc::new(index), config))
}

fn load_graph_config(file_prefix: &str) -> GraphConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("ENCORE")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    let defaults = GraphConfig::default();
    match cfg {
        Ok(c) => GraphConfig {
            uri: c.get_string("neo4j.uri").unwrap_or(defaults.uri),
            user: c.get_string("neo4j.user").unwrap_or(defaults.user),
            password: c.get_string("neo4j.password").unwrap_or(defaults.password),
            max_connections: c
                .get_int("neo4j.max_connections")
                .ok()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_connections),
            fetch_size: c
                .get_int("neo4j.fetch_size")
                .ok()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(defaults.fetch_size),
        },
        Err(_) => defaults,
    }
}
