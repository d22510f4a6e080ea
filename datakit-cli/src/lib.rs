//! Command-line front end for datakit.
//!
//! Datasets are read from and written to JSON files. `rank` works offline
//! against a literal query vector; `ingest` and `query` call the OpenAI
//! embeddings API (`OPENAI_API_KEY`, optionally `OPENAI_BASE_URL`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use datakit_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K};
use datakit_rag::{
    Dataset, EmbeddingProvider, OpenAIEmbeddingProvider, RagConfig, RagService, ScoredResult,
    rank_with_threshold,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ingest documents and run similarity search over JSON datasets.
#[derive(Debug, Parser)]
#[command(name = "datakit", version, about)]
pub struct Cli {
    /// Log at debug level regardless of `RUST_LOG`.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank a pre-embedded dataset against a query vector given as a JSON array.
    Rank {
        /// Dataset JSON file.
        #[arg(long)]
        dataset: PathBuf,
        /// Query embedding, e.g. `[0.1, 0.9]`.
        #[arg(long)]
        embedding: String,
        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
    /// Split and embed every document, then write the dataset back.
    Ingest {
        /// Dataset JSON file.
        #[arg(long)]
        dataset: PathBuf,
        /// Where to write the processed dataset. Defaults to overwriting `--dataset`.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Maximum chunk size in characters.
        #[arg(long, env = "DATAKIT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Characters shared between consecutive chunks.
        #[arg(long, env = "DATAKIT_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Embed a text query and return the most similar chunks.
    Query {
        /// Dataset JSON file.
        #[arg(long)]
        dataset: PathBuf,
        /// Free-text query.
        #[arg(long)]
        query: String,
        #[command(flatten)]
        retrieval: RetrievalArgs,
        #[command(flatten)]
        model: ModelArgs,
    },
}

/// Options shared by the ranking commands.
#[derive(Debug, Clone, Args)]
pub struct RetrievalArgs {
    /// Number of results to return.
    #[arg(short = 'k', long, env = "DATAKIT_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
    /// Drop results with similarity below this value.
    #[arg(long, env = "DATAKIT_MIN_SIMILARITY")]
    pub min_similarity: Option<f32>,
}

/// Embedding model selection.
#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Embedding model name. Defaults to `text-embedding-3-small`.
    #[arg(long, env = "DATAKIT_EMBEDDING_MODEL")]
    pub model: Option<String>,
}

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Execute a parsed command and return what should be printed to stdout.
///
/// # Errors
///
/// Fails on unreadable or invalid dataset files, invalid options, or
/// embedding API failures.
pub async fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Command::Rank { dataset, embedding, retrieval } => {
            let dataset = load_dataset(&dataset)?;
            let query = parse_embedding(&embedding)?;
            let results = rank_command(&dataset, &query, &retrieval)?;
            to_pretty_json(&results)
        }
        Command::Ingest { dataset, output, chunk_size, chunk_overlap, model } => {
            let config =
                RagConfig::builder().chunk_size(chunk_size).chunk_overlap(chunk_overlap).build()?;
            let provider = openai_provider(&model)?;
            let output = output.unwrap_or_else(|| dataset.clone());
            let summary = ingest_command(&dataset, &output, config, provider).await?;
            Ok(summary.to_string())
        }
        Command::Query { dataset, query, retrieval, model } => {
            let dataset = load_dataset(&dataset)?;
            let provider = openai_provider(&model)?;
            let results = query_command(&dataset, &query, &retrieval, provider).await?;
            to_pretty_json(&results)
        }
    }
}

/// Rank `dataset` against a literal query vector.
///
/// # Errors
///
/// Fails if the retrieval options are invalid.
pub fn rank_command(
    dataset: &Dataset,
    query: &[f32],
    retrieval: &RetrievalArgs,
) -> Result<Vec<ScoredResult>> {
    let config = retrieval_config(retrieval)?;
    let results =
        rank_with_threshold(query, dataset.chunks(), config.top_k, config.min_similarity)?;
    info!(dataset.id = %dataset.id, result_count = results.len(), "ranked dataset");
    Ok(results)
}

/// Process every document in the dataset at `input` and write it to `output`.
///
/// Returns a JSON summary of what was written.
///
/// # Errors
///
/// Fails if the dataset cannot be read or written, or embedding fails.
pub async fn ingest_command(
    input: &Path,
    output: &Path,
    config: RagConfig,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<serde_json::Value> {
    let mut dataset = load_dataset(input)?;
    let service = RagService::builder().config(config).embedding_provider(provider).build()?;
    let chunks = service.process_dataset(&mut dataset).await?;
    save_dataset(output, &dataset)?;

    Ok(json!({
        "dataset": dataset.id,
        "documents": dataset.documents.len(),
        "chunks": chunks,
        "output": output.display().to_string(),
    }))
}

/// Embed `query` and rank `dataset` against it.
///
/// # Errors
///
/// Fails if the retrieval options are invalid or embedding fails.
pub async fn query_command(
    dataset: &Dataset,
    query: &str,
    retrieval: &RetrievalArgs,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<Vec<ScoredResult>> {
    let config = retrieval_config(retrieval)?;
    let top_k = config.top_k;
    let service = RagService::builder().config(config).embedding_provider(provider).build()?;
    Ok(service.query_dataset(dataset, query, top_k).await?)
}

fn retrieval_config(retrieval: &RetrievalArgs) -> Result<RagConfig> {
    let mut builder = RagConfig::builder().top_k(retrieval.top_k);
    if let Some(threshold) = retrieval.min_similarity {
        builder = builder.min_similarity(threshold);
    }
    Ok(builder.build()?)
}

fn openai_provider(model: &ModelArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    let mut provider = OpenAIEmbeddingProvider::from_env()?;
    if let Some(name) = &model.model {
        provider = provider.with_model(name);
    }
    Ok(Arc::new(provider))
}

/// Parse a JSON array of numbers into a query vector.
///
/// An empty array is accepted; ranking against it yields no results.
///
/// # Errors
///
/// Fails if `raw` is not a JSON array of numbers.
pub fn parse_embedding(raw: &str) -> Result<Vec<f32>> {
    serde_json::from_str(raw)
        .with_context(|| format!("query embedding must be a JSON array of numbers: {raw}"))
}

/// Read a dataset from a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid dataset.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    Dataset::from_json(&text).with_context(|| format!("invalid dataset JSON in {}", path.display()))
}

/// Write a dataset to a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be written.
pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let text = dataset.to_json_pretty()?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write dataset {}", path.display()))
}

fn to_pretty_json(results: &[ScoredResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}
