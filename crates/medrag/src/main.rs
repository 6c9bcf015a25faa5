//! # medrag CLI
//!
//! Command-line interface for chunking the DSM-5 manual, indexing the chunks
//! and running hybrid keyword/vector retrieval over them.
//!
//! ## Commands
//!
//! - `medrag chunk <INPUT>` - Parse a PDF or text export into chunks
//! - `medrag index create|upload|delete|status` - Manage the search index
//! - `medrag search <QUERY>` - Hybrid search with rank fusion
//! - `medrag criteria <DISORDER>` - Criteria-anchored lookup
//! - `medrag config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! medrag chunk dsm5.pdf -o chunks.json
//! medrag index upload chunks.json --recreate
//! medrag search "triệu chứng trầm cảm" --top-k 5 --context
//! medrag criteria "Rối loạn trầm cảm chủ yếu" --criterion A --format json
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medrag_chunker::{save_chunks, ChunkPipeline, ChunkStats};
use medrag_core::SearchIndex;
use medrag_embed::{build_embedder, EmbedderPool};
use medrag_extract::ExtractorRegistry;
use medrag_index::{load_chunks, DocumentIndexer, IndexerConfig};
use medrag_query::{format_context_for_llm, HybridRetriever};
use medrag_store::{ElasticIndex, MemoryIndex};
use serde::Serialize;
use tracing::{info, warn};

mod config;
mod logging;

use config::{Config, SearchBackend, SearchConfig};

#[derive(Parser)]
#[command(name = "medrag")]
#[command(about = "Hierarchical chunking and hybrid retrieval over the DSM-5 manual")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/medrag/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document into hierarchical chunks
    Chunk {
        /// PDF or text file
        input: PathBuf,

        /// Output JSON file (default: <INPUT>.chunks.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Document name recorded on each chunk (default: input file name)
        #[arg(long)]
        source: Option<String>,
    },

    /// Manage the search index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Hybrid keyword + vector search
    Search {
        /// Query string
        query: String,

        /// Maximum results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// RRF rank constant
        #[arg(long)]
        rrf_k: Option<u32>,

        /// Weight of the keyword list
        #[arg(long)]
        keyword_weight: Option<f64>,

        /// Weight of the vector list
        #[arg(long)]
        vector_weight: Option<f64>,

        /// kNN candidates per shard
        #[arg(long)]
        num_candidates: Option<usize>,

        /// Attach sibling and parent sections
        #[arg(long)]
        context: bool,

        /// Print the LLM context block instead of the result list
        #[arg(long)]
        llm_context: bool,

        /// Character budget of the LLM context block
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Find diagnostic criteria of a disorder
    Criteria {
        /// Disorder name
        disorder: String,

        /// Criterion letter (A, B, ...)
        #[arg(long)]
        criterion: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Create the index with the configured embedding dimension
    Create {
        /// Drop an existing index first
        #[arg(long)]
        recreate: bool,
    },
    /// Embed and upload a chunk file
    Upload {
        /// Chunk file written by `medrag chunk`
        chunks: PathBuf,

        /// Drop and recreate the index first
        #[arg(long)]
        recreate: bool,

        /// Chunks per embedding and bulk request
        #[arg(short, long)]
        batch_size: Option<usize>,
    },
    /// Delete the index
    Delete,
    /// Show document count
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a sample configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ChunkOutput {
    input: String,
    output: String,
    pages: usize,
    stats: ChunkStats,
}

#[derive(Serialize)]
struct StatusOutput {
    index: String,
    backend: SearchBackend,
    exists: bool,
    documents: u64,
}

/// The configured index plus what is needed to persist it.
enum Backend {
    Elastic(Arc<ElasticIndex>),
    Memory {
        index: Arc<MemoryIndex>,
        snapshot: PathBuf,
    },
}

impl Backend {
    async fn open(config: &SearchConfig) -> Result<Self> {
        match config.backend {
            SearchBackend::Elasticsearch => {
                let index = ElasticIndex::new(&config.elastic())
                    .context("Failed to configure Elasticsearch client")?;
                Ok(Self::Elastic(Arc::new(index)))
            }
            SearchBackend::Memory => {
                let snapshot = config
                    .snapshot_path()
                    .context("Failed to determine snapshot path")?;
                let index = if snapshot.exists() {
                    MemoryIndex::load_snapshot(config.index_name.clone(), &snapshot)
                        .await
                        .with_context(|| format!("Failed to load {}", snapshot.display()))?
                } else {
                    MemoryIndex::new(config.index_name.clone())
                };
                Ok(Self::Memory {
                    index: Arc::new(index),
                    snapshot,
                })
            }
        }
    }

    fn index(&self) -> Arc<dyn SearchIndex> {
        match self {
            Self::Elastic(index) => index.clone() as Arc<dyn SearchIndex>,
            Self::Memory { index, .. } => index.clone() as Arc<dyn SearchIndex>,
        }
    }

    async fn exists(&self) -> Result<bool> {
        match self {
            Self::Elastic(index) => Ok(index.exists().await?),
            Self::Memory { snapshot, .. } => Ok(snapshot.exists()),
        }
    }

    /// Write the memory snapshot; Elasticsearch persists on its own.
    async fn persist(&self) -> Result<()> {
        if let Self::Memory { index, snapshot } = self {
            index
                .save_snapshot(snapshot)
                .await
                .with_context(|| format!("Failed to write {}", snapshot.display()))?;
        }
        Ok(())
    }

    /// Remove the memory snapshot after a delete.
    async fn discard(&self) -> Result<()> {
        if let Self::Memory { snapshot, .. } = self {
            if snapshot.exists() {
                tokio::fs::remove_file(snapshot)
                    .await
                    .with_context(|| format!("Failed to remove {}", snapshot.display()))?;
            }
        }
        Ok(())
    }
}

fn retriever(config: &Config, backend: &Backend) -> Result<HybridRetriever> {
    let embedder =
        build_embedder(&config.embedding.provider).context("Failed to initialize embedder")?;
    Ok(HybridRetriever::new(embedder, backend.index()).with_timeouts(config.retrieval.timeouts()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(Some(path.clone()))?,
        None => Config::load()?,
    };
    logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Chunk {
            input,
            output,
            source,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("chunks.json"));
            chunk(&config, cli.format, &input, &output, source).await?;
        }

        Commands::Index { action } => {
            let backend = Backend::open(&config.search).await?;
            index(&config, cli.format, &backend, action).await?;
        }

        Commands::Search {
            query,
            top_k,
            rrf_k,
            keyword_weight,
            vector_weight,
            num_candidates,
            context,
            llm_context,
            max_chars,
        } => {
            let backend = Backend::open(&config.search).await?;
            let retriever = retriever(&config, &backend)?;

            let mut params = config.retrieval.params.clone();
            params.top_k = top_k.unwrap_or(params.top_k);
            params.rrf_k = rrf_k.unwrap_or(params.rrf_k);
            params.keyword_weight = keyword_weight.unwrap_or(params.keyword_weight);
            params.vector_weight = vector_weight.unwrap_or(params.vector_weight);
            params.num_candidates = num_candidates.unwrap_or(params.num_candidates);
            params.include_context |= context;

            let results = retriever.hybrid_search(&query, &params).await?;

            if llm_context {
                let max_chars = max_chars.unwrap_or(config.retrieval.max_context_chars);
                println!("{}", format_context_for_llm(&results, max_chars));
                return Ok(());
            }

            match cli.format {
                OutputFormat::Json => print_json(&results)?,
                OutputFormat::Text => {
                    println!("Query: {query}\n");
                    if results.is_empty() {
                        println!("No results found.");
                    }
                    for (i, result) in results.iter().enumerate() {
                        println!(
                            "{}. [{}] {} (rrf: {:.4})",
                            i + 1,
                            result.section_id.as_deref().unwrap_or("N/A"),
                            result.title,
                            result.scores.rrf
                        );
                        if let Some(sub_title) = &result.sub_title {
                            println!("   Tiêu chí: {sub_title}");
                        }
                        println!("   {}", truncate(&result.content, 200));
                        for related in &result.related_sections {
                            println!(
                                "   + [{}] {}",
                                related.section_id.as_deref().unwrap_or("N/A"),
                                related.title
                            );
                        }
                        println!();
                    }
                }
            }
        }

        Commands::Criteria {
            disorder,
            criterion,
        } => {
            let backend = Backend::open(&config.search).await?;
            let retriever = retriever(&config, &backend)?;
            let matches = retriever
                .search_by_criteria(&disorder, criterion.as_deref())
                .await?;

            match cli.format {
                OutputFormat::Json => print_json(&matches)?,
                OutputFormat::Text => {
                    if matches.is_empty() {
                        println!("No criteria found for {disorder}.");
                    }
                    for (i, m) in matches.iter().enumerate() {
                        println!(
                            "{}. [{}] {} (score: {:.3})",
                            i + 1,
                            m.section_id.as_deref().unwrap_or("N/A"),
                            m.title,
                            m.score
                        );
                        if let Some(sub_title) = &m.sub_title {
                            println!("   Tiêu chí: {sub_title}");
                        }
                        println!("   {}\n", truncate(&m.content, 200));
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => print_json(&config)?,
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init { force } => {
                let path = Config::config_path().context("Failed to determine config path")?;
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                std::fs::write(&path, Config::sample_toml())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
            ConfigAction::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("Could not determine config path"),
            },
        },
    }

    Ok(())
}

async fn chunk(
    config: &Config,
    format: OutputFormat,
    input: &Path,
    output: &Path,
    source: Option<String>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("File does not exist: {}", input.display());
    }

    let pipeline =
        ChunkPipeline::new(config.chunking.clone()).context("Invalid chunking configuration")?;
    let pages = ExtractorRegistry::with_defaults()
        .extract(input)
        .await
        .with_context(|| format!("Failed to extract {}", input.display()))?;

    let source = source.unwrap_or_else(|| {
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let chunks = pipeline.process_pages(&pages, &source);
    if chunks.is_empty() {
        warn!(input = %input.display(), "no numbered sections found");
    }
    save_chunks(output, &chunks).context("Failed to write chunk file")?;

    let stats = ChunkStats::compute(&chunks, config.chunking.max_chunk_size);
    info!(chunks = stats.total, output = %output.display(), "chunking complete");

    match format {
        OutputFormat::Json => print_json(&ChunkOutput {
            input: input.display().to_string(),
            output: output.display().to_string(),
            pages: pages.len(),
            stats,
        })?,
        OutputFormat::Text => {
            println!("Chunked {} ({} pages)", input.display(), pages.len());
            println!("  Chunks:    {}", stats.total);
            println!("  Split:     {}", stats.split);
            println!("  Merged:    {}", stats.merged);
            println!("  Short:     {}", stats.short);
            println!("  Oversized: {}", stats.oversized);
            println!(
                "  Size:      min {} / avg {:.0} / max {}",
                stats.min_chars, stats.avg_chars, stats.max_chars
            );
            println!("Written to {}", output.display());
        }
    }
    Ok(())
}

async fn index(
    config: &Config,
    format: OutputFormat,
    backend: &Backend,
    action: IndexAction,
) -> Result<()> {
    let index = backend.index();

    match action {
        IndexAction::Create { recreate } => {
            if recreate && index.delete_index().await? {
                info!(index = index.name(), "deleted existing index");
            }
            let created = index
                .create_index(config.embedding.provider.dimension)
                .await?;
            backend.persist().await?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "index": index.name(),
                    "created": created,
                }))?,
                OutputFormat::Text if created => println!("Created index {}", index.name()),
                OutputFormat::Text => println!("Index {} already exists", index.name()),
            }
        }

        IndexAction::Upload {
            chunks,
            recreate,
            batch_size,
        } => {
            let chunks = load_chunks(&chunks)
                .await
                .with_context(|| format!("Failed to load {}", chunks.display()))?;
            let batch_size = batch_size.unwrap_or(config.embedding.batch_size).max(1);

            let embedder = build_embedder(&config.embedding.provider)
                .context("Failed to initialize embedder")?;
            let pool = EmbedderPool::new(embedder, config.embedding.max_concurrent)
                .with_batch_size(batch_size);
            let indexer = DocumentIndexer::new(
                index.clone(),
                Arc::new(pool),
                IndexerConfig {
                    batch_size,
                    recreate,
                },
            );

            indexer.prepare_index().await?;
            let report = indexer.index_chunks(&chunks).await?;
            backend.persist().await?;

            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => {
                    println!("Indexed into {}", report.index_name);
                    println!("  Chunks:  {}", report.total_chunks);
                    println!("  Indexed: {}", report.indexed);
                    println!("  Failed:  {}", report.failed);
                    println!(
                        "  Batches: {} ({} failed)",
                        report.batches, report.failed_batches
                    );
                    for error in &report.errors {
                        println!("  ! {}", truncate(error, 120));
                    }
                    let elapsed = report.finished_at - report.started_at;
                    println!("  Took:    {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
                }
            }
        }

        IndexAction::Delete => {
            let deleted = index.delete_index().await?;
            backend.discard().await?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "index": index.name(),
                    "deleted": deleted,
                }))?,
                OutputFormat::Text if deleted => println!("Deleted index {}", index.name()),
                OutputFormat::Text => println!("Index {} not found", index.name()),
            }
        }

        IndexAction::Status => {
            let exists = backend.exists().await?;
            let documents = if exists { index.count().await? } else { 0 };
            let status = StatusOutput {
                index: index.name().to_string(),
                backend: config.search.backend,
                exists,
                documents,
            };
            match format {
                OutputFormat::Json => print_json(&status)?,
                OutputFormat::Text if !exists => {
                    println!("Index {} not found", status.index);
                    println!("Run 'medrag index upload <CHUNKS>' to create it.");
                }
                OutputFormat::Text => {
                    println!("Index Status for {}", status.index);
                    println!("  Backend:   {:?}", status.backend);
                    println!("  Documents: {}", status.documents);
                }
            }
        }
    }
    Ok(())
}

/// Single-line preview of at most `max_chars` characters.
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_chars {
        s
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
