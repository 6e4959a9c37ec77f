//! docsearch CLI: build the index from a folder of extracted text, then query it.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use docsearch::{
    DocSearchConfig, DocumentLoader, IndexBuilder, IndexStore, QueryService, answer_context,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsearch", version, about = "Search over documents by embedding similarity")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "docsearch.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from every document in the documents folder.
    Index {
        /// Override `ingest.documents_dir`.
        #[arg(long)]
        documents: Option<PathBuf>,
    },
    /// Print the chunks nearest to a query.
    Search {
        query: String,
        /// Number of chunks to return (defaults to `search.top_k`).
        #[arg(short)]
        k: Option<usize>,
    },
    /// Print the context an answer-generation model would receive.
    Context {
        question: String,
        #[arg(short)]
        k: Option<usize>,
    },
}

const PREVIEW_CHARS: usize = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docsearch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DocSearchConfig::load(Some(&cli.config))
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    match cli.command {
        Command::Index { documents } => run_index(config, documents).await,
        Command::Search { query, k } => run_search(config, &query, k).await,
        Command::Context { question, k } => run_context(config, &question, k).await,
    }
}

async fn run_index(mut config: DocSearchConfig, documents: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(documents) = documents {
        config.ingest.documents_dir = documents;
    }
    let folder = config.ingest.documents_dir.clone();

    if !folder.is_dir() {
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("failed to create {}", folder.display()))?;
        tracing::warn!(folder = %folder.display(), "documents folder did not exist, created it; add documents and rerun");
        return Ok(());
    }

    let documents = DocumentLoader::new(folder.clone())
        .load_documents()
        .with_context(|| format!("failed to read {}", folder.display()))?;
    if documents.is_empty() {
        tracing::warn!(folder = %folder.display(), "no documents found, nothing to index");
        return Ok(());
    }

    let gateway = docsearch::embedding::from_config(&config.embedding)?;
    let builder = IndexBuilder::from_config(gateway.clone(), &config)?;
    let store = IndexStore::new(config.index.dir.clone());
    let service = QueryService::new(gateway, config.embedding.timeout());

    let stats = service
        .rebuild(&builder, &documents, &store, config.index.io_timeout())
        .await
        .context("index build failed")?;

    println!(
        "Indexed {} documents ({} pages) into {} chunks of dimension {} at {}",
        stats.documents,
        stats.pages,
        stats.chunks,
        stats.dimension,
        store.dir().display()
    );
    Ok(())
}

async fn open_service(config: &DocSearchConfig) -> anyhow::Result<QueryService> {
    let gateway = docsearch::embedding::from_config(&config.embedding)?;
    let service = QueryService::new(gateway, config.embedding.timeout());
    let store = IndexStore::new(config.index.dir.clone());
    service
        .reload(&store, config.index.io_timeout())
        .await
        .context("failed to load index; run `docsearch index` first")?;
    Ok(service)
}

async fn run_search(config: DocSearchConfig, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    let service = open_service(&config).await?;
    let hits = service
        .search(query, k.unwrap_or(config.search.top_k))
        .await?;

    if hits.is_empty() {
        println!("No matching chunks found.");
        return Ok(());
    }
    for hit in hits {
        println!(
            "{} (distance {:.4}):\n{}...\n",
            hit.chunk.filename,
            hit.distance,
            preview(&hit.chunk.text)
        );
    }
    Ok(())
}

async fn run_context(config: DocSearchConfig, question: &str, k: Option<usize>) -> anyhow::Result<()> {
    let service = open_service(&config).await?;
    let chunks = service
        .retrieve(question, k.unwrap_or(config.search.top_k))
        .await?;
    println!("{}", answer_context(&chunks));
    Ok(())
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
