//! saberrag CLI - serve the sabermetrics retrieval tool
//!
//! # Usage
//!
//! ```bash
//! # MCP over stdio (for agent hosts that spawn the server)
//! saberrag
//!
//! # MCP over HTTP
//! saberrag --transport sse --port 8000
//! saberrag --transport streamable-http --mount-path /rag
//!
//! # One retrieval, JSON on stdout
//! saberrag --test-query "OPS가 뭐야?"
//! ```
//!
//! Logging goes to stderr and is controlled by `SABERRAG_LOG`
//! (e.g. `SABERRAG_LOG=debug saberrag --transport sse`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use saberrag_lib::{
    config::{Config, EmbeddingProvider},
    embed::{Embedder, GeminiEmbedder, HashEmbedder},
    search::SearchEngine,
    server::{serve, ServerOptions, Transport},
    tool::SabermetricsRag,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saberrag")]
#[command(about = "Run the sabermetrics RAG MCP server or a quick test query")]
#[command(version)]
struct Cli {
    /// Transport protocol for the MCP server
    #[arg(long, value_enum)]
    transport: Option<CliTransport>,

    /// Host for SSE/HTTP transports
    #[arg(long)]
    host: Option<String>,

    /// Port for SSE/HTTP transports
    #[arg(long)]
    port: Option<u16>,

    /// Mount path for SSE/HTTP transports
    #[arg(long)]
    mount_path: Option<String>,

    /// Run a single RAG query and print JSON, then exit
    #[arg(long)]
    test_query: Option<String>,

    /// Config file (defaults to ./saberrag.toml when present)
    #[arg(long, env = "SABERRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Number of chunks to return
    #[arg(short = 'k', long = "top-k", value_parser = clap::value_parser!(u64).range(1..))]
    top_k: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliTransport {
    Stdio,
    Sse,
    StreamableHttp,
}

impl From<CliTransport> for Transport {
    fn from(transport: CliTransport) -> Self {
        match transport {
            CliTransport::Stdio => Transport::Stdio,
            CliTransport::Sse => Transport::Sse,
            CliTransport::StreamableHttp => Transport::StreamableHttp,
        }
    }
}

/// Everything resolved from flags, config and defaults (in that order)
struct Settings {
    config: Config,
    k: usize,
    test_query: Option<String>,
    server: ServerOptions,
}

impl Settings {
    fn resolve(cli: Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::from_path(path)?,
            None => Config::load()?,
        };

        let k = cli
            .top_k
            .map(|k| usize::try_from(k).unwrap_or(usize::MAX))
            .unwrap_or_else(|| config.retrieval.k());
        let server = ServerOptions {
            transport: cli
                .transport
                .map(Transport::from)
                .unwrap_or_else(|| config.server.transport()),
            host: cli.host.unwrap_or_else(|| config.server.host().to_string()),
            port: cli.port.unwrap_or_else(|| config.server.port()),
            mount_path: cli
                .mount_path
                .unwrap_or_else(|| config.server.mount_path().to_string()),
        };

        Ok(Self {
            config,
            k,
            test_query: cli.test_query,
            server,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries protocol traffic, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("SABERRAG_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::resolve(Cli::parse())?;
    let embedding = &settings.config.embedding;

    match embedding.provider() {
        EmbeddingProvider::Gemini => run(GeminiEmbedder::from_env(embedding.model()), &settings).await,
        EmbeddingProvider::Hash => run(HashEmbedder::new(embedding.dimension()), &settings).await,
        EmbeddingProvider::Fastembed => run_fastembed(&settings).await,
    }
}

#[cfg(feature = "fastembed")]
async fn run_fastembed(settings: &Settings) -> Result<()> {
    info!("loading local embedding model (first run downloads it)");
    run(saberrag_lib::embed::E5Embedder::new()?, settings).await
}

#[cfg(not(feature = "fastembed"))]
async fn run_fastembed(_settings: &Settings) -> Result<()> {
    anyhow::bail!("provider \"fastembed\" needs a build with `--features fastembed`")
}

async fn run<E: Embedder>(embedder: E, settings: &Settings) -> Result<()> {
    let config = &settings.config;
    info!(
        model = embedder.model_name(),
        primary = %config.primary_path().display(),
        k = settings.k,
        "starting sabermetrics retrieval"
    );

    let engine = SearchEngine::new(embedder, config.source_set(), config.chunker()?)
        .with_embed_timeout(config.embedding.timeout());
    let rag = SabermetricsRag::new(engine).with_default_k(settings.k);

    if let Some(query) = &settings.test_query {
        let response = rag.respond(query, None).await;
        println!("{}", response.to_json());
        return Ok(());
    }

    serve(rag, &settings.server).await?;
    Ok(())
}
