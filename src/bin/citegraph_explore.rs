

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use citegraph::core::events::JsonLinesSink;
use citegraph::store::Corpus;
use citegraph::{
    CachedEmbedder, EmbeddingProvider, ExplorationSession, ExplorerConfig, HttpEmbeddingProvider,
    ScoreCache,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const USAGE: &str = "usage: citegraph-explore <corpus.json> <root-id> [start-id]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn").add_directive("citegraph=info".parse().unwrap()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(corpus_path), Some(root_id)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let start_id = args.next();

    let config_path = std::env::var("CITEGRAPH_CONFIG").ok().map(PathBuf::from);
    let config = ExplorerConfig::load(config_path.as_deref()).context("loading configuration")?;

    let corpus = Corpus::load(Path::new(&corpus_path))
        .await
        .with_context(|| format!("loading corpus {}", corpus_path))?;
    let (papers, relations) = corpus.into_stores(config.title_match_threshold);

    let provider = HttpEmbeddingProvider::from_config(&config).context("building embedding provider")?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(CachedEmbedder::new(
        Arc::new(provider),
        config.embedding_cache_size,
        config.embedding_cache_ttl_secs,
    ));

    let session = ExplorationSession::new(
        config,
        Arc::new(papers),
        Arc::new(ScoreCache::new(Arc::new(relations))),
        embedder,
        Arc::new(JsonLinesSink::new(tokio::io::stdout())),
    );

    let outcome = session.run_with_defaults(&root_id, start_id.as_deref()).await?;
    info!(
        "Session {} finished: {}",
        outcome.session_id,
        serde_json::to_string(&outcome)?
    );
    Ok(())
}
