mod cascade;
mod classifier;
mod config;
mod core;
mod filter;
mod verifier;

use crate::cascade::orchestrator::{CascadeSettings, SentimentCascade};
use crate::cascade::stats::StatsTracker;
use crate::classifier::lexicon::LexiconModel;
use crate::config::config::AppCfg;
use crate::core::types::TextItem;
use crate::filter::relevance::RelevanceFilter;
use crate::verifier::batch::ExternalVerifier;
use crate::verifier::llm::LlmVerifier;
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cfg = AppCfg::load("config.yml")?;

    let span = info_span!(
        "Cascade",
        pid = %std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
    );
    let _enter = span.enter();

    info!("Starting up");

    info!("Initializing Client");
    let client = Client::builder()
        .user_agent(cfg.http.user_agent.clone())
        .pool_idle_timeout(cfg.http.pool_idle_timeout)
        .pool_max_idle_per_host(cfg.http.pool_max_idle_per_host)
        .tcp_keepalive(cfg.http.tcp_keep_alive)
        .timeout(cfg.http.timeout)
        .build()
        .expect("client");

    info!("Building cascade");
    let model = Arc::new(LexiconModel::new(cfg.cascade.max_input_len)?);

    // No credential means no verifier: the run degrades to local-only
    // rather than failing per item.
    let verifier = if cfg.cascade.ai_enabled && !cfg.verifier.api_key.is_empty() {
        let llm = LlmVerifier::new(client.clone(), cfg.verifier.clone());
        Some(ExternalVerifier::new(Arc::new(llm), cfg.verifier.clone()))
    } else {
        warn!("verifier credential missing or aiEnabled=false; running local-only");
        None
    };

    let stats = Arc::new(StatsTracker::new());
    let cascade = SentimentCascade::new(RelevanceFilter::new()?, model, verifier, stats.clone());

    let input_path = std::env::args()
        .nth(1)
        .context("usage: sentimind <items.jsonl>")?;
    let items = read_items(&input_path)?;
    info!("Loaded {} items from {}", items.len(), input_path);

    // Ctrl-C cancels the in-flight batch without corrupting stats.
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, cancelling batch");
            shutdown_signal.cancel();
        }
    });

    let settings = CascadeSettings::from(&cfg.cascade);
    let results = cascade.analyze_batch(&items, &settings, &shutdown).await?;

    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }

    let snapshot = stats.snapshot();
    info!(
        total = snapshot.total_analyzed,
        escalated = snapshot.escalated_count,
        errors = snapshot.external_errors,
        avg_local_confidence = snapshot.avg_local_confidence,
        "Run complete"
    );

    Ok(())
}

/// One `TextItem` JSON object per line; blank lines are skipped.
fn read_items(path: &str) -> Result<Vec<TextItem>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    raw.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("parsing item: {}", l)))
        .collect()
}
