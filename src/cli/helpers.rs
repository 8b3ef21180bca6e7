//! Shared helper functions for CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use postrank::config::Config;
use postrank::models::Capabilities;
use postrank::stats::{BoxedStatsGateway, StaticStatsGateway, WpcomStatsGateway};
use postrank::trending::TrendingCache;
use postrank::views::DieselViewStore;

/// Gateway selected by config: a JSON fixture if one is set, else the
/// WordPress.com REST API.
pub fn build_gateway(config: &Config) -> anyhow::Result<BoxedStatsGateway> {
    if let Some(fixture) = &config.stats.fixture {
        let path = config.resolve_path(&fixture.to_string_lossy());
        info!("Using stats fixture {}", path.display());
        let gateway = StaticStatsGateway::from_fixture_path(&path)
            .with_context(|| format!("Failed to load stats fixture {}", path.display()))?;
        return Ok(Arc::new(gateway));
    }

    let gateway = WpcomStatsGateway::new(&config.stats)?;
    Ok(Arc::new(gateway))
}

/// Gateway plus the capabilities probed from it.
pub async fn probed_gateway(config: &Config) -> anyhow::Result<(BoxedStatsGateway, Capabilities)> {
    let gateway = build_gateway(config)?;
    let capabilities = Capabilities::probe(gateway.as_ref()).await;
    Ok((gateway, capabilities))
}

pub fn trending_cache(
    config: &Config,
    gateway: BoxedStatsGateway,
    capabilities: Capabilities,
) -> TrendingCache {
    TrendingCache::from_config(gateway, &config.trending, capabilities)
}

/// Open the view store, creating the data directory and schema as needed.
pub async fn open_store(config: &Config) -> anyhow::Result<DieselViewStore> {
    let path: PathBuf = config.database_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = DieselViewStore::open(&path)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(store)
}

/// Bar for per-entity sweeps.
pub fn progress_bar(total: usize, message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    Ok(pb)
}
