//! View counter commands.

use std::sync::Arc;

use console::style;

use postrank::config::Config;
use postrank::display::ViewDisplay;
use postrank::models::EntityId;
use postrank::trending::TrendingCache;
use postrank::views::{ReconcileOutcome, ViewCountUpdater, ViewStore};

use crate::cli::helpers::{open_store, probed_gateway, progress_bar, trending_cache};

/// Which entities an update sweep covers.
pub enum Selection {
    /// IDs given on the command line.
    Explicit(Vec<EntityId>),
    /// Entities already known to the store.
    Stored,
    /// The current trending report.
    Trending,
}

async fn trending_page(
    cache: &TrendingCache,
    config: &Config,
    per_page: usize,
    offset: usize,
) -> Vec<EntityId> {
    let set = cache
        .get_trending(
            i64::from(config.trending.window_days),
            &config.trending.entity_types,
            false,
        )
        .await;
    set.into_iter().skip(offset).take(per_page).collect()
}

/// Refresh stored counters for a page of entities.
pub async fn cmd_update_views(
    config: &Config,
    selection: Selection,
    per_page: usize,
    offset: usize,
    concurrency: usize,
) -> anyhow::Result<()> {
    let (gateway, capabilities) = probed_gateway(config).await?;
    if !capabilities.stats {
        anyhow::bail!("Stats provider is unavailable; nothing to update");
    }

    let store = Arc::new(open_store(config).await?);

    let ids = match selection {
        Selection::Explicit(ids) => window_page(&ids, per_page, offset),
        Selection::Stored => store.entity_ids(offset, per_page).await?,
        Selection::Trending => {
            let cache = trending_cache(config, gateway.clone(), capabilities);
            trending_page(&cache, config, per_page, offset).await
        }
    };

    if ids.is_empty() {
        println!("{} No entities found.", style("✓").green());
        return Ok(());
    }

    let updater = ViewCountUpdater::new(gateway, store, capabilities);
    let pb = progress_bar(ids.len(), "Updating views...")?;
    let summary = updater
        .reconcile_many(&ids, concurrency, |outcome| {
            if matches!(outcome, ReconcileOutcome::Failed { .. }) {
                pb.println(format!(
                    "{} Entity {} failed, kept {} views",
                    style("!").yellow(),
                    outcome.id(),
                    outcome.views()
                ));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    println!(
        "{} Done, updates complete: {} updated, {} unchanged, {} failed",
        style("✓").green(),
        summary.updated,
        summary.unchanged,
        summary.failed
    );

    Ok(())
}

/// Plain skip/take paging.
fn window_page(ids: &[EntityId], per_page: usize, offset: usize) -> Vec<EntityId> {
    ids.iter().skip(offset).take(per_page).copied().collect()
}

/// Print the raw stored count.
pub async fn cmd_views_get(config: &Config, id: EntityId) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    println!("{}", store.get(id).await?);
    Ok(())
}

/// Overwrite a stored count.
pub async fn cmd_views_set(config: &Config, id: EntityId, count: u64) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    store.put(id, count).await?;
    println!("{} Entity {} set to {} views", style("✓").green(), id, count);
    Ok(())
}

/// Render one entity's count, or the most viewed entities.
pub async fn cmd_views_show(
    config: &Config,
    display: &ViewDisplay,
    id: Option<EntityId>,
    limit: usize,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    if let Some(id) = id {
        let views = store.get(id).await?;
        match display.render(views) {
            Some(rendered) => println!("{}", rendered),
            None => println!(
                "{} Entity {} has {} views, below the display minimum of {}",
                style("!").yellow(),
                id,
                views,
                display.min
            ),
        }
        return Ok(());
    }

    let top = store.top(limit).await?;
    if top.is_empty() {
        println!("{} No stored view counts", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Most viewed").bold());
    println!("{}", "-".repeat(30));
    for (id, views) in top {
        let rendered = display.render(views).unwrap_or_else(|| "-".to_string());
        println!("{:>10}  {}", id, rendered);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use postrank::trending::window;

    #[test]
    fn test_explicit_ids_page_without_shift() {
        let ids: Vec<EntityId> = (1..=5).map(EntityId).collect();
        assert_eq!(window_page(&ids, 2, 1), vec![EntityId(2), EntityId(3)]);
        // The ranked-list window would start one earlier and take one more.
        assert_eq!(window(&ids, 1, 2).len(), 3);
    }
}
