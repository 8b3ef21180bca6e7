//! Trending listing and candidate ranking commands.

use std::sync::Arc;

use console::style;

use postrank::config::Config;
use postrank::models::EntityId;
use postrank::trending::{clamp_window, OrderBy, QueryOrder, TrendingQuery, TrendingRequest};

use crate::cli::helpers::{probed_gateway, trending_cache};

/// Build a request from CLI flags, falling back to configured defaults.
pub fn request(
    config: &Config,
    days: Option<i64>,
    types: Vec<String>,
    offset: i64,
    limit: i64,
    use_cache: bool,
) -> TrendingRequest {
    let mut request = TrendingRequest::from_config(&config.trending);
    if let Some(days) = days {
        request.window_days = days;
    }
    if !types.is_empty() {
        request.entity_types = types;
    }
    request.offset = offset;
    request.limit = limit;
    request.use_cache = use_cache;
    request
}

async fn build_query(config: &Config) -> anyhow::Result<TrendingQuery> {
    let (gateway, capabilities) = probed_gateway(config).await?;
    let cache = trending_cache(config, gateway, capabilities);
    Ok(TrendingQuery::new(Arc::new(cache)).with_candidate_pool(config.trending.candidate_pool))
}

/// Print the windowed trending set.
pub async fn cmd_trending(
    config: &Config,
    request: &TrendingRequest,
    json: bool,
) -> anyhow::Result<()> {
    let query = build_query(config).await?;
    let ids = query.top(request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }

    if ids.is_empty() {
        println!("{} No trending entities", style("!").yellow());
        return Ok(());
    }

    println!(
        "\n{}",
        style(format!(
            "Trending ({} days, {})",
            clamp_window(request.window_days),
            request.entity_types.join(", ")
        ))
        .bold()
    );
    println!("{}", "-".repeat(30));
    for (rank, id) in ids.iter().enumerate() {
        println!("{:>4}  {}", rank + 1, id);
    }

    Ok(())
}

/// Order candidate IDs as a host query executor would be instructed to.
pub async fn cmd_rank(
    config: &Config,
    order: OrderBy,
    request: &TrendingRequest,
    candidates: Vec<EntityId>,
    json: bool,
) -> anyhow::Result<()> {
    let query = build_query(config).await?;
    let instruction = query.order_for(order, request, &candidates).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&instruction)?);
        return Ok(());
    }

    match instruction {
        QueryOrder::ExplicitIds { ids } => {
            for id in ids {
                println!("{}", id);
            }
        }
        QueryOrder::ByViewCount { meta_key } => {
            println!(
                "{} Sort numerically by stored counter '{}'",
                style("→").cyan(),
                meta_key
            );
        }
        QueryOrder::Default { reason } => {
            println!(
                "{} Keeping default order ({})",
                style("!").yellow(),
                reason.as_str()
            );
        }
    }

    Ok(())
}
