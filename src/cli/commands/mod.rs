//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod probe;
mod trending;
mod views;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use postrank::config::Config;
use postrank::models::EntityId;
use postrank::trending::OrderBy;
use postrank::utils::CountFormat;
use postrank::views::DEFAULT_CONCURRENCY;

#[derive(Parser)]
#[command(name = "postrank")]
#[command(about = "Trending and popular ordering from page-view statistics")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the stats provider is reachable
    Probe,

    /// Show the trending entities
    Trending {
        /// Window length in days (1-30, defaults to config)
        #[arg(short, long)]
        days: Option<i64>,
        /// Entity types to include, comma-separated (defaults to config)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<String>,
        /// Number of entries (the window returns up to one more)
        #[arg(short, long, default_value = "12")]
        number: i64,
        /// Offset into the trending set (1-based)
        #[arg(short, long, default_value = "0")]
        offset: i64,
        /// Bypass the cache
        #[arg(long)]
        no_cache: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Order a candidate set the way a host query would
    Rank {
        /// Candidate IDs matched by the host's filters, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        candidates: Vec<EntityId>,
        /// IDs to leave out, comma-separated
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<EntityId>,
        /// Requested ordering
        #[arg(long, value_enum, default_value = "trending")]
        order: OrderBy,
        /// Offset into the merged result (1-based)
        #[arg(short, long, default_value = "0")]
        offset: i64,
        /// Page size (the window returns up to one more)
        #[arg(short, long, default_value = "12")]
        limit: i64,
        /// Window length in days (1-30, defaults to config)
        #[arg(short, long)]
        days: Option<i64>,
        /// Entity types to include, comma-separated (defaults to config)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<String>,
        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },

    /// Refresh stored view counters from the stats provider
    UpdateViews {
        /// Entities to update, comma-separated (defaults to known entities)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<EntityId>,
        /// Seed the page from the trending report instead of stored entities
        #[arg(long, conflicts_with = "ids")]
        from_trending: bool,
        /// Entities per run
        #[arg(long, default_value = "100")]
        per_page: usize,
        /// Entities to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Reconciles in flight
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Read and write stored view counters
    Views {
        #[command(subcommand)]
        command: ViewsCommands,
    },
}

#[derive(Subcommand)]
enum ViewsCommands {
    /// Print the raw stored count
    Get {
        id: EntityId,
    },
    /// Overwrite the stored count (must be positive)
    Set {
        id: EntityId,
        count: u64,
    },
    /// Render counts as they would be displayed
    Show {
        /// Entity to render (defaults to the most viewed entities)
        id: Option<EntityId>,
        /// Minimum count to display (defaults to config)
        #[arg(long)]
        min: Option<u64>,
        /// Count format (defaults to config)
        #[arg(long, value_enum)]
        format: Option<CountFormat>,
        /// Number of entities when no ID is given
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(data) = &cli.data {
        config.data_dir = Some(data.display().to_string());
    }

    Ok(config)
}

/// Parse the command line and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).await?;

    match cli.command {
        Commands::Probe => probe::cmd_probe(&config).await,
        Commands::Trending {
            days,
            types,
            number,
            offset,
            no_cache,
            json,
        } => {
            let request = trending::request(&config, days, types, offset, number, !no_cache);
            trending::cmd_trending(&config, &request, json).await
        }
        Commands::Rank {
            candidates,
            exclude,
            order,
            offset,
            limit,
            days,
            types,
            json,
        } => {
            let mut request = trending::request(&config, days, types, offset, limit, true);
            request.excluded = exclude.into_iter().collect();
            trending::cmd_rank(&config, order, &request, candidates, json).await
        }
        Commands::UpdateViews {
            ids,
            from_trending,
            per_page,
            offset,
            concurrency,
        } => {
            let selection = if !ids.is_empty() {
                views::Selection::Explicit(ids)
            } else if from_trending {
                views::Selection::Trending
            } else {
                views::Selection::Stored
            };
            views::cmd_update_views(&config, selection, per_page, offset, concurrency).await
        }
        Commands::Views { command } => match command {
            ViewsCommands::Get { id } => views::cmd_views_get(&config, id).await,
            ViewsCommands::Set { id, count } => views::cmd_views_set(&config, id, count).await,
            ViewsCommands::Show {
                id,
                min,
                format,
                limit,
            } => {
                let mut display = config.display.clone();
                if let Some(min) = min {
                    display.min = min;
                }
                if let Some(format) = format {
                    display.format = format;
                }
                views::cmd_views_show(&config, &display, id, limit).await
            }
        },
    }
}
