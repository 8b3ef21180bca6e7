//! Stats provider reachability check.

use console::style;

use postrank::config::Config;
use postrank::models::Capabilities;

use crate::cli::helpers::build_gateway;

/// Probe the configured stats provider once and report the result.
pub async fn cmd_probe(config: &Config) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;
    let capabilities = Capabilities::probe(gateway.as_ref()).await;

    let source = match (&config.stats.fixture, &config.stats.site) {
        (Some(path), _) => format!("fixture {}", path.display()),
        (None, Some(site)) => format!("{} (site {})", config.stats.base_url, site),
        (None, None) => "no site configured".to_string(),
    };

    if capabilities.stats {
        println!("{} Stats available: {}", style("✓").green(), source);
    } else {
        println!("{} Stats unavailable: {}", style("✗").red(), source);
        println!("  Trending and view ordering will fall back to the default order.");
    }

    Ok(())
}
