//! Host capability flags, probed once at startup.

use serde::Serialize;
use tracing::{info, warn};

use crate::stats::StatsGateway;

/// What the environment can do, decided once and passed into constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// The stats provider answered a probe request.
    pub stats: bool,
}

impl Capabilities {
    /// Everything available (used when the caller already knows, and in tests).
    pub fn all() -> Self {
        Self { stats: true }
    }

    /// Nothing available; every stats-backed operation degrades to its default.
    pub fn none() -> Self {
        Self { stats: false }
    }

    /// Probe the gateway once.
    pub async fn probe(gateway: &dyn StatsGateway) -> Self {
        let stats = gateway.probe().await;
        if stats {
            info!("Stats provider is available");
        } else {
            warn!("Stats provider is unavailable; trending and view updates are disabled");
        }
        Self { stats }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}
