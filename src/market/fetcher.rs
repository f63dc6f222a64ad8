//! Snapshot fetcher with cache and fallback

use serde::Serialize;
use std::sync::Arc;

use super::{MarketDataSource, MarketSnapshot, TtlCache};
use crate::logger;

/// Explanation attached to every fallback response
pub const FALLBACK_REASON: &str = "Failed to fetch live market data, showing fallback values";

/// Result of one snapshot read, the fallback is explicit rather than implied
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Live(MarketSnapshot),
    Fallback {
        snapshot: MarketSnapshot,
        reason: String,
    },
}

impl SnapshotOutcome {
    /// Wire shape for `GET /dominance`
    pub fn into_response(self, timestamp: String) -> DominanceResponse {
        match self {
            Self::Live(data) => DominanceResponse {
                success: true,
                data,
                error: None,
                timestamp,
            },
            Self::Fallback { snapshot, reason } => DominanceResponse {
                success: false,
                data: snapshot,
                error: Some(reason),
                timestamp,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DominanceResponse {
    pub success: bool,
    pub data: MarketSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

pub struct MarketSnapshotFetcher {
    source: Arc<dyn MarketDataSource>,
    cache: TtlCache<MarketSnapshot>,
}

impl MarketSnapshotFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>, cache: TtlCache<MarketSnapshot>) -> Self {
        Self { source, cache }
    }

    /// Read the current snapshot. Never fails: upstream errors yield the fallback.
    pub async fn fetch(&self) -> SnapshotOutcome {
        if let Some(snapshot) = self.cache.get().await {
            return SnapshotOutcome::Live(snapshot);
        }

        match self.source.global_market().await {
            Ok(global) => {
                let snapshot = MarketSnapshot::from_global(&global, now_rfc3339());
                self.cache.insert(snapshot.clone()).await;
                SnapshotOutcome::Live(snapshot)
            }
            Err(e) => {
                logger::log_upstream_failure("market", &e);
                SnapshotOutcome::Fallback {
                    snapshot: MarketSnapshot::fallback(now_rfc3339()),
                    reason: FALLBACK_REASON.to_string(),
                }
            }
        }
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
