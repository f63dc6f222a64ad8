// Application state module
// Owns the configured upstream clients shared by every connection

use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::error::UpstreamError;
use crate::generation::{ActionDispatcher, DispatchDefaults, GenerationService, HuggingFaceClient};
use crate::market::{CoinGeckoClient, MarketDataSource, MarketSnapshotFetcher, TtlCache};

/// Application state
pub struct AppState {
    pub config: Config,
    pub market: MarketSnapshotFetcher,
    pub dispatcher: ActionDispatcher,
}

impl AppState {
    /// Build state with the real CoinGecko and Hugging Face clients
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let market: Arc<dyn MarketDataSource> = Arc::new(CoinGeckoClient::new(&config.market)?);
        let generation: Arc<dyn GenerationService> =
            Arc::new(HuggingFaceClient::new(&config.generation)?);
        Ok(Self::with_services(config.clone(), market, generation))
    }

    /// Build state around arbitrary service implementations
    pub fn with_services(
        config: Config,
        market: Arc<dyn MarketDataSource>,
        generation: Arc<dyn GenerationService>,
    ) -> Self {
        let cache = match config.market.cache_ttl_secs {
            0 => TtlCache::disabled(),
            secs => TtlCache::new(Duration::from_secs(secs)),
        };
        let defaults = DispatchDefaults::from(&config.generation);

        Self {
            market: MarketSnapshotFetcher::new(market, cache),
            dispatcher: ActionDispatcher::new(generation, defaults),
            config,
        }
    }
}
