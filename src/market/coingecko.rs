//! CoinGecko-compatible global market client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{GlobalMarket, MarketDataSource};
use crate::config::MarketConfig;
use crate::error::UpstreamError;

const USER_AGENT: &str = concat!("crypto-edu-gateway/", env!("CARGO_PKG_VERSION"));

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(config: &MarketConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn global_market(&self) -> Result<GlobalMarket, UpstreamError> {
        let mut request = self
            .client
            .get(format!("{}/global", self.base_url))
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        GlobalMarket::from_value(&body)
    }
}
