//! Market data gateway: batch price/metadata/history lookups behind the
//! cache, with provider fallback.
//!
//! Fallback policy: the Solana family prefers Birdeye when an API key is
//! configured and falls back to GeckoTerminal on any failure (missing key,
//! non-2xx, malformed payload); the Ethereum family uses GeckoTerminal only.
//! Everything is best-effort: a total failure degrades to `None`/empty and
//! never reaches the caller as an error.

pub mod birdeye;
pub mod geckoterminal;

use crate::http;
use anyhow::Result;
use birdeye::BirdeyeClient;
use common::cache::Cache;
use common::config;
use common::types::{Chain, PricePoint, TokenMetadata, TokenPrice};
use geckoterminal::GeckoTerminalClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const MS_PER_DAY: i64 = 86_400_000;

/// Best-effort per-token snapshot. `None` means the data could not be
/// resolved this request; downstream analytics treat it as zero impact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub address: String,
    pub price: Option<TokenPrice>,
    pub metadata: Option<TokenMetadata>,
}

pub struct MarketDataGateway {
    cache: Arc<Cache>,
    birdeye: Option<BirdeyeClient>,
    gecko: GeckoTerminalClient,
    price_ttl: Duration,
    metadata_ttl: Duration,
    history_ttl: Duration,
    lookback_days: i64,
}

impl MarketDataGateway {
    pub fn new(
        cache: Arc<Cache>,
        market: &config::MarketData,
        ttls: &config::CacheTtls,
    ) -> Result<Self> {
        let client = http::client(market.request_timeout_secs)?;
        let birdeye = market.birdeye_api_key().map(|key| {
            BirdeyeClient::new(client.clone(), &market.birdeye_api_url, key)
        });
        if birdeye.is_none() {
            tracing::info!("no birdeye api key configured; solana lookups use geckoterminal only");
        }
        Ok(Self {
            cache,
            birdeye,
            gecko: GeckoTerminalClient::new(client, &market.geckoterminal_api_url),
            price_ttl: Duration::from_secs(ttls.price_ttl_secs),
            metadata_ttl: Duration::from_secs(ttls.metadata_ttl_secs),
            history_ttl: Duration::from_secs(ttls.history_ttl_secs),
            lookback_days: market.history_lookback_days,
        })
    }

    /// Batch-resolve snapshots for a token set. Repeated addresses are
    /// de-duplicated before any fetch; per-token lookups fan out
    /// concurrently and settle independently.
    pub async fn snapshots(
        &self,
        chain: Chain,
        addresses: &[String],
    ) -> HashMap<String, TokenSnapshot> {
        let mut unique: Vec<&String> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for address in addresses {
            if seen.insert(address.as_str()) {
                unique.push(address);
            }
        }

        let tasks: Vec<_> = unique
            .into_iter()
            .map(|address| async move {
                let (price, metadata) =
                    tokio::join!(self.price(chain, address), self.metadata(chain, address));
                TokenSnapshot {
                    address: address.clone(),
                    price,
                    metadata,
                }
            })
            .collect();

        // Per-token lookups are already best-effort, so the join cannot fail.
        futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|snap| (snap.address.clone(), snap))
            .collect()
    }

    pub async fn price(&self, chain: Chain, address: &str) -> Option<TokenPrice> {
        let key = format!("price:{}:{address}", chain.as_str());
        let fetched: Result<Option<TokenPrice>> = self
            .cache
            .get_with(&key, self.price_ttl, || self.fetch_price(chain, address))
            .await;
        match fetched {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(chain = chain.as_str(), address, error = %e, "price unavailable");
                None
            }
        }
    }

    pub async fn metadata(&self, chain: Chain, address: &str) -> Option<TokenMetadata> {
        let key = format!("meta:{}:{address}", chain.as_str());
        let fetched: Result<Option<TokenMetadata>> = self
            .cache
            .get_with(&key, self.metadata_ttl, || self.fetch_metadata(chain, address))
            .await;
        match fetched {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(chain = chain.as_str(), address, error = %e, "metadata unavailable");
                None
            }
        }
    }

    /// Price series for the patience-tax window after `exit_ms`. The lookback
    /// is capped deterministically to bound upstream cost; a total provider
    /// failure yields an empty series.
    pub async fn post_exit_history(
        &self,
        chain: Chain,
        address: &str,
        exit_ms: i64,
        now_ms: i64,
    ) -> Vec<PricePoint> {
        let (from_ms, to_ms) = self.post_exit_window(exit_ms, now_ms);
        if from_ms >= to_ms {
            return Vec::new();
        }
        let key = format!("history:{}:{address}:{from_ms}:{to_ms}", chain.as_str());
        let fetched: Result<Vec<PricePoint>> = self
            .cache
            .get_with(&key, self.history_ttl, || {
                self.fetch_history(chain, address, from_ms, to_ms)
            })
            .await;
        match fetched {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(chain = chain.as_str(), address, error = %e, "history unavailable");
                Vec::new()
            }
        }
    }

    /// `exit .. min(now, exit + lookback)`.
    pub fn post_exit_window(&self, exit_ms: i64, now_ms: i64) -> (i64, i64) {
        (exit_ms, now_ms.min(exit_ms + self.lookback_days * MS_PER_DAY))
    }

    async fn fetch_price(&self, chain: Chain, address: &str) -> Result<Option<TokenPrice>> {
        if chain == Chain::Solana {
            if let Some(birdeye) = &self.birdeye {
                match birdeye.price(address).await {
                    Ok(price) => return Ok(price),
                    Err(e) => self.log_fallback("price", address, &e),
                }
            }
        }
        Ok(self.gecko.price(chain, address).await?)
    }

    async fn fetch_metadata(&self, chain: Chain, address: &str) -> Result<Option<TokenMetadata>> {
        if chain == Chain::Solana {
            if let Some(birdeye) = &self.birdeye {
                match birdeye.metadata(address).await {
                    Ok(metadata) => return Ok(metadata),
                    Err(e) => self.log_fallback("metadata", address, &e),
                }
            }
        }
        Ok(self.gecko.metadata(chain, address).await?)
    }

    async fn fetch_history(
        &self,
        chain: Chain,
        address: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<PricePoint>> {
        if chain == Chain::Solana {
            if let Some(birdeye) = &self.birdeye {
                match birdeye.history(address, from_ms, to_ms).await {
                    Ok(series) => return Ok(series),
                    Err(e) => self.log_fallback("history", address, &e),
                }
            }
        }
        Ok(self.gecko.history(chain, address, from_ms, to_ms).await?)
    }

    fn log_fallback(&self, endpoint: &'static str, address: &str, e: &http::ProviderError) {
        metrics::counter!("conviction_provider_fallbacks_total", "endpoint" => endpoint)
            .increment(1);
        tracing::warn!(endpoint, address, error = %e, "primary provider failed; falling back");
    }
}
