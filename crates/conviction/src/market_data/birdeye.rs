//! Birdeye: primary market-data provider for the Solana family. Requires an
//! API key; when none is configured the gateway skips this provider
//! entirely. Responses arrive in a `{success, data}` envelope which is
//! validated here and mapped into internal shapes at this boundary.

use crate::http::{timed, ProviderError, ProviderResult};
use common::types::{PricePoint, TokenMetadata, TokenPrice};
use serde::Deserialize;

pub struct BirdeyeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    value: f64,
    #[serde(rename = "priceChange24h")]
    price_change_24h: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetadataData {
    name: Option<String>,
    symbol: Option<String>,
    logo_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "unixTime")]
    unix_time: i64,
    value: f64,
}

fn map_price(data: PriceData) -> TokenPrice {
    TokenPrice {
        price_usd: data.value,
        change_24h_pct: data.price_change_24h,
    }
}

fn map_metadata(data: MetadataData) -> TokenMetadata {
    TokenMetadata {
        name: data.name,
        symbol: data.symbol,
        logo_uri: data.logo_uri,
    }
}

fn map_history(data: HistoryData) -> Vec<PricePoint> {
    data.items
        .into_iter()
        .map(|item| PricePoint {
            timestamp: item.unix_time * 1000,
            price_usd: item.value,
        })
        .collect()
}

impl BirdeyeClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_envelope<T: serde::de::DeserializeOwned>(&self, url: String) -> ProviderResult<Option<T>> {
        let resp = self
            .http
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        if !envelope.success {
            return Err(ProviderError::Malformed("success=false".to_string()));
        }
        Ok(envelope.data)
    }

    pub async fn price(&self, address: &str) -> ProviderResult<Option<TokenPrice>> {
        let url = format!("{}/defi/price?address={address}", self.base_url);
        timed("birdeye", async {
            Ok(self.get_envelope::<PriceData>(url).await?.map(map_price))
        })
        .await
    }

    pub async fn metadata(&self, address: &str) -> ProviderResult<Option<TokenMetadata>> {
        let url = format!(
            "{}/defi/v3/token/meta-data/single?address={address}",
            self.base_url
        );
        timed("birdeye", async {
            Ok(self
                .get_envelope::<MetadataData>(url)
                .await?
                .map(map_metadata))
        })
        .await
    }

    /// Hourly price series in `[from_ms, to_ms]`. Birdeye takes unix seconds.
    pub async fn history(
        &self,
        address: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> ProviderResult<Vec<PricePoint>> {
        let url = format!(
            "{}/defi/history_price?address={address}&address_type=token&type=1H&time_from={}&time_to={}",
            self.base_url,
            from_ms / 1000,
            to_ms / 1000,
        );
        timed("birdeye", async {
            Ok(self
                .get_envelope::<HistoryData>(url)
                .await?
                .map(map_history)
                .unwrap_or_default())
        })
        .await
    }
}
