//! GeckoTerminal: secondary, unauthenticated market-data provider covering
//! both chain families. Current price and 24h change come from the token's
//! most liquid pool; history is that pool's hourly OHLCV closes. Numeric
//! fields arrive as JSON strings and are validated at this boundary.

use crate::http::{timed, ProviderError, ProviderResult};
use common::types::{Chain, PricePoint, TokenMetadata, TokenPrice};
use serde::Deserialize;

pub struct GeckoTerminalClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct One<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Many<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenDoc {
    attributes: TokenAttributes,
}

#[derive(Debug, Deserialize)]
struct TokenAttributes {
    name: Option<String>,
    symbol: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolDoc {
    attributes: PoolAttributes,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    address: String,
    base_token_price_usd: Option<String>,
    #[serde(default)]
    price_change_percentage: PriceChange,
}

#[derive(Debug, Default, Deserialize)]
struct PriceChange {
    h24: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OhlcvDoc {
    attributes: OhlcvAttributes,
}

#[derive(Debug, Deserialize)]
struct OhlcvAttributes {
    /// `[timestamp_secs, open, high, low, close, volume]` rows, newest first.
    ohlcv_list: Vec<Vec<f64>>,
}

fn network(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "eth",
        Chain::Solana => "solana",
    }
}

fn parse_decimal(field: &str, raw: &str) -> ProviderResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| ProviderError::Malformed(format!("{field}: {raw:?}")))
}

fn map_pool_price(pool: &PoolAttributes) -> ProviderResult<Option<TokenPrice>> {
    let Some(raw) = pool.base_token_price_usd.as_deref() else {
        return Ok(None);
    };
    let price_usd = parse_decimal("base_token_price_usd", raw)?;
    let change_24h_pct = match pool.price_change_percentage.h24.as_deref() {
        Some(raw) => Some(parse_decimal("price_change_percentage.h24", raw)?),
        None => None,
    };
    Ok(Some(TokenPrice {
        price_usd,
        change_24h_pct,
    }))
}

fn map_metadata(attrs: TokenAttributes) -> TokenMetadata {
    TokenMetadata {
        name: attrs.name,
        symbol: attrs.symbol,
        logo_uri: attrs.image_url,
    }
}

fn map_ohlcv(attrs: OhlcvAttributes) -> Vec<PricePoint> {
    let mut series: Vec<PricePoint> = attrs
        .ohlcv_list
        .iter()
        .filter(|row| row.len() >= 5)
        .map(|row| PricePoint {
            timestamp: (row[0] as i64) * 1000,
            price_usd: row[4],
        })
        .collect();
    series.sort_by_key(|p| p.timestamp);
    series
}

impl GeckoTerminalClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> ProviderResult<T> {
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        resp.json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// Top pool for a token, by GeckoTerminal's own liquidity ordering.
    async fn top_pool(&self, chain: Chain, address: &str) -> ProviderResult<Option<PoolAttributes>> {
        let url = format!(
            "{}/networks/{}/tokens/{address}/pools?page=1",
            self.base_url,
            network(chain)
        );
        let pools: Many<PoolDoc> = self.get_json(url).await?;
        Ok(pools.data.into_iter().next().map(|p| p.attributes))
    }

    pub async fn price(&self, chain: Chain, address: &str) -> ProviderResult<Option<TokenPrice>> {
        timed("geckoterminal", async {
            match self.top_pool(chain, address).await? {
                Some(pool) => map_pool_price(&pool),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn metadata(
        &self,
        chain: Chain,
        address: &str,
    ) -> ProviderResult<Option<TokenMetadata>> {
        let url = format!(
            "{}/networks/{}/tokens/{address}",
            self.base_url,
            network(chain)
        );
        timed("geckoterminal", async {
            let doc: One<TokenDoc> = self.get_json(url).await?;
            Ok(Some(map_metadata(doc.data.attributes)))
        })
        .await
    }

    /// Hourly closes in `[from_ms, to_ms]` via the token's top pool. A token
    /// with no indexed pool yields an empty series.
    pub async fn history(
        &self,
        chain: Chain,
        address: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> ProviderResult<Vec<PricePoint>> {
        timed("geckoterminal", async {
            let Some(pool) = self.top_pool(chain, address).await? else {
                return Ok(Vec::new());
            };
            let hours = ((to_ms - from_ms) / 3_600_000 + 1).clamp(1, 1000);
            let url = format!(
                "{}/networks/{}/pools/{}/ohlcv/hour?before_timestamp={}&limit={hours}&currency=usd",
                self.base_url,
                network(chain),
                pool.address,
                to_ms / 1000,
            );
            let doc: One<OhlcvDoc> = self.get_json(url).await?;
            let mut series = map_ohlcv(doc.data.attributes);
            series.retain(|p| p.timestamp >= from_ms && p.timestamp <= to_ms);
            Ok(series)
        })
        .await
    }
}
