//! FairScale reputation client. Solana-native, already on a 0-100 scale.

use serde::Deserialize;

use crate::http::{self, ProviderError, ProviderResult};

pub struct FairScaleClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

impl FairScaleClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// FairScale score for one Solana wallet, clamped onto 0-100. Unknown
    /// wallets 404 and are reported as no data.
    pub async fn score(&self, address: &str) -> ProviderResult<Option<u8>> {
        let url = format!("{}/score/{address}", self.base_url);
        http::timed("fairscale", async {
            let resp = self.http.get(&url).send().await?;
            if resp.status().as_u16() == 404 {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(ProviderError::Status(resp.status().as_u16()));
            }
            let body: ScoreResponse = resp.json().await?;
            Ok(Some(body.score.clamp(0.0, 100.0).round() as u8))
        })
        .await
    }
}
