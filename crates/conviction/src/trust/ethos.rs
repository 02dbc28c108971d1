//! Ethos reputation client. Ethos keys identities by "userkey" strings, so
//! one endpoint serves both EVM addresses and X handles.

use serde::Deserialize;

use crate::http::{self, ProviderError, ProviderResult};

/// Ethos raw scores run 0-2800; dividing by 30 maps the observed range
/// onto 0-100 with a ceiling for outliers.
const RAW_SCALE: f64 = 30.0;

pub struct EthosClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

impl EthosClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    pub fn userkey_for_address(address: &str) -> String {
        format!("address:{address}")
    }

    pub fn userkey_for_handle(handle: &str) -> String {
        format!("service:x.com:{}", handle.trim_start_matches('@'))
    }

    /// Raw Ethos score for one userkey. A 404 means the identity has no
    /// Ethos profile and is reported as no data, not a failure.
    pub async fn score(&self, userkey: &str) -> ProviderResult<Option<f64>> {
        let url = format!("{}/score/{userkey}", self.base_url);
        http::timed("ethos", async {
            let resp = self.http.get(&url).send().await?;
            if resp.status().as_u16() == 404 {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(ProviderError::Status(resp.status().as_u16()));
            }
            let body: ScoreResponse = resp.json().await?;
            Ok(Some(body.score))
        })
        .await
    }
}

/// Map a raw Ethos score onto the unified 0-100 scale.
pub fn normalize(raw: f64) -> u8 {
    let scaled = (raw / RAW_SCALE).round();
    scaled.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_userkey_formats() {
        assert_eq!(
            EthosClient::userkey_for_address("0xabc"),
            "address:0xabc"
        );
        assert_eq!(
            EthosClient::userkey_for_handle("@vitalik"),
            "service:x.com:vitalik"
        );
        assert_eq!(
            EthosClient::userkey_for_handle("vitalik"),
            "service:x.com:vitalik"
        );
    }

    #[test]
    fn test_normalize_scales_and_caps() {
        assert_eq!(normalize(0.0), 0);
        assert_eq!(normalize(1500.0), 50);
        assert_eq!(normalize(2800.0), 93);
        // Outliers above the expected range pin at 100.
        assert_eq!(normalize(9000.0), 100);
        assert_eq!(normalize(-50.0), 0);
    }

    #[test]
    fn test_score_response_parses() {
        let body: ScoreResponse = serde_json::from_str(r#"{"score": 1424}"#).unwrap();
        assert!((body.score - 1424.0).abs() < f64::EPSILON);
    }
}
