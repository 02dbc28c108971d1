//! Cross-ecosystem identity bridging. web3.bio is asked first, then
//! Tapestry fills whatever is still empty. A field set once is never
//! overwritten by a later source.

use serde::Deserialize;
use tracing::debug;

use common::types::{BridgedIdentity, Chain};

use crate::http::{self, ProviderError, ProviderResult};

pub struct BridgeClient {
    http: reqwest::Client,
    web3bio_url: String,
    tapestry_url: String,
}

#[derive(Debug, Deserialize)]
struct Web3BioProfile {
    platform: String,
    identity: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TapestryProfile {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "walletAddress")]
    wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TapestryResponse {
    #[serde(default)]
    profiles: Vec<TapestryProfile>,
}

fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.is_none() {
        *slot = candidate.filter(|s| !s.is_empty());
    }
}

impl BridgeClient {
    pub fn new(http: reqwest::Client, web3bio_url: String, tapestry_url: String) -> Self {
        Self {
            http,
            web3bio_url,
            tapestry_url,
        }
    }

    /// Resolve the counter-chain address and social handle for a wallet.
    /// Bridging is best-effort; either source failing leaves its fields
    /// empty rather than failing the resolution.
    pub async fn resolve(&self, address: &str, chain: Chain) -> BridgedIdentity {
        let mut bridged = BridgedIdentity::default();

        match self.web3bio_profiles(address).await {
            Ok(profiles) => {
                for profile in profiles {
                    match profile.platform.as_str() {
                        "twitter" => fill(&mut bridged.social_handle, Some(profile.identity)),
                        _ => {
                            let counter = profile
                                .address
                                .filter(|a| Chain::detect(a).is_some_and(|c| c != chain));
                            fill(&mut bridged.counter_address, counter);
                        }
                    }
                }
            }
            Err(e) => debug!(error = %e, address, "web3.bio lookup failed"),
        }

        if bridged.social_handle.is_none() || bridged.counter_address.is_none() {
            match self.tapestry_profile(address).await {
                Ok(profiles) => {
                    for profile in profiles {
                        fill(&mut bridged.social_handle, profile.username);
                        let counter = profile
                            .wallet_address
                            .filter(|a| Chain::detect(a).is_some_and(|c| c != chain));
                        fill(&mut bridged.counter_address, counter);
                    }
                }
                Err(e) => debug!(error = %e, address, "tapestry lookup failed"),
            }
        }

        bridged
    }

    async fn web3bio_profiles(&self, address: &str) -> ProviderResult<Vec<Web3BioProfile>> {
        let url = format!("{}/profile/{address}", self.web3bio_url);
        http::timed("web3bio", async {
            let resp = self.http.get(&url).send().await?;
            if resp.status().as_u16() == 404 {
                return Ok(Vec::new());
            }
            if !resp.status().is_success() {
                return Err(ProviderError::Status(resp.status().as_u16()));
            }
            Ok(resp.json().await?)
        })
        .await
    }

    async fn tapestry_profile(&self, address: &str) -> ProviderResult<Vec<TapestryProfile>> {
        let url = format!(
            "{}/profiles?walletAddress={address}",
            self.tapestry_url
        );
        http::timed("tapestry", async {
            let resp = self.http.get(&url).send().await?;
            if resp.status().as_u16() == 404 {
                return Ok(Vec::new());
            }
            if !resp.status().is_success() {
                return Err(ProviderError::Status(resp.status().as_u16()));
            }
            let body: TapestryResponse = resp.json().await?;
            Ok(body.profiles)
        })
        .await
    }
}
