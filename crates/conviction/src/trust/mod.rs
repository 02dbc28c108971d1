//! Unified trust resolution. One wallet address (plus an optional social
//! handle) goes in; a single 0-100 score with tier, credibility, per-provider
//! breakdown, bridged identity, and feature gates comes out.

pub mod bridge;
pub mod ethos;
pub mod fairscale;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use common::cache::Cache;
use common::config::Config;
use common::types::{
    BridgedIdentity, Chain, CredibilityLevel, TrustBreakdown, TrustProvider, TrustTier,
    UnifiedTrustScore,
};

use crate::feature_gate;
use crate::http;

use bridge::BridgeClient;
use ethos::EthosClient;
use fairscale::FairScaleClient;

pub struct TrustResolver {
    cache: Arc<Cache>,
    ethos: EthosClient,
    fairscale: FairScaleClient,
    bridge: BridgeClient,
    trust_ttl: Duration,
}

pub fn tier_for(score: u8) -> TrustTier {
    match score {
        90..=u8::MAX => TrustTier::Diamond,
        75..=89 => TrustTier::Platinum,
        60..=74 => TrustTier::Gold,
        40..=59 => TrustTier::Silver,
        20..=39 => TrustTier::Bronze,
        _ => TrustTier::Unknown,
    }
}

pub fn credibility_for(score: u8) -> CredibilityLevel {
    match score {
        75..=u8::MAX => CredibilityLevel::HighlyCredible,
        40..=74 => CredibilityLevel::Credible,
        20..=39 => CredibilityLevel::Neutral,
        _ => CredibilityLevel::Risky,
    }
}

/// Pick the unified score: max of the normalized provider scores. Ties go
/// to Ethos. No provider data at all yields zero with no primary.
fn unify(breakdown: &TrustBreakdown) -> (u8, TrustProvider) {
    match (breakdown.ethos_normalized, breakdown.fairscale) {
        (Some(e), Some(f)) if f > e => (f, TrustProvider::FairScale),
        (Some(e), _) => (e, TrustProvider::Ethos),
        (None, Some(f)) => (f, TrustProvider::FairScale),
        (None, None) => (0, TrustProvider::None),
    }
}

/// Ethos lookup keys in query order. An EVM wallet is queried by its own
/// address and then any resolved handle; a Solana wallet reaches Ethos only
/// through a resolved handle, never through a bridged address.
fn ethos_userkeys(chain: Chain, address: &str, handle: Option<&str>) -> Vec<String> {
    let mut keys = Vec::new();
    if chain == Chain::Ethereum {
        keys.push(EthosClient::userkey_for_address(address));
    }
    if let Some(handle) = handle {
        keys.push(EthosClient::userkey_for_handle(handle));
    }
    keys
}

impl TrustResolver {
    pub fn new(cache: Arc<Cache>, config: &Config) -> Result<Self> {
        let http = http::client(config.trust.request_timeout_secs)?;
        Ok(Self {
            cache,
            ethos: EthosClient::new(http.clone(), config.trust.ethos_api_url.clone()),
            fairscale: FairScaleClient::new(http.clone(), config.trust.fairscale_api_url.clone()),
            bridge: BridgeClient::new(
                http,
                config.trust.web3bio_api_url.clone(),
                config.trust.tapestry_api_url.clone(),
            ),
            trust_ttl: Duration::from_secs(config.cache.trust_ttl_secs),
        })
    }

    /// Resolve one wallet's unified trust score. The whole result is cached
    /// as a unit, so a cache hit skips bridging and both providers.
    pub async fn resolve(
        &self,
        address: &str,
        handle: Option<&str>,
    ) -> Result<UnifiedTrustScore> {
        let key = format!("trust:{address}:{}", handle.unwrap_or("-"));
        let address = address.to_string();
        let handle = handle.map(str::to_string);
        self.cache
            .get_with(&key, self.trust_ttl, || async move {
                self.resolve_uncached(&address, handle.as_deref()).await
            })
            .await
    }

    async fn resolve_uncached(
        &self,
        address: &str,
        handle: Option<&str>,
    ) -> Result<UnifiedTrustScore> {
        let Some(chain) = Chain::detect(address) else {
            warn!(address, "unrecognized address shape, returning neutral trust");
            return Ok(neutral_result(address));
        };

        let mut bridged = self.bridge.resolve(address, chain).await;
        // A caller-supplied handle outranks anything bridging found.
        if let Some(h) = handle {
            bridged.social_handle = Some(h.trim_start_matches('@').to_string());
        }

        let solana_address = match chain {
            Chain::Solana => Some(address.to_string()),
            Chain::Ethereum => bridged.counter_address.clone(),
        };
        let userkeys = ethos_userkeys(chain, address, bridged.social_handle.as_deref());

        let (ethos_raw, fairscale) = tokio::join!(
            self.ethos_score(userkeys),
            self.fairscale_score(solana_address.as_deref()),
        );

        let breakdown = TrustBreakdown {
            ethos_raw,
            ethos_normalized: ethos_raw.map(ethos::normalize),
            fairscale,
        };
        let (score, primary_provider) = unify(&breakdown);
        info!(
            address,
            score,
            provider = primary_provider.as_str(),
            "trust resolved"
        );

        Ok(UnifiedTrustScore {
            address: address.to_string(),
            chain: Some(chain),
            score,
            tier: tier_for(score),
            credibility: credibility_for(score),
            primary_provider,
            breakdown,
            bridged,
            gates: feature_gate::gates_for(score),
        })
    }

    /// Ethos lookup over the prepared userkeys; first hit wins. Provider
    /// failure degrades to no data.
    async fn ethos_score(&self, userkeys: Vec<String>) -> Option<f64> {
        for userkey in userkeys {
            match self.ethos.score(&userkey).await {
                Ok(Some(raw)) => return Some(raw),
                Ok(None) => {}
                Err(e) => warn!(error = %e, userkey, "ethos lookup failed"),
            }
        }
        None
    }

    async fn fairscale_score(&self, solana_address: Option<&str>) -> Option<u8> {
        let address = solana_address?;
        match self.fairscale.score(address).await {
            Ok(score) => score,
            Err(e) => {
                warn!(error = %e, address, "fairscale lookup failed");
                None
            }
        }
    }
}

/// Result for an address neither chain detector recognizes: unknown tier,
/// zero score, every gate closed.
fn neutral_result(address: &str) -> UnifiedTrustScore {
    UnifiedTrustScore {
        address: address.to_string(),
        chain: None,
        score: 0,
        tier: TrustTier::Unknown,
        credibility: CredibilityLevel::Risky,
        primary_provider: TrustProvider::None,
        breakdown: TrustBreakdown::default(),
        bridged: BridgedIdentity::default(),
        gates: feature_gate::gates_for(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_takes_higher_provider() {
        let breakdown = TrustBreakdown {
            ethos_raw: Some(1800.0),
            ethos_normalized: Some(60),
            fairscale: Some(80),
        };
        let (score, provider) = unify(&breakdown);
        assert_eq!(score, 80);
        assert_eq!(provider, TrustProvider::FairScale);
    }

    #[test]
    fn test_unify_tie_goes_to_ethos() {
        let breakdown = TrustBreakdown {
            ethos_raw: Some(2100.0),
            ethos_normalized: Some(70),
            fairscale: Some(70),
        };
        let (score, provider) = unify(&breakdown);
        assert_eq!(score, 70);
        assert_eq!(provider, TrustProvider::Ethos);
    }

    #[test]
    fn test_unify_single_provider() {
        let ethos_only = TrustBreakdown {
            ethos_raw: Some(900.0),
            ethos_normalized: Some(30),
            fairscale: None,
        };
        assert_eq!(unify(&ethos_only), (30, TrustProvider::Ethos));

        let fairscale_only = TrustBreakdown {
            ethos_raw: None,
            ethos_normalized: None,
            fairscale: Some(45),
        };
        assert_eq!(unify(&fairscale_only), (45, TrustProvider::FairScale));
    }

    #[test]
    fn test_unify_no_data() {
        assert_eq!(unify(&TrustBreakdown::default()), (0, TrustProvider::None));
    }

    #[test]
    fn test_solana_wallet_without_handle_skips_ethos() {
        // A bridged EVM address alone does not open an Ethos query path.
        let keys = ethos_userkeys(
            Chain::Solana,
            "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            None,
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn test_solana_wallet_queries_ethos_only_by_handle() {
        let keys = ethos_userkeys(
            Chain::Solana,
            "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            Some("jane"),
        );
        assert_eq!(keys, vec!["service:x.com:jane".to_string()]);
    }

    #[test]
    fn test_evm_wallet_queries_address_then_handle() {
        let keys = ethos_userkeys(
            Chain::Ethereum,
            "0x00112233445566778899aabbccddeeff00112233",
            Some("jane"),
        );
        assert_eq!(
            keys,
            vec![
                "address:0x00112233445566778899aabbccddeeff00112233".to_string(),
                "service:x.com:jane".to_string(),
            ]
        );
    }

    #[test]
    fn test_tier_breakpoints() {
        assert_eq!(tier_for(0), TrustTier::Unknown);
        assert_eq!(tier_for(19), TrustTier::Unknown);
        assert_eq!(tier_for(20), TrustTier::Bronze);
        assert_eq!(tier_for(40), TrustTier::Silver);
        assert_eq!(tier_for(60), TrustTier::Gold);
        assert_eq!(tier_for(75), TrustTier::Platinum);
        assert_eq!(tier_for(90), TrustTier::Diamond);
        assert_eq!(tier_for(100), TrustTier::Diamond);
    }

    #[test]
    fn test_tier_monotonic_in_score() {
        let mut last = TrustTier::Unknown;
        for score in 0..=100 {
            let tier = tier_for(score);
            assert!(tier >= last, "tier regressed at score {score}");
            last = tier;
        }
    }

    #[test]
    fn test_credibility_breakpoints() {
        assert_eq!(credibility_for(0), CredibilityLevel::Risky);
        assert_eq!(credibility_for(19), CredibilityLevel::Risky);
        assert_eq!(credibility_for(20), CredibilityLevel::Neutral);
        assert_eq!(credibility_for(39), CredibilityLevel::Neutral);
        assert_eq!(credibility_for(40), CredibilityLevel::Credible);
        assert_eq!(credibility_for(74), CredibilityLevel::Credible);
        assert_eq!(credibility_for(75), CredibilityLevel::HighlyCredible);
    }

    #[test]
    fn test_neutral_result_is_fully_closed() {
        let result = neutral_result("not-an-address");
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, TrustTier::Unknown);
        assert_eq!(result.primary_provider, TrustProvider::None);
        assert!(!result.gates.trust_filtering);
        assert!(!result.gates.premium_views);
    }
}
