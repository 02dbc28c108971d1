use anyhow::Result;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub cache: CacheTtls,
    pub market_data: MarketData,
    pub scoring: Scoring,
    pub archetypes: Archetypes,
    pub trust: Trust,
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

/// TTLs for every cached lookup class, in seconds.
#[derive(Debug, Deserialize)]
pub struct CacheTtls {
    pub price_ttl_secs: u64,
    pub metadata_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub trust_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct MarketData {
    pub birdeye_api_url: String,
    pub geckoterminal_api_url: String,
    /// Env var holding the Birdeye key. The key itself never lives in the
    /// config file; absence simply disables the primary provider.
    pub birdeye_api_key_env: String,
    pub request_timeout_secs: u64,
    /// Post-exit lookback window for patience-tax history fetches, days.
    pub history_lookback_days: i64,
}

impl MarketData {
    pub fn birdeye_api_key(&self) -> Option<String> {
        std::env::var(&self.birdeye_api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// Composite-score weights plus the fixed reference constants the score
/// formula needs. Weights are injectable; the 30-day holding cap and the
/// 50% early-exit threshold are product constants.
#[derive(Debug, Deserialize)]
pub struct Scoring {
    pub win_rate_weight: f64,
    pub upside_capture_weight: f64,
    pub early_exit_mitigation_weight: f64,
    pub holding_period_weight: f64,
    pub holding_period_cap_days: f64,
    pub early_exit_threshold_pct: f64,
    /// Realized PnL above this fraction of invested counts as a conviction win.
    pub conviction_win_ratio: f64,
}

#[derive(Debug, Deserialize)]
pub struct Archetypes {
    pub iron_pillar_min_score: f64,
    pub iron_pillar_max_patience_tax: f64,
    pub profit_phantom_min_score: f64,
    pub profit_phantom_min_patience_tax: f64,
    pub exit_voyager_max_score: f64,
    /// Label assigned to a wallet with zero positions.
    pub empty_state: String,
}

#[derive(Debug, Deserialize)]
pub struct Trust {
    pub ethos_api_url: String,
    pub fairscale_api_url: String,
    pub web3bio_api_url: String,
    pub tapestry_api_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string("config/default.toml")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
