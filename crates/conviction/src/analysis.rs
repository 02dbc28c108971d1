//! Wallet analysis orchestration: ledger in, per-position analytics plus
//! portfolio conviction metrics out.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::fanout;
use common::types::{
    Chain, ConvictionMetrics, Position, PositionAnalysis, PricePoint, TradeDirection, TradeEvent,
};

use crate::conviction_scoring::{self, ScorerConfig};
use crate::market_data::{MarketDataGateway, TokenSnapshot};
use crate::position_analysis::{self, AnalyzerConfig};

/// One executed fill. Direction is implied by which list it sits in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFill {
    pub hash: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub amount: f64,
    pub price_usd: f64,
    pub value_usd: f64,
}

/// All fills a wallet made in one token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLedger {
    pub token_address: String,
    pub buys: Vec<LedgerFill>,
    pub sells: Vec<LedgerFill>,
}

/// The whole input for one wallet. The chain is inferred from the wallet
/// address shape, never declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletLedger {
    pub wallet: String,
    pub positions: Vec<PositionLedger>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletAnalysis {
    pub wallet: String,
    pub chain: Chain,
    /// Unix milliseconds at which this analysis was computed.
    pub generated_at: i64,
    pub positions: Vec<PositionAnalysis>,
    pub tokens: HashMap<String, TokenSnapshot>,
    pub metrics: ConvictionMetrics,
}

pub struct AnalysisEngine {
    gateway: MarketDataGateway,
    analyzer: AnalyzerConfig,
    scorer: ScorerConfig,
}

fn event(fill: &LedgerFill, token: &str, direction: TradeDirection) -> TradeEvent {
    TradeEvent {
        hash: fill.hash.clone(),
        timestamp: fill.timestamp,
        token_address: token.to_string(),
        direction,
        amount: fill.amount,
        price_usd: fill.price_usd,
        value_usd: fill.value_usd,
    }
}

/// Rebuild a Position from its ledger entry.
pub fn position_from_ledger(wallet: &str, ledger: &PositionLedger) -> Position {
    let events: Vec<TradeEvent> = ledger
        .buys
        .iter()
        .map(|f| event(f, &ledger.token_address, TradeDirection::Buy))
        .chain(
            ledger
                .sells
                .iter()
                .map(|f| event(f, &ledger.token_address, TradeDirection::Sell)),
        )
        .collect();
    Position::from_events(wallet, &ledger.token_address, events)
}

/// Pure assembly step: positions plus already-fetched market data in,
/// analyses and portfolio metrics out. Split from the fetch path so the
/// math is testable without any provider.
pub fn assemble(
    positions: &[Position],
    snapshots: &HashMap<String, TokenSnapshot>,
    histories: &HashMap<String, Vec<PricePoint>>,
    now_ms: i64,
    analyzer: &AnalyzerConfig,
    scorer: &ScorerConfig,
) -> (Vec<PositionAnalysis>, ConvictionMetrics) {
    static NO_HISTORY: Vec<PricePoint> = Vec::new();
    let analyses: Vec<PositionAnalysis> = positions
        .iter()
        .map(|position| {
            let current_price = snapshots
                .get(&position.token_address)
                .and_then(|snap| snap.price.as_ref())
                .map(|p| p.price_usd);
            let series = histories
                .get(&position.token_address)
                .unwrap_or(&NO_HISTORY);
            position_analysis::analyze_position(position, current_price, series, now_ms, analyzer)
        })
        .collect();
    let metrics = conviction_scoring::score_portfolio(&analyses, scorer);
    (analyses, metrics)
}

impl AnalysisEngine {
    pub fn new(gateway: MarketDataGateway, analyzer: AnalyzerConfig, scorer: ScorerConfig) -> Self {
        Self {
            gateway,
            analyzer,
            scorer,
        }
    }

    pub async fn analyze_wallet(&self, ledger: &WalletLedger) -> Result<WalletAnalysis> {
        self.analyze_wallet_at(ledger, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Analyze one wallet as of `now_ms`. The timestamp is injectable so
    /// results are reproducible under test.
    pub async fn analyze_wallet_at(
        &self,
        ledger: &WalletLedger,
        now_ms: i64,
    ) -> Result<WalletAnalysis> {
        let chain = Chain::detect(&ledger.wallet)
            .with_context(|| format!("unrecognized wallet address shape: {}", ledger.wallet))?;

        let positions: Vec<Position> = ledger
            .positions
            .iter()
            .map(|p| position_from_ledger(&ledger.wallet, p))
            .collect();

        let token_addresses: Vec<String> = positions
            .iter()
            .map(|p| p.token_address.clone())
            .collect();
        let snapshots = self.gateway.snapshots(chain, &token_addresses).await;

        // Post-exit series are only needed where a sale exists to regret.
        let history_tasks: Vec<_> = positions
            .iter()
            .filter_map(|position| {
                let last_exit = position.exits.last()?.timestamp;
                let address = position.token_address.clone();
                Some(async move {
                    let series = self
                        .gateway
                        .post_exit_history(chain, &address, last_exit, now_ms)
                        .await;
                    anyhow::Ok((address, series))
                })
            })
            .collect();
        let histories: HashMap<String, Vec<PricePoint>> =
            fanout::settle_ok("post_exit_history", history_tasks)
                .await
                .into_iter()
                .collect();

        let (analyses, metrics) =
            assemble(&positions, &snapshots, &histories, now_ms, &self.analyzer, &self.scorer);
        info!(
            wallet = ledger.wallet,
            chain = chain.as_str(),
            positions = analyses.len(),
            score = metrics.score,
            archetype = ?metrics.archetype,
            "wallet analysis complete"
        );

        Ok(WalletAnalysis {
            wallet: ledger.wallet.clone(),
            chain,
            generated_at: now_ms,
            positions: analyses,
            tokens: snapshots,
            metrics,
        })
    }

    /// Analyze several wallets concurrently. A wallet that fails to resolve
    /// is dropped from the output with a warning, not a batch failure.
    pub async fn analyze_wallets(&self, ledgers: &[WalletLedger]) -> Vec<WalletAnalysis> {
        let tasks: Vec<_> = ledgers
            .iter()
            .map(|ledger| self.analyze_wallet(ledger))
            .collect();
        fanout::settle_ok("analyze_wallets", tasks).await
    }
}
