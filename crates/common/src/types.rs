use serde::{Deserialize, Serialize};

/// The two chain families the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Solana,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
        }
    }

    /// Classify an address by shape: fixed-length hex with a `0x` prefix is
    /// EVM; a Base58 string of 32-44 chars without a prefix is Solana.
    pub fn detect(address: &str) -> Option<Chain> {
        if let Some(hex) = address.strip_prefix("0x") {
            if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(Chain::Ethereum);
            }
            return None;
        }
        let base58 = address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
        if (32..=44).contains(&address.len()) && base58 {
            return Some(Chain::Solana);
        }
        None
    }
}

impl std::str::FromStr for Chain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Self::Ethereum),
            "solana" => Ok(Self::Solana),
            other => anyhow::bail!("unknown chain selector: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// One reconstructed buy or sell, produced by the upstream ledger layer.
/// Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub hash: String,
    /// Unix millis.
    pub timestamp: i64,
    pub token_address: String,
    pub direction: TradeDirection,
    pub amount: f64,
    pub price_usd: f64,
    pub value_usd: f64,
}

/// All trade events for one (wallet, token), split into ordered entries and
/// exits with running aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub wallet: String,
    pub token_address: String,
    pub entries: Vec<TradeEvent>,
    pub exits: Vec<TradeEvent>,
    pub total_invested: f64,
    pub total_realized: f64,
    pub remaining_balance: f64,
    pub is_active: bool,
}

impl Position {
    /// Build a position from a mixed event stream. Events for a different
    /// token are a caller contract violation (debug-asserted, not filtered).
    /// A negative remaining balance signals an upstream ledger defect: it is
    /// clamped to zero and logged, never trusted silently.
    pub fn from_events(wallet: &str, token_address: &str, events: Vec<TradeEvent>) -> Self {
        debug_assert!(
            events.iter().all(|e| e.token_address == token_address),
            "events for a foreign token passed to Position::from_events"
        );
        let mut entries: Vec<TradeEvent> = Vec::new();
        let mut exits: Vec<TradeEvent> = Vec::new();
        for event in events {
            match event.direction {
                TradeDirection::Buy => entries.push(event),
                TradeDirection::Sell => exits.push(event),
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        exits.sort_by_key(|e| e.timestamp);

        let total_invested: f64 = entries.iter().map(|e| e.value_usd).sum();
        let total_realized: f64 = exits.iter().map(|e| e.value_usd).sum();
        let bought: f64 = entries.iter().map(|e| e.amount).sum();
        let sold: f64 = exits.iter().map(|e| e.amount).sum();
        let mut remaining_balance = bought - sold;
        if remaining_balance < 0.0 {
            tracing::warn!(
                wallet,
                token = token_address,
                bought,
                sold,
                "ledger sold more than it bought; clamping remaining balance to zero"
            );
            remaining_balance = 0.0;
        }

        Self {
            wallet: wallet.to_string(),
            token_address: token_address.to_string(),
            entries,
            exits,
            total_invested,
            total_realized,
            remaining_balance,
            is_active: remaining_balance > 0.0,
        }
    }
}

/// One point of a lazily-fetched, read-only price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix millis.
    pub timestamp: i64,
    pub price_usd: f64,
}

/// Current price snapshot for a token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub price_usd: f64,
    pub change_24h_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub logo_uri: Option<String>,
}

/// "What if they had held to the post-exit peak" view. Present only when a
/// patience tax could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Counterfactual {
    pub would_be_value_usd: f64,
    pub missed_gain_usd: f64,
}

/// Derived, request-scoped view of one position. Never persisted by the
/// engine; rounding happens at presentation boundaries only.
#[derive(Debug, Clone, Serialize)]
pub struct PositionAnalysis {
    pub token_address: String,
    pub entry_avg_price: f64,
    pub entry_total_amount: f64,
    /// Unix millis of the first entry; 0 for a (degenerate) entry-less position.
    pub first_entry_at: i64,
    pub exit_avg_price: Option<f64>,
    pub last_exit_at: Option<i64>,
    pub total_invested: f64,
    pub total_realized: f64,
    pub remaining_balance: f64,
    pub is_active: bool,
    pub realized_pnl_usd: f64,
    pub realized_pnl_pct: f64,
    pub unrealized_pnl_usd: Option<f64>,
    pub holding_period_days: f64,
    pub patience_tax_usd: f64,
    pub missed_gain_multiplier: Option<f64>,
    pub max_missed_gain_pct: Option<f64>,
    pub is_early_exit: bool,
    pub counterfactual: Option<Counterfactual>,
}

/// The four behavioral labels. Classification is total: exactly one rule
/// fires for any (score, patience tax) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    IronPillar,
    ProfitPhantom,
    ExitVoyager,
    DiamondHand,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IronPillar => "Iron Pillar",
            Self::ProfitPhantom => "Profit Phantom",
            Self::ExitVoyager => "Exit Voyager",
            Self::DiamondHand => "Diamond Hand",
        }
    }
}

impl std::str::FromStr for Archetype {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "iron_pillar" => Ok(Self::IronPillar),
            "profit_phantom" => Ok(Self::ProfitPhantom),
            "exit_voyager" => Ok(Self::ExitVoyager),
            "diamond_hand" => Ok(Self::DiamondHand),
            other => anyhow::bail!("unknown archetype label: {other}"),
        }
    }
}

/// Portfolio-level aggregate over all analyzed positions. Derived, stateless.
#[derive(Debug, Clone, Serialize)]
pub struct ConvictionMetrics {
    /// Composite 0-100.
    pub score: f64,
    /// Monotonic transform of score, clamped to [1, 99]. Not a true cohort
    /// percentile.
    pub percentile: u8,
    pub archetype: Archetype,
    pub total_positions: u32,
    pub winning_positions: u32,
    pub conviction_wins: u32,
    pub early_exits: u32,
    pub win_rate_pct: f64,
    pub upside_capture_pct: f64,
    pub early_exit_rate_pct: f64,
    pub avg_holding_period_days: f64,
    pub total_invested: f64,
    pub total_realized: f64,
    pub total_patience_tax_usd: f64,
}

/// Six ordinal reputation bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    Unknown,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl TrustTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityLevel {
    Risky,
    Neutral,
    Credible,
    HighlyCredible,
}

/// Which reputation provider contributed the unified score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustProvider {
    None,
    Ethos,
    FairScale,
}

impl TrustProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ethos => "ethos",
            Self::FairScale => "fairscale",
        }
    }
}

/// Per-provider raw and normalized scores; `None` means the provider had no
/// data (or failed, which is treated the same).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrustBreakdown {
    pub ethos_raw: Option<f64>,
    pub ethos_normalized: Option<u8>,
    pub fairscale: Option<u8>,
}

/// What cross-chain bridging resolved. Fields are filled first-wins and
/// never overwritten once set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgedIdentity {
    pub counter_address: Option<String>,
    pub social_handle: Option<String>,
}

/// Four boolean capability flags, each monotonic non-decreasing in score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustGates {
    pub trust_filtering: bool,
    pub extended_results: bool,
    pub cluster_alerts: bool,
    pub premium_views: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTrustScore {
    pub address: String,
    /// `None` when the address matched neither chain's shape.
    pub chain: Option<Chain>,
    /// 0-100, max of the normalized provider scores.
    pub score: u8,
    pub tier: TrustTier,
    pub credibility: CredibilityLevel,
    pub primary_provider: TrustProvider,
    pub breakdown: TrustBreakdown,
    pub bridged: BridgedIdentity,
    pub gates: TrustGates,
}
