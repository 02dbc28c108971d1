//! Per-position economics: cost basis, realized/unrealized PnL, holding
//! period, and the patience tax (dollar value of gains missed by exiting
//! before the post-exit peak, inside a bounded lookback window).
//!
//! All division is guarded; a degenerate position yields zeros, never
//! NaN/Infinity. No rounding happens here beyond the day-level holding
//! period; presentation-boundary rounding is the caller's concern.

use common::types::{Counterfactual, Position, PositionAnalysis, PricePoint};

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// A missed gain above this percentage marks the exit as early. Fixed at
    /// 50% by product definition.
    pub early_exit_threshold_pct: f64,
    /// Patience-tax window after the last exit, days.
    pub lookback_days: i64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            early_exit_threshold_pct: 50.0,
            lookback_days: 90,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_config(scoring: &common::config::Scoring, market: &common::config::MarketData) -> Self {
        Self {
            early_exit_threshold_pct: scoring.early_exit_threshold_pct,
            lookback_days: market.history_lookback_days,
        }
    }
}

fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Amount-weighted average price over a slice of fills.
fn weighted_avg_price(events: &[common::types::TradeEvent]) -> f64 {
    let total_amount: f64 = events.iter().map(|e| e.amount).sum();
    let weighted: f64 = events.iter().map(|e| e.price_usd * e.amount).sum();
    guarded_div(weighted, total_amount)
}

/// Analyze one position against an optional current price and the post-exit
/// series fetched for its patience-tax window. The caller guarantees the
/// series belongs to this position's token.
pub fn analyze_position(
    position: &Position,
    current_price: Option<f64>,
    post_exit_series: &[PricePoint],
    now_ms: i64,
    cfg: &AnalyzerConfig,
) -> PositionAnalysis {
    let entry_avg_price = weighted_avg_price(&position.entries);
    let entry_total_amount: f64 = position.entries.iter().map(|e| e.amount).sum();
    let first_entry_at = position.entries.first().map_or(0, |e| e.timestamp);

    let last_exit = position.exits.last();
    let exit_avg_price = if position.exits.is_empty() {
        None
    } else {
        Some(weighted_avg_price(&position.exits))
    };
    let last_exit_at = last_exit.map(|e| e.timestamp);

    let realized_pnl_usd = position.total_realized - position.total_invested;
    let realized_pnl_pct = guarded_div(realized_pnl_usd, position.total_invested) * 100.0;

    let unrealized_pnl_usd = match (position.is_active, current_price) {
        (true, Some(price)) => Some(position.remaining_balance * (price - entry_avg_price)),
        _ => None,
    };

    // Holding period runs to "last known": now while the position is still
    // open, otherwise the final exit.
    let held_until = if position.is_active {
        now_ms
    } else {
        last_exit_at.unwrap_or(first_entry_at)
    };
    let holding_period_days = (((held_until - first_entry_at) as f64) / MS_PER_DAY).round();

    let mut patience_tax_usd = 0.0;
    let mut missed_gain_multiplier = None;
    let mut max_missed_gain_pct = None;
    let mut counterfactual = None;
    let mut is_early_exit = false;

    if let Some(exit) = last_exit {
        let window_end = now_ms.min(exit.timestamp + cfg.lookback_days * 86_400_000);
        let peak = post_exit_series
            .iter()
            .filter(|p| p.timestamp > exit.timestamp && p.timestamp <= window_end)
            .map(|p| p.price_usd)
            .fold(None, |acc: Option<f64>, p| {
                Some(acc.map_or(p, |a| a.max(p)))
            });

        if let Some(peak) = peak {
            if exit.price_usd > 0.0 {
                let multiplier = peak / exit.price_usd;
                let missed_pct = (multiplier - 1.0) * 100.0;
                // Dollar-floored at zero: a post-exit decline is never
                // penalized further.
                patience_tax_usd = (position.total_realized * (multiplier - 1.0)).max(0.0);
                missed_gain_multiplier = Some(multiplier);
                max_missed_gain_pct = Some(missed_pct);
                counterfactual = Some(Counterfactual {
                    would_be_value_usd: position.total_realized * multiplier,
                    missed_gain_usd: patience_tax_usd,
                });
                is_early_exit = missed_pct > cfg.early_exit_threshold_pct;
            }
        }
    }

    PositionAnalysis {
        token_address: position.token_address.clone(),
        entry_avg_price,
        entry_total_amount,
        first_entry_at,
        exit_avg_price,
        last_exit_at,
        total_invested: position.total_invested,
        total_realized: position.total_realized,
        remaining_balance: position.remaining_balance,
        is_active: position.is_active,
        realized_pnl_usd,
        realized_pnl_pct,
        unrealized_pnl_usd,
        holding_period_days,
        patience_tax_usd,
        missed_gain_multiplier,
        max_missed_gain_pct,
        is_early_exit,
        counterfactual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{Position, TradeDirection, TradeEvent};

    const DAY: i64 = 86_400_000;
    const T0: i64 = 1_700_000_000_000;

    fn event(direction: TradeDirection, ts: i64, amount: f64, price: f64) -> TradeEvent {
        TradeEvent {
            hash: format!("0x{ts:x}"),
            timestamp: ts,
            token_address: "0xtok".to_string(),
            direction,
            amount,
            price_usd: price,
            value_usd: amount * price,
        }
    }

    fn position(entries: Vec<(i64, f64, f64)>, exits: Vec<(i64, f64, f64)>) -> Position {
        let mut events: Vec<TradeEvent> = entries
            .into_iter()
            .map(|(ts, a, p)| event(TradeDirection::Buy, ts, a, p))
            .collect();
        events.extend(
            exits
                .into_iter()
                .map(|(ts, a, p)| event(TradeDirection::Sell, ts, a, p)),
        );
        Position::from_events("0xwallet", "0xtok", events)
    }

    #[test]
    fn test_scenario_full_exit_with_post_exit_peak() {
        // Buy 100 @ $1, sell 100 @ $2, price peaks at $4 ten days later.
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let series = vec![
            PricePoint {
                timestamp: T0 + 5 * DAY,
                price_usd: 3.0,
            },
            PricePoint {
                timestamp: T0 + 11 * DAY,
                price_usd: 4.0,
            },
        ];
        let analysis = analyze_position(&pos, None, &series, T0 + 30 * DAY, &AnalyzerConfig::default());

        assert!((analysis.realized_pnl_usd - 100.0).abs() < 1e-9);
        assert!((analysis.realized_pnl_pct - 100.0).abs() < 1e-9);
        assert!((analysis.max_missed_gain_pct.unwrap() - 100.0).abs() < 1e-9);
        assert!((analysis.patience_tax_usd - 200.0).abs() < 1e-9);
        let cf = analysis.counterfactual.unwrap();
        assert!((cf.would_be_value_usd - 400.0).abs() < 1e-9);
        assert!((cf.missed_gain_usd - 200.0).abs() < 1e-9);
        assert!(analysis.is_early_exit);
    }

    #[test]
    fn test_no_exits_means_no_patience_tax() {
        let pos = position(vec![(T0, 100.0, 1.0)], vec![]);
        let analysis = analyze_position(&pos, Some(1.5), &[], T0 + 10 * DAY, &AnalyzerConfig::default());

        assert_eq!(analysis.exit_avg_price, None);
        assert_eq!(analysis.last_exit_at, None);
        assert_eq!(analysis.patience_tax_usd, 0.0);
        assert!(analysis.counterfactual.is_none());
        assert!(!analysis.is_early_exit);
        // Active position with a known price: unrealized = 100 * (1.5 - 1.0).
        assert!((analysis.unrealized_pnl_usd.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(analysis.holding_period_days, 10.0);
    }

    #[test]
    fn test_post_exit_decline_is_floored_at_zero() {
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let series = vec![PricePoint {
            timestamp: T0 + 2 * DAY,
            price_usd: 0.5,
        }];
        let analysis = analyze_position(&pos, None, &series, T0 + 30 * DAY, &AnalyzerConfig::default());

        assert_eq!(analysis.patience_tax_usd, 0.0);
        assert!(analysis.missed_gain_multiplier.unwrap() < 1.0);
        assert!(analysis.max_missed_gain_pct.unwrap() < 0.0);
        assert!(!analysis.is_early_exit);
        // Holding to the (lower) peak would have been worth less.
        assert!((analysis.counterfactual.unwrap().would_be_value_usd - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_outside_lookback_window_are_ignored() {
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let series = vec![
            PricePoint {
                timestamp: T0 + 10 * DAY,
                price_usd: 3.0,
            },
            // Beyond exit + 90 days: a later moonshot does not count.
            PricePoint {
                timestamp: T0 + DAY + 91 * DAY,
                price_usd: 50.0,
            },
        ];
        let analysis =
            analyze_position(&pos, None, &series, T0 + 200 * DAY, &AnalyzerConfig::default());
        assert!((analysis.missed_gain_multiplier.unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series_after_exit_yields_zero_tax() {
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let analysis = analyze_position(&pos, None, &[], T0 + 30 * DAY, &AnalyzerConfig::default());
        assert_eq!(analysis.patience_tax_usd, 0.0);
        assert!(analysis.counterfactual.is_none());
        assert!(analysis.missed_gain_multiplier.is_none());
    }

    #[test]
    fn test_zero_invested_guards_division() {
        // Airdropped position: entries with zero value.
        let pos = position(vec![(T0, 100.0, 0.0)], vec![(T0 + DAY, 100.0, 1.0)]);
        let analysis = analyze_position(&pos, None, &[], T0 + 10 * DAY, &AnalyzerConfig::default());
        assert!((analysis.realized_pnl_usd - 100.0).abs() < 1e-9);
        assert_eq!(analysis.realized_pnl_pct, 0.0);
        assert!(analysis.realized_pnl_pct.is_finite());
    }

    #[test]
    fn test_weighted_entry_average() {
        // 100 @ $1 and 50 @ $4 -> (100 + 200) / 150 = $2.
        let pos = position(vec![(T0, 100.0, 1.0), (T0 + DAY, 50.0, 4.0)], vec![]);
        let analysis = analyze_position(&pos, None, &[], T0 + 10 * DAY, &AnalyzerConfig::default());
        assert!((analysis.entry_avg_price - 2.0).abs() < 1e-9);
        assert!((analysis.entry_total_amount - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_early_exit_threshold_is_strict() {
        // Exactly 50% missed gain is not an early exit (strictly greater).
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let series = vec![PricePoint {
            timestamp: T0 + 2 * DAY,
            price_usd: 3.0,
        }];
        let analysis = analyze_position(&pos, None, &series, T0 + 30 * DAY, &AnalyzerConfig::default());
        assert!((analysis.max_missed_gain_pct.unwrap() - 50.0).abs() < 1e-9);
        assert!(!analysis.is_early_exit);
    }

    #[test]
    fn test_inactive_position_ignores_current_price() {
        let pos = position(vec![(T0, 100.0, 1.0)], vec![(T0 + DAY, 100.0, 2.0)]);
        let analysis =
            analyze_position(&pos, Some(9.0), &[], T0 + 30 * DAY, &AnalyzerConfig::default());
        assert_eq!(analysis.unrealized_pnl_usd, None);
        // Fully exited: held until the last exit, one day.
        assert_eq!(analysis.holding_period_days, 1.0);
    }
}
