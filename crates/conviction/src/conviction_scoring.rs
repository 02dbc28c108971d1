//! Portfolio-level conviction scoring: composite 0-100 score, percentile
//! transform, and behavioral archetype.

use common::types::{Archetype, ConvictionMetrics, PositionAnalysis};

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub win_rate: f64,
    pub upside_capture: f64,
    pub early_exit_mitigation: f64,
    pub holding_period: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_rate: 0.35,
            upside_capture: 0.25,
            early_exit_mitigation: 0.20,
            holding_period: 0.20,
        }
    }
}

/// Archetype rule thresholds. Rules are checked in order; the first match
/// wins and Diamond Hand is the exhaustive default, so classification is
/// total for any (score, patience tax) pair.
#[derive(Debug, Clone, Copy)]
pub struct ArchetypeThresholds {
    pub iron_pillar_min_score: f64,
    pub iron_pillar_max_patience_tax: f64,
    pub profit_phantom_min_score: f64,
    pub profit_phantom_min_patience_tax: f64,
    pub exit_voyager_max_score: f64,
    /// Label for a wallet with zero positions.
    pub empty_state: Archetype,
}

impl Default for ArchetypeThresholds {
    fn default() -> Self {
        Self {
            iron_pillar_min_score: 70.0,
            iron_pillar_max_patience_tax: 1000.0,
            profit_phantom_min_score: 50.0,
            profit_phantom_min_patience_tax: 5000.0,
            exit_voyager_max_score: 30.0,
            empty_state: Archetype::ExitVoyager,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    pub weights: ScoreWeights,
    pub thresholds: ArchetypeThresholds,
    /// Holding beyond this many days adds nothing to the score.
    pub holding_period_cap_days: f64,
    /// Realized PnL above this fraction of invested counts as a conviction win.
    pub conviction_win_ratio: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: ArchetypeThresholds::default(),
            holding_period_cap_days: 30.0,
            conviction_win_ratio: 0.5,
        }
    }
}

impl ScorerConfig {
    pub fn from_config(
        scoring: &common::config::Scoring,
        archetypes: &common::config::Archetypes,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            weights: ScoreWeights {
                win_rate: scoring.win_rate_weight,
                upside_capture: scoring.upside_capture_weight,
                early_exit_mitigation: scoring.early_exit_mitigation_weight,
                holding_period: scoring.holding_period_weight,
            },
            thresholds: ArchetypeThresholds {
                iron_pillar_min_score: archetypes.iron_pillar_min_score,
                iron_pillar_max_patience_tax: archetypes.iron_pillar_max_patience_tax,
                profit_phantom_min_score: archetypes.profit_phantom_min_score,
                profit_phantom_min_patience_tax: archetypes.profit_phantom_min_patience_tax,
                exit_voyager_max_score: archetypes.exit_voyager_max_score,
                empty_state: archetypes.empty_state.parse()?,
            },
            holding_period_cap_days: scoring.holding_period_cap_days,
            conviction_win_ratio: scoring.conviction_win_ratio,
        })
    }
}

pub fn classify_archetype(score: f64, patience_tax: f64, t: &ArchetypeThresholds) -> Archetype {
    if score >= t.iron_pillar_min_score && patience_tax <= t.iron_pillar_max_patience_tax {
        Archetype::IronPillar
    } else if score >= t.profit_phantom_min_score
        && patience_tax >= t.profit_phantom_min_patience_tax
    {
        Archetype::ProfitPhantom
    } else if score <= t.exit_voyager_max_score {
        Archetype::ExitVoyager
    } else {
        Archetype::DiamondHand
    }
}

/// `clamp(1, 99, 100 - floor(score))`: a monotonic transform of the score
/// ("top N%"), not a true cohort percentile.
fn percentile_for(score: f64) -> u8 {
    (100.0 - score.floor()).clamp(1.0, 99.0) as u8
}

fn guarded_rate(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total) * 100.0
    }
}

/// Aggregate a wallet's analyses into one ConvictionMetrics. Zero positions
/// returns the fixed neutral result with the configured empty-state label.
pub fn score_portfolio(analyses: &[PositionAnalysis], cfg: &ScorerConfig) -> ConvictionMetrics {
    let total = u32::try_from(analyses.len()).unwrap_or(u32::MAX);
    if total == 0 {
        return ConvictionMetrics {
            score: 0.0,
            percentile: percentile_for(0.0),
            archetype: cfg.thresholds.empty_state,
            total_positions: 0,
            winning_positions: 0,
            conviction_wins: 0,
            early_exits: 0,
            win_rate_pct: 0.0,
            upside_capture_pct: 0.0,
            early_exit_rate_pct: 0.0,
            avg_holding_period_days: 0.0,
            total_invested: 0.0,
            total_realized: 0.0,
            total_patience_tax_usd: 0.0,
        };
    }

    let mut total_invested = 0.0;
    let mut total_realized = 0.0;
    let mut total_patience_tax = 0.0;
    let mut total_holding_days = 0.0;
    let mut winning_positions = 0u32;
    let mut conviction_wins = 0u32;
    let mut early_exits = 0u32;

    for analysis in analyses {
        total_invested += analysis.total_invested;
        total_realized += analysis.total_realized;
        total_patience_tax += analysis.patience_tax_usd;
        total_holding_days += analysis.holding_period_days;
        if analysis.realized_pnl_usd > 0.0 {
            winning_positions += 1;
        }
        if analysis.realized_pnl_usd > cfg.conviction_win_ratio * analysis.total_invested {
            conviction_wins += 1;
        }
        if analysis.is_early_exit {
            early_exits += 1;
        }
    }

    let win_rate_pct = guarded_rate(winning_positions, total);
    let early_exit_rate_pct = guarded_rate(early_exits, total);
    let captured_denominator = total_realized + total_patience_tax;
    let upside_capture_pct = if captured_denominator == 0.0 {
        0.0
    } else {
        total_realized / captured_denominator * 100.0
    };
    let avg_holding_period_days = total_holding_days / f64::from(total);

    let holding_term = (avg_holding_period_days / cfg.holding_period_cap_days).min(1.0) * 100.0;
    let score = (win_rate_pct * cfg.weights.win_rate
        + upside_capture_pct * cfg.weights.upside_capture
        + (100.0 - early_exit_rate_pct) * cfg.weights.early_exit_mitigation
        + holding_term * cfg.weights.holding_period)
        .clamp(0.0, 100.0);

    ConvictionMetrics {
        score,
        percentile: percentile_for(score),
        archetype: classify_archetype(score, total_patience_tax, &cfg.thresholds),
        total_positions: total,
        winning_positions,
        conviction_wins,
        early_exits,
        win_rate_pct,
        upside_capture_pct,
        early_exit_rate_pct,
        avg_holding_period_days,
        total_invested,
        total_realized,
        total_patience_tax_usd: total_patience_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(
        invested: f64,
        realized: f64,
        patience_tax: f64,
        holding_days: f64,
        early_exit: bool,
    ) -> PositionAnalysis {
        PositionAnalysis {
            token_address: "0xtok".to_string(),
            entry_avg_price: 1.0,
            entry_total_amount: invested,
            first_entry_at: 0,
            exit_avg_price: Some(1.0),
            last_exit_at: Some(1),
            total_invested: invested,
            total_realized: realized,
            remaining_balance: 0.0,
            is_active: false,
            realized_pnl_usd: realized - invested,
            realized_pnl_pct: 0.0,
            unrealized_pnl_usd: None,
            holding_period_days: holding_days,
            patience_tax_usd: patience_tax,
            missed_gain_multiplier: None,
            max_missed_gain_pct: None,
            is_early_exit: early_exit,
            counterfactual: None,
        }
    }

    #[test]
    fn test_zero_positions_neutral_result() {
        let metrics = score_portfolio(&[], &ScorerConfig::default());
        assert_eq!(metrics.score, 0.0);
        assert_eq!(metrics.win_rate_pct, 0.0);
        assert_eq!(metrics.total_positions, 0);
        assert_eq!(metrics.archetype, Archetype::ExitVoyager);
        assert_eq!(metrics.percentile, 99);
    }

    #[test]
    fn test_rates_stay_in_bounds() {
        let analyses = vec![
            analysis(100.0, 300.0, 50.0, 10.0, false),
            analysis(100.0, 20.0, 0.0, 2.0, true),
            analysis(50.0, 80.0, 500.0, 45.0, true),
        ];
        let metrics = score_portfolio(&analyses, &ScorerConfig::default());
        for rate in [
            metrics.win_rate_pct,
            metrics.upside_capture_pct,
            metrics.early_exit_rate_pct,
        ] {
            assert!((0.0..=100.0).contains(&rate), "rate out of bounds: {rate}");
        }
    }

    #[test]
    fn test_score_clamped_for_any_weights() {
        let analyses = vec![analysis(100.0, 300.0, 0.0, 60.0, false)];
        let mut cfg = ScorerConfig {
            weights: ScoreWeights {
                win_rate: 5.0,
                upside_capture: 5.0,
                early_exit_mitigation: 5.0,
                holding_period: 5.0,
            },
            ..ScorerConfig::default()
        };
        let metrics = score_portfolio(&analyses, &cfg);
        assert!((0.0..=100.0).contains(&metrics.score));
        assert_eq!(metrics.score, 100.0);

        cfg.weights = ScoreWeights {
            win_rate: -5.0,
            upside_capture: -5.0,
            early_exit_mitigation: -5.0,
            holding_period: -5.0,
        };
        let metrics = score_portfolio(&analyses, &cfg);
        assert_eq!(metrics.score, 0.0);
    }

    #[test]
    fn test_holding_term_caps_at_reference() {
        // 30 days and 300 days contribute identically.
        let at_cap = score_portfolio(
            &[analysis(100.0, 150.0, 0.0, 30.0, false)],
            &ScorerConfig::default(),
        );
        let beyond_cap = score_portfolio(
            &[analysis(100.0, 150.0, 0.0, 300.0, false)],
            &ScorerConfig::default(),
        );
        assert!((at_cap.score - beyond_cap.score).abs() < 1e-9);
    }

    #[test]
    fn test_conviction_win_needs_half_of_invested() {
        let analyses = vec![
            // +60% of invested: conviction win.
            analysis(100.0, 160.0, 0.0, 5.0, false),
            // +20% of invested: a win, but not a conviction win.
            analysis(100.0, 120.0, 0.0, 5.0, false),
            // Loss.
            analysis(100.0, 40.0, 0.0, 5.0, false),
        ];
        let metrics = score_portfolio(&analyses, &ScorerConfig::default());
        assert_eq!(metrics.winning_positions, 2);
        assert_eq!(metrics.conviction_wins, 1);
    }

    #[test]
    fn test_upside_capture_zero_denominator() {
        let metrics = score_portfolio(
            &[analysis(100.0, 0.0, 0.0, 5.0, false)],
            &ScorerConfig::default(),
        );
        assert_eq!(metrics.upside_capture_pct, 0.0);
    }

    #[test]
    fn test_archetype_rules_in_order() {
        let t = ArchetypeThresholds::default();
        assert_eq!(classify_archetype(80.0, 500.0, &t), Archetype::IronPillar);
        // High score but heavy patience tax: phantom, not pillar.
        assert_eq!(classify_archetype(80.0, 9000.0, &t), Archetype::ProfitPhantom);
        assert_eq!(classify_archetype(20.0, 0.0, &t), Archetype::ExitVoyager);
        assert_eq!(classify_archetype(45.0, 2000.0, &t), Archetype::DiamondHand);
    }

    #[test]
    fn test_archetype_total_over_grid() {
        // Every (score, tax) pair classifies to exactly one label; the match
        // chain cannot panic and always lands somewhere.
        let t = ArchetypeThresholds::default();
        for score in (0..=100).step_by(5) {
            for tax in [0.0, 999.0, 1000.0, 1001.0, 4999.0, 5000.0, 1e9] {
                let _ = classify_archetype(f64::from(score), tax, &t);
            }
        }
    }

    #[test]
    fn test_percentile_transform() {
        assert_eq!(percentile_for(0.0), 99);
        assert_eq!(percentile_for(94.2), 6);
        assert_eq!(percentile_for(100.0), 1);
    }

    #[test]
    fn test_percentile_monotonic_in_score() {
        let mut last = u8::MAX;
        for score in 0..=100 {
            let p = percentile_for(f64::from(score));
            assert!(p <= last);
            last = p;
        }
    }
}
