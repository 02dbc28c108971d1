//! Score-gated capabilities. Every gate and entitlement is monotonic
//! non-decreasing in the unified trust score, so raising a score can only
//! unlock, never revoke.

use common::types::{TrustGates, TrustTier};

const TRUST_FILTERING_MIN: u8 = 35;
const EXTENDED_RESULTS_MIN: u8 = 50;
const CLUSTER_ALERTS_MIN: u8 = 65;
const PREMIUM_VIEWS_MIN: u8 = 80;

pub fn gates_for(score: u8) -> TrustGates {
    TrustGates {
        trust_filtering: score >= TRUST_FILTERING_MIN,
        extended_results: score >= EXTENDED_RESULTS_MIN,
        cluster_alerts: score >= CLUSTER_ALERTS_MIN,
        premium_views: score >= PREMIUM_VIEWS_MIN,
    }
}

/// Tier-derived quotas layered on top of the boolean gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlements {
    /// Result-set ceiling for ranked queries.
    pub max_results: u32,
    /// Highest trust-filter floor the caller may request. Filtering below
    /// one's own tier is always allowed; filtering above it is not.
    pub max_filter_tier: TrustTier,
    pub gates: TrustGates,
}

pub fn entitlements_for(score: u8) -> Entitlements {
    let tier = crate::trust::tier_for(score);
    let max_results = match tier {
        TrustTier::Unknown => 25,
        TrustTier::Bronze => 50,
        TrustTier::Silver => 100,
        TrustTier::Gold => 200,
        TrustTier::Platinum => 500,
        TrustTier::Diamond => 1000,
    };
    Entitlements {
        max_results,
        max_filter_tier: tier,
        gates: gates_for(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_breakpoints() {
        let closed = gates_for(34);
        assert!(!closed.trust_filtering);

        let filtering = gates_for(35);
        assert!(filtering.trust_filtering);
        assert!(!filtering.extended_results);

        let extended = gates_for(50);
        assert!(extended.extended_results);
        assert!(!extended.cluster_alerts);

        let alerts = gates_for(65);
        assert!(alerts.cluster_alerts);
        assert!(!alerts.premium_views);

        let premium = gates_for(80);
        assert!(premium.premium_views);
    }

    #[test]
    fn test_gates_monotonic_over_full_range() {
        let mut last = gates_for(0);
        for score in 1..=100 {
            let gates = gates_for(score);
            assert!(gates.trust_filtering >= last.trust_filtering);
            assert!(gates.extended_results >= last.extended_results);
            assert!(gates.cluster_alerts >= last.cluster_alerts);
            assert!(gates.premium_views >= last.premium_views);
            last = gates;
        }
    }

    #[test]
    fn test_entitlements_grow_with_score() {
        let mut last = entitlements_for(0);
        for score in 1..=100 {
            let ent = entitlements_for(score);
            assert!(ent.max_results >= last.max_results);
            assert!(ent.max_filter_tier >= last.max_filter_tier);
            last = ent;
        }
    }

    #[test]
    fn test_entitlement_quotas_per_tier() {
        assert_eq!(entitlements_for(0).max_results, 25);
        assert_eq!(entitlements_for(20).max_results, 50);
        assert_eq!(entitlements_for(40).max_results, 100);
        assert_eq!(entitlements_for(60).max_results, 200);
        assert_eq!(entitlements_for(75).max_results, 500);
        assert_eq!(entitlements_for(90).max_results, 1000);
    }
}
