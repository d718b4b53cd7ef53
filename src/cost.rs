//! Cost / utility model (spec §4.6): turns user-declared priority tiers
//! into a strict lexicographic weight scheme, then scores a solution's
//! preserved preferred behavior against the authority it still spends.

use std::collections::BTreeMap;

use crate::options::Tier;

/// A solution's score: `util_pref` (higher is better, sum of satisfied
/// preferred items' tier weights) and `cost` (higher is better too,
/// since it is the negated sum of retained authority — `0` means no
/// events were controlled or observed at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub util_pref: u64,
    pub cost: i64,
}

impl Score {
    /// Pareto dominance: `self` dominates `other` iff it is at least as
    /// good on both axes, strictly better on at least one.
    pub fn dominates(&self, other: &Self) -> bool {
        self.util_pref >= other.util_pref
            && self.cost >= other.cost
            && (self.util_pref > other.util_pref || self.cost > other.cost)
    }
}

/// The per-tier weight scheme: `n0 = 0`; `n_{k+1} = 1 + total weight
/// assigned in tiers P1..Pk`. This geometric escalation (`0, 1, 2, 4`)
/// guarantees a single `P_{k+1}` item outranks every combination of
/// tier-≤k items, giving strict lexicographic priority between tiers.
pub struct CostModel {
    weights: BTreeMap<Tier, u64>,
}

impl CostModel {
    pub fn new() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(Tier::P0, 0);
        let mut total = 0u64;
        for tier in Tier::COSTED {
            let w = 1 + total;
            weights.insert(tier, w);
            total += w;
        }
        Self { weights }
    }

    /// The weight assigned to `tier`.
    pub fn weight(&self, tier: Tier) -> u64 {
        *self.weights.get(&tier).unwrap_or(&0)
    }

    /// `util_pref = Σ_{p ∈ D_sat} weight(p)`, given the tiers of the
    /// satisfied preferred items.
    pub fn util_pref(&self, satisfied_tiers: impl IntoIterator<Item = Tier>) -> u64 {
        satisfied_tiers.into_iter().map(|t| self.weight(t)).sum()
    }

    /// `cost = Σ_{a ∈ C_min} (−weight_c(a)) + Σ_{a ∈ O_min} (−weight_o(a))`,
    /// given the tiers of the events retained in `C_min` and `O_min`.
    pub fn cost(
        &self,
        c_min_tiers: impl IntoIterator<Item = Tier>,
        o_min_tiers: impl IntoIterator<Item = Tier>,
    ) -> i64 {
        let c: i64 = c_min_tiers
            .into_iter()
            .map(|t| -(self.weight(t) as i64))
            .sum();
        let o: i64 = o_min_tiers
            .into_iter()
            .map(|t| -(self.weight(t) as i64))
            .sum();
        c + o
    }

    /// Scores a candidate solution in one call.
    pub fn score(
        &self,
        satisfied_tiers: impl IntoIterator<Item = Tier>,
        c_min_tiers: impl IntoIterator<Item = Tier>,
        o_min_tiers: impl IntoIterator<Item = Tier>,
    ) -> Score {
        Score {
            util_pref: self.util_pref(satisfied_tiers),
            cost: self.cost(c_min_tiers, o_min_tiers),
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_weights_escalate_geometrically() {
        let model = CostModel::new();
        assert_eq!(model.weight(Tier::P0), 0);
        assert_eq!(model.weight(Tier::P1), 1);
        assert_eq!(model.weight(Tier::P2), 2);
        assert_eq!(model.weight(Tier::P3), 4);
    }

    #[test]
    fn single_higher_tier_item_outranks_every_lower_combination() {
        let model = CostModel::new();
        let all_lower = model.util_pref([Tier::P1, Tier::P2]);
        let one_higher = model.util_pref([Tier::P3]);
        assert!(one_higher > all_lower);
    }

    #[test]
    fn cost_of_no_retained_authority_is_zero() {
        let model = CostModel::new();
        assert_eq!(model.cost([], []), 0);
    }

    #[test]
    fn retaining_authority_is_strictly_worse() {
        let model = CostModel::new();
        let bare = model.cost([], []);
        let with_one = model.cost([Tier::P1], []);
        assert!(with_one < bare);
    }

    #[test]
    fn dominance_requires_at_least_as_good_on_both_axes() {
        let better = Score {
            util_pref: 5,
            cost: -1,
        };
        let worse = Score {
            util_pref: 5,
            cost: -3,
        };
        assert!(better.dominates(&worse));
        assert!(!worse.dominates(&better));

        let incomparable = Score {
            util_pref: 6,
            cost: -4,
        };
        assert!(!better.dominates(&incomparable));
        assert!(!incomparable.dominates(&better));
    }
}
