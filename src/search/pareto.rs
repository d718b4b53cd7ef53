//! Pareto (exhaustive) minimizer mode (spec §4.7): for each cost tier
//! from P3 down to P1, repeatedly tries dropping one remaining event at a
//! time — controllable authority first, then observable authority for
//! events no longer controllable — keeping every drop that still
//! enforces the weakened preferred set. Sweeps a tier repeatedly until a
//! full pass removes nothing, then moves to the next tier down.

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::options::Tier;

/// A still-enforcing authority assignment.
pub type Assignment = (BTreeSet<String>, BTreeSet<String>);

pub fn minimize<F>(
    controllable: BTreeSet<String>,
    observable: BTreeSet<String>,
    controllable_tier: &HashMap<String, Tier>,
    observable_tier: &HashMap<String, Tier>,
    mut still_enforced: F,
) -> Result<Assignment>
where
    F: FnMut(&BTreeSet<String>, &BTreeSet<String>) -> Result<bool>,
{
    let mut c = controllable;
    let mut o = observable;

    for tier in [Tier::P3, Tier::P2, Tier::P1] {
        loop {
            let mut progressed = false;

            let droppable_c: Vec<String> = c
                .iter()
                .filter(|e| controllable_tier.get(*e) == Some(&tier))
                .cloned()
                .collect();
            for event in droppable_c {
                let mut c2 = c.clone();
                c2.remove(&event);
                if still_enforced(&c2, &o)? {
                    c = c2;
                    progressed = true;
                }
            }

            let droppable_o: Vec<String> = o
                .iter()
                .filter(|e| observable_tier.get(*e) == Some(&tier) && !c.contains(e.as_str()))
                .cloned()
                .collect();
            for event in droppable_o {
                let mut o2 = o.clone();
                o2.remove(&event);
                if still_enforced(&c, &o2)? {
                    o = o2;
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }
    }
    Ok((c, o))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(pairs: &[(&str, Tier)]) -> HashMap<String, Tier> {
        pairs.iter().map(|(e, t)| (e.to_string(), *t)).collect()
    }

    #[test]
    fn drops_every_event_when_nothing_is_required() {
        let c: BTreeSet<String> = ["a".to_owned(), "b".to_owned()].into_iter().collect();
        let o = c.clone();
        let c_tier = tiers(&[("a", Tier::P2), ("b", Tier::P1)]);
        let o_tier = tiers(&[("a", Tier::P2), ("b", Tier::P1)]);

        let (c_min, o_min) = minimize(c, o, &c_tier, &o_tier, |_, _| Ok(true)).unwrap();
        assert!(c_min.is_empty());
        assert!(o_min.is_empty());
    }

    #[test]
    fn keeps_an_event_the_test_refuses_to_release() {
        let c: BTreeSet<String> = ["a".to_owned()].into_iter().collect();
        let o = c.clone();
        let c_tier = tiers(&[("a", Tier::P1)]);
        let o_tier = tiers(&[("a", Tier::P1)]);

        let (c_min, o_min) =
            minimize(c, o, &c_tier, &o_tier, |c, _| Ok(c.contains("a"))).unwrap();
        assert!(c_min.contains("a"));
        assert!(o_min.contains("a"));
    }

    #[test]
    fn higher_tiers_are_attempted_before_lower_ones() {
        // both droppable, but only the P1 event may actually be released;
        // the fixpoint must still reach the minimal assignment regardless
        // of which tier it visits first.
        let c: BTreeSet<String> = ["a".to_owned(), "b".to_owned()].into_iter().collect();
        let o = c.clone();
        let c_tier = tiers(&[("a", Tier::P3), ("b", Tier::P1)]);
        let o_tier = tiers(&[("a", Tier::P3), ("b", Tier::P1)]);

        let (c_min, o_min) =
            minimize(c, o, &c_tier, &o_tier, |c, _| Ok(c.contains("a"))).unwrap();
        assert_eq!(c_min, ["a".to_owned()].into_iter().collect());
        assert_eq!(o_min, ["a".to_owned()].into_iter().collect());
    }
}
