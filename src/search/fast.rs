//! Fast (greedy) minimizer mode (spec §4.7): a single linear pass over
//! the cost-ordered removable events, highest tier first. Each event is
//! tentatively dropped exactly once; the drop is kept iff the weakened
//! preferred set is still enforced afterward, otherwise the event stays.
//! Linear in the size of the alphabet, no branching, no optimality
//! guarantee.

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
        let candidates_c: Vec<String> = c
            .iter()
            .filter(|e| controllable_tier.get(*e) == Some(&tier))
            .cloned()
            .collect();
        for event in candidates_c {
            let mut c2 = c.clone();
            c2.remove(&event);
            if still_enforced(&c2, &o)? {
                c = c2;
            }
        }

        let candidates_o: Vec<String> = o
            .iter()
            .filter(|e| observable_tier.get(*e) == Some(&tier) && !c.contains(e.as_str()))
            .cloned()
            .collect();
        for event in candidates_o {
            let mut o2 = o.clone();
            o2.remove(&event);
            if still_enforced(&c, &o2)? {
                o = o2;
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
    fn single_pass_drops_what_it_can() {
        let c: BTreeSet<String> = ["a".to_owned(), "b".to_owned()].into_iter().collect();
        let o = c.clone();
        let c_tier = tiers(&[("a", Tier::P2), ("b", Tier::P1)]);
        let o_tier = tiers(&[("a", Tier::P2), ("b", Tier::P1)]);

        let (c_min, o_min) = minimize(c, o, &c_tier, &o_tier, |_, _| Ok(true)).unwrap();
        assert!(c_min.is_empty());
        assert!(o_min.is_empty());
    }

    #[test]
    fn never_revisits_a_kept_event() {
        let c: BTreeSet<String> = ["a".to_owned()].into_iter().collect();
        let o = c.clone();
        let c_tier = tiers(&[("a", Tier::P1)]);
        let o_tier = tiers(&[("a", Tier::P1)]);

        let (c_min, o_min) =
            minimize(c, o, &c_tier, &o_tier, |c, _| Ok(c.contains("a"))).unwrap();
        assert!(c_min.contains("a"));
        assert!(o_min.contains("a"));
    }
}
