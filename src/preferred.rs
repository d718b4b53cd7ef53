//! Preferred-behavior checker (spec §4.5): decides whether a candidate
//! supervised system still realizes a preferred-behavior automaton `p`
//! after authority has been pared down to some controllable/observable
//! subset.
//!
//! The test hides every event outside `p`'s alphabet `Σ_p` (treats it as
//! unobservable), projects to an observer `M'↓Σ_p`, and decides whether
//! `M'↓Σ_p` refines `p`, i.e. `L(M'↓Σ_p) ⊆ L(p)`. Subset is encoded as
//! an equality test the standard way: `L(observer) ⊆ L(p)` iff
//! `L(observer ‖ p) = L(observer)`. The result is memoized on `(sorted
//! C, sorted O, p-identity)` because the search engine revisits the same
//! pair with different subsets of `D`.

use std::collections::HashMap;

use crate::automaton::Automaton;
use crate::error::Result;

/// Stateful checker holding the memoization cache across search-engine
/// calls. `preferred_id` is a stable identifier assigned by the caller
/// (e.g. the preferred automaton's index in its tier's catalogue) rather
/// than a hash of the automaton itself, since the automaton is loaded
/// once and never mutated.
#[derive(Default)]
pub struct PreferredChecker {
    cache: HashMap<(Vec<String>, Vec<String>, usize), bool>,
}

impl PreferredChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `preferred` is still enforced by `composed` under
    /// the given controllable/observable sets.
    pub fn is_enforced(
        &mut self,
        composed: &Automaton,
        controllable: &[String],
        observable: &[String],
        preferred_id: usize,
        preferred: &Automaton,
    ) -> Result<bool> {
        let mut c = controllable.to_vec();
        c.sort();
        let mut o = observable.to_vec();
        o.sort();
        let key = (c, o, preferred_id);
        if let Some(&cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let enforced = check(composed, preferred)?;
        self.cache.insert(key, enforced);
        Ok(enforced)
    }

    /// Drops every cached result, e.g. between independent search runs.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// The uncached check underlying [`PreferredChecker::is_enforced`].
fn check(composed: &Automaton, preferred: &Automaton) -> Result<bool> {
    let sigma_p = preferred.alphabet().to_vec();
    let observer = composed
        .extend_alphabet(&sigma_p)
        .restrict_observable(&sigma_p)
        .project();
    let recomposed = observer.compose(preferred);
    recomposed.language_equal(&observer)
}
