//! Controller extraction (`construct_supervisor`, spec §4.3): turns a
//! projected supervisor into a supervisor automaton that is admissible
//! (never silently disables an uncontrollable event) and redundantly
//! defined (never disables an event the plant cannot produce anyway).

use std::collections::{HashSet, VecDeque};

use crate::automaton::{Automaton, StateIndex};

/// Extracts an executable supervisor from the projected supervisor `sp`
/// and projected plant `gp`, both deterministic over the same observable
/// alphabet. `controllable` names the controllable events.
///
/// BFS over pairs `(s_sp, s_gp)` starting at `(0, 0)`; since `sp` is
/// already deterministic, the output automaton reuses `sp`'s own state
/// set and merely adds self-loops where admissibility or redundancy
/// requires one.
pub fn construct_supervisor(
    sp: &Automaton,
    gp: &Automaton,
    controllable: &HashSet<String>,
) -> Automaton {
    let mut result = sp.clone();
    let mut visited: HashSet<(StateIndex, StateIndex)> = HashSet::new();
    let mut queue = VecDeque::new();
    let init = (sp.initial_state(), gp.initial_state());
    visited.insert(init);
    queue.push_back(init);

    while let Some((s_sp, s_gp)) = queue.pop_front() {
        for label in sp.alphabet().to_vec() {
            let event = match result.event_index(&label) {
                Some(e) => e,
                None => continue,
            };
            match sp.transition_by_label(s_sp, &label) {
                Some(next_sp) => {
                    if let Some(next_gp) = gp.transition_by_label(s_gp, &label) {
                        if visited.insert((next_sp, next_gp)) {
                            queue.push_back((next_sp, next_gp));
                        }
                    }
                }
                None => {
                    let gp_defines_it = gp.transition_by_label(s_gp, &label).is_some();
                    let is_controllable = controllable.contains(&label);
                    let needs_self_loop = (!is_controllable) || !gp_defines_it;
                    if needs_self_loop && result.transition_by_label(s_sp, &label).is_none() {
                        result.add_transition(s_sp, event, s_sp);
                    }
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(labels: &[&str]) -> Automaton {
        let alphabet: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        let mut a = Automaton::new(alphabet.clone());
        a.mark_controllable(alphabet.iter());
        a.mark_observable(alphabet.iter());
        let mut prev = 0;
        for label in labels {
            let next = a.add_state(false);
            let e = a.event_index(label).unwrap();
            a.add_transition(prev, e, next);
            prev = next;
        }
        a.set_marked(prev, true);
        a
    }

    #[test]
    fn uncontrollable_event_undefined_in_sp_gets_self_loop() {
        let gp = linear(&["a", "b"]);
        // sp disables "b" entirely (never transitions on it).
        let sp = linear(&["a"]);
        let controllable: HashSet<String> = ["a".to_owned()].into_iter().collect();
        let result = construct_supervisor(&sp, &gp, &controllable);
        // "b" is uncontrollable-and-observable, undefined at sp's final
        // state, so admissibility requires a self-loop there.
        let final_state = result.num_states() - 1;
        let eb = result.event_index("b").unwrap();
        assert_eq!(result.transition(final_state, eb), Some(final_state));
    }

    #[test]
    fn controllable_event_impossible_in_plant_gets_self_loop() {
        let gp = linear(&["a"]);
        let sp = linear(&["a"]);
        // "z" is controllable but never occurs in the plant at all.
        let mut sp = sp;
        sp.ensure_event("z");
        sp.mark_controllable(["z"]);
        let controllable: HashSet<String> = ["a".to_owned(), "z".to_owned()].into_iter().collect();
        let result = construct_supervisor(&sp, &gp, &controllable);
        let ez = result.event_index("z").unwrap();
        assert_eq!(result.transition(0, ez), Some(0));
    }

    #[test]
    fn legitimately_disabled_controllable_event_stays_disabled() {
        let gp = linear(&["a", "b"]);
        // sp disables "b": it's controllable and the plant defines it,
        // so this is a legitimate restriction, not a gap to fill.
        let sp = linear(&["a"]);
        let controllable: HashSet<String> = ["a".to_owned(), "b".to_owned()].into_iter().collect();
        let result = construct_supervisor(&sp, &gp, &controllable);
        let final_state = result.num_states() - 1;
        let eb = result.event_index("b").unwrap();
        assert_eq!(result.transition(final_state, eb), None);
    }
}
