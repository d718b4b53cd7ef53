//! Authority minimizer (spec §4.4): drops events that no reachable
//! supervisor state actually disables or distinguishes.

use std::collections::BTreeSet;

use crate::automaton::Automaton;

/// Computes `C_min`/`O_min` for the extracted supervisor `s`, given its
/// current controllable/observable sets and the priority-0 ("always
/// free") events that must be retained regardless.
///
/// `can_uc` is the set of observable events never disabled at any
/// reachable state — these may be dropped from `controllable`.
/// `can_uo` is the subset of `can_uc` whose every transition is a
/// self-loop at every reachable state — these may additionally be
/// dropped from `observable`.
pub fn minimize_authority(
    s: &Automaton,
    controllable: &[String],
    observable: &[String],
    free_controllable: &[String],
    free_observable: &[String],
) -> (Vec<String>, Vec<String>) {
    let reachable = s.reachable();

    let can_uc: BTreeSet<String> = observable
        .iter()
        .filter(|label| {
            s.event_index(label)
                .map(|event| {
                    reachable
                        .ones()
                        .all(|state| s.transition(state, event).is_some())
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let can_uo: BTreeSet<String> = can_uc
        .iter()
        .filter(|label| {
            let event = s.event_index(label).unwrap();
            reachable.ones().all(|state| {
                matches!(s.transition(state, event), Some(target) if target == state)
            })
        })
        .cloned()
        .collect();

    let c_min: BTreeSet<String> = controllable
        .iter()
        .filter(|e| !can_uc.contains(*e))
        .cloned()
        .chain(free_controllable.iter().cloned())
        .collect();
    let o_min: BTreeSet<String> = observable
        .iter()
        .filter(|e| !can_uo.contains(*e))
        .cloned()
        .chain(free_observable.iter().cloned())
        .collect();

    (c_min.into_iter().collect(), o_min.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_never_disabled_is_dropped_from_controllable() {
        let mut s = Automaton::new(vec!["a".to_owned()]);
        let s1 = s.add_state(true);
        let e = s.event_index("a").unwrap();
        s.add_transition(0, e, s1);
        s.add_transition(s1, e, s1);
        // "a" is defined at every reachable state: never disabled.

        let (c_min, o_min) = minimize_authority(
            &s,
            &["a".to_owned()],
            &["a".to_owned()],
            &[],
            &[],
        );
        assert!(c_min.is_empty());
        assert_eq!(o_min, vec!["a".to_owned()]);
    }

    #[test]
    fn pure_self_loop_event_is_dropped_from_observable_too() {
        let mut s = Automaton::new(vec!["a".to_owned()]);
        let e = s.event_index("a").unwrap();
        s.set_marked(0, true);
        s.add_transition(0, e, 0);
        // "a" always self-loops: never distinguishes states.

        let (c_min, o_min) = minimize_authority(
            &s,
            &["a".to_owned()],
            &["a".to_owned()],
            &[],
            &[],
        );
        assert!(c_min.is_empty());
        assert!(o_min.is_empty());
    }

    #[test]
    fn free_events_are_always_retained() {
        let s = Automaton::new(vec!["a".to_owned()]);
        let (c_min, o_min) = minimize_authority(
            &s,
            &[],
            &[],
            &["a".to_owned()],
            &["a".to_owned()],
        );
        assert_eq!(c_min, vec!["a".to_owned()]);
        assert_eq!(o_min, vec!["a".to_owned()]);
    }

    #[test]
    fn event_disabled_somewhere_is_kept_controllable() {
        let mut s = Automaton::new(vec!["a".to_owned()]);
        let s1 = s.add_state(true);
        let e = s.event_index("a").unwrap();
        s.add_transition(0, e, s1);
        // undefined at s1: "a" is disabled there, so it stays controllable.

        let (c_min, _) = minimize_authority(&s, &["a".to_owned()], &["a".to_owned()], &[], &[]);
        assert_eq!(c_min, vec!["a".to_owned()]);
    }
}
