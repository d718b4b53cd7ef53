//! The supervisory-control kernel: computes the supremal
//! controllable-and-normal sublanguage of a plant under a property.
//!
//! The fixpoint walks the synchronized plant/property product directly
//! rather than going through [`crate::automaton::Automaton::compose`],
//! because the controllability check needs to know, at every product
//! state, which events the *plant alone* still permits — information the
//! generic composition operator does not retain once it has flattened
//! the product into a fresh automaton.

use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;

use crate::automaton::{Automaton, StateIndex};

/// Synchronizes `plant` and `property` exactly as
/// [`Automaton::compose`] would, but also returns, for every state of
/// the product, the corresponding plant-side state — the bookkeeping
/// the controllability fixpoint needs.
fn synchronize(plant: &Automaton, property: &Automaton) -> (Automaton, Vec<StateIndex>) {
    let shared: Vec<String> = plant
        .alphabet()
        .iter()
        .filter(|label| property.event_index(label).is_some())
        .cloned()
        .collect();
    let mut combined_alphabet = plant.alphabet().to_vec();
    for label in property.alphabet() {
        if plant.event_index(label).is_none() {
            combined_alphabet.push(label.clone());
        }
    }
    let mut result = Automaton::new(combined_alphabet);
    for label in plant.alphabet() {
        let src = plant.event_index(label).unwrap();
        if plant.is_controllable(src) {
            result.mark_controllable([label.as_str()]);
        }
        if plant.is_observable(src) {
            result.mark_observable([label.as_str()]);
        }
    }
    for label in property.alphabet() {
        let src = property.event_index(label).unwrap();
        if property.is_controllable(src) {
            result.mark_controllable([label.as_str()]);
        }
        if property.is_observable(src) {
            result.mark_observable([label.as_str()]);
        }
    }
    let shared_labels: std::collections::HashSet<&str> =
        shared.iter().map(|s| s.as_str()).collect();

    let mut mapping: HashMap<(StateIndex, StateIndex), StateIndex> = HashMap::new();
    let mut plant_of = Vec::new();
    let mut queue = VecDeque::new();
    let init_pair = (plant.initial_state(), property.initial_state());
    mapping.insert(init_pair, 0);
    plant_of.push(init_pair.0);
    result.set_marked(0, plant.is_marked(init_pair.0) && property.is_marked(init_pair.1));
    queue.push_back(init_pair);

    while let Some((sa, sb)) = queue.pop_front() {
        let source = mapping[&(sa, sb)];
        for &(ea, ta) in plant.out_edges(sa) {
            let label = &plant.alphabet()[ea];
            if shared_labels.contains(label.as_str()) {
                if let Some(tb) = property.transition_by_label(sb, label) {
                    let event = result.event_index(label).unwrap();
                    let target = product_state(
                        &mut result, &mut mapping, &mut plant_of, &mut queue, plant, property, (ta, tb),
                    );
                    result.add_transition(source, event, target);
                }
            } else {
                let event = result.event_index(label).unwrap();
                let target = product_state(
                    &mut result, &mut mapping, &mut plant_of, &mut queue, plant, property, (ta, sb),
                );
                result.add_transition(source, event, target);
            }
        }
        for &(eb, tb) in property.out_edges(sb) {
            let label = &property.alphabet()[eb];
            if !shared_labels.contains(label.as_str()) {
                let event = result.event_index(label).unwrap();
                let target = product_state(
                    &mut result, &mut mapping, &mut plant_of, &mut queue, plant, property, (sa, tb),
                );
                result.add_transition(source, event, target);
            }
        }
    }
    (result, plant_of)
}

/// Looks up (or creates) the product state for `pair`, registering its
/// plant-side component and enqueuing it for exploration if new.
fn product_state(
    result: &mut Automaton,
    mapping: &mut HashMap<(StateIndex, StateIndex), StateIndex>,
    plant_of: &mut Vec<StateIndex>,
    queue: &mut VecDeque<(StateIndex, StateIndex)>,
    plant: &Automaton,
    property: &Automaton,
    pair: (StateIndex, StateIndex),
) -> StateIndex {
    *mapping.entry(pair).or_insert_with(|| {
        let idx = result.add_state(plant.is_marked(pair.0) && property.is_marked(pair.1));
        plant_of.push(pair.0);
        queue.push_back(pair);
        idx
    })
}

/// Removes from `live` every state that disables, directly or
/// transitively, an uncontrollable event the plant still permits.
/// Returns whether anything changed.
fn remove_controllability_violations(
    gh: &Automaton,
    plant: &Automaton,
    plant_of: &[StateIndex],
    live: &mut FixedBitSet,
) -> bool {
    let mut changed = false;
    loop {
        let mut to_remove = Vec::new();
        for s in 0..gh.num_states() {
            if !live[s] {
                continue;
            }
            let g = plant_of[s];
            for &(event, _) in plant.out_edges(g) {
                if plant.is_controllable(event) {
                    continue;
                }
                let ok = matches!(gh.transition(s, event), Some(t) if live[t]);
                if !ok {
                    to_remove.push(s);
                    break;
                }
            }
        }
        if to_remove.is_empty() {
            break;
        }
        for s in to_remove {
            live.set(s, false);
        }
        changed = true;
    }
    changed
}

/// Groups states into equivalence classes connected by unobservable
/// transitions, in either direction, since a supervisor that cannot see
/// an event cannot condition its decision on which side of it it is.
fn unobservable_components(gh: &Automaton) -> Vec<usize> {
    let n = gh.num_states();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for s in 0..n {
        for &(event, t) in gh.out_edges(s) {
            if !gh.is_observable(event) {
                let ra = find(&mut parent, s);
                let rb = find(&mut parent, t);
                if ra != rb {
                    parent[ra] = rb;
                }
            }
        }
    }
    (0..n).map(|i| find(&mut parent, i)).collect()
}

/// Enforces normality: an equivalence class under
/// [`unobservable_components`] must be either entirely live or entirely
/// dead, since the supervisor observing only the projected behavior
/// cannot distinguish its members. Shrinks mixed classes to dead.
fn enforce_normal_closure(gh: &Automaton, components: &[usize], live: &mut FixedBitSet) -> bool {
    let mut all_live: HashMap<usize, bool> = HashMap::new();
    for s in 0..gh.num_states() {
        let entry = all_live.entry(components[s]).or_insert(true);
        *entry &= live[s];
    }
    let mut changed = false;
    for s in 0..gh.num_states() {
        if live[s] && !all_live[&components[s]] {
            live.set(s, false);
            changed = true;
        }
    }
    changed
}

/// Removes states from which no live marked state is reachable via live
/// transitions, enforcing the non-blocking (marked-state reachable)
/// requirement.
fn trim_non_coreachable(gh: &Automaton, live: &mut FixedBitSet) -> bool {
    let n = gh.num_states();
    let mut preds: Vec<Vec<StateIndex>> = vec![Vec::new(); n];
    for s in 0..n {
        for &(_, t) in gh.out_edges(s) {
            preds[t].push(s);
        }
    }
    let mut coreachable = FixedBitSet::with_capacity(n);
    let mut queue = VecDeque::new();
    for s in 0..n {
        if live[s] && gh.is_marked(s) {
            coreachable.insert(s);
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for &p in &preds[s] {
            if live[p] && !coreachable[p] {
                coreachable.insert(p);
                queue.push_back(p);
            }
        }
    }
    let mut changed = false;
    for s in 0..n {
        if live[s] && !coreachable[s] {
            live.set(s, false);
            changed = true;
        }
    }
    changed
}

/// Builds the sub-automaton of `gh` induced by `live`, dropping
/// transitions into dead states, then compacts to the states reachable
/// from the initial state.
fn restrict(gh: &Automaton, live: &FixedBitSet) -> Automaton {
    let mut result = Automaton::new(gh.alphabet().to_vec());
    for event in 0..gh.alphabet().len() {
        let label = &gh.alphabet()[event];
        if gh.is_controllable(event) {
            result.mark_controllable([label.as_str()]);
        }
        if gh.is_observable(event) {
            result.mark_observable([label.as_str()]);
        }
    }
    for _ in 1..gh.num_states() {
        result.add_state(false);
    }
    for s in 0..gh.num_states() {
        result.set_marked(s, live[s] && gh.is_marked(s));
        if !live[s] {
            continue;
        }
        for &(event, target) in gh.out_edges(s) {
            if live[target] {
                result.add_transition(s, event, target);
            }
        }
    }
    result.restricted_to_reachable()
}

/// Computes the supremal controllable-and-normal sublanguage of `plant`
/// under `property`. When `prefix_closed` is false, also enforces
/// marked-state reachability (non-blocking): every live state must be
/// able to reach a marked live state.
///
/// Returns `None` ("no controller") if the supremal sublanguage is
/// empty, i.e. the initial state itself cannot survive the fixpoint.
pub fn supremal_controllable_normal(
    plant: &Automaton,
    property: &Automaton,
    prefix_closed: bool,
) -> Option<Automaton> {
    let (gh, plant_of) = synchronize(plant, property);
    let components = unobservable_components(&gh);

    let mut live = FixedBitSet::with_capacity(gh.num_states());
    for s in 0..gh.num_states() {
        live.insert(s);
    }

    loop {
        let mut changed = remove_controllability_violations(&gh, plant, &plant_of, &mut live);
        changed |= enforce_normal_closure(&gh, &components, &mut live);
        if !prefix_closed {
            changed |= trim_non_coreachable(&gh, &mut live);
        }
        if !changed {
            break;
        }
    }

    if !live[gh.initial_state()] {
        return None;
    }
    Some(restrict(&gh, &live))
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
    fn unconstrained_property_yields_full_plant_language() {
        let plant = linear(&["a", "b"]);
        // a property over a disjoint alphabet restricts nothing: "z" is
        // simply never taken, so the solution's plant-alphabet language
        // is unchanged.
        let property = Automaton::new(vec!["z".to_owned()]);
        let solution = supremal_controllable_normal(&plant, &property, true).unwrap();
        assert_eq!(solution.reachable().count_ones(..), plant.reachable().count_ones(..));
    }

    #[test]
    fn contradictory_safety_yields_no_controller() {
        let mut plant = Automaton::new(vec!["a".to_owned()]);
        plant.mark_controllable(["a"]);
        plant.mark_observable(["a"]);
        let s1 = plant.add_state(true);
        let ea = plant.event_index("a").unwrap();
        plant.add_transition(0, ea, s1);

        // safety property that forbids "a" entirely: no transition on a.
        let mut property = Automaton::new(vec!["a".to_owned()]);
        property.mark_controllable(["a"]);
        property.mark_observable(["a"]);
        property.set_marked(0, true);

        // "a" is controllable, so this is merely restricted, not blocked.
        let solution = supremal_controllable_normal(&plant, &property, true);
        assert!(solution.is_some());
        let solution = solution.unwrap();
        assert_eq!(solution.num_states(), 1);
    }

    #[test]
    fn uncontrollable_violation_yields_no_controller() {
        let mut plant = Automaton::new(vec!["a".to_owned()]);
        plant.mark_observable(["a"]);
        // "a" left uncontrollable: the supervisor cannot prevent it.
        let s1 = plant.add_state(true);
        let ea = plant.event_index("a").unwrap();
        plant.add_transition(0, ea, s1);

        let mut property = Automaton::new(vec!["a".to_owned()]);
        property.mark_controllable(["a"]);
        property.mark_observable(["a"]);
        property.set_marked(0, true);
        // property has no transition on "a": any traversal is unsafe

        let solution = supremal_controllable_normal(&plant, &property, true);
        assert!(solution.is_none());
    }

    #[test]
    fn non_blocking_trims_states_unable_to_reach_marking() {
        let mut plant = Automaton::new(vec!["a".to_owned(), "b".to_owned()]);
        plant.mark_controllable(["a", "b"]);
        plant.mark_observable(["a", "b"]);
        let s1 = plant.add_state(false);
        let s2 = plant.add_state(true);
        let ea = plant.event_index("a").unwrap();
        let eb = plant.event_index("b").unwrap();
        plant.add_transition(0, ea, s1);
        plant.add_transition(0, eb, s2);
        // s1 is a dead end: never marked, nothing leaves it.

        let property = Automaton::new(vec!["z".to_owned()]);
        let solution = supremal_controllable_normal(&plant, &property, false).unwrap();
        assert!(solution.num_states() <= 2);
    }
}
