//! Finite labeled transition systems, the unit of exchange between every
//! other component of the engine.
//!
//! An [`Automaton`] is represented struct-of-arrays style: states are dense
//! indices `0..num_states`, events are dense indices into a shared
//! alphabet, and transitions are adjacency lists keyed by source state,
//! mirroring the index-based node/label separation of a labelled game,
//! generalized from a single winner-owner-color-label tuple per node to a
//! (possibly nondeterministic) set of outgoing labeled edges per state.

pub mod io;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use fixedbitset::FixedBitSet;

use crate::error::{EngineError, Result};

/// The reserved label for the silent event introduced by observer
/// projection, and the implicit alphabet-index-0 event of the FSM text
/// format.
pub const TAU: &str = "_tau_";

/// Index of a state in an [`Automaton`]. The initial state is always 0.
pub type StateIndex = usize;

/// Index of an event in an [`Automaton`]'s alphabet.
pub type EventIndex = usize;

/// A finite labeled transition system `(Q, Sigma, delta, q0, F)`.
///
/// States are `0..num_states()` with `0` always the initial state.
/// Transitions are stored per source state as `(event, target)` pairs;
/// nondeterminism (more than one target for the same event at the same
/// state) is permitted until [`Automaton::project`] is called.
#[derive(Debug, Clone)]
pub struct Automaton {
    alphabet: Vec<String>,
    label_index: HashMap<String, EventIndex>,
    controllable: FixedBitSet,
    observable: FixedBitSet,
    marked: FixedBitSet,
    out: Vec<Vec<(EventIndex, StateIndex)>>,
}

impl Automaton {
    /// Creates a new automaton with the given alphabet and a single,
    /// unmarked initial state. All events start out uncontrollable and
    /// unobservable; use [`Automaton::mark_controllable`] and
    /// [`Automaton::mark_observable`] to set flags.
    pub fn new(alphabet: Vec<String>) -> Self {
        let mut label_index = HashMap::with_capacity(alphabet.len());
        for (i, label) in alphabet.iter().enumerate() {
            label_index.insert(label.clone(), i);
        }
        let n = alphabet.len();
        let mut automaton = Self {
            alphabet,
            label_index,
            controllable: FixedBitSet::with_capacity(n),
            observable: FixedBitSet::with_capacity(n),
            marked: FixedBitSet::with_capacity(1),
            out: vec![Vec::new()],
        };
        automaton.marked.grow(1);
        automaton
    }

    /// Adds a new state, returning its index. If `marked` is true the
    /// state is added to the set of accepting states.
    pub fn add_state(&mut self, marked: bool) -> StateIndex {
        let index = self.out.len();
        self.out.push(Vec::new());
        self.marked.grow(index + 1);
        self.marked.set(index, marked);
        index
    }

    /// Returns the index of `label` in the alphabet, adding it if it is
    /// not already present.
    pub fn ensure_event(&mut self, label: &str) -> EventIndex {
        if let Some(&i) = self.label_index.get(label) {
            return i;
        }
        let index = self.alphabet.len();
        self.alphabet.push(label.to_owned());
        self.label_index.insert(label.to_owned(), index);
        self.controllable.grow(index + 1);
        self.observable.grow(index + 1);
        index
    }

    /// Adds a transition `(src, event, dst)`. Both states must already
    /// exist.
    ///
    /// # Panics
    ///
    /// Panics if `src` or `dst` is out of range.
    pub fn add_transition(&mut self, src: StateIndex, event: EventIndex, dst: StateIndex) {
        assert!(dst < self.out.len(), "target state out of range");
        self.out[src].push((event, dst));
    }

    /// Marks the given events (by label) as controllable. Labels not in
    /// the alphabet are ignored.
    pub fn mark_controllable<S: AsRef<str>>(&mut self, labels: impl IntoIterator<Item = S>) {
        for label in labels {
            if let Some(&i) = self.label_index.get(label.as_ref()) {
                self.controllable.insert(i);
            }
        }
    }

    /// Marks the given events (by label) as observable. Labels not in the
    /// alphabet are ignored.
    pub fn mark_observable<S: AsRef<str>>(&mut self, labels: impl IntoIterator<Item = S>) {
        for label in labels {
            if let Some(&i) = self.label_index.get(label.as_ref()) {
                self.observable.insert(i);
            }
        }
    }

    /// Sets the marked flag of `state` directly.
    pub fn set_marked(&mut self, state: StateIndex, marked: bool) {
        self.marked.set(state, marked);
    }

    /// Marks every state as accepting. Used when loading formats (such as
    /// explicit automaton JSON) where marking is implicit.
    pub fn mark_all_states(&mut self) {
        for i in 0..self.out.len() {
            self.marked.set(i, true);
        }
    }

    /// The initial state, always `0`.
    pub fn initial_state(&self) -> StateIndex {
        0
    }

    /// The number of states.
    pub fn num_states(&self) -> usize {
        self.out.len()
    }

    /// The alphabet, in stable insertion order.
    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    /// Looks up the index of `label`, if present.
    pub fn event_index(&self, label: &str) -> Option<EventIndex> {
        self.label_index.get(label).copied()
    }

    /// Returns true if `state` is marked (accepting).
    pub fn is_marked(&self, state: StateIndex) -> bool {
        self.marked[state]
    }

    /// Returns true if `event` is controllable.
    pub fn is_controllable(&self, event: EventIndex) -> bool {
        self.controllable[event]
    }

    /// Returns true if `event` is observable.
    pub fn is_observable(&self, event: EventIndex) -> bool {
        self.observable[event]
    }

    /// The outgoing transitions of `state`, as `(event, target)` pairs.
    pub fn out_edges(&self, state: StateIndex) -> &[(EventIndex, StateIndex)] {
        &self.out[state]
    }

    /// Returns the (possibly non-unique) target of a `(state, event)`
    /// pair, taking the first match. Use [`Automaton::is_deterministic`]
    /// to assert uniqueness first if that matters for the caller.
    pub fn transition(&self, state: StateIndex, event: EventIndex) -> Option<StateIndex> {
        self.out[state]
            .iter()
            .find(|&&(e, _)| e == event)
            .map(|&(_, t)| t)
    }

    /// Looks up the target of a `(state, label)` pair by event label
    /// rather than index.
    pub fn transition_by_label(&self, state: StateIndex, label: &str) -> Option<StateIndex> {
        self.event_index(label)
            .and_then(|event| self.transition(state, event))
    }

    /// Returns true if no state has two outgoing transitions for the same
    /// event.
    pub fn is_deterministic(&self) -> bool {
        self.out.iter().all(|edges| {
            let mut seen: Vec<EventIndex> = edges.iter().map(|&(e, _)| e).collect();
            seen.sort_unstable();
            let len_before = seen.len();
            seen.dedup();
            seen.len() == len_before
        })
    }

    /// Returns the set of states reachable from the initial state.
    pub fn reachable(&self) -> FixedBitSet {
        let mut visited = FixedBitSet::with_capacity(self.num_states());
        let mut queue = VecDeque::new();
        visited.insert(self.initial_state());
        queue.push_back(self.initial_state());
        while let Some(state) = queue.pop_front() {
            for &(_, target) in &self.out[state] {
                if !visited[target] {
                    visited.insert(target);
                    queue.push_back(target);
                }
            }
        }
        visited
    }

    /// Returns a copy of this automaton restricted to its reachable
    /// states, with states renumbered densely starting from the (new)
    /// initial state `0`.
    pub fn restricted_to_reachable(&self) -> Self {
        let reachable = self.reachable();
        let mut renumber = HashMap::with_capacity(reachable.count_ones(..));
        for old in reachable.ones() {
            renumber.insert(old, renumber.len());
        }
        let mut result = Self::new(self.alphabet.clone());
        result.controllable = self.controllable.clone();
        result.observable = self.observable.clone();
        result.out = vec![Vec::new(); renumber.len()];
        result.marked = FixedBitSet::with_capacity(renumber.len());
        for (&old, &new) in &renumber {
            result.marked.set(new, self.marked[old]);
            for &(event, target) in &self.out[old] {
                if let Some(&new_target) = renumber.get(&target) {
                    result.out[new].push((event, new_target));
                }
            }
        }
        result
    }

    /// Extends this automaton's alphabet to include every label in
    /// `target`, adding a self-loop at every existing state for each
    /// newly introduced event ("stuttering extension"). Preserves the
    /// language exactly, since the new events were previously
    /// unconstrained.
    pub fn extend_alphabet<S: AsRef<str>>(&self, target: &[S]) -> Self {
        let mut result = self.clone();
        for label in target {
            let label = label.as_ref();
            if result.event_index(label).is_some() {
                continue;
            }
            let event = result.ensure_event(label);
            for state in 0..result.out.len() {
                result.out[state].push((event, state));
            }
        }
        result
    }

    /// Returns a clone whose observable flags are reset to exactly the
    /// events named in `target`; every other event becomes unobservable.
    /// Used by the preferred-behavior checker to hide everything outside
    /// a preferred automaton's alphabet before projecting.
    pub fn restrict_observable<S: AsRef<str>>(&self, target: &[S]) -> Self {
        let mut result = self.clone();
        result.observable = FixedBitSet::with_capacity(result.alphabet.len());
        for label in target {
            if let Some(event) = result.event_index(label.as_ref()) {
                result.observable.insert(event);
            }
        }
        result
    }

    /// Returns a clone whose controllable and observable flags are reset
    /// to exactly the events named in `controllable`/`observable`. Used
    /// by the search engine to try a candidate authority assignment
    /// against the plant/property pair without mutating the originals.
    pub fn restrict_authority<S: AsRef<str>>(&self, controllable: &[S], observable: &[S]) -> Self {
        let mut result = self.clone();
        result.controllable = FixedBitSet::with_capacity(result.alphabet.len());
        result.observable = FixedBitSet::with_capacity(result.alphabet.len());
        for label in controllable {
            if let Some(event) = result.event_index(label.as_ref()) {
                result.controllable.insert(event);
            }
        }
        for label in observable {
            if let Some(event) = result.event_index(label.as_ref()) {
                result.observable.insert(event);
            }
        }
        result
    }

    /// Computes the parallel composition `self || other`: events with a
    /// shared label (by string, not index, since the two automata may
    /// have independently ordered alphabets) synchronize, private events
    /// interleave. The result contains only states reachable from the
    /// initial state. A composite state is marked iff both components are
    /// marked there.
    pub fn compose(&self, other: &Self) -> Self {
        let shared: Vec<String> = self
            .alphabet
            .iter()
            .filter(|label| other.event_index(label).is_some())
            .cloned()
            .collect();
        let mut combined_alphabet = self.alphabet.clone();
        for label in &other.alphabet {
            if self.event_index(label).is_none() {
                combined_alphabet.push(label.clone());
            }
        }
        let mut result = Self::new(combined_alphabet);
        // flags: prefer the defining component's flags; if both define an
        // event they are expected to agree (the event is a property of
        // the shared alphabet, not of either component alone).
        for label in &self.alphabet {
            let event = result.ensure_event(label);
            if self.is_controllable(self.event_index(label).unwrap()) {
                result.controllable.insert(event);
            }
            if self.is_observable(self.event_index(label).unwrap()) {
                result.observable.insert(event);
            }
        }
        for label in &other.alphabet {
            let event = result.ensure_event(label);
            if other.is_controllable(other.event_index(label).unwrap()) {
                result.controllable.insert(event);
            }
            if other.is_observable(other.event_index(label).unwrap()) {
                result.observable.insert(event);
            }
        }
        let shared_labels: std::collections::HashSet<&str> =
            shared.iter().map(|s| s.as_str()).collect();

        let mut mapping: HashMap<(StateIndex, StateIndex), StateIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        let init_pair = (self.initial_state(), other.initial_state());
        mapping.insert(init_pair, 0);
        result.set_marked(0, self.is_marked(init_pair.0) && other.is_marked(init_pair.1));
        queue.push_back(init_pair);

        while let Some((sa, sb)) = queue.pop_front() {
            let source = mapping[&(sa, sb)];
            // synchronized moves on shared events
            for &(ea, ta) in &self.out[sa] {
                let label = &self.alphabet[ea];
                if shared_labels.contains(label.as_str()) {
                    if let Some(tb) = other.transition_by_label(sb, label) {
                        let event = result.event_index(label).unwrap();
                        let target_pair = (ta, tb);
                        let target = *mapping.entry(target_pair).or_insert_with(|| {
                            let idx = result.add_state(
                                self.is_marked(target_pair.0) && other.is_marked(target_pair.1),
                            );
                            queue.push_back(target_pair);
                            idx
                        });
                        result.add_transition(source, event, target);
                    }
                }
            }
            // private moves of self
            for &(ea, ta) in &self.out[sa] {
                let label = &self.alphabet[ea];
                if !shared_labels.contains(label.as_str()) {
                    let event = result.event_index(label).unwrap();
                    let target_pair = (ta, sb);
                    let target = *mapping.entry(target_pair).or_insert_with(|| {
                        let idx = result.add_state(
                            self.is_marked(target_pair.0) && other.is_marked(target_pair.1),
                        );
                        queue.push_back(target_pair);
                        idx
                    });
                    result.add_transition(source, event, target);
                }
            }
            // private moves of other
            for &(eb, tb) in &other.out[sb] {
                let label = &other.alphabet[eb];
                if !shared_labels.contains(label.as_str()) {
                    let event = result.event_index(label).unwrap();
                    let target_pair = (sa, tb);
                    let target = *mapping.entry(target_pair).or_insert_with(|| {
                        let idx = result.add_state(
                            self.is_marked(target_pair.0) && other.is_marked(target_pair.1),
                        );
                        queue.push_back(target_pair);
                        idx
                    });
                    result.add_transition(source, event, target);
                }
            }
        }
        result
    }

    /// Computes the epsilon closure of `states` under every unobservable
    /// event, i.e. every state reachable from `states` using only
    /// unobservable transitions.
    fn epsilon_closure(&self, states: &[StateIndex]) -> Vec<StateIndex> {
        let mut visited = FixedBitSet::with_capacity(self.num_states());
        let mut queue = VecDeque::new();
        for &s in states {
            if !visited[s] {
                visited.insert(s);
                queue.push_back(s);
            }
        }
        while let Some(s) = queue.pop_front() {
            for &(event, target) in &self.out[s] {
                if !self.observable[event] && !visited[target] {
                    visited.insert(target);
                    queue.push_back(target);
                }
            }
        }
        let mut result: Vec<StateIndex> = visited.ones().collect();
        result.sort_unstable();
        result
    }

    /// Computes the observer projection: subset construction that
    /// replaces unobservable events by epsilon-closures and keeps only
    /// the observable alphabet. The result is deterministic and
    /// tau-free. A macro-state is marked iff it contains a marked
    /// component state.
    pub fn project(&self) -> Self {
        let observable_alphabet: Vec<String> = self
            .alphabet
            .iter()
            .enumerate()
            .filter(|&(i, _)| self.observable[i])
            .map(|(_, label)| label.clone())
            .collect();
        let mut result = Self::new(observable_alphabet);
        result.observable = FixedBitSet::with_capacity(result.alphabet.len());
        for event in 0..result.alphabet.len() {
            result.observable.insert(event);
        }
        // controllability of a projected event mirrors the source event;
        // the alphabet of `result` is exactly the observable events of
        // `self`, so every label here has a source flag to copy.
        for label in &self.alphabet {
            let source_event = self.event_index(label).unwrap();
            if self.is_observable(source_event) {
                let event = result.event_index(label).unwrap();
                result.controllable.set(event, self.is_controllable(source_event));
            }
        }

        let initial_closure = self.epsilon_closure(&[self.initial_state()]);
        let mut mapping: HashMap<Vec<StateIndex>, StateIndex> = HashMap::new();
        mapping.insert(initial_closure.clone(), 0);
        result.set_marked(0, initial_closure.iter().any(|&s| self.is_marked(s)));
        let mut queue = VecDeque::new();
        queue.push_back(initial_closure);

        while let Some(macro_state) = queue.pop_front() {
            let source = mapping[&macro_state];
            for label in &self.alphabet.clone() {
                let event = self.event_index(label).unwrap();
                if !self.observable[event] {
                    continue;
                }
                let mut raw: Vec<StateIndex> = Vec::new();
                for &s in &macro_state {
                    for &(e, t) in &self.out[s] {
                        if e == event {
                            raw.push(t);
                        }
                    }
                }
                if raw.is_empty() {
                    continue;
                }
                let closure = self.epsilon_closure(&raw);
                let target = *mapping.entry(closure.clone()).or_insert_with(|| {
                    let marked = closure.iter().any(|&s| self.is_marked(s));
                    let idx = result.add_state(marked);
                    queue.push_back(closure);
                    idx
                });
                let out_event = result.event_index(label).unwrap();
                result.add_transition(source, out_event, target);
            }
        }
        result
    }

    /// Compares `L(self) == L(other)` for two deterministic automata over
    /// the same set of event labels, by walking reachable state pairs and
    /// checking that markings and defined-ness of transitions agree at
    /// every pair (equivalent to computing the bisimulation relation
    /// restricted to the reachable state space).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Domain`] if either automaton is
    /// nondeterministic, or if the two alphabets (as sets of labels)
    /// differ.
    pub fn language_equal(&self, other: &Self) -> Result<bool> {
        if !self.is_deterministic() || !other.is_deterministic() {
            return Err(EngineError::Domain(
                "language comparison requires deterministic automata".to_owned(),
            ));
        }
        let self_labels: std::collections::BTreeSet<&str> =
            self.alphabet.iter().map(|s| s.as_str()).collect();
        let other_labels: std::collections::BTreeSet<&str> =
            other.alphabet.iter().map(|s| s.as_str()).collect();
        if self_labels != other_labels {
            return Err(EngineError::Domain(
                "language comparison requires automata over the same alphabet".to_owned(),
            ));
        }

        let mut visited: std::collections::HashSet<(StateIndex, StateIndex)> =
            std::collections::HashSet::new();
        let mut queue = VecDeque::new();
        let init = (self.initial_state(), other.initial_state());
        visited.insert(init);
        queue.push_back(init);

        while let Some((sa, sb)) = queue.pop_front() {
            if self.is_marked(sa) != other.is_marked(sb) {
                return Ok(false);
            }
            for label in &self.alphabet {
                let ta = self.transition_by_label(sa, label);
                let tb = other.transition_by_label(sb, label);
                match (ta, tb) {
                    (None, None) => (),
                    (Some(ta), Some(tb)) => {
                        if visited.insert((ta, tb)) {
                            queue.push_back((ta, tb));
                        }
                    }
                    _ => return Ok(false),
                }
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "automaton with {} states:", self.num_states())?;
        for state in 0..self.num_states() {
            writeln!(
                f,
                "  state {}{}:",
                state,
                if self.is_marked(state) { " (marked)" } else { "" }
            )?;
            for &(event, target) in &self.out[state] {
                writeln!(f, "    --{}--> {}", self.alphabet[event], target)?;
            }
        }
        Ok(())
    }
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
            let marked = false;
            let next = a.add_state(marked);
            let e = a.event_index(label).unwrap();
            a.add_transition(prev, e, next);
            prev = next;
        }
        a.set_marked(prev, true);
        a
    }

    #[test]
    fn compose_synchronizes_shared_events() {
        let a = linear(&["a", "b"]);
        let b = linear(&["b", "c"]);
        let composed = a.compose(&b);
        // only "a b c" survives: a must happen first (private to a),
        // then shared "b", then private "c".
        let reachable = composed.reachable();
        assert!(reachable.count_ones(..) >= 3);
        assert!(composed.event_index("a").is_some());
        assert!(composed.event_index("b").is_some());
        assert!(composed.event_index("c").is_some());
    }

    #[test]
    fn extend_alphabet_is_language_preserving_via_self_loops() {
        let a = linear(&["a"]);
        let extended = a.extend_alphabet(&["a", "z"]);
        assert_eq!(extended.num_states(), a.num_states());
        let z = extended.event_index("z").unwrap();
        for s in 0..extended.num_states() {
            assert_eq!(extended.transition(s, z), Some(s));
        }
    }

    #[test]
    fn project_hides_unobservable_events() {
        let mut a = Automaton::new(vec!["a".to_owned(), "h".to_owned()]);
        a.mark_observable(["a"]);
        a.mark_controllable(["a", "h"]);
        let s1 = a.add_state(false);
        let s2 = a.add_state(true);
        let ea = a.event_index("a").unwrap();
        let eh = a.event_index("h").unwrap();
        a.add_transition(0, eh, s1);
        a.add_transition(s1, ea, s2);

        let projected = a.project();
        assert_eq!(projected.alphabet(), &["a".to_owned()]);
        assert!(projected.is_deterministic());
        let target = projected.transition_by_label(0, "a");
        assert!(target.is_some());
        assert!(projected.is_marked(target.unwrap()));
    }

    #[test]
    fn language_equal_detects_marking_difference() {
        let a = linear(&["a"]);
        let mut b = linear(&["a"]);
        b.set_marked(0, true);
        assert!(!a.language_equal(&b).unwrap());
        assert!(a.language_equal(&a).unwrap());
    }
}
