//! Search engine (spec §4.7): enumerates solutions by weakening the
//! preferred-behavior set `D` from the best (everything realizable,
//! `D_max`) downward in lexicographic priority order, invoking the
//! minimizer at each weakening to find the cheapest authority that still
//! enforces it, and keeping only the brackets that strictly improve on
//! every earlier one (Pareto-front extraction).

pub mod fast;
pub mod pareto;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use crate::automaton::Automaton;
use crate::controller::{construct_supervisor, minimize_authority};
use crate::cost::{CostModel, Score};
use crate::error::Result;
use crate::model::{Model, StagingDir};
use crate::options::{EngineConfig, SearchAlgorithm, Tier};
use crate::preferred::PreferredChecker;
use crate::supervisor::supremal_controllable_normal;

/// One loaded preferred-behavior automaton, tagged with a stable id (its
/// index in this vector) and its priority tier.
struct PreferredItem {
    id: usize,
    tier: Tier,
    path: PathBuf,
    automaton: Automaton,
}

/// One emitted, non-dominated solution.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The realized controllable event set.
    pub controllable: Vec<String>,
    /// The realized observable event set.
    pub observable: Vec<String>,
    /// Paths of the preferred-behavior items this solution enforces.
    pub satisfied: Vec<PathBuf>,
    /// This solution's (util_pref, cost) score.
    pub score: Score,
}

#[derive(Clone)]
struct SolveResult {
    supervisor: Automaton,
    controlled: Automaton,
}

/// The synthesis-and-search engine: owns the composed plant/property, the
/// preferred-behavior catalogue, and the caches the search revisits
/// across brackets (`synthesize_cache` folds in the role of an
/// `fsp_cache` too, since both would be keyed on the same `(C, O)`
/// tuple).
pub struct Engine {
    plant: Automaton,
    property: Automaton,
    controllable: HashMap<Tier, Vec<String>>,
    observable: HashMap<Tier, Vec<String>>,
    preferred: Vec<PreferredItem>,
    algorithm: SearchAlgorithm,
    cost_model: CostModel,
    synthesize_cache: HashMap<(Vec<String>, Vec<String>), Option<SolveResult>>,
    checker: PreferredChecker,
    _staging: StagingDir,
}

/// Builds the two-state progress template for event `e` (design note
/// (c)): the accepting state loops unconditionally on `e`, so composing
/// it into the property forces every live state to eventually be able to
/// take `e` in order to remain non-blocking.
fn progress_template(event: &str) -> Automaton {
    let mut a = Automaton::new(vec![event.to_owned()]);
    a.mark_controllable([event]);
    a.mark_observable([event]);
    let accept = a.add_state(true);
    let e = a.event_index(event).unwrap();
    a.add_transition(0, e, accept);
    a.add_transition(accept, e, accept);
    a
}

/// Loads every model in `paths` and composes them together, folding left
/// to right. An empty list composes to the one-state, fully-permissive
/// identity automaton.
fn load_and_compose(paths: &[PathBuf], helper: Option<&std::path::Path>) -> Result<Automaton> {
    let mut result = Automaton::new(Vec::new());
    result.set_marked(0, true);
    for path in paths {
        let loaded = Model::from_path(path.clone()).load(helper)?;
        result = result.compose(&loaded);
    }
    Ok(result)
}

/// All `k`-element subsets of `items`, as index-preserving clones.
fn combinations(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if k > items.len() {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut current = Vec::new();
    fn recurse(
        items: &[usize],
        k: usize,
        start: usize,
        current: &mut Vec<usize>,
        result: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == k {
            result.push(current.clone());
            return;
        }
        for i in start..items.len() {
            current.push(items[i]);
            recurse(items, k, i + 1, current, result);
            current.pop();
        }
    }
    recurse(items, k, 0, &mut current, &mut result);
    result
}

impl Engine {
    /// Builds an engine from a validated configuration: loads and
    /// composes the plant (`sys ‖ env_p`) and property (`safety`, with
    /// one progress template per `progress` event folded in), loads the
    /// preferred-behavior catalogue, and (re)creates the staging
    /// directory.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let staging = StagingDir::new("./tmp")?;
        let helper = config.lts_helper.as_deref();

        let sys = load_and_compose(&config.sys, helper)?;
        let env_p = load_and_compose(&config.env_p, helper)?;
        let plant = sys.compose(&env_p);

        let mut property = load_and_compose(&config.safety, helper)?;
        for event in &config.progress {
            property = property.compose(&progress_template(event));
        }

        let mut preferred = Vec::new();
        for (tier, paths) in &config.preferred {
            for path in paths {
                let automaton = Model::from_path(path.clone()).load(helper)?;
                preferred.push(PreferredItem {
                    id: preferred.len(),
                    tier: *tier,
                    path: path.clone(),
                    automaton,
                });
            }
        }

        Ok(Self {
            plant,
            property,
            controllable: config
                .controllable
                .iter()
                .map(|(t, v)| (*t, v.clone()))
                .collect(),
            observable: config
                .observable
                .iter()
                .map(|(t, v)| (*t, v.clone()))
                .collect(),
            preferred,
            algorithm: config.alg,
            cost_model: CostModel::new(),
            synthesize_cache: HashMap::new(),
            checker: PreferredChecker::new(),
            _staging: staging,
        })
    }

    /// Runs the supervisory-control solver and controller extractor for
    /// `(controllable, observable)`, memoized: a bracket that repeats a
    /// `(C, O)` pair already tried invokes the solver exactly once.
    fn solve(
        &mut self,
        controllable: &BTreeSet<String>,
        observable: &BTreeSet<String>,
    ) -> Result<Option<SolveResult>> {
        let c: Vec<String> = controllable.iter().cloned().collect();
        let o: Vec<String> = observable.iter().cloned().collect();
        let key = (c.clone(), o.clone());
        if let Some(cached) = self.synthesize_cache.get(&key) {
            return Ok(cached.clone());
        }

        let plant = self.plant.restrict_authority(&c, &o);
        let property = self.property.restrict_authority(&c, &o);
        let result = match supremal_controllable_normal(&plant, &property, false) {
            None => None,
            Some(gh) => {
                let sp = gh.project();
                let gp = plant.project();
                let controllable_set: HashSet<String> = controllable.iter().cloned().collect();
                let supervisor = construct_supervisor(&sp, &gp, &controllable_set);
                let controlled = self.plant.compose(&supervisor);
                Some(SolveResult {
                    supervisor,
                    controlled,
                })
            }
        };

        self.synthesize_cache.insert(key, result.clone());
        Ok(result)
    }

    /// Whether `(controllable, observable)` both yields a controller at
    /// all and still enforces every preferred item in `weakened`.
    fn enforces(
        &mut self,
        controllable: &BTreeSet<String>,
        observable: &BTreeSet<String>,
        weakened: &[(usize, Automaton)],
    ) -> Result<bool> {
        let Some(result) = self.solve(controllable, observable)? else {
            return Ok(false);
        };
        let c: Vec<String> = controllable.iter().cloned().collect();
        let o: Vec<String> = observable.iter().cloned().collect();
        for (id, automaton) in weakened {
            if !self
                .checker
                .is_enforced(&result.controlled, &c, &o, *id, automaton)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Enumerates up to `n` Pareto-optimal solutions, weakening the
    /// preferred set in lexicographic priority order.
    pub fn synthesize(&mut self, n: usize) -> Result<Vec<Solution>> {
        let c_max: BTreeSet<String> = self.controllable.values().flatten().cloned().collect();
        let o_max: BTreeSet<String> = self.observable.values().flatten().cloned().collect();
        let free_controllable = self.controllable.get(&Tier::P0).cloned().unwrap_or_default();
        let free_observable = self.observable.get(&Tier::P0).cloned().unwrap_or_default();

        let controllable_tier: HashMap<String, Tier> = self
            .controllable
            .iter()
            .flat_map(|(t, es)| es.iter().map(move |e| (e.clone(), *t)))
            .collect();
        let observable_tier: HashMap<String, Tier> = self
            .observable
            .iter()
            .flat_map(|(t, es)| es.iter().map(move |e| (e.clone(), *t)))
            .collect();

        let Some(base) = self.solve(&c_max, &o_max)? else {
            log::warn!("no controller exists for the full plant/property pair; no solutions");
            return Ok(Vec::new());
        };

        let c_max_vec: Vec<String> = c_max.iter().cloned().collect();
        let o_max_vec: Vec<String> = o_max.iter().cloned().collect();
        let mut d_max: Vec<usize> = Vec::new();
        for item in &self.preferred {
            if self.checker.is_enforced(
                &base.controlled,
                &c_max_vec,
                &o_max_vec,
                item.id,
                &item.automaton,
            )? {
                d_max.push(item.id);
            }
        }
        if !self.preferred.is_empty() && d_max.is_empty() {
            log::warn!("no preferred-behavior item is realizable at all; every bracket is empty");
        }

        let tier_of: HashMap<usize, Tier> =
            self.preferred.iter().map(|p| (p.id, p.tier)).collect();
        let p3: Vec<usize> = d_max
            .iter()
            .copied()
            .filter(|id| tier_of[id] == Tier::P3)
            .collect();
        let p2: Vec<usize> = d_max
            .iter()
            .copied()
            .filter(|id| tier_of[id] == Tier::P2)
            .collect();
        let p1: Vec<usize> = d_max
            .iter()
            .copied()
            .filter(|id| tier_of[id] == Tier::P1)
            .collect();

        let mut solutions = Vec::new();
        let mut min_cost = i64::MIN;
        let mut brackets_explored = 0usize;

        'outer: for i in 0..=p3.len() {
            for j in 0..=p2.len() {
                for k in 0..=p1.len() {
                    if brackets_explored >= n {
                        break 'outer;
                    }
                    brackets_explored += 1;

                    let mut bracket: Vec<(Vec<String>, Vec<String>, Vec<usize>, Score)> =
                        Vec::new();

                    for removed_p3 in combinations(&p3, i) {
                        for removed_p2 in combinations(&p2, j) {
                            for removed_p1 in combinations(&p1, k) {
                                let removed: HashSet<usize> = removed_p3
                                    .iter()
                                    .chain(&removed_p2)
                                    .chain(&removed_p1)
                                    .copied()
                                    .collect();
                                let weakened_ids: Vec<usize> = d_max
                                    .iter()
                                    .copied()
                                    .filter(|id| !removed.contains(id))
                                    .collect();
                                let weakened: Vec<(usize, Automaton)> = weakened_ids
                                    .iter()
                                    .map(|id| (*id, self.preferred[*id].automaton.clone()))
                                    .collect();

                                let minimize_result = match self.algorithm {
                                    SearchAlgorithm::Pareto => pareto::minimize(
                                        c_max.clone(),
                                        o_max.clone(),
                                        &controllable_tier,
                                        &observable_tier,
                                        |c, o| self.enforces(c, o, &weakened),
                                    ),
                                    SearchAlgorithm::Fast => fast::minimize(
                                        c_max.clone(),
                                        o_max.clone(),
                                        &controllable_tier,
                                        &observable_tier,
                                        |c, o| self.enforces(c, o, &weakened),
                                    ),
                                }?;
                                let (c_candidate, o_candidate) = minimize_result;

                                let Some(solve_result) =
                                    self.solve(&c_candidate, &o_candidate)?
                                else {
                                    continue;
                                };
                                let c_vec: Vec<String> = c_candidate.iter().cloned().collect();
                                let o_vec: Vec<String> = o_candidate.iter().cloned().collect();
                                let (c_final, o_final) = minimize_authority(
                                    &solve_result.supervisor,
                                    &c_vec,
                                    &o_vec,
                                    &free_controllable,
                                    &free_observable,
                                );

                                let c_tiers: Vec<Tier> = c_final
                                    .iter()
                                    .filter_map(|e| controllable_tier.get(e).copied())
                                    .collect();
                                let o_tiers: Vec<Tier> = o_final
                                    .iter()
                                    .filter_map(|e| observable_tier.get(e).copied())
                                    .collect();
                                let sat_tiers: Vec<Tier> =
                                    weakened_ids.iter().map(|id| tier_of[id]).collect();
                                let score = self.cost_model.score(sat_tiers, c_tiers, o_tiers);

                                bracket.push((c_final, o_final, weakened_ids, score));
                            }
                        }
                    }

                    let Some(best_cost) = bracket.iter().map(|(_, _, _, s)| s.cost).max() else {
                        continue;
                    };
                    if best_cost <= min_cost {
                        continue;
                    }
                    min_cost = best_cost;
                    for (controllable, observable, weakened_ids, score) in
                        bracket.into_iter().filter(|(_, _, _, s)| s.cost == best_cost)
                    {
                        solutions.push(Solution {
                            controllable,
                            observable,
                            satisfied: weakened_ids
                                .iter()
                                .map(|id| self.preferred[*id].path.clone())
                                .collect(),
                            score,
                        });
                    }
                }
            }
        }

        if solutions.is_empty() {
            log::warn!("search completed with no Pareto-optimal solutions");
        }
        Ok(solutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

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
    fn combinations_of_zero_is_one_empty_set() {
        assert_eq!(combinations(&[1, 2, 3], 0), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn combinations_cover_every_pair() {
        let combos = combinations(&[1, 2, 3], 2);
        assert_eq!(combos.len(), 3);
        assert!(combos.contains(&vec![1, 2]));
        assert!(combos.contains(&vec![1, 3]));
        assert!(combos.contains(&vec![2, 3]));
    }

    #[test]
    fn progress_template_loops_forever_once_fired() {
        let template = progress_template("tick");
        let e = template.event_index("tick").unwrap();
        let accept = template.transition(0, e).unwrap();
        assert_eq!(template.transition(accept, e), Some(accept));
        assert!(template.is_marked(accept));
    }

    fn sample_config(alg: SearchAlgorithm) -> EngineConfig {
        let mut controllable = BTreeMap::new();
        controllable.insert(Tier::P1, vec!["a".to_owned()]);
        let mut observable = BTreeMap::new();
        observable.insert(Tier::P1, vec!["a".to_owned()]);
        EngineConfig {
            alg,
            controllable,
            observable,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn engine_without_preferred_items_runs_a_single_bracket() {
        let mut engine = Engine::new(&sample_config(SearchAlgorithm::Fast)).unwrap();
        engine.plant = linear(&["a", "b"]);
        engine.property = Automaton::new(vec!["z".to_owned()]);
        let solutions = engine.synthesize(10).unwrap();
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].controllable.is_empty());
        assert!(solutions[0].observable.is_empty());
    }
}
