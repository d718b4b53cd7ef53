//! Configuration for the synthesis-and-search engine: a library-facing
//! [`EngineConfig`] that anything can construct (from a config file,
//! from a test, from another program), and a thin [`CliOptions`] that
//! only the binary needs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A user-declared priority tier. `P0` is free (always available, never
/// costed); `P1`..`P3` carry strictly increasing per-event cost, per the
/// weight construction of §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    P0,
    P1,
    P2,
    P3,
}

impl Tier {
    /// The three costed tiers, in ascending cost order.
    pub const COSTED: [Tier; 3] = [Tier::P1, Tier::P2, Tier::P3];
}

/// Which search-engine minimizer mode to run: the exhaustive layered
/// `pareto` frontier, or the single-pass greedy `fast` heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAlgorithm {
    Pareto,
    Fast,
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::Pareto
    }
}

/// The logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for TraceLevel {
    fn default() -> Self {
        Self::Warn
    }
}

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

/// The engine's full configuration, matching the CLI surface of §6: the
/// system/environment/safety model paths, the preferred-behavior
/// catalogue, the progress events, the full alphabet, the
/// controllable/observable priority maps, and the search mode.
///
/// `controllable`/`observable`/`preferred` are `BTreeMap`s rather than
/// `HashMap`s because `Tier`'s derived `Ord` gives `P0 < P1 < P2 < P3`,
/// which is exactly the stable iteration order §3 requires of `D`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// System component model paths.
    pub sys: Vec<PathBuf>,
    /// Deviated-environment component model paths.
    pub env_p: Vec<PathBuf>,
    /// Safety property model paths (composed together).
    pub safety: Vec<PathBuf>,
    /// Preferred-behavior automata, by tier.
    pub preferred: BTreeMap<Tier, Vec<PathBuf>>,
    /// Events that must make progress (one two-state template each).
    pub progress: Vec<String>,
    /// The full event alphabet.
    pub alphabet: Vec<String>,
    /// Controllable events, by priority tier.
    pub controllable: BTreeMap<Tier, Vec<String>>,
    /// Observable events, by priority tier.
    pub observable: BTreeMap<Tier, Vec<String>>,
    /// Which minimizer mode the search engine runs.
    pub alg: SearchAlgorithm,
    /// Path to the external `.lts`-to-JSON converter, required only if
    /// any input model is a `.lts` file.
    pub lts_helper: Option<PathBuf>,
    /// Verbose solution reporting.
    pub verbose: bool,
}

impl EngineConfig {
    /// Constructs a config and validates it, per design note (b):
    /// every controllable event must also be observable, since an
    /// unobservable event is implicitly uncontrollable (§3).
    pub fn try_new(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Checks the "controllable ⊆ observable" invariant across the
    /// union of all tiers.
    pub fn validate(&self) -> Result<()> {
        let observable: std::collections::HashSet<&str> = self
            .observable
            .values()
            .flatten()
            .map(|s| s.as_str())
            .collect();
        for event in self.controllable.values().flatten() {
            if !observable.contains(event.as_str()) {
                return Err(EngineError::InvalidConfig(format!(
                    "event '{}' is controllable but not observable",
                    event
                )));
            }
        }
        Ok(())
    }

    /// The union of controllable events across every tier.
    pub fn all_controllable(&self) -> Vec<String> {
        self.controllable.values().flatten().cloned().collect()
    }

    /// The union of observable events across every tier.
    pub fn all_observable(&self) -> Vec<String> {
        self.observable.values().flatten().cloned().collect()
    }
}

/// Binary-only CLI surface: a path to a JSON [`EngineConfig`] plus the
/// ambient flags (search budget, trace level, output destination) that
/// don't belong in the serialized config itself.
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct CliOptions {
    /// Path to a JSON file deserializing to an [`EngineConfig`].
    pub config: PathBuf,

    /// Number of search brackets to explore before stopping.
    #[clap(short = 'n', long, default_value_t = 10)]
    pub budget: usize,

    /// Logging verbosity.
    #[clap(long, value_enum, default_value_t = TraceLevel::Warn)]
    pub trace_level: TraceLevel,

    /// Write solutions to this file instead of stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_p0_first() {
        let mut tiers = vec![Tier::P3, Tier::P0, Tier::P2, Tier::P1];
        tiers.sort();
        assert_eq!(tiers, vec![Tier::P0, Tier::P1, Tier::P2, Tier::P3]);
    }

    #[test]
    fn validate_rejects_controllable_without_observable() {
        let mut config = EngineConfig::default();
        config.controllable.insert(Tier::P1, vec!["a".to_owned()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_controllable_subset_of_observable() {
        let mut config = EngineConfig::default();
        config.controllable.insert(Tier::P1, vec!["a".to_owned()]);
        config.observable.insert(Tier::P1, vec!["a".to_owned()]);
        assert!(config.validate().is_ok());
    }
}
