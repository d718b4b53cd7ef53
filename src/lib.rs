//! Repair-synth library crate: a supervisory-control synthesis-and-search
//! engine. Given a plant, a safety property, and a set of tiered
//! preferred behaviors, it computes the supremal controllable-and-normal
//! sublanguage, extracts and minimizes a controller, and searches for
//! Pareto-optimal trade-offs between preserved preferred behavior and
//! control/observation cost.

pub mod automaton;
pub mod controller;
pub mod cost;
pub mod error;
pub mod model;
pub mod options;
pub mod preferred;
pub mod search;
pub mod supervisor;

pub use error::{EngineError, Result};
pub use options::{CliOptions, EngineConfig, SearchAlgorithm, Tier, TraceLevel};
pub use search::{Engine, Solution};

/// Builds an engine from `config` and searches for up to `n`
/// Pareto-optimal solutions. Mirrors the CLI surface's `synthesize(n)`
/// entry point (spec §6).
pub fn synthesize(config: &EngineConfig, n: usize) -> Result<Vec<Solution>> {
    let mut engine = Engine::new(config)?;
    engine.synthesize(n)
}
