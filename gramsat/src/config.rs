//! Solver configuration.

use serde::{Deserialize, Serialize};

use crate::cost::CostSettings;

/// Configurable parameters used during solving.
///
/// All configuration is plain value state passed to the solver; there is no
/// hidden global configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum number of witness-insertion branches spawned per existential
    /// quantifier occurrence, and the candidate range for integer
    /// existentials. (Default: 10)
    pub max_number_free_instantiations: usize,

    /// Maximum number of models requested from the external solver per atom
    /// group. (Default: 10)
    pub max_number_smt_instantiations: usize,

    /// Wall-clock budget in seconds; `None` disables the timeout. Polled
    /// between frontier pops, never preemptive. (Default: None)
    pub timeout_seconds: Option<f64>,

    /// Cost weight vectors, their mixing weights and the coverage path
    /// length `k`.
    pub cost: CostSettings,

    /// Seed for randomized grammar closing. (Default: 0)
    pub seed: u64,

    /// Depth bound for the leaf-growth insertion strategy. (Default: 4)
    pub max_insert_growth_depth: usize,

    /// Bound on the number of shortest wrapping paths materialized per
    /// query. (Default: 4)
    pub max_wrap_paths: usize,

    /// Derivation depth budget for randomized closing; beyond it the
    /// cheapest alternative is always taken. (Default: 12)
    pub max_close_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            max_number_free_instantiations: 10,
            max_number_smt_instantiations: 10,
            timeout_seconds: None,
            cost: CostSettings::default(),
            seed: 0,
            max_insert_growth_depth: 4,
            max_wrap_paths: 4,
            max_close_depth: 12,
        }
    }
}
