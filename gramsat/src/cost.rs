//! Cost model for ranking partial solver states.
//!
//! Lower cost is better. A state's cost is a weighted sum over six features
//! of its tree and remaining constraint; several weight vectors can be
//! blended with relative mixing weights to combine objectives.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use gramsat_formula::DerivationTree;
use gramsat_grammar::GrammarGraph;

/// The six feature weights of the cost function.
///
/// All weights are non-negative; a zero weight disables its feature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightVector {
    /// Weight of the number of open leaves still to close.
    pub tree_closing: f64,
    /// Weight of the number of vacuously eliminated universal quantifiers.
    pub vacuity: f64,
    /// Weight of the number of unresolved constraint conjuncts.
    pub constraint: f64,
    /// Weight of the derivation depth of the tree.
    pub depth: f64,
    /// Weight of the tree's own uncovered k-path fraction.
    pub low_k_coverage: f64,
    /// Weight of the run-global uncovered k-path fraction after this tree.
    pub low_global_k_coverage: f64,
}

impl Default for WeightVector {
    fn default() -> WeightVector {
        WeightVector {
            tree_closing: 10.0,
            vacuity: 15.0,
            constraint: 20.0,
            depth: 1.0,
            low_k_coverage: 5.0,
            low_global_k_coverage: 7.0,
        }
    }
}

/// Cost settings: weight vectors with mixing weights, and the path length
/// `k` used for the coverage features.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostSettings {
    /// The blended weight vectors and their relative mixing weights.
    pub vectors: Vec<(WeightVector, f64)>,
    /// Length of the grammar derivation paths used for coverage.
    pub k: usize,
}

impl Default for CostSettings {
    fn default() -> CostSettings {
        CostSettings {
            vectors: vec![(WeightVector::default(), 1.0)],
            k: 3,
        }
    }
}

/// The measured features of one solver state.
#[derive(Clone, Copy, Debug)]
pub struct CostFeatures {
    pub open_leaves: usize,
    pub vacuous_eliminations: usize,
    pub remaining_constraints: usize,
    pub depth: usize,
    /// Fraction of all grammar k-paths not covered by the tree itself.
    pub local_coverage_deficit: f64,
    /// Fraction not covered by the run's global coverage plus this tree.
    pub global_coverage_deficit: f64,
}

impl CostFeatures {
    /// Measure a state's features.
    ///
    /// `all_k_paths` is the precomputed set of grammar k-paths for the run;
    /// `global_coverage` the k-paths covered by previously accepted trees.
    pub fn measure(
        tree: &DerivationTree,
        remaining_constraints: usize,
        vacuous_eliminations: usize,
        all_k_paths: &FxHashSet<Vec<String>>,
        global_coverage: &FxHashSet<Vec<String>>,
        k: usize,
    ) -> CostFeatures {
        let tree_paths = tree.k_paths(k);
        let (local_deficit, global_deficit) = if all_k_paths.is_empty() {
            (0.0, 0.0)
        } else {
            let total = all_k_paths.len() as f64;
            let local = all_k_paths.intersection(&tree_paths).count() as f64;
            let global = all_k_paths
                .iter()
                .filter(|path| tree_paths.contains(*path) || global_coverage.contains(*path))
                .count() as f64;
            (1.0 - local / total, 1.0 - global / total)
        };

        CostFeatures {
            open_leaves: tree.num_open(),
            vacuous_eliminations,
            remaining_constraints,
            depth: tree.depth(),
            local_coverage_deficit: local_deficit,
            global_coverage_deficit: global_deficit,
        }
    }

    /// The blended cost of these features under the given settings.
    pub fn cost(&self, settings: &CostSettings) -> f64 {
        let total_mix: f64 = settings.vectors.iter().map(|(_, mix)| mix).sum();
        if total_mix == 0.0 {
            return 0.0;
        }
        settings
            .vectors
            .iter()
            .map(|(weights, mix)| mix * self.weighted(weights))
            .sum::<f64>()
            / total_mix
    }

    fn weighted(&self, weights: &WeightVector) -> f64 {
        weights.tree_closing * self.open_leaves as f64
            + weights.vacuity * self.vacuous_eliminations as f64
            + weights.constraint * self.remaining_constraints as f64
            + weights.depth * self.depth as f64
            + weights.low_k_coverage * self.local_coverage_deficit
            + weights.low_global_k_coverage * self.global_coverage_deficit
    }
}

/// Precomputed per-run cost context: the grammar's k-paths.
///
/// Explicitly constructed and owned by the run, never process-global.
#[derive(Clone, Debug)]
pub struct CostContext {
    pub all_k_paths: FxHashSet<Vec<String>>,
    pub k: usize,
}

impl CostContext {
    pub fn new(graph: &GrammarGraph, settings: &CostSettings) -> CostContext {
        CostContext {
            all_k_paths: graph.k_paths(settings.k),
            k: settings.k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gramsat_formula::dt;
    use gramsat_grammar::{grammar, GrammarGraph};

    fn features(
        open_leaves: usize,
        vacuous: usize,
        constraints: usize,
        depth: usize,
    ) -> CostFeatures {
        CostFeatures {
            open_leaves,
            vacuous_eliminations: vacuous,
            remaining_constraints: constraints,
            depth,
            local_coverage_deficit: 0.0,
            global_coverage_deficit: 0.0,
        }
    }

    #[test]
    fn weighted_sum() {
        let settings = CostSettings {
            vectors: vec![(
                WeightVector {
                    tree_closing: 2.0,
                    vacuity: 3.0,
                    constraint: 5.0,
                    depth: 1.0,
                    low_k_coverage: 0.0,
                    low_global_k_coverage: 0.0,
                },
                1.0,
            )],
            k: 3,
        };
        assert_eq!(features(1, 1, 1, 1).cost(&settings), 11.0);
        assert_eq!(features(0, 0, 2, 4).cost(&settings), 14.0);
    }

    #[test]
    fn vacuity_increases_cost() {
        let settings = CostSettings::default();
        assert!(features(0, 1, 0, 1).cost(&settings) > features(0, 0, 0, 1).cost(&settings));
    }

    #[test]
    fn mixing_weights_blend() {
        let cheap = WeightVector {
            tree_closing: 0.0,
            vacuity: 0.0,
            constraint: 0.0,
            depth: 1.0,
            low_k_coverage: 0.0,
            low_global_k_coverage: 0.0,
        };
        let expensive = WeightVector {
            depth: 3.0,
            ..cheap.clone()
        };
        let settings = CostSettings {
            vectors: vec![(cheap, 1.0), (expensive, 1.0)],
            k: 3,
        };
        // (1*2 + 3*2) / 2
        assert_eq!(features(0, 0, 0, 2).cost(&settings), 4.0);
    }

    #[test]
    fn coverage_deficits() {
        let grammar = grammar![
            "<start>" => [["<stmt>"]];
            "<stmt>" => [["<assgn>", " ; ", "<stmt>"], ["<assgn>"]];
            "<assgn>" => [["<var>", " := ", "<var>"]];
            "<var>" => [["x"]];
        ];
        let graph = GrammarGraph::from_grammar(&grammar);
        let all = graph.k_paths(2);

        let shallow = dt!("<start>" => [dt!("<stmt>")]);
        let features = CostFeatures::measure(
            &shallow,
            0,
            0,
            &all,
            &FxHashSet::default(),
            2,
        );
        // Only <start>-<stmt> of several 2-paths is covered.
        assert!(features.local_coverage_deficit > 0.0);
        assert!(features.local_coverage_deficit < 1.0);

        // Global coverage of everything removes the global deficit.
        let features = CostFeatures::measure(&shallow, 0, 0, &all, &all, 2);
        assert_eq!(features.global_coverage_deficit, 0.0);
        assert!(features.local_coverage_deficit > 0.0);
    }
}
