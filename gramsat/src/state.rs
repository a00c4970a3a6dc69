//! Search states and the cost-ordered frontier.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use gramsat_formula::{DerivationTree, Formula};

/// One node of the solver's search tree: a partial derivation tree plus the
/// constraint conjuncts that still have to be satisfied on it.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub tree: DerivationTree,
    /// Normalized conjuncts not yet discharged.
    pub constraints: Vec<Formula>,
    /// Number of quantifiers eliminated with an empty settled domain.
    pub vacuous: usize,
    /// Universal conjuncts already eliminated on this branch. A later
    /// witness insertion can grow their domain, so they are re-applied to
    /// every insertion successor.
    pub universals: Vec<Formula>,
}

impl SearchState {
    pub fn new(tree: DerivationTree, constraints: Vec<Formula>) -> SearchState {
        SearchState {
            tree,
            constraints,
            vacuous: 0,
            universals: Vec::new(),
        }
    }

    /// Successor with the conjunct at `index` replaced by new conjuncts.
    pub fn with_replaced(
        &self,
        index: usize,
        replacement: impl IntoIterator<Item = Formula>,
        tree: DerivationTree,
    ) -> SearchState {
        let mut constraints: Vec<Formula> = Vec::with_capacity(self.constraints.len());
        constraints.extend_from_slice(&self.constraints[..index]);
        constraints.extend(replacement);
        constraints.extend_from_slice(&self.constraints[index + 1..]);
        SearchState {
            tree,
            constraints,
            vacuous: self.vacuous,
            universals: self.universals.clone(),
        }
    }
}

struct FrontierEntry {
    cost: Reverse<OrderedFloat<f64>>,
    /// FIFO tie break: earlier insertions pop first among equal costs.
    seq: Reverse<u64>,
    state: SearchState,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &FrontierEntry) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &FrontierEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &FrontierEntry) -> Ordering {
        self.cost.cmp(&other.cost).then(self.seq.cmp(&other.seq))
    }
}

/// Min-cost priority queue of search states.
#[derive(Default)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Frontier {
        Frontier::default()
    }

    pub fn push(&mut self, state: SearchState, cost: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(FrontierEntry {
            cost: Reverse(OrderedFloat(cost)),
            seq: Reverse(seq),
            state,
        });
    }

    /// Remove and return the cheapest state.
    pub fn pop(&mut self) -> Option<SearchState> {
        self.heap.pop().map(|entry| entry.state)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
