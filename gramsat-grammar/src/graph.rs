//! Grammar graph: the derivation relation between nonterminals.
//!
//! The graph has an edge from `<a>` to `<b>` when some alternative of `<a>`
//! mentions `<b>`. It backs the insertion engine's reachability and shortest
//! wrapping queries and the k-path coverage terms of the cost model.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::{is_nonterminal, Grammar};

/// Reachability and shortest-derivation-path queries over a grammar.
#[derive(Clone, Debug)]
pub struct GrammarGraph {
    order: Vec<String>,
    successors: FxHashMap<String, Vec<String>>,
}

impl GrammarGraph {
    /// Build the graph for a grammar.
    ///
    /// Successor lists are deduplicated but keep grammar order, so path
    /// enumeration is deterministic.
    pub fn from_grammar(grammar: &Grammar) -> GrammarGraph {
        let mut order = Vec::new();
        let mut successors: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for nt in grammar.nonterminals() {
            order.push(nt.to_owned());
            let mut seen = FxHashSet::default();
            let mut succ = Vec::new();
            for alternative in grammar.alternatives(nt).unwrap_or(&[]) {
                for symbol in alternative {
                    if is_nonterminal(symbol) && seen.insert(symbol.clone()) {
                        succ.push(symbol.clone());
                    }
                }
            }
            successors.insert(nt.to_owned(), succ);
        }

        GrammarGraph { order, successors }
    }

    /// All nonterminals known to the graph, in grammar order.
    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|nt| nt.as_str())
    }

    /// Direct successors of a nonterminal.
    pub fn successors(&self, nonterminal: &str) -> &[String] {
        self.successors
            .get(nonterminal)
            .map(|succ| &succ[..])
            .unwrap_or(&[])
    }

    /// Whether `to` can be derived from `from` in one or more steps.
    ///
    /// `reachable(n, n)` is true only if `n` occurs in a derivation of
    /// itself, which is exactly the condition for self-embedding insertion.
    pub fn reachable(&self, from: &str, to: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue: VecDeque<&str> = self.successors(from).iter().map(|s| s.as_str()).collect();
        while let Some(nt) = queue.pop_front() {
            if nt == to {
                return true;
            }
            if seen.insert(nt) {
                queue.extend(self.successors(nt).iter().map(|s| s.as_str()));
            }
        }
        false
    }

    /// One shortest derivation path from `from` to `to`, both endpoints
    /// included, or `None` if `to` is unreachable.
    ///
    /// The path always makes at least one step, so `shortest_path(n, n)`
    /// looks for a cycle through `n`.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.shortest_paths(from, to, 1).into_iter().next()
    }

    /// Up to `limit` shortest derivation paths from `from` to `to`.
    ///
    /// All returned paths have the same, minimal length. Enumeration follows
    /// grammar order, so the result is deterministic.
    pub fn shortest_paths(&self, from: &str, to: &str, limit: usize) -> Vec<Vec<String>> {
        if limit == 0 {
            return Vec::new();
        }

        // BFS to compute minimal distances from `from` (first step = 1).
        let mut dist: FxHashMap<&str, usize> = FxHashMap::default();
        let mut queue = VecDeque::new();
        for succ in self.successors(from) {
            if !dist.contains_key(succ.as_str()) {
                dist.insert(succ.as_str(), 1);
                queue.push_back(succ.as_str());
            }
        }
        while let Some(nt) = queue.pop_front() {
            let next_dist = dist[nt] + 1;
            for succ in self.successors(nt) {
                if !dist.contains_key(succ.as_str()) {
                    dist.insert(succ.as_str(), next_dist);
                    queue.push_back(succ.as_str());
                }
            }
        }

        let target_dist = match dist.get(to) {
            Some(&d) => d,
            None => return Vec::new(),
        };

        // Forward walk, only ever stepping to nodes on a minimal path.
        let mut paths = Vec::new();
        let mut stack = vec![vec![from]];
        while let Some(partial) = stack.pop() {
            if paths.len() >= limit {
                break;
            }
            let steps = partial.len() - 1;
            if steps == target_dist {
                if *partial.last().unwrap() == to {
                    paths.push(partial.iter().map(|s| (*s).to_owned()).collect());
                }
                continue;
            }
            // Reverse so grammar-ordered successors pop first.
            for succ in self.successors(partial.last().unwrap()).iter().rev() {
                let on_minimal_path = if succ == to {
                    steps + 1 == target_dist
                } else {
                    dist.get(succ.as_str()) == Some(&(steps + 1))
                };
                if on_minimal_path {
                    let mut next = partial.clone();
                    next.push(succ.as_str());
                    stack.push(next);
                }
            }
        }
        paths
    }

    /// All derivation chains of exactly `k` nonterminals.
    ///
    /// Enumeration is bounded by the grammar size and `k`; the cost model
    /// uses small `k` (3 by default), so this stays cheap for the grammar
    /// sizes gramsat deals with.
    pub fn k_paths(&self, k: usize) -> FxHashSet<Vec<String>> {
        let mut result = FxHashSet::default();
        if k == 0 {
            return result;
        }
        let mut stack: Vec<Vec<&str>> = self.order.iter().map(|nt| vec![nt.as_str()]).collect();
        while let Some(chain) = stack.pop() {
            if chain.len() == k {
                result.insert(chain.iter().map(|s| (*s).to_owned()).collect());
                continue;
            }
            for succ in self.successors(chain.last().unwrap()) {
                let mut next = chain.clone();
                next.push(succ.as_str());
                stack.push(next);
            }
        }
        result
    }
}
