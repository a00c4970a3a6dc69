//! Context-free grammar data types used by the gramsat solver.
//!
//! A [`Grammar`] maps each nonterminal to an ordered list of alternatives,
//! where an alternative is an ordered sequence of symbols. A symbol is either
//! literal terminal text or a nonterminal reference written in angle brackets,
//! e.g. `"<stmt>"`. Grammars are consumed as given and never mutated by the
//! solver.

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! grammar {
    ( $( $nt:expr => [ $( [ $( $sym:expr ),* $(,)? ] ),* $(,)? ] );* $(;)? ) => {{
        let mut grammar = $crate::Grammar::new();
        $(
            grammar.add_rule($nt, vec![ $( vec![ $( String::from($sym) ),* ] ),* ]);
        )*
        grammar
    }};
}

pub mod graph;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use graph::GrammarGraph;

/// One way to expand a nonterminal: an ordered sequence of symbols.
pub type Alternative = Vec<String>;

/// Whether a grammar symbol is a nonterminal reference.
///
/// Nonterminals are written in angle brackets with a non-empty name, e.g.
/// `"<expr>"`. Everything else is terminal text.
#[inline]
pub fn is_nonterminal(symbol: &str) -> bool {
    symbol.len() > 2 && symbol.starts_with('<') && symbol.ends_with('>')
}

/// A context-free grammar in canonical (alternative-list) form.
///
/// Alternative order within a rule is significant: the tree insertion engine
/// and the grammar-based closing step follow it when enumerating expansions.
/// Nonterminal iteration order is the rule insertion order, which keeps all
/// derived computations deterministic.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Grammar {
    order: Vec<String>,
    rules: FxHashMap<String, Vec<Alternative>>,
}

impl Grammar {
    /// Create an empty grammar.
    pub fn new() -> Grammar {
        Grammar::default()
    }

    /// Add a rule mapping a nonterminal to its ordered alternatives.
    ///
    /// Adding a rule for an already present nonterminal replaces the previous
    /// alternatives but keeps the original position in the iteration order.
    pub fn add_rule(&mut self, nonterminal: &str, alternatives: Vec<Alternative>) {
        debug_assert!(is_nonterminal(nonterminal));
        if self
            .rules
            .insert(nonterminal.to_owned(), alternatives)
            .is_none()
        {
            self.order.push(nonterminal.to_owned());
        }
    }

    /// The alternatives of a nonterminal, in grammar order.
    pub fn alternatives(&self, nonterminal: &str) -> Option<&[Alternative]> {
        self.rules.get(nonterminal).map(|alts| &alts[..])
    }

    /// Whether the grammar has a rule for the given nonterminal.
    pub fn defines(&self, nonterminal: &str) -> bool {
        self.rules.contains_key(nonterminal)
    }

    /// All defined nonterminals in rule insertion order.
    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|nt| nt.as_str())
    }

    /// Number of rules in the grammar.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the grammar has no rules.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Minimal number of expansion steps needed to derive a terminal-only
    /// string from each nonterminal.
    ///
    /// Computed as a fixpoint over the rules. Nonterminals that cannot derive
    /// any terminal string (e.g. `<a> ::= <a>`) are absent from the result.
    pub fn min_expansion_steps(&self) -> FxHashMap<String, usize> {
        let mut steps: FxHashMap<String, usize> = FxHashMap::default();

        loop {
            let mut changed = false;
            for nt in &self.order {
                let mut best: Option<usize> = None;
                for alternative in &self.rules[nt] {
                    let mut cost = Some(1);
                    for symbol in alternative {
                        if is_nonterminal(symbol) {
                            cost = match (cost, steps.get(symbol)) {
                                (Some(c), Some(&s)) => Some(c.max(s + 1)),
                                _ => None,
                            };
                        }
                    }
                    if let Some(cost) = cost {
                        best = Some(best.map_or(cost, |b: usize| b.min(cost)));
                    }
                }
                if let Some(best) = best {
                    if steps.get(nt).map_or(true, |&old| best < old) {
                        steps.insert(nt.clone(), best);
                        changed = true;
                    }
                }
            }
            if !changed {
                return steps;
            }
        }
    }

    /// Index of the alternative of `nonterminal` with the smallest minimal
    /// expansion depth, given a `min_expansion_steps` table.
    ///
    /// Used for budget-bounded grammar closing: beyond the depth budget the
    /// closing step always picks this alternative.
    pub fn cheapest_alternative(
        &self,
        nonterminal: &str,
        steps: &FxHashMap<String, usize>,
    ) -> Option<usize> {
        let alternatives = self.rules.get(nonterminal)?;
        let mut best: Option<(usize, usize)> = None;
        for (index, alternative) in alternatives.iter().enumerate() {
            let mut cost = Some(0);
            for symbol in alternative {
                if is_nonterminal(symbol) {
                    cost = match (cost, steps.get(symbol)) {
                        (Some(c), Some(&s)) => Some(c.max(s)),
                        _ => None,
                    };
                }
            }
            if let Some(cost) = cost {
                if best.map_or(true, |(_, b)| cost < b) {
                    best = Some((index, cost));
                }
            }
        }
        best.map(|(index, _)| index)
    }
}
