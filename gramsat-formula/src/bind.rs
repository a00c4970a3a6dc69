//! Bind (match) expressions.
//!
//! A bind expression is a partial derivation-tree skeleton: a sequence of
//! literal grammar text interleaved with placeholder variables. A quantifier
//! carrying one pins not only the bound subtree's nonterminal but also the
//! shape and relative position of its children, and introduces the
//! placeholders as bound variables in the quantifier body.

use std::fmt;

use rustc_hash::FxHashMap;

use gramsat_grammar::{is_nonterminal, Grammar};

use crate::formula::Variable;
use crate::tree::{DerivationTree, NodeId, Path};

/// One element of a bind expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindElement {
    /// A placeholder variable; matches a child of the variable's nonterminal
    /// type and binds it.
    Var(Variable),
    /// Literal grammar text: terminal text and `<nonterminal>` tokens.
    Literal(String),
}

/// A structural pattern constraining a quantifier's bound subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindExpr {
    elements: Vec<BindElement>,
}

/// A flattened bind element: either a placeholder or a single grammar symbol.
enum BindSymbol<'a> {
    Var(&'a Variable),
    Symbol(String),
}

impl BindSymbol<'_> {
    fn matches(&self, grammar_symbol: &str) -> bool {
        match self {
            BindSymbol::Var(var) => var.ty() == grammar_symbol,
            BindSymbol::Symbol(symbol) => symbol == grammar_symbol,
        }
    }
}

/// Split literal grammar text into symbols: `<...>` tokens become
/// nonterminal symbols, maximal runs in between become terminal symbols.
fn tokenize(literal: &str) -> Vec<String> {
    let mut symbols = Vec::new();
    let mut terminal = String::new();
    let mut rest = literal;
    while let Some(start) = rest.find('<') {
        let after = &rest[start..];
        match after.find('>') {
            Some(end) if end > 1 && !after[1..end].contains('<') => {
                terminal.push_str(&rest[..start]);
                if !terminal.is_empty() {
                    symbols.push(std::mem::take(&mut terminal));
                }
                symbols.push(after[..=end].to_owned());
                rest = &after[end + 1..];
            }
            _ => {
                terminal.push_str(&rest[..=start]);
                rest = &after[1..];
            }
        }
    }
    terminal.push_str(rest);
    if !terminal.is_empty() {
        symbols.push(terminal);
    }
    symbols
}

impl BindExpr {
    /// Create a bind expression from its elements.
    pub fn new(elements: Vec<BindElement>) -> BindExpr {
        BindExpr { elements }
    }

    /// The expression's elements.
    pub fn elements(&self) -> &[BindElement] {
        &self.elements
    }

    /// The placeholder variables, in order of occurrence.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.elements.iter().filter_map(|element| match element {
            BindElement::Var(var) => Some(var),
            BindElement::Literal(_) => None,
        })
    }

    fn symbol_sequence(&self) -> Vec<BindSymbol> {
        let mut sequence = Vec::new();
        for element in &self.elements {
            match element {
                BindElement::Var(var) => sequence.push(BindSymbol::Var(var)),
                BindElement::Literal(literal) => {
                    sequence.extend(tokenize(literal).into_iter().map(BindSymbol::Symbol))
                }
            }
        }
        sequence
    }

    /// Materialize the skeleton as a tree prefix rooted at `nonterminal`.
    ///
    /// Picks the first grammar alternative of `nonterminal` whose symbols
    /// match the flattened element sequence, creates one open node per
    /// nonterminal position and one leaf per terminal position, and reports
    /// where each placeholder variable ended up. `None` when no alternative
    /// matches, which makes the bind expression inconsistent with its
    /// declared nonterminal.
    pub fn to_tree_prefix(
        &self,
        nonterminal: &str,
        grammar: &Grammar,
    ) -> Option<(DerivationTree, FxHashMap<Variable, Path>)> {
        let sequence = self.symbol_sequence();
        let alternatives = grammar.alternatives(nonterminal)?;

        let alternative = alternatives.iter().find(|alternative| {
            alternative.len() == sequence.len()
                && alternative
                    .iter()
                    .zip(&sequence)
                    .all(|(symbol, element)| element.matches(symbol))
        })?;

        let mut paths = FxHashMap::default();
        let mut children = Vec::with_capacity(alternative.len());
        for (index, (symbol, element)) in alternative.iter().zip(&sequence).enumerate() {
            let child = if is_nonterminal(symbol) {
                DerivationTree::open(symbol)
            } else {
                DerivationTree::leaf(symbol)
            };
            if let BindSymbol::Var(var) = element {
                paths.insert((*var).clone(), vec![index]);
            }
            children.push(child);
        }

        Some((DerivationTree::node(nonterminal, children), paths))
    }

    /// Structurally match a concrete subtree against the skeleton.
    ///
    /// The subtree must be closed and its children must match the flattened
    /// element sequence position by position. On success returns the node
    /// bound by each placeholder variable.
    pub fn match_tree(&self, tree: &DerivationTree) -> Option<FxHashMap<Variable, NodeId>> {
        let sequence = self.symbol_sequence();
        let children = tree.children()?;
        if children.len() != sequence.len() {
            return None;
        }

        let mut bindings = FxHashMap::default();
        for (child, element) in children.iter().zip(&sequence) {
            if !element.matches(child.symbol()) {
                return None;
            }
            if let BindSymbol::Var(var) = element {
                bindings.insert((*var).clone(), child.id());
            }
        }
        Some(bindings)
    }
}

impl fmt::Display for BindExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for element in &self.elements {
            match element {
                BindElement::Var(var) => write!(f, "{{{} {}}}", var.ty(), var.name())?,
                BindElement::Literal(literal) => write!(f, "{}", literal)?,
            }
        }
        Ok(())
    }
}
