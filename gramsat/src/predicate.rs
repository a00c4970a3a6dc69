//! Structural predicates over derivation trees.
//!
//! Structural predicates talk about positions and yields of subtrees, which
//! string-level constraint solving cannot express. Each predicate evaluates
//! against the current whole tree; when the relevant subtrees are still open
//! it may answer [`PredicateResult::NeedsMoreInstantiation`], deferring the
//! verdict until closing makes it decidable.

use rustc_hash::FxHashMap;

use gramsat_formula::tree::path_precedes;
use gramsat_formula::{DerivationTree, NodeId, Term};

/// A predicate argument after variable substitution.
#[derive(Clone, PartialEq, Debug)]
pub enum PredicateArg {
    Node(NodeId),
    Str(String),
    Int(i64),
}

impl PredicateArg {
    /// Resolve a fully instantiated term. `None` when the term still holds
    /// a variable.
    pub fn from_term(term: &Term) -> Option<PredicateArg> {
        match term {
            Term::Var(_) => None,
            Term::Node(id) => Some(PredicateArg::Node(*id)),
            Term::Str(s) => Some(PredicateArg::Str(s.clone())),
            Term::Int(i) => Some(PredicateArg::Int(*i)),
        }
    }
}

/// Verdict of a predicate on the current tree.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PredicateResult {
    Satisfied,
    NotSatisfied,
    /// Not decidable yet; re-evaluate after the tree grows or closes.
    NeedsMoreInstantiation,
}

impl PredicateResult {
    /// Flip the verdict for a negated atom. An undecided verdict stays
    /// undecided.
    pub fn negate(self) -> PredicateResult {
        match self {
            PredicateResult::Satisfied => PredicateResult::NotSatisfied,
            PredicateResult::NotSatisfied => PredicateResult::Satisfied,
            PredicateResult::NeedsMoreInstantiation => PredicateResult::NeedsMoreInstantiation,
        }
    }
}

/// A named structural predicate with fixed arity.
pub trait StructuralPredicate {
    fn name(&self) -> &'static str;
    fn arity(&self) -> usize;
    fn evaluate(&self, tree: &DerivationTree, args: &[PredicateArg]) -> PredicateResult;
}

/// `before(a, b)`: node `a`'s yield starts strictly before node `b`'s in the
/// overall string, with neither containing the other.
pub struct Before;

impl StructuralPredicate for Before {
    fn name(&self) -> &'static str {
        "before"
    }

    fn arity(&self) -> usize {
        2
    }

    fn evaluate(&self, tree: &DerivationTree, args: &[PredicateArg]) -> PredicateResult {
        let (a, b) = match args {
            [PredicateArg::Node(a), PredicateArg::Node(b)] => (*a, *b),
            _ => return PredicateResult::NotSatisfied,
        };
        let path_a = match tree.find_node(a) {
            Some(path) => path,
            None => return PredicateResult::NeedsMoreInstantiation,
        };
        let path_b = match tree.find_node(b) {
            Some(path) => path,
            None => return PredicateResult::NeedsMoreInstantiation,
        };
        if path_precedes(&path_a, &path_b) {
            PredicateResult::Satisfied
        } else {
            PredicateResult::NotSatisfied
        }
    }
}

/// Yield of a node argument, or the literal itself. `None` while the
/// subtree is open or absent from the tree.
fn arg_text(tree: &DerivationTree, arg: &PredicateArg) -> Option<String> {
    match arg {
        PredicateArg::Node(id) => {
            let path = tree.find_node(*id)?;
            let subtree = tree.subtree(&path)?;
            if subtree.num_open() > 0 {
                None
            } else {
                Some(subtree.to_string())
            }
        }
        PredicateArg::Str(s) => Some(s.clone()),
        PredicateArg::Int(i) => Some(i.to_string()),
    }
}

/// `same_text(a, b)`: the yields of `a` and `b` are equal.
pub struct SameText;

impl StructuralPredicate for SameText {
    fn name(&self) -> &'static str {
        "same_text"
    }

    fn arity(&self) -> usize {
        2
    }

    fn evaluate(&self, tree: &DerivationTree, args: &[PredicateArg]) -> PredicateResult {
        let (a, b) = match (arg_text(tree, &args[0]), arg_text(tree, &args[1])) {
            (Some(a), Some(b)) => (a, b),
            _ => return PredicateResult::NeedsMoreInstantiation,
        };
        if a == b {
            PredicateResult::Satisfied
        } else {
            PredicateResult::NotSatisfied
        }
    }
}

/// `different_text(a, b)`: the yields of `a` and `b` differ.
pub struct DifferentText;

impl StructuralPredicate for DifferentText {
    fn name(&self) -> &'static str {
        "different_text"
    }

    fn arity(&self) -> usize {
        2
    }

    fn evaluate(&self, tree: &DerivationTree, args: &[PredicateArg]) -> PredicateResult {
        SameText.evaluate(tree, args).negate()
    }
}

/// Name-indexed predicate lookup used by evaluation and solving.
#[derive(Default)]
pub struct PredicateRegistry {
    predicates: FxHashMap<String, Box<dyn StructuralPredicate>>,
}

impl PredicateRegistry {
    pub fn new() -> PredicateRegistry {
        PredicateRegistry::default()
    }

    /// The built-in predicates: `before`, `same_text`, `different_text`.
    pub fn standard() -> PredicateRegistry {
        let mut registry = PredicateRegistry::new();
        registry.register(Box::new(Before));
        registry.register(Box::new(SameText));
        registry.register(Box::new(DifferentText));
        registry
    }

    pub fn register(&mut self, predicate: Box<dyn StructuralPredicate>) {
        self.predicates
            .insert(predicate.name().to_owned(), predicate);
    }

    pub fn get(&self, name: &str) -> Option<&dyn StructuralPredicate> {
        self.predicates.get(name).map(|boxed| &**boxed)
    }

    /// Name-to-arity map, for formula validation.
    pub fn arities(&self) -> FxHashMap<String, usize> {
        self.predicates
            .iter()
            .map(|(name, predicate)| (name.clone(), predicate.arity()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gramsat_formula::dt;

    use crate::test::lang_tree_two_stmts;

    #[test]
    fn before_follows_document_order() {
        let tree = lang_tree_two_stmts();
        // first <assgn> node: x := 1
        let first = tree.subtree(&[0, 0]).unwrap().id();
        // second <assgn> node: y := z
        let second = tree.subtree(&[0, 2, 0]).unwrap().id();

        let args_fwd = [PredicateArg::Node(first), PredicateArg::Node(second)];
        let args_bwd = [PredicateArg::Node(second), PredicateArg::Node(first)];
        assert_eq!(Before.evaluate(&tree, &args_fwd), PredicateResult::Satisfied);
        assert_eq!(
            Before.evaluate(&tree, &args_bwd),
            PredicateResult::NotSatisfied
        );
    }

    #[test]
    fn before_on_nested_nodes_is_not_satisfied() {
        let tree = lang_tree_two_stmts();
        let outer = tree.subtree(&[0]).unwrap().id();
        let inner = tree.subtree(&[0, 0]).unwrap().id();
        let args = [PredicateArg::Node(outer), PredicateArg::Node(inner)];
        assert_eq!(Before.evaluate(&tree, &args), PredicateResult::NotSatisfied);
    }

    #[test]
    fn before_defers_for_absent_node() {
        let tree = lang_tree_two_stmts();
        let present = tree.subtree(&[0, 0]).unwrap().id();
        let absent = dt!("<assgn>").id();
        let args = [PredicateArg::Node(present), PredicateArg::Node(absent)];
        assert_eq!(
            Before.evaluate(&tree, &args),
            PredicateResult::NeedsMoreInstantiation
        );
    }

    #[test]
    fn same_text_compares_yields() {
        let tree = dt!("<stmt>" => [
            dt!("<var>" => [dt!("x")]),
            dt!(" = "),
            dt!("<var>" => [dt!("x")]),
        ]);
        let left = tree.subtree(&[0]).unwrap().id();
        let right = tree.subtree(&[2]).unwrap().id();
        let args = [PredicateArg::Node(left), PredicateArg::Node(right)];
        assert_eq!(SameText.evaluate(&tree, &args), PredicateResult::Satisfied);
        assert_eq!(
            DifferentText.evaluate(&tree, &args),
            PredicateResult::NotSatisfied
        );

        let lit_args = [PredicateArg::Node(left), PredicateArg::Str("y".into())];
        assert_eq!(
            SameText.evaluate(&tree, &lit_args),
            PredicateResult::NotSatisfied
        );
    }

    #[test]
    fn same_text_defers_on_open_subtree() {
        let tree = dt!("<stmt>" => [
            dt!("<var>" => [dt!("x")]),
            dt!(" = "),
            dt!("<var>"),
        ]);
        let left = tree.subtree(&[0]).unwrap().id();
        let right = tree.subtree(&[2]).unwrap().id();
        let args = [PredicateArg::Node(left), PredicateArg::Node(right)];
        assert_eq!(
            SameText.evaluate(&tree, &args),
            PredicateResult::NeedsMoreInstantiation
        );
    }

    #[test]
    fn registry_lookup_and_arities() {
        let registry = PredicateRegistry::standard();
        assert!(registry.get("before").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.arities()["same_text"], 2);
    }
}
