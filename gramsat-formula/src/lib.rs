//! Derivation tree and constraint formula data types used by the gramsat
//! solver.
//!
//! A [`DerivationTree`] is a (partial) parse under a context-free grammar.
//! A [`Formula`] is a semantic constraint over such trees: propositional
//! connectives, bounded quantifiers over tree nodes or integers, structural
//! bind expressions, semantic-predicate atoms and external-solver atoms.

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! dt {
    ( $sym:expr ) => {
        $crate::tree::DerivationTree::auto($sym)
    };
    ( $sym:expr => [ $( $child:expr ),* $(,)? ] ) => {
        $crate::tree::DerivationTree::node($sym, vec![ $( $child ),* ])
    };
}

pub mod bind;
pub mod formula;
pub mod tree;

pub use bind::{BindElement, BindExpr};
pub use formula::{
    Formula, FormulaError, IntQuantifier, PredicateAtom, SmtAtom, Term, TreeQuantifier, VarKind,
    Variable,
};
pub use tree::{DerivationTree, NodeId, ParseTree, Path};
