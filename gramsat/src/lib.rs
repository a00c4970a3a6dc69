//! Gramsat generates test inputs that are syntactically valid under a
//! context-free grammar and satisfy semantic constraints expressed as
//! quantified formulas over derivation trees. Given a grammar and a
//! constraint, it runs a cost-guided best-first search that interleaves
//! quantifier instantiation, witness construction by tree insertion,
//! grammar-based closing of open leaves, and delegation of quantifier-free
//! atoms to an external solver, producing fully concrete trees that satisfy
//! the constraint.

pub mod config;
pub mod cost;
pub mod eval;
pub mod insert;
pub mod predicate;
pub mod smt;
pub mod solver;

mod state;


pub use gramsat_formula::{
    BindElement, BindExpr, DerivationTree, Formula, FormulaError, NodeId, ParseTree, Path, Term,
    Variable,
};
pub use gramsat_grammar::{Grammar, GrammarGraph};

pub use config::SolverConfig;
pub use cost::{CostSettings, WeightVector};
pub use insert::{insert_tree, wrap_in_tree_starting_in};
pub use solver::{RunStatus, SolveResult, Solver};
