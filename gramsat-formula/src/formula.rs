//! Constraint formulas over derivation trees.
//!
//! Formulas are a closed tagged union; every consumer (the solver's
//! eliminator, the cost model, the evaluator, the printer) matches
//! exhaustively, so adding a variant is a compile-time checked change
//! everywhere.
//!
//! During search, formulas are only ever *specialized*: quantifiers are
//! stripped as they are instantiated and variables are replaced by concrete
//! node references. Normalization rewrites `Implies`/`Iff`/`Xor`/`Not` away,
//! folding negation into atom polarity, so the solver core only deals with
//! conjunction, disjunction, quantifiers and atoms.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use gramsat_grammar::Grammar;

use crate::bind::BindExpr;
use crate::tree::NodeId;

/// Type name used by integer-quantified variables.
pub const INT_TYPE: &str = "int";

/// The kind of a variable.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VarKind {
    /// The distinguished variable denoting the tree under construction.
    Constant,
    /// A variable introduced by a quantifier or bind expression.
    Bound,
}

/// A named variable with a required type.
///
/// For tree variables the type is a nonterminal label; for integer-quantified
/// variables it is [`INT_TYPE`]. Once bound during search, a tree variable
/// denotes exactly one node (by identity) in one concrete tree.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Variable {
    name: String,
    ty: String,
    kind: VarKind,
}

impl Variable {
    /// The constant denoting the tree under construction.
    pub fn constant(name: &str, ty: &str) -> Variable {
        Variable {
            name: name.to_owned(),
            ty: ty.to_owned(),
            kind: VarKind::Constant,
        }
    }

    /// A quantifier-bound tree variable.
    pub fn bound(name: &str, ty: &str) -> Variable {
        Variable {
            name: name.to_owned(),
            ty: ty.to_owned(),
            kind: VarKind::Bound,
        }
    }

    /// A quantifier-bound integer variable.
    pub fn int(name: &str) -> Variable {
        Variable::bound(name, INT_TYPE)
    }

    /// The variable's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's type: a nonterminal label or [`INT_TYPE`].
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// The variable's kind.
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    /// Whether this is the distinguished constant.
    pub fn is_constant(&self) -> bool {
        self.kind == VarKind::Constant
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An argument position in an atom or quantifier domain.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    /// A not yet instantiated variable.
    Var(Variable),
    /// A concrete tree node, by identity.
    Node(NodeId),
    /// A string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Var(var) => write!(f, "{}", var),
            Term::Node(id) => write!(f, "{}", id),
            Term::Str(text) => write!(f, "{:?}", text),
            Term::Int(value) => write!(f, "{}", value),
        }
    }
}

/// A bounded quantifier over tree nodes.
#[derive(Clone, PartialEq, Debug)]
pub struct TreeQuantifier {
    /// The bound variable; its type is the quantified nonterminal.
    pub var: Variable,
    /// The variable or concrete node whose subtree is the search domain.
    pub in_term: Term,
    /// Optional structural pattern the bound subtree must match.
    pub bind: Option<BindExpr>,
    /// The quantifier body.
    pub body: Formula,
}

/// A quantifier over the unbounded integer domain.
#[derive(Clone, PartialEq, Debug)]
pub struct IntQuantifier {
    /// The bound integer variable.
    pub var: Variable,
    /// The quantifier body.
    pub body: Formula,
}

/// A semantic-predicate atom, decided by an external decision procedure.
#[derive(Clone, PartialEq, Debug)]
pub struct PredicateAtom {
    /// The predicate name; arity is checked at construction time.
    pub name: String,
    /// Argument terms.
    pub args: Vec<Term>,
    /// Polarity; normalization folds `Not` into this flag.
    pub negated: bool,
}

/// An atom to be discharged by the external solver.
///
/// The constraint text is opaque to the engine; `vars` declares the typed
/// free variables it mentions and `bindings` accumulates their concrete
/// instantiations as enclosing quantifiers are eliminated.
#[derive(Clone, PartialEq, Debug)]
pub struct SmtAtom {
    /// Quantifier-free constraint over `vars`, in the backend's syntax.
    pub constraint: String,
    /// The typed free variables of the constraint.
    pub vars: Vec<Variable>,
    /// Instantiations accumulated during quantifier elimination.
    pub bindings: FxHashMap<Variable, Term>,
    /// Polarity; normalization folds `Not` into this flag.
    pub negated: bool,
}

/// A semantic constraint over derivation trees.
#[derive(Clone, PartialEq, Debug)]
pub enum Formula {
    True,
    False,
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    Xor(Box<Formula>, Box<Formula>),
    Forall(Box<TreeQuantifier>),
    Exists(Box<TreeQuantifier>),
    ForallInt(Box<IntQuantifier>),
    ExistsInt(Box<IntQuantifier>),
    Predicate(PredicateAtom),
    Smt(SmtAtom),
}

impl Formula {
    /// Conjunction of the given formulas.
    pub fn and(formulas: Vec<Formula>) -> Formula {
        Formula::And(formulas)
    }

    /// Disjunction of the given formulas.
    pub fn or(formulas: Vec<Formula>) -> Formula {
        Formula::Or(formulas)
    }

    /// Negation.
    pub fn not(formula: Formula) -> Formula {
        Formula::Not(Box::new(formula))
    }

    /// Implication.
    pub fn implies(antecedent: Formula, consequent: Formula) -> Formula {
        Formula::Implies(Box::new(antecedent), Box::new(consequent))
    }

    /// Universal quantifier over subtrees of `in_term`.
    pub fn forall(var: Variable, in_term: Term, body: Formula) -> Formula {
        Formula::Forall(Box::new(TreeQuantifier {
            var,
            in_term,
            bind: None,
            body,
        }))
    }

    /// Universal quantifier with a bind expression.
    pub fn forall_bind(var: Variable, bind: BindExpr, in_term: Term, body: Formula) -> Formula {
        Formula::Forall(Box::new(TreeQuantifier {
            var,
            in_term,
            bind: Some(bind),
            body,
        }))
    }

    /// Existential quantifier over subtrees of `in_term`.
    pub fn exists(var: Variable, in_term: Term, body: Formula) -> Formula {
        Formula::Exists(Box::new(TreeQuantifier {
            var,
            in_term,
            bind: None,
            body,
        }))
    }

    /// Existential quantifier with a bind expression.
    pub fn exists_bind(var: Variable, bind: BindExpr, in_term: Term, body: Formula) -> Formula {
        Formula::Exists(Box::new(TreeQuantifier {
            var,
            in_term,
            bind: Some(bind),
            body,
        }))
    }

    /// A positive semantic-predicate atom.
    pub fn predicate(name: &str, args: Vec<Term>) -> Formula {
        Formula::Predicate(PredicateAtom {
            name: name.to_owned(),
            args,
            negated: false,
        })
    }

    /// A positive external-solver atom.
    pub fn smt(constraint: &str, vars: Vec<Variable>) -> Formula {
        Formula::Smt(SmtAtom {
            constraint: constraint.to_owned(),
            vars,
            bindings: FxHashMap::default(),
            negated: false,
        })
    }

    /// Replace every free occurrence of `var` by `term`.
    ///
    /// Quantifier binders are never touched; validation guarantees binders
    /// are unique, so capture cannot occur.
    pub fn substitute(&self, var: &Variable, term: &Term) -> Formula {
        let subst_term = |t: &Term| match t {
            Term::Var(v) if v == var => term.clone(),
            other => other.clone(),
        };
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::Not(inner) => Formula::not(inner.substitute(var, term)),
            Formula::And(parts) => {
                Formula::And(parts.iter().map(|p| p.substitute(var, term)).collect())
            }
            Formula::Or(parts) => {
                Formula::Or(parts.iter().map(|p| p.substitute(var, term)).collect())
            }
            Formula::Implies(a, b) => {
                Formula::implies(a.substitute(var, term), b.substitute(var, term))
            }
            Formula::Iff(a, b) => Formula::Iff(
                Box::new(a.substitute(var, term)),
                Box::new(b.substitute(var, term)),
            ),
            Formula::Xor(a, b) => Formula::Xor(
                Box::new(a.substitute(var, term)),
                Box::new(b.substitute(var, term)),
            ),
            Formula::Forall(q) => Formula::Forall(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: subst_term(&q.in_term),
                bind: q.bind.clone(),
                body: q.body.substitute(var, term),
            })),
            Formula::Exists(q) => Formula::Exists(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: subst_term(&q.in_term),
                bind: q.bind.clone(),
                body: q.body.substitute(var, term),
            })),
            Formula::ForallInt(q) => Formula::ForallInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.substitute(var, term),
            })),
            Formula::ExistsInt(q) => Formula::ExistsInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.substitute(var, term),
            })),
            Formula::Predicate(atom) => Formula::Predicate(PredicateAtom {
                name: atom.name.clone(),
                args: atom.args.iter().map(subst_term).collect(),
                negated: atom.negated,
            }),
            Formula::Smt(atom) => {
                let mut bindings = atom.bindings.clone();
                if atom.vars.contains(var) {
                    bindings.insert(var.clone(), term.clone());
                }
                Formula::Smt(SmtAtom {
                    constraint: atom.constraint.clone(),
                    vars: atom.vars.clone(),
                    bindings,
                    negated: atom.negated,
                })
            }
        }
    }

    /// Rewrite into negation-normal conjunction/disjunction structure.
    ///
    /// After normalization the formula contains no `Not`, `Implies`, `Iff`
    /// or `Xor` variants: negation lives in atom polarity flags and
    /// quantifier duality. `And`/`Or` are flattened and constant-folded.
    pub fn normalize(&self) -> Formula {
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::Not(inner) => inner.negate(),
            Formula::And(parts) => {
                let mut flat = Vec::new();
                for part in parts {
                    match part.normalize() {
                        Formula::True => {}
                        Formula::False => return Formula::False,
                        Formula::And(nested) => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => Formula::True,
                    1 => flat.pop().unwrap(),
                    _ => Formula::And(flat),
                }
            }
            Formula::Or(parts) => {
                let mut flat = Vec::new();
                for part in parts {
                    match part.normalize() {
                        Formula::False => {}
                        Formula::True => return Formula::True,
                        Formula::Or(nested) => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => Formula::False,
                    1 => flat.pop().unwrap(),
                    _ => Formula::Or(flat),
                }
            }
            Formula::Implies(a, b) => {
                Formula::Or(vec![Formula::not((**a).clone()), (**b).clone()]).normalize()
            }
            Formula::Iff(a, b) => Formula::And(vec![
                Formula::implies((**a).clone(), (**b).clone()),
                Formula::implies((**b).clone(), (**a).clone()),
            ])
            .normalize(),
            Formula::Xor(a, b) => Formula::Or(vec![
                Formula::And(vec![(**a).clone(), Formula::not((**b).clone())]),
                Formula::And(vec![Formula::not((**a).clone()), (**b).clone()]),
            ])
            .normalize(),
            Formula::Forall(q) => Formula::Forall(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: q.in_term.clone(),
                bind: q.bind.clone(),
                body: q.body.normalize(),
            })),
            Formula::Exists(q) => Formula::Exists(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: q.in_term.clone(),
                bind: q.bind.clone(),
                body: q.body.normalize(),
            })),
            Formula::ForallInt(q) => Formula::ForallInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.normalize(),
            })),
            Formula::ExistsInt(q) => Formula::ExistsInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.normalize(),
            })),
            Formula::Predicate(atom) => Formula::Predicate(atom.clone()),
            Formula::Smt(atom) => Formula::Smt(atom.clone()),
        }
    }

    /// The normalized negation of this formula.
    fn negate(&self) -> Formula {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => inner.normalize(),
            Formula::And(parts) => {
                Formula::Or(parts.iter().map(Formula::negate).collect()).normalize()
            }
            Formula::Or(parts) => {
                Formula::And(parts.iter().map(Formula::negate).collect()).normalize()
            }
            Formula::Implies(a, b) => {
                Formula::And(vec![(**a).clone(), b.negate()]).normalize()
            }
            Formula::Iff(a, b) => Formula::Xor((*a).clone(), (*b).clone()).normalize(),
            Formula::Xor(a, b) => Formula::Iff((*a).clone(), (*b).clone()).normalize(),
            Formula::Forall(q) => Formula::Exists(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: q.in_term.clone(),
                bind: q.bind.clone(),
                body: q.body.negate(),
            })),
            Formula::Exists(q) => Formula::Forall(Box::new(TreeQuantifier {
                var: q.var.clone(),
                in_term: q.in_term.clone(),
                bind: q.bind.clone(),
                body: q.body.negate(),
            })),
            Formula::ForallInt(q) => Formula::ExistsInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.negate(),
            })),
            Formula::ExistsInt(q) => Formula::ForallInt(Box::new(IntQuantifier {
                var: q.var.clone(),
                body: q.body.negate(),
            })),
            Formula::Predicate(atom) => {
                let mut atom = atom.clone();
                atom.negated = !atom.negated;
                Formula::Predicate(atom)
            }
            Formula::Smt(atom) => {
                let mut atom = atom.clone();
                atom.negated = !atom.negated;
                Formula::Smt(atom)
            }
        }
    }

    /// The top-level conjuncts of the normalized formula; empty for `True`.
    pub fn conjuncts(&self) -> Vec<Formula> {
        match self.normalize() {
            Formula::True => Vec::new(),
            Formula::And(parts) => parts,
            other => vec![other],
        }
    }

    /// All constant variables referenced anywhere in the formula.
    pub fn constants(&self) -> FxHashSet<Variable> {
        let mut result = FxHashSet::default();
        self.visit_terms(&mut |term| {
            if let Term::Var(var) = term {
                if var.is_constant() {
                    result.insert(var.clone());
                }
            }
        });
        result
    }

    /// All concrete node references anywhere in the formula.
    pub fn referenced_nodes(&self) -> FxHashSet<NodeId> {
        let mut result = FxHashSet::default();
        self.visit_terms(&mut |term| {
            if let Term::Node(id) = term {
                result.insert(*id);
            }
        });
        result
    }

    /// All integer literals anywhere in the formula.
    pub fn int_literals(&self) -> FxHashSet<i64> {
        let mut result = FxHashSet::default();
        self.visit_terms(&mut |term| {
            if let Term::Int(value) = term {
                result.insert(*value);
            }
        });
        result
    }

    fn visit_terms(&self, visit: &mut impl FnMut(&Term)) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Not(inner) => inner.visit_terms(visit),
            Formula::And(parts) | Formula::Or(parts) => {
                for part in parts {
                    part.visit_terms(visit);
                }
            }
            Formula::Implies(a, b) | Formula::Iff(a, b) | Formula::Xor(a, b) => {
                a.visit_terms(visit);
                b.visit_terms(visit);
            }
            Formula::Forall(q) | Formula::Exists(q) => {
                visit(&q.in_term);
                q.body.visit_terms(visit);
            }
            Formula::ForallInt(q) | Formula::ExistsInt(q) => q.body.visit_terms(visit),
            Formula::Predicate(atom) => {
                for arg in &atom.args {
                    visit(arg);
                }
            }
            Formula::Smt(atom) => {
                for term in atom.bindings.values() {
                    visit(term);
                }
            }
        }
    }

    /// Check well-formedness against a grammar and a table of known
    /// predicate arities.
    ///
    /// Rejects ill-typed variables, duplicate or missing bindings, `in`
    /// references that cannot resolve, bind expressions inconsistent with
    /// their declared nonterminal, and unknown or wrongly applied
    /// predicates. Fatal at formula-construction time, so search never
    /// discovers malformed input.
    pub fn validate(
        &self,
        grammar: &Grammar,
        predicate_arities: &FxHashMap<String, usize>,
    ) -> Result<(), FormulaError> {
        let mut binders = FxHashSet::default();
        self.validate_inner(grammar, predicate_arities, &mut binders, &FxHashSet::default())
    }

    fn validate_inner(
        &self,
        grammar: &Grammar,
        predicate_arities: &FxHashMap<String, usize>,
        binders: &mut FxHashSet<Variable>,
        scope: &FxHashSet<Variable>,
    ) -> Result<(), FormulaError> {
        let check_term = |term: &Term, scope: &FxHashSet<Variable>| match term {
            Term::Var(var) => {
                if var.is_constant() {
                    if !grammar.defines(var.ty()) {
                        return Err(FormulaError::UnknownNonterminal {
                            variable: var.name().to_owned(),
                            nonterminal: var.ty().to_owned(),
                        });
                    }
                    Ok(())
                } else if scope.contains(var) {
                    Ok(())
                } else {
                    Err(FormulaError::UnboundVariable {
                        variable: var.name().to_owned(),
                    })
                }
            }
            Term::Node(_) | Term::Str(_) | Term::Int(_) => Ok(()),
        };

        match self {
            Formula::True | Formula::False => Ok(()),
            Formula::Not(inner) => inner.validate_inner(grammar, predicate_arities, binders, scope),
            Formula::And(parts) | Formula::Or(parts) => {
                for part in parts {
                    part.validate_inner(grammar, predicate_arities, binders, scope)?;
                }
                Ok(())
            }
            Formula::Implies(a, b) | Formula::Iff(a, b) | Formula::Xor(a, b) => {
                a.validate_inner(grammar, predicate_arities, binders, scope)?;
                b.validate_inner(grammar, predicate_arities, binders, scope)
            }
            Formula::Forall(q) | Formula::Exists(q) => {
                if q.var.is_constant() {
                    return Err(FormulaError::QuantifiedConstant {
                        variable: q.var.name().to_owned(),
                    });
                }
                if !grammar.defines(q.var.ty()) {
                    return Err(FormulaError::UnknownNonterminal {
                        variable: q.var.name().to_owned(),
                        nonterminal: q.var.ty().to_owned(),
                    });
                }
                check_term(&q.in_term, scope)?;

                let mut inner_scope = scope.clone();
                for var in std::iter::once(&q.var)
                    .chain(q.bind.iter().flat_map(|bind| bind.variables()))
                {
                    if !binders.insert(var.clone()) {
                        return Err(FormulaError::DuplicateBinding {
                            variable: var.name().to_owned(),
                        });
                    }
                    inner_scope.insert(var.clone());
                }

                if let Some(bind) = &q.bind {
                    if bind.to_tree_prefix(q.var.ty(), grammar).is_none() {
                        return Err(FormulaError::BindMismatch {
                            variable: q.var.name().to_owned(),
                            nonterminal: q.var.ty().to_owned(),
                        });
                    }
                }

                q.body
                    .validate_inner(grammar, predicate_arities, binders, &inner_scope)
            }
            Formula::ForallInt(q) | Formula::ExistsInt(q) => {
                if q.var.ty() != INT_TYPE {
                    return Err(FormulaError::IntVariableExpected {
                        variable: q.var.name().to_owned(),
                        ty: q.var.ty().to_owned(),
                    });
                }
                if !binders.insert(q.var.clone()) {
                    return Err(FormulaError::DuplicateBinding {
                        variable: q.var.name().to_owned(),
                    });
                }
                let mut inner_scope = scope.clone();
                inner_scope.insert(q.var.clone());
                q.body
                    .validate_inner(grammar, predicate_arities, binders, &inner_scope)
            }
            Formula::Predicate(atom) => {
                let arity = predicate_arities.get(&atom.name).ok_or_else(|| {
                    FormulaError::UnknownPredicate {
                        predicate: atom.name.clone(),
                    }
                })?;
                if atom.args.len() != *arity {
                    return Err(FormulaError::PredicateArity {
                        predicate: atom.name.clone(),
                        expected: *arity,
                        got: atom.args.len(),
                    });
                }
                for arg in &atom.args {
                    check_term(arg, scope)?;
                }
                Ok(())
            }
            Formula::Smt(atom) => {
                for var in &atom.vars {
                    if let Some(term) = atom.bindings.get(var) {
                        check_term(term, scope)?;
                    } else {
                        check_term(&Term::Var(var.clone()), scope)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Not(inner) => write!(f, "not ({})", inner),
            Formula::And(parts) => {
                write!(f, "(")?;
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
            Formula::Or(parts) => {
                write!(f, "(")?;
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
            Formula::Implies(a, b) => write!(f, "({} implies {})", a, b),
            Formula::Iff(a, b) => write!(f, "({} iff {})", a, b),
            Formula::Xor(a, b) => write!(f, "({} xor {})", a, b),
            Formula::Forall(q) => match &q.bind {
                Some(bind) => write!(
                    f,
                    "forall {} {}=\"{}\" in {}: {}",
                    q.var.ty(),
                    q.var,
                    bind,
                    q.in_term,
                    q.body
                ),
                None => write!(f, "forall {} {} in {}: {}", q.var.ty(), q.var, q.in_term, q.body),
            },
            Formula::Exists(q) => match &q.bind {
                Some(bind) => write!(
                    f,
                    "exists {} {}=\"{}\" in {}: {}",
                    q.var.ty(),
                    q.var,
                    bind,
                    q.in_term,
                    q.body
                ),
                None => write!(f, "exists {} {} in {}: {}", q.var.ty(), q.var, q.in_term, q.body),
            },
            Formula::ForallInt(q) => write!(f, "forall int {}: {}", q.var, q.body),
            Formula::ExistsInt(q) => write!(f, "exists int {}: {}", q.var, q.body),
            Formula::Predicate(atom) => {
                if atom.negated {
                    write!(f, "not ")?;
                }
                write!(f, "{}(", atom.name)?;
                for (index, arg) in atom.args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Formula::Smt(atom) => {
                if atom.negated {
                    write!(f, "not ")?;
                }
                write!(f, "{}", atom.constraint)
            }
        }
    }
}

/// Possible errors while constructing a constraint formula.
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error("variable '{variable}' is used but not bound by any quantifier")]
    UnboundVariable { variable: String },
    #[error("variable '{variable}' is bound by more than one quantifier")]
    DuplicateBinding { variable: String },
    #[error("constant '{variable}' cannot be quantified over")]
    QuantifiedConstant { variable: String },
    #[error("variable '{variable}' has unknown nonterminal type '{nonterminal}'")]
    UnknownNonterminal {
        variable: String,
        nonterminal: String,
    },
    #[error(
        "bind expression of variable '{variable}' matches no alternative of '{nonterminal}'"
    )]
    BindMismatch {
        variable: String,
        nonterminal: String,
    },
    #[error("integer quantifier binds '{variable}' of non-integer type '{ty}'")]
    IntVariableExpected { variable: String, ty: String },
    #[error("unknown predicate '{predicate}'")]
    UnknownPredicate { predicate: String },
    #[error("predicate '{predicate}' expects {expected} arguments, got {got}")]
    PredicateArity {
        predicate: String,
        expected: usize,
        got: usize,
    },
    #[error("formula references {count} distinct constants, expected exactly one")]
    ConstantCount { count: usize },
}
