//! Discharging of leaf-level string constraints.
//!
//! The engine treats constraint text as opaque and hands fully scoped atoms
//! to an [`SmtSolver`] backend. The backend sees each variable together with
//! its fixed value (when quantifier elimination already bound it to a closed
//! subtree) or a finite candidate domain of yields (when the variable is
//! still free), and reports concrete models, unsatisfiability, or that it
//! cannot decide the constraint.
//!
//! [`StrEqSolver`] is the built-in backend. It decides conjunction-free
//! equality and disequality atoms in SMT-LIB syntax, which covers the
//! constraint language of this crate's test corpus. Anything else yields
//! [`SmtOutcome::Unknown`], which the solver core treats as "keep the
//! constraint and continue".

use log::trace;
use rustc_hash::FxHashMap;

use gramsat_formula::Variable;

/// One variable of an atom as seen by the backend.
#[derive(Clone, Debug)]
pub struct SmtVar {
    pub var: Variable,
    /// Yield of the closed subtree the variable is bound to, if any.
    pub value: Option<String>,
    /// Candidate yields for a still-free variable.
    pub domain: Vec<String>,
}

/// A fully scoped atom ready for the backend.
#[derive(Clone, Debug)]
pub struct SmtAtomInstance {
    /// Constraint text in the backend's syntax.
    pub constraint: String,
    /// Polarity of the atom.
    pub negated: bool,
    /// All variables the constraint mentions.
    pub vars: Vec<SmtVar>,
}

/// Backend verdict for one atom.
#[derive(Clone, PartialEq, Debug)]
pub enum SmtOutcome {
    /// Satisfiable; one assignment per model, covering the free variables.
    Models(Vec<FxHashMap<Variable, String>>),
    /// No assignment satisfies the atom.
    Unsat,
    /// The backend cannot decide this constraint.
    Unknown,
}

/// A solver for leaf-level string constraints.
pub trait SmtSolver {
    /// Decide `instance`, producing at most `max_models` models.
    fn solve(&self, instance: &SmtAtomInstance, max_models: usize) -> SmtOutcome;
}

/// Built-in backend for `(= a b)` and `(distinct a b)` atoms.
///
/// Arguments may be variable names, double-quoted string literals, or bare
/// integer literals. The atom's `negated` flag swaps equality and
/// disequality.
#[derive(Default, Clone, Debug)]
pub struct StrEqSolver;

impl StrEqSolver {
    pub fn new() -> StrEqSolver {
        StrEqSolver
    }
}

enum Arg {
    Fixed(String),
    Free(usize),
}

impl SmtSolver for StrEqSolver {
    fn solve(&self, instance: &SmtAtomInstance, max_models: usize) -> SmtOutcome {
        let tokens = match tokenize(&instance.constraint) {
            Some(tokens) => tokens,
            None => return SmtOutcome::Unknown,
        };
        if tokens.len() != 3 {
            return SmtOutcome::Unknown;
        }
        let equality = match tokens[0].as_str() {
            "=" => !instance.negated,
            "distinct" => instance.negated,
            _ => return SmtOutcome::Unknown,
        };

        let lhs = match resolve(&tokens[1], instance) {
            Some(arg) => arg,
            None => return SmtOutcome::Unknown,
        };
        let rhs = match resolve(&tokens[2], instance) {
            Some(arg) => arg,
            None => return SmtOutcome::Unknown,
        };

        let outcome = decide(lhs, rhs, equality, instance, max_models);
        trace!("str-eq solver: '{}' -> {:?}", instance.constraint, outcome);
        outcome
    }
}

/// Split `(op a b)` into its three tokens, honoring quoted strings.
fn tokenize(constraint: &str) -> Option<Vec<String>> {
    let inner = constraint.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut tokens = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::from("\"");
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => literal.push(c),
                    None => return None,
                }
            }
            literal.push('"');
            tokens.push(literal);
        } else if c == '(' {
            return None; // nested terms are out of scope
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(word);
        }
    }
    Some(tokens)
}

/// Resolve a token to a fixed value or the index of a free variable.
fn resolve(token: &str, instance: &SmtAtomInstance) -> Option<Arg> {
    if let Some(stripped) = token.strip_prefix('"') {
        return Some(Arg::Fixed(stripped.strip_suffix('"')?.to_owned()));
    }
    if token.chars().all(|c| c.is_ascii_digit() || c == '-') && token.parse::<i64>().is_ok() {
        return Some(Arg::Fixed(token.to_owned()));
    }
    let index = instance
        .vars
        .iter()
        .position(|smt_var| smt_var.var.name() == token)?;
    match &instance.vars[index].value {
        Some(value) => Some(Arg::Fixed(value.clone())),
        None => Some(Arg::Free(index)),
    }
}

fn decide(
    lhs: Arg,
    rhs: Arg,
    equality: bool,
    instance: &SmtAtomInstance,
    max_models: usize,
) -> SmtOutcome {
    let mut models = Vec::new();
    match (lhs, rhs) {
        (Arg::Fixed(a), Arg::Fixed(b)) => {
            if (a == b) == equality {
                models.push(FxHashMap::default());
            } else {
                return SmtOutcome::Unsat;
            }
        }
        (Arg::Fixed(value), Arg::Free(index)) | (Arg::Free(index), Arg::Fixed(value)) => {
            let smt_var = &instance.vars[index];
            for candidate in &smt_var.domain {
                if models.len() >= max_models {
                    break;
                }
                if (*candidate == value) == equality {
                    let mut model = FxHashMap::default();
                    model.insert(smt_var.var.clone(), candidate.clone());
                    models.push(model);
                }
            }
            if models.is_empty() {
                return if smt_var.domain.is_empty() {
                    SmtOutcome::Unknown
                } else {
                    SmtOutcome::Unsat
                };
            }
        }
        (Arg::Free(left), Arg::Free(right)) => {
            if left == right {
                // Same variable on both sides.
                let smt_var = &instance.vars[left];
                if equality {
                    for candidate in smt_var.domain.iter().take(max_models) {
                        let mut model = FxHashMap::default();
                        model.insert(smt_var.var.clone(), candidate.clone());
                        models.push(model);
                    }
                    if models.is_empty() {
                        return SmtOutcome::Unknown;
                    }
                } else {
                    return SmtOutcome::Unsat;
                }
            } else {
                let (a, b) = (&instance.vars[left], &instance.vars[right]);
                if a.domain.is_empty() || b.domain.is_empty() {
                    return SmtOutcome::Unknown;
                }
                'outer: for va in &a.domain {
                    for vb in &b.domain {
                        if models.len() >= max_models {
                            break 'outer;
                        }
                        if (va == vb) == equality {
                            let mut model = FxHashMap::default();
                            model.insert(a.var.clone(), va.clone());
                            model.insert(b.var.clone(), vb.clone());
                            models.push(model);
                        }
                    }
                }
                if models.is_empty() {
                    return SmtOutcome::Unsat;
                }
            }
        }
    }
    SmtOutcome::Models(models)
}
