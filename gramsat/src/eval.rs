//! Three-valued evaluation of formulas against (partial) trees.
//!
//! Evaluation answers [`EvalResult::Unknown`] whenever open parts of the
//! tree could still change the verdict: a quantifier whose domain is not
//! settled, a predicate over an open subtree, or a constraint the backend
//! cannot decide. On closed trees the tree quantifiers are always decided.

use rustc_hash::FxHashMap;

use gramsat_formula::{
    DerivationTree, Formula, IntQuantifier, NodeId, PredicateAtom, SmtAtom, Term, TreeQuantifier,
    Variable,
};
use gramsat_grammar::GrammarGraph;

use crate::predicate::{PredicateArg, PredicateRegistry, PredicateResult};
use crate::smt::{SmtAtomInstance, SmtOutcome, SmtSolver, SmtVar};

/// Verdict of evaluating a formula against a tree.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EvalResult {
    True,
    False,
    /// Open parts of the tree can still change the verdict.
    Unknown,
}

impl EvalResult {
    fn negate(self) -> EvalResult {
        match self {
            EvalResult::True => EvalResult::False,
            EvalResult::False => EvalResult::True,
            EvalResult::Unknown => EvalResult::Unknown,
        }
    }
}

/// One element of a tree quantifier's domain.
#[derive(Clone, Debug)]
pub struct QuantifierMatch {
    /// The matched subtree, shared by identity with the scope tree.
    pub subtree: DerivationTree,
    /// Bind-expression variables mapped to child nodes of the match.
    pub bindings: FxHashMap<Variable, NodeId>,
}

/// All current matches of a tree quantifier within its scope subtree.
///
/// A match is a subtree labeled with the quantified nonterminal; when the
/// quantifier carries a bind expression, only subtrees whose children fit
/// the pattern count, with the pattern's variables bound alongside.
pub fn quantifier_matches(
    quantifier: &TreeQuantifier,
    scope: &DerivationTree,
) -> Vec<QuantifierMatch> {
    let mut matches = Vec::new();
    for (_, node) in scope.walk() {
        if node.symbol() != quantifier.var.ty() {
            continue;
        }
        let bindings = match &quantifier.bind {
            None => FxHashMap::default(),
            Some(bind) => match bind.match_tree(&node) {
                Some(bindings) => bindings,
                None => continue,
            },
        };
        matches.push(QuantifierMatch {
            subtree: node,
            bindings,
        });
    }
    matches
}

/// Whether growing or closing `scope` can still produce new subtrees of
/// `nonterminal`.
pub fn domain_unsettled(graph: &GrammarGraph, scope: &DerivationTree, nonterminal: &str) -> bool {
    scope
        .open_leaves()
        .iter()
        .any(|(_, sym)| sym == nonterminal || graph.reachable(sym, nonterminal))
}

/// Formula evaluator for a fixed grammar and backend pair.
pub struct Evaluator<'a> {
    graph: &'a GrammarGraph,
    predicates: &'a PredicateRegistry,
    smt: &'a dyn SmtSolver,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        graph: &'a GrammarGraph,
        predicates: &'a PredicateRegistry,
        smt: &'a dyn SmtSolver,
    ) -> Evaluator<'a> {
        Evaluator {
            graph,
            predicates,
            smt,
        }
    }

    /// Evaluate `formula` against `tree`.
    ///
    /// The formula's constant must already be substituted by the tree's
    /// root node; use [`Evaluator::evaluate_with_constant`] for the common
    /// case.
    pub fn evaluate(&self, formula: &Formula, tree: &DerivationTree) -> EvalResult {
        match formula {
            Formula::True => EvalResult::True,
            Formula::False => EvalResult::False,
            Formula::Not(inner) => self.evaluate(inner, tree).negate(),
            Formula::And(parts) => {
                let mut result = EvalResult::True;
                for part in parts {
                    match self.evaluate(part, tree) {
                        EvalResult::False => return EvalResult::False,
                        EvalResult::Unknown => result = EvalResult::Unknown,
                        EvalResult::True => {}
                    }
                }
                result
            }
            Formula::Or(parts) => {
                let mut result = EvalResult::False;
                for part in parts {
                    match self.evaluate(part, tree) {
                        EvalResult::True => return EvalResult::True,
                        EvalResult::Unknown => result = EvalResult::Unknown,
                        EvalResult::False => {}
                    }
                }
                result
            }
            Formula::Implies(a, b) => {
                match (self.evaluate(a, tree), self.evaluate(b, tree)) {
                    (EvalResult::False, _) | (_, EvalResult::True) => EvalResult::True,
                    (EvalResult::True, other) => other,
                    _ => EvalResult::Unknown,
                }
            }
            Formula::Iff(a, b) => match (self.evaluate(a, tree), self.evaluate(b, tree)) {
                (EvalResult::Unknown, _) | (_, EvalResult::Unknown) => EvalResult::Unknown,
                (a, b) if a == b => EvalResult::True,
                _ => EvalResult::False,
            },
            Formula::Xor(a, b) => match (self.evaluate(a, tree), self.evaluate(b, tree)) {
                (EvalResult::Unknown, _) | (_, EvalResult::Unknown) => EvalResult::Unknown,
                (a, b) if a == b => EvalResult::False,
                _ => EvalResult::True,
            },
            Formula::Forall(q) => self.evaluate_tree_quantifier(q, tree, true),
            Formula::Exists(q) => self.evaluate_tree_quantifier(q, tree, false),
            Formula::ForallInt(q) => self.evaluate_int_quantifier(q, tree, true),
            Formula::ExistsInt(q) => self.evaluate_int_quantifier(q, tree, false),
            Formula::Predicate(atom) => self.evaluate_predicate(atom, tree),
            Formula::Smt(atom) => self.evaluate_smt(atom, tree),
        }
    }

    /// Substitute the formula's unique constant by the tree's root node,
    /// then evaluate.
    pub fn evaluate_with_constant(&self, formula: &Formula, tree: &DerivationTree) -> EvalResult {
        let mut formula = formula.clone();
        for constant in formula.constants() {
            formula = formula.substitute(&constant, &Term::Node(tree.id()));
        }
        self.evaluate(&formula, tree)
    }

    fn evaluate_tree_quantifier(
        &self,
        quantifier: &TreeQuantifier,
        tree: &DerivationTree,
        universal: bool,
    ) -> EvalResult {
        let scope = match self.resolve_scope(&quantifier.in_term, tree) {
            Some(scope) => scope,
            None => return EvalResult::Unknown,
        };

        let mut undecided = domain_unsettled(self.graph, &scope, quantifier.var.ty());
        for instance in quantifier_matches(quantifier, &scope) {
            let mut body = quantifier
                .body
                .substitute(&quantifier.var, &Term::Node(instance.subtree.id()));
            for (var, node) in &instance.bindings {
                body = body.substitute(var, &Term::Node(*node));
            }
            match (self.evaluate(&body, tree), universal) {
                (EvalResult::False, true) => return EvalResult::False,
                (EvalResult::True, false) => return EvalResult::True,
                (EvalResult::Unknown, _) => undecided = true,
                _ => {}
            }
        }

        if undecided {
            EvalResult::Unknown
        } else if universal {
            EvalResult::True
        } else {
            EvalResult::False
        }
    }

    /// Integers are unbounded, so only counterexamples and witnesses from
    /// a finite candidate set decide the quantifier; everything else is
    /// `Unknown`. The solver core eliminates int quantifiers before
    /// emitting solutions, so this conservatism only shows on raw input
    /// formulas.
    fn evaluate_int_quantifier(
        &self,
        quantifier: &IntQuantifier,
        tree: &DerivationTree,
        universal: bool,
    ) -> EvalResult {
        let mut candidates = quantifier.body.int_literals();
        candidates.insert(0);
        candidates.insert(1);

        for value in candidates {
            let body = quantifier
                .body
                .substitute(&quantifier.var, &Term::Int(value));
            match (self.evaluate(&body, tree), universal) {
                (EvalResult::False, true) => return EvalResult::False,
                (EvalResult::True, false) => return EvalResult::True,
                _ => {}
            }
        }
        EvalResult::Unknown
    }

    fn evaluate_predicate(&self, atom: &PredicateAtom, tree: &DerivationTree) -> EvalResult {
        let predicate = match self.predicates.get(&atom.name) {
            Some(predicate) => predicate,
            None => return EvalResult::Unknown,
        };
        if atom.args.len() != predicate.arity() {
            return EvalResult::Unknown;
        }
        let mut args = Vec::with_capacity(atom.args.len());
        for term in &atom.args {
            match PredicateArg::from_term(term) {
                Some(arg) => args.push(arg),
                None => return EvalResult::Unknown,
            }
        }
        let mut result = predicate.evaluate(tree, &args);
        if atom.negated {
            result = result.negate();
        }
        match result {
            PredicateResult::Satisfied => EvalResult::True,
            PredicateResult::NotSatisfied => EvalResult::False,
            PredicateResult::NeedsMoreInstantiation => EvalResult::Unknown,
        }
    }

    fn evaluate_smt(&self, atom: &SmtAtom, tree: &DerivationTree) -> EvalResult {
        let instance = self.smt_instance(atom, tree);
        match self.smt.solve(&instance, 1) {
            SmtOutcome::Models(_) => EvalResult::True,
            SmtOutcome::Unsat => EvalResult::False,
            SmtOutcome::Unknown => EvalResult::Unknown,
        }
    }

    /// Turn an atom's accumulated bindings into concrete values where the
    /// bound subtrees are closed.
    pub fn smt_instance(&self, atom: &SmtAtom, tree: &DerivationTree) -> SmtAtomInstance {
        let vars = atom
            .vars
            .iter()
            .map(|var| {
                let value = match atom.bindings.get(var) {
                    Some(Term::Node(id)) => tree
                        .find_node(*id)
                        .and_then(|path| tree.subtree(&path).cloned())
                        .filter(|subtree| subtree.num_open() == 0)
                        .map(|subtree| subtree.to_string()),
                    Some(Term::Str(s)) => Some(s.clone()),
                    Some(Term::Int(i)) => Some(i.to_string()),
                    Some(Term::Var(_)) | None => None,
                };
                SmtVar {
                    var: var.clone(),
                    value,
                    domain: Vec::new(),
                }
            })
            .collect();
        SmtAtomInstance {
            constraint: atom.constraint.clone(),
            negated: atom.negated,
            vars,
        }
    }

    fn resolve_scope(&self, in_term: &Term, tree: &DerivationTree) -> Option<DerivationTree> {
        match in_term {
            Term::Node(id) => {
                let path = tree.find_node(*id)?;
                tree.subtree(&path).cloned()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gramsat_formula::dt;
    use gramsat_grammar::Grammar;

    use crate::predicate::PredicateRegistry;
    use crate::smt::StrEqSolver;
    use crate::test::{lang_grammar, lang_tree_two_stmts};

    fn with_evaluator<R>(grammar: &Grammar, run: impl FnOnce(&Evaluator) -> R) -> R {
        let graph = GrammarGraph::from_grammar(grammar);
        let predicates = PredicateRegistry::standard();
        let smt = StrEqSolver::new();
        run(&Evaluator::new(&graph, &predicates, &smt))
    }

    fn assgn_var_formula(constraint: &str) -> Formula {
        // forall <assgn> a in <start>: smt over the assigned variable name
        let start = Variable::constant("start", "<start>");
        let var = Variable::bound("a", "<var>");
        Formula::forall(
            Variable::bound("assgn", "<assgn>"),
            Term::Var(start),
            Formula::exists(
                var.clone(),
                Term::Var(Variable::bound("assgn", "<assgn>")),
                Formula::smt(constraint, vec![var]),
            ),
        )
    }

    #[test]
    fn closed_tree_decides_quantifiers() {
        let grammar = lang_grammar();
        let tree = lang_tree_two_stmts();

        with_evaluator(&grammar, |evaluator| {
            // every <assgn> contains some <var> equal to "x" -- false since
            // the second statement assigns to y from z.
            let all_x = assgn_var_formula("(= a \"x\")").normalize();
            assert_eq!(
                evaluator.evaluate_with_constant(&all_x, &tree),
                EvalResult::False
            );

            // every <assgn> contains some <var> different from "q".
            let no_q = assgn_var_formula("(distinct a \"q\")").normalize();
            assert_eq!(
                evaluator.evaluate_with_constant(&no_q, &tree),
                EvalResult::True
            );
        });
    }

    #[test]
    fn open_tree_is_unknown() {
        let grammar = lang_grammar();
        let tree = dt!("<start>" => [dt!("<stmt>")]);

        with_evaluator(&grammar, |evaluator| {
            let formula = assgn_var_formula("(= a \"x\")").normalize();
            assert_eq!(
                evaluator.evaluate_with_constant(&formula, &tree),
                EvalResult::Unknown
            );
        });
    }

    #[test]
    fn vacuous_forall_is_true_when_settled() {
        let grammar = lang_grammar();
        // Closed tree with no <digit> nodes.
        let tree = dt!("<rhs>" => [dt!("<var>" => [dt!("x")])]);

        with_evaluator(&grammar, |evaluator| {
            let digit = Variable::bound("d", "<digit>");
            let formula = Formula::forall(
                digit.clone(),
                Term::Node(tree.id()),
                Formula::smt("(= d \"0\")", vec![digit]),
            )
            .normalize();
            assert_eq!(evaluator.evaluate(&formula, &tree), EvalResult::True);
        });
    }

    #[test]
    fn before_predicate_in_formula() {
        let grammar = lang_grammar();
        let tree = lang_tree_two_stmts();
        let first = tree.subtree(&[0, 0]).unwrap().id();
        let second = tree.subtree(&[0, 2, 0]).unwrap().id();

        with_evaluator(&grammar, |evaluator| {
            let formula = Formula::predicate(
                "before",
                vec![Term::Node(first), Term::Node(second)],
            );
            assert_eq!(evaluator.evaluate(&formula, &tree), EvalResult::True);
            let negated = Formula::not(formula).normalize();
            assert_eq!(evaluator.evaluate(&negated, &tree), EvalResult::False);
        });
    }

    #[test]
    fn quantifier_matches_with_bind() {
        use gramsat_formula::{BindElement, BindExpr};

        let tree = lang_tree_two_stmts();
        let var = Variable::bound("a", "<assgn>");
        let lhs = Variable::bound("lhs", "<var>");
        let rhs = Variable::bound("rhs", "<rhs>");
        let bind = BindExpr::new(vec![
            BindElement::Var(lhs.clone()),
            BindElement::Literal(" := ".to_owned()),
            BindElement::Var(rhs.clone()),
        ]);
        let quantifier = TreeQuantifier {
            var,
            in_term: Term::Node(tree.id()),
            bind: Some(bind),
            body: Formula::True,
        };

        let matches = quantifier_matches(&quantifier, &tree);
        assert_eq!(matches.len(), 2);
        for instance in &matches {
            assert!(instance.bindings.contains_key(&lhs));
            assert!(instance.bindings.contains_key(&rhs));
        }
    }
}
