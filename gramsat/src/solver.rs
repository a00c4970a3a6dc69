//! Best-first solver core.
//!
//! The solver explores a search tree of [`SearchState`]s, each pairing a
//! partial derivation tree with the constraint conjuncts still to satisfy
//! on it. Expanding a state first simplifies its conjuncts by three-valued
//! evaluation, then applies the first applicable transition: disjunction
//! split, quantifier elimination, witness insertion for existentials,
//! constraint-backend instantiation, or a one-step grammar expansion of an
//! open leaf. States compete on a weighted cost blend, so cheap and
//! coverage-improving derivations surface first.

use std::time::{Duration, Instant};

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use gramsat_formula::{
    DerivationTree, Formula, FormulaError, IntQuantifier, NodeId, Path, SmtAtom, Term,
    TreeQuantifier, Variable,
};
use gramsat_grammar::{Grammar, GrammarGraph};

use crate::config::SolverConfig;
use crate::cost::{CostContext, CostFeatures};
use crate::eval::{domain_unsettled, quantifier_matches, EvalResult, Evaluator};
use crate::insert::insert_tree_bounded;
use crate::predicate::PredicateRegistry;
use crate::smt::{SmtAtomInstance, SmtOutcome, SmtSolver, SmtVar, StrEqSolver};
use crate::state::{Frontier, SearchState};

/// Depth slack added on top of a nonterminal's minimal expansion height
/// when enumerating candidate values for the constraint backend.
const DOMAIN_DEPTH_SLACK: usize = 2;
/// Cap on enumerated candidate values per variable.
const DOMAIN_LIMIT: usize = 32;

/// Why a run stopped.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RunStatus {
    /// The requested number of solutions was produced.
    Satisfied,
    /// The search space was exhausted first; the constraint admits no
    /// further solutions under the configured bounds.
    Exhausted,
    /// The wall-clock budget ran out first.
    Timeout,
}

/// Outcome of one [`Solver::solve`] call.
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// Closed, grammar-conformant trees satisfying the constraint, in
    /// generation order.
    pub trees: Vec<DerivationTree>,
    pub status: RunStatus,
}

enum Step {
    /// The state cannot lead to a solution.
    Dead,
    /// All conjuncts discharged on a closed tree.
    Solution(DerivationTree),
    /// All conjuncts discharged; the tree still has open leaves to close.
    NeedsClose(SearchState),
    Branches(Vec<SearchState>),
}

/// A constraint solver session over one grammar and formula.
///
/// Successive [`solve`](Solver::solve) calls continue the same best-first
/// search, so a second call yields further, different solutions.
pub struct Solver {
    grammar: Grammar,
    graph: GrammarGraph,
    config: SolverConfig,
    predicates: PredicateRegistry,
    smt: Box<dyn SmtSolver>,
    min_steps: FxHashMap<String, usize>,
    cost_ctx: CostContext,
    frontier: Frontier,
    global_coverage: FxHashSet<Vec<String>>,
    rng: StdRng,
}

impl Solver {
    /// Create a solver with the built-in predicates and constraint backend.
    ///
    /// Fails when the formula does not validate against the grammar or does
    /// not reference exactly one constant.
    pub fn new(
        grammar: Grammar,
        formula: &Formula,
        config: SolverConfig,
    ) -> Result<Solver, FormulaError> {
        Solver::with_backends(
            grammar,
            formula,
            config,
            PredicateRegistry::standard(),
            Box::new(StrEqSolver::new()),
        )
    }

    /// Create a solver with custom predicates and constraint backend.
    pub fn with_backends(
        grammar: Grammar,
        formula: &Formula,
        config: SolverConfig,
        predicates: PredicateRegistry,
        smt: Box<dyn SmtSolver>,
    ) -> Result<Solver, FormulaError> {
        formula.validate(&grammar, &predicates.arities())?;
        let constants = formula.constants();
        if constants.len() != 1 {
            return Err(FormulaError::ConstantCount {
                count: constants.len(),
            });
        }
        let constant = constants.into_iter().next().unwrap();

        let graph = GrammarGraph::from_grammar(&grammar);
        let min_steps = grammar.min_expansion_steps();
        let cost_ctx = CostContext::new(&graph, &config.cost);
        let rng = StdRng::seed_from_u64(config.seed);

        let root = DerivationTree::open(constant.ty());
        let constraints = formula
            .substitute(&constant, &Term::Node(root.id()))
            .normalize()
            .conjuncts();
        debug!(
            "solver start: constant '{}' of {}, {} top-level conjuncts",
            constant,
            constant.ty(),
            constraints.len()
        );

        let mut solver = Solver {
            grammar,
            graph,
            config,
            predicates,
            smt,
            min_steps,
            cost_ctx,
            frontier: Frontier::new(),
            global_coverage: FxHashSet::default(),
            rng,
        };
        let initial = SearchState::new(root, constraints);
        let cost = solver.state_cost(&initial);
        solver.frontier.push(initial, cost);
        Ok(solver)
    }

    /// Produce up to `max_solutions` further solutions.
    pub fn solve(&mut self, max_solutions: usize) -> SolveResult {
        let deadline = self
            .config
            .timeout_seconds
            .map(|seconds| Instant::now() + Duration::from_secs_f64(seconds));
        let mut trees = Vec::new();

        while trees.len() < max_solutions {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    debug!("timeout after {} solutions", trees.len());
                    return SolveResult {
                        trees,
                        status: RunStatus::Timeout,
                    };
                }
            }
            let state = match self.frontier.pop() {
                Some(state) => state,
                None => {
                    debug!("search space exhausted after {} solutions", trees.len());
                    return SolveResult {
                        trees,
                        status: RunStatus::Exhausted,
                    };
                }
            };
            trace!(
                "pop: '{}', {} conjuncts, {} open",
                state.tree,
                state.constraints.len(),
                state.tree.num_open()
            );

            match self.expand(&state) {
                Step::Dead => {}
                Step::Solution(tree) => self.emit(tree, &mut trees),
                Step::NeedsClose(state) => {
                    if let Some(closed) = close_tree(
                        &self.grammar,
                        &self.min_steps,
                        self.config.max_close_depth,
                        &state.tree,
                        &mut self.rng,
                    ) {
                        self.emit(closed, &mut trees);
                    }
                }
                Step::Branches(successors) => {
                    for successor in successors {
                        let cost = self.state_cost(&successor);
                        self.frontier.push(successor, cost);
                    }
                    trace!("frontier: {} states", self.frontier.len());
                }
            }
        }

        SolveResult {
            trees,
            status: RunStatus::Satisfied,
        }
    }

    fn emit(&mut self, tree: DerivationTree, trees: &mut Vec<DerivationTree>) {
        info!("solution: {}", tree);
        self.global_coverage
            .extend(tree.k_paths(self.cost_ctx.k));
        trees.push(tree);
    }

    fn state_cost(&self, state: &SearchState) -> f64 {
        CostFeatures::measure(
            &state.tree,
            state.constraints.len(),
            state.vacuous,
            &self.cost_ctx.all_k_paths,
            &self.global_coverage,
            self.cost_ctx.k,
        )
        .cost(&self.config.cost)
    }

    fn expand(&self, state: &SearchState) -> Step {
        let evaluator = Evaluator::new(&self.graph, &self.predicates, &*self.smt);

        // Drop conjuncts that already hold; their verdicts are stable under
        // further growth, since quantifiers are only decided on settled
        // domains. Top-level foralls stay: they go through
        // `eliminate_forall`, which accounts vacuous eliminations.
        let mut constraints = Vec::with_capacity(state.constraints.len());
        for conjunct in &state.constraints {
            if matches!(conjunct, Formula::Forall(_)) {
                constraints.push(conjunct.clone());
                continue;
            }
            match evaluator.evaluate(conjunct, &state.tree) {
                EvalResult::True => {}
                EvalResult::False => return Step::Dead,
                EvalResult::Unknown => constraints.push(conjunct.clone()),
            }
        }

        if constraints.is_empty() {
            if state.tree.num_open() == 0 {
                return Step::Solution(state.tree.clone());
            }
            return Step::NeedsClose(SearchState {
                tree: state.tree.clone(),
                constraints,
                vacuous: state.vacuous,
                universals: state.universals.clone(),
            });
        }

        let state = SearchState {
            tree: state.tree.clone(),
            constraints,
            vacuous: state.vacuous,
            universals: state.universals.clone(),
        };

        for (index, conjunct) in state.constraints.iter().enumerate() {
            match conjunct {
                Formula::Or(parts) => {
                    let successors = parts
                        .iter()
                        .map(|part| {
                            state.with_replaced(index, part.conjuncts(), state.tree.clone())
                        })
                        .collect();
                    return Step::Branches(successors);
                }
                Formula::Forall(quantifier) => {
                    if let Some(step) = self.eliminate_forall(&state, index, quantifier) {
                        return step;
                    }
                }
                Formula::Exists(quantifier) => {
                    if let Some(step) = self.expand_exists(&state, index, quantifier) {
                        return step;
                    }
                }
                Formula::ForallInt(quantifier) => {
                    return self.eliminate_forall_int(&state, index, quantifier);
                }
                Formula::ExistsInt(quantifier) => {
                    return self.expand_exists_int(&state, index, quantifier);
                }
                Formula::Smt(atom) => {
                    if let Some(step) = self.instantiate_smt(&evaluator, &state, index, atom) {
                        return step;
                    }
                }
                // Predicate atoms and anything else undecided wait for the
                // generic expansion below to grow the tree.
                _ => {}
            }
        }

        self.expand_leaf(&state)
    }

    fn scope_of(&self, in_term: &Term, tree: &DerivationTree) -> Option<(Path, DerivationTree)> {
        match in_term {
            Term::Node(id) => {
                let path = tree.find_node(*id)?;
                let scope = tree.subtree(&path)?.clone();
                Some((path, scope))
            }
            _ => None,
        }
    }

    /// Universal quantifiers are eliminated only once their domain is
    /// settled: no open leaf in scope can still derive the quantified
    /// nonterminal, so the current matches are all there will ever be.
    fn eliminate_forall(
        &self,
        state: &SearchState,
        index: usize,
        quantifier: &TreeQuantifier,
    ) -> Option<Step> {
        let (_, scope) = match self.scope_of(&quantifier.in_term, &state.tree) {
            Some(scope) => scope,
            None => return Some(Step::Dead),
        };
        if domain_unsettled(&self.graph, &scope, quantifier.var.ty()) {
            return None;
        }

        let matches = quantifier_matches(quantifier, &scope);
        let mut successor = if matches.is_empty() {
            trace!("forall over {} eliminated vacuously", quantifier.var.ty());
            let mut successor = state.with_replaced(index, Vec::new(), state.tree.clone());
            successor.vacuous += 1;
            successor
        } else {
            let mut replacement = Vec::new();
            for instance in &matches {
                replacement.extend(
                    instantiate_body(quantifier, instance.subtree.id(), &instance.bindings)
                        .conjuncts(),
                );
            }
            state.with_replaced(index, replacement, state.tree.clone())
        };
        // A later insertion into the scope can grow the domain past the
        // matches instantiated here, so the quantifier is kept for
        // re-application.
        let eliminated = state.constraints[index].clone();
        if !successor.universals.contains(&eliminated) {
            successor.universals.push(eliminated);
        }
        Some(Step::Branches(vec![successor]))
    }

    /// Existential quantifiers branch over existing matches first, then
    /// over tree insertions of a fresh witness.
    fn expand_exists(
        &self,
        state: &SearchState,
        index: usize,
        quantifier: &TreeQuantifier,
    ) -> Option<Step> {
        let (scope_path, scope) = match self.scope_of(&quantifier.in_term, &state.tree) {
            Some(scope) => scope,
            None => return Some(Step::Dead),
        };
        let limit = self.config.max_number_free_instantiations;
        let mut successors = Vec::new();

        for instance in quantifier_matches(quantifier, &scope) {
            if successors.len() >= limit {
                break;
            }
            let body = instantiate_body(quantifier, instance.subtree.id(), &instance.bindings);
            successors.push(state.with_replaced(index, body.conjuncts(), state.tree.clone()));
        }

        // Fresh-witness branches via tree insertion.
        let (fragment, var_paths) = match &quantifier.bind {
            Some(bind) => match bind.to_tree_prefix(quantifier.var.ty(), &self.grammar) {
                Some(prefix) => prefix,
                None => return Some(Step::Dead),
            },
            None => (
                DerivationTree::open(quantifier.var.ty()),
                FxHashMap::default(),
            ),
        };
        let mut bindings = FxHashMap::default();
        for (var, path) in &var_paths {
            if let Some(subtree) = fragment.subtree(path) {
                bindings.insert(var.clone(), subtree.id());
            }
        }

        let insertions = insert_tree_bounded(
            &self.grammar,
            &self.graph,
            &fragment,
            &scope,
            Some(limit.saturating_sub(successors.len())),
            self.config.max_insert_growth_depth,
            self.config.max_wrap_paths,
        );
        for inserted_scope in insertions {
            let tree = match state.tree.replace(&scope_path, inserted_scope) {
                Some(tree) => tree,
                None => continue,
            };
            let body = instantiate_body(quantifier, fragment.id(), &bindings);
            let mut successor = state.with_replaced(index, body.conjuncts(), tree);
            // Insertion bypasses the settled-domain argument that justified
            // the eliminations recorded on this branch, so the eliminated
            // universals are re-applied; already satisfied instances
            // evaluate to true and drop out again.
            for universal in &state.universals {
                if !successor.constraints.contains(universal) {
                    successor.constraints.push(universal.clone());
                }
            }
            successors.push(successor);
        }

        if successors.is_empty() {
            if domain_unsettled(&self.graph, &scope, quantifier.var.ty()) {
                // Tree growth can still produce a witness position.
                return None;
            }
            return Some(Step::Dead);
        }
        trace!(
            "exists over {}: {} branches",
            quantifier.var.ty(),
            successors.len()
        );
        Some(Step::Branches(successors))
    }

    /// Universal integer quantifiers range over the integers actually
    /// mentioned by the state's constraints; with none mentioned the
    /// quantifier is vacuous.
    fn eliminate_forall_int(
        &self,
        state: &SearchState,
        index: usize,
        quantifier: &IntQuantifier,
    ) -> Step {
        let mut values = FxHashSet::default();
        for conjunct in &state.constraints {
            values.extend(conjunct.int_literals());
        }

        let vacuous = values.is_empty();
        let mut successor = if vacuous {
            state.with_replaced(index, Vec::new(), state.tree.clone())
        } else {
            let mut sorted: Vec<i64> = values.into_iter().collect();
            sorted.sort_unstable();
            let mut replacement = Vec::new();
            for value in sorted {
                replacement.extend(
                    quantifier
                        .body
                        .substitute(&quantifier.var, &Term::Int(value))
                        .conjuncts(),
                );
            }
            state.with_replaced(index, replacement, state.tree.clone())
        };
        if vacuous {
            successor.vacuous += 1;
        }
        Step::Branches(vec![successor])
    }

    /// Existential integer quantifiers branch over the mentioned integer
    /// literals followed by small naturals, bounded by the free
    /// instantiation limit.
    fn expand_exists_int(
        &self,
        state: &SearchState,
        index: usize,
        quantifier: &IntQuantifier,
    ) -> Step {
        let limit = self.config.max_number_free_instantiations.max(1);
        let mut values: Vec<i64> = {
            let mut mentioned: Vec<i64> = quantifier.body.int_literals().into_iter().collect();
            mentioned.sort_unstable();
            mentioned
        };
        let mut next = 0;
        while values.len() < limit {
            if !values.contains(&next) {
                values.push(next);
            }
            next += 1;
        }
        values.truncate(limit);

        let successors = values
            .into_iter()
            .map(|value| {
                let body = quantifier.body.substitute(&quantifier.var, &Term::Int(value));
                state.with_replaced(index, body.conjuncts(), state.tree.clone())
            })
            .collect();
        Step::Branches(successors)
    }

    /// Instantiate an atom whose free variables are bound to open leaves by
    /// asking the backend for models over enumerated candidate values.
    ///
    /// `None` defers the atom: some variable is bound to a partially
    /// expanded subtree, so the generic expansion has to make progress
    /// first.
    fn instantiate_smt(
        &self,
        evaluator: &Evaluator,
        state: &SearchState,
        index: usize,
        atom: &SmtAtom,
    ) -> Option<Step> {
        let mut open_vars: Vec<(Variable, Path, FxHashMap<String, DerivationTree>)> = Vec::new();
        for var in &atom.vars {
            let id = match atom.bindings.get(var) {
                Some(Term::Node(id)) => *id,
                Some(_) => continue, // literal binding, already fixed
                None => return None, // not yet in scope
            };
            let path = state.tree.find_node(id)?;
            let subtree = state.tree.subtree(&path)?;
            if subtree.num_open() == 0 {
                continue;
            }
            if subtree.children().is_some() {
                // Partially expanded; wait for the generic expansion.
                return None;
            }
            let candidates = self.enumerate_trees(subtree.symbol());
            if candidates.is_empty() {
                return None;
            }
            open_vars.push((var.clone(), path, candidates));
        }
        if open_vars.is_empty() {
            // Fully fixed atoms are handled by evaluation; reaching this
            // point means the backend answered Unknown. Keep deferring.
            return None;
        }

        let mut instance: SmtAtomInstance = evaluator.smt_instance(atom, &state.tree);
        for (var, _, candidates) in &open_vars {
            let smt_var = instance
                .vars
                .iter_mut()
                .find(|smt_var| smt_var.var == *var)?;
            let mut domain: Vec<String> = candidates.keys().cloned().collect();
            domain.sort();
            *smt_var = SmtVar {
                var: var.clone(),
                value: None,
                domain,
            };
        }

        let models = match self
            .smt
            .solve(&instance, self.config.max_number_smt_instantiations)
        {
            SmtOutcome::Models(models) => models,
            SmtOutcome::Unsat => return Some(Step::Dead),
            SmtOutcome::Unknown => return None,
        };

        let mut successors = Vec::new();
        for model in models {
            let mut tree = state.tree.clone();
            let mut applied = true;
            for (var, path, candidates) in &open_vars {
                let value = match model.get(var) {
                    Some(value) => value,
                    None => {
                        applied = false;
                        break;
                    }
                };
                let replacement = match candidates.get(value) {
                    Some(replacement) => replacement.clone(),
                    None => {
                        applied = false;
                        break;
                    }
                };
                // The leaf keeps its identity so other anchors to it stay
                // valid.
                let grafted = match tree.subtree(path) {
                    Some(leaf) => {
                        leaf.expand(replacement.children().map(|c| c.to_vec()).unwrap_or_default())
                    }
                    None => {
                        applied = false;
                        break;
                    }
                };
                tree = match tree.replace(path, grafted) {
                    Some(tree) => tree,
                    None => {
                        applied = false;
                        break;
                    }
                };
            }
            if applied {
                successors.push(state.with_replaced(index, Vec::new(), tree));
            }
        }
        trace!(
            "smt '{}': {} instantiations",
            atom.constraint,
            successors.len()
        );
        Some(Step::Branches(successors))
    }

    /// Bounded enumeration of closed derivations of `nonterminal`, keyed by
    /// their yield.
    fn enumerate_trees(&self, nonterminal: &str) -> FxHashMap<String, DerivationTree> {
        let depth = match self.min_steps.get(nonterminal) {
            Some(&steps) => steps + DOMAIN_DEPTH_SLACK,
            None => return FxHashMap::default(),
        };
        let mut result = FxHashMap::default();
        for tree in self.enumerate_inner(nonterminal, depth) {
            if result.len() >= DOMAIN_LIMIT {
                break;
            }
            result.entry(tree.to_string()).or_insert(tree);
        }
        result
    }

    fn enumerate_inner(&self, symbol: &str, depth: usize) -> Vec<DerivationTree> {
        let mut results = Vec::new();
        if depth == 0 {
            return results;
        }
        for alternative in self.grammar.alternatives(symbol).unwrap_or(&[]) {
            // Per-child candidate lists, combined by cartesian product.
            let mut per_child: Vec<Vec<DerivationTree>> = Vec::with_capacity(alternative.len());
            let mut feasible = true;
            for child_sym in alternative {
                if gramsat_grammar::is_nonterminal(child_sym) {
                    let candidates = self.enumerate_inner(child_sym, depth - 1);
                    if candidates.is_empty() {
                        feasible = false;
                        break;
                    }
                    per_child.push(candidates);
                } else {
                    per_child.push(vec![DerivationTree::leaf(child_sym)]);
                }
            }
            if !feasible {
                continue;
            }
            let mut combos: Vec<Vec<DerivationTree>> = vec![Vec::new()];
            for candidates in &per_child {
                let mut extended = Vec::new();
                for combo in &combos {
                    for candidate in candidates {
                        if extended.len() >= DOMAIN_LIMIT {
                            break;
                        }
                        let mut next = combo.clone();
                        next.push(candidate.clone());
                        extended.push(next);
                    }
                }
                combos = extended;
            }
            for children in combos {
                if results.len() >= DOMAIN_LIMIT {
                    return results;
                }
                results.push(DerivationTree::node(symbol, children));
            }
        }
        results
    }

    /// One-step grammar expansion of an open leaf, one branch per
    /// alternative. Leaves referenced by the remaining constraints are
    /// expanded last, since the constraint-specific transitions handle
    /// them more precisely.
    fn expand_leaf(&self, state: &SearchState) -> Step {
        let mut referenced = FxHashSet::default();
        for conjunct in &state.constraints {
            referenced.extend(conjunct.referenced_nodes());
        }

        let open = state.tree.open_leaves();
        let chosen = open
            .iter()
            .find(|(path, _)| {
                state
                    .tree
                    .subtree(path)
                    .map_or(false, |subtree| !referenced.contains(&subtree.id()))
            })
            .or_else(|| open.first());
        let (path, symbol) = match chosen {
            Some(leaf) => leaf,
            None => return Step::Dead, // closed but undecided: no way forward
        };
        let leaf = match state.tree.subtree(path) {
            Some(leaf) => leaf.clone(),
            None => return Step::Dead,
        };

        let alternatives = match self.grammar.alternatives(symbol) {
            Some(alternatives) => alternatives,
            None => return Step::Dead,
        };
        let successors = alternatives
            .iter()
            .filter_map(|alternative| {
                let children = alternative
                    .iter()
                    .map(|sym| DerivationTree::auto(sym))
                    .collect();
                // Expanding in place keeps the leaf's identity, so anchors
                // to it survive.
                let tree = state.tree.replace(path, leaf.expand(children))?;
                Some(SearchState {
                    tree,
                    constraints: state.constraints.clone(),
                    vacuous: state.vacuous,
                    universals: state.universals.clone(),
                })
            })
            .collect();
        Step::Branches(successors)
    }
}

fn instantiate_body(
    quantifier: &TreeQuantifier,
    node: NodeId,
    bindings: &FxHashMap<Variable, NodeId>,
) -> Formula {
    let mut body = quantifier
        .body
        .substitute(&quantifier.var, &Term::Node(node));
    for (var, id) in bindings {
        body = body.substitute(var, &Term::Node(*id));
    }
    body
}

/// Close every open leaf of `tree` with grammar expansions.
///
/// Below the depth budget the alternative is chosen randomly; at or beyond
/// it the minimal-height alternative is forced, which guarantees
/// termination on productive grammars. `None` when some open nonterminal
/// is unproductive.
fn close_tree(
    grammar: &Grammar,
    min_steps: &FxHashMap<String, usize>,
    max_close_depth: usize,
    tree: &DerivationTree,
    rng: &mut StdRng,
) -> Option<DerivationTree> {
    let mut tree = tree.clone();
    while let Some((path, symbol)) = tree.open_leaves().into_iter().next() {
        let alternatives = grammar.alternatives(&symbol)?;
        let index = if path.len() >= max_close_depth {
            grammar.cheapest_alternative(&symbol, min_steps)?
        } else {
            rng.gen_range(0, alternatives.len())
        };
        let children = alternatives[index]
            .iter()
            .map(|sym| DerivationTree::auto(sym))
            .collect();
        let expanded = match tree.subtree(&path) {
            Some(leaf) => leaf.expand(children),
            None => return None,
        };
        tree = tree.replace(&path, expanded)?;
    }
    Some(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    use gramsat_formula::dt;

    use crate::test::lang_grammar;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    fn smt_formula(constraint: &str, ty: &str) -> Formula {
        let constant = Variable::constant("start", "<start>");
        let var = Variable::bound("v", ty);
        Formula::forall(
            var.clone(),
            Term::Var(constant),
            Formula::smt(constraint, vec![var]),
        )
    }

    #[test]
    fn rejects_missing_constant() {
        let grammar = lang_grammar();
        match Solver::new(grammar, &Formula::True, config()) {
            Ok(_) => panic!("expected a constant count error"),
            Err(FormulaError::ConstantCount { count }) => assert_eq!(count, 0),
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unconstrained_solving_closes_trees() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let formula = Formula::forall(
            Variable::bound("a", "<assgn>"),
            Term::Var(constant),
            Formula::True,
        );
        let mut solver = Solver::new(grammar.clone(), &formula, config()).unwrap();

        let result = solver.solve(3);
        assert_eq!(result.status, RunStatus::Satisfied);
        assert_eq!(result.trees.len(), 3);
        for tree in &result.trees {
            assert_eq!(tree.num_open(), 0);
            assert!(tree.conforms_to(&grammar));
        }
    }

    #[test]
    fn smt_constraint_restricts_all_vars() {
        let grammar = lang_grammar();
        let formula = smt_formula("(= v \"x\")", "<var>");
        let mut solver = Solver::new(grammar.clone(), &formula, config()).unwrap();

        let result = solver.solve(5);
        assert!(!result.trees.is_empty());
        for tree in &result.trees {
            assert!(tree.conforms_to(&grammar));
            for (_, node) in tree.walk() {
                if node.symbol() == "<var>" {
                    assert_eq!(node.to_string(), "x", "in {}", tree);
                }
            }
        }
    }

    #[test]
    fn zero_timeout_reports_timeout() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let formula = Formula::forall(
            Variable::bound("a", "<assgn>"),
            Term::Var(constant),
            Formula::True,
        );
        let mut cfg = config();
        cfg.timeout_seconds = Some(0.0);
        let mut solver = Solver::new(grammar, &formula, cfg).unwrap();

        let result = solver.solve(1);
        assert_eq!(result.status, RunStatus::Timeout);
        assert!(result.trees.is_empty());
    }

    #[test]
    fn vacuous_universal_is_penalized() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let digit = Variable::bound("d", "<digit>");
        let formula = Formula::forall(
            digit.clone(),
            Term::Var(constant),
            Formula::smt("(= d \"1\")", vec![digit]),
        );
        let mut solver = Solver::new(grammar, &formula, config()).unwrap();
        let initial = solver.frontier.pop().unwrap();

        // x := y, no digit anywhere: the universal never applied.
        let tree = initial.tree.expand(vec![dt!("<stmt>" => [
            dt!("<assgn>" => [
                dt!("<var>" => [dt!("x")]),
                dt!(" := "),
                dt!("<rhs>" => [dt!("<var>" => [dt!("y")])]),
            ]),
        ])]);
        let state = SearchState {
            tree,
            constraints: initial.constraints.clone(),
            vacuous: 0,
            universals: Vec::new(),
        };

        match solver.expand(&state) {
            Step::Branches(successors) => {
                assert_eq!(successors.len(), 1);
                assert_eq!(successors[0].vacuous, 1);
                assert!(successors[0].constraints.is_empty());
            }
            _ => panic!("expected a vacuous elimination branch"),
        }
    }

    #[test]
    fn insertion_reapplies_eliminated_universals() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let formula = Formula::exists(
            Variable::bound("a", "<assgn>"),
            Term::Var(constant),
            Formula::True,
        );
        let mut solver = Solver::new(grammar, &formula, config()).unwrap();
        let mut state = solver.frontier.pop().unwrap();

        let digit = Variable::bound("d", "<digit>");
        let universal = Formula::forall(
            digit.clone(),
            Term::Node(state.tree.id()),
            Formula::smt("(= d \"1\")", vec![digit]),
        );
        state.universals.push(universal.clone());

        match solver.expand(&state) {
            Step::Branches(successors) => {
                assert!(!successors.is_empty());
                for successor in &successors {
                    assert!(successor.constraints.contains(&universal));
                }
            }
            _ => panic!("expected insertion branches"),
        }
    }

    #[test]
    fn close_tree_respects_depth_budget() {
        let grammar = lang_grammar();
        let min_steps = grammar.min_expansion_steps();
        let mut rng = StdRng::seed_from_u64(7);

        let tree = dt!("<start>" => [dt!("<stmt>")]);
        let closed = close_tree(&grammar, &min_steps, 6, &tree, &mut rng).unwrap();
        assert_eq!(closed.num_open(), 0);
        assert!(closed.conforms_to(&grammar));
        assert!(closed.depth() <= 6 + min_steps["<start>"] + 1);
    }

    #[test]
    fn closing_preserves_node_identities() {
        let grammar = lang_grammar();
        let min_steps = grammar.min_expansion_steps();
        let mut rng = StdRng::seed_from_u64(3);

        let tree = dt!("<start>" => [dt!("<stmt>")]);
        let root_id = tree.id();
        let stmt_id = tree.subtree(&[0]).unwrap().id();

        let closed = close_tree(&grammar, &min_steps, 8, &tree, &mut rng).unwrap();
        assert_eq!(closed.num_open(), 0);
        assert_eq!(closed.id(), root_id);
        assert_eq!(closed.find_node(stmt_id), Some(vec![0]));
    }

    #[test]
    fn seeded_closing_is_deterministic() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let formula = Formula::forall(
            Variable::bound("a", "<assgn>"),
            Term::Var(constant),
            Formula::True,
        );

        let mut first = Solver::new(grammar.clone(), &formula, config()).unwrap();
        let mut second = Solver::new(grammar, &formula, config()).unwrap();
        let a: Vec<String> = first.solve(4).trees.iter().map(|t| t.to_string()).collect();
        let b: Vec<String> = second.solve(4).trees.iter().map(|t| t.to_string()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn enumerate_trees_covers_terminals() {
        let grammar = lang_grammar();
        let constant = Variable::constant("start", "<start>");
        let formula = Formula::forall(
            Variable::bound("a", "<assgn>"),
            Term::Var(constant),
            Formula::True,
        );
        let solver = Solver::new(grammar, &formula, config()).unwrap();

        let vars = solver.enumerate_trees("<var>");
        let mut yields: Vec<&String> = vars.keys().collect();
        yields.sort();
        assert_eq!(yields, ["x", "y", "z"]);
    }
}
