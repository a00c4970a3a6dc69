//! End-to-end solver tests.

use proptest::prelude::*;

use gramsat::eval::{EvalResult, Evaluator};
use gramsat::predicate::PredicateRegistry;
use gramsat::smt::StrEqSolver;
use gramsat::{
    BindElement, BindExpr, Formula, Grammar, GrammarGraph, RunStatus, Solver, SolverConfig, Term,
    Variable,
};
use gramsat_grammar::grammar;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lang_grammar() -> Grammar {
    grammar![
        "<start>" => [["<stmt>"]];
        "<stmt>" => [["<assgn>", " ; ", "<stmt>"], ["<assgn>"]];
        "<assgn>" => [["<var>", " := ", "<rhs>"]];
        "<rhs>" => [["<var>"], ["<digit>"]];
        "<var>" => [["x"], ["y"], ["z"]];
        "<digit>" => [["0"], ["1"], ["2"]];
    ]
}

fn start_constant() -> Variable {
    Variable::constant("start", "<start>")
}

fn assgn_bind(lhs: &Variable, rhs: &Variable) -> BindExpr {
    BindExpr::new(vec![
        BindElement::Var(lhs.clone()),
        BindElement::Literal(" := ".to_owned()),
        BindElement::Var(rhs.clone()),
    ])
}

#[test]
fn existential_witness_is_inserted() {
    init_logging();
    let grammar = lang_grammar();
    let lhs = Variable::bound("l", "<var>");
    let rhs = Variable::bound("r", "<rhs>");
    let formula = Formula::exists_bind(
        Variable::bound("a", "<assgn>"),
        assgn_bind(&lhs, &rhs),
        Term::Var(start_constant()),
        Formula::smt("(= l \"x\")", vec![lhs]),
    );

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(3);
    assert_eq!(result.status, RunStatus::Satisfied);
    assert_eq!(result.trees.len(), 3);
    for tree in &result.trees {
        assert_eq!(tree.num_open(), 0);
        assert!(tree.conforms_to(&grammar));
        assert!(tree.to_string().contains("x := "), "{}", tree);
    }
}

#[test]
fn before_predicate_orders_witnesses() {
    init_logging();
    let grammar = lang_grammar();
    let a = Variable::bound("a", "<assgn>");
    let b = Variable::bound("b", "<assgn>");
    let la = Variable::bound("la", "<var>");
    let ra = Variable::bound("ra", "<rhs>");
    let lb = Variable::bound("lb", "<var>");
    let rb = Variable::bound("rb", "<rhs>");

    let body = Formula::and(vec![
        Formula::predicate("before", vec![Term::Var(a.clone()), Term::Var(b.clone())]),
        Formula::smt("(= la \"x\")", vec![la.clone()]),
        Formula::smt("(= lb \"y\")", vec![lb.clone()]),
    ]);
    let formula = Formula::exists_bind(
        a,
        assgn_bind(&la, &ra),
        Term::Var(start_constant()),
        Formula::exists_bind(b, assgn_bind(&lb, &rb), Term::Var(start_constant()), body),
    );

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(2);
    assert!(!result.trees.is_empty());
    for tree in &result.trees {
        let text = tree.to_string();
        let x_pos = text.find("x := ").expect(&text);
        let y_pos = text.find("y := ").expect(&text);
        assert!(x_pos < y_pos, "{}", text);
        assert!(tree.conforms_to(&grammar));
    }
}

#[test]
fn universal_constraint_filters_all_occurrences() {
    init_logging();
    let grammar = lang_grammar();
    let digit = Variable::bound("d", "<digit>");
    let formula = Formula::forall(
        digit.clone(),
        Term::Var(start_constant()),
        Formula::smt("(= d \"1\")", vec![digit]),
    );

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(4);
    assert!(!result.trees.is_empty());
    for tree in &result.trees {
        for (_, node) in tree.walk() {
            if node.symbol() == "<digit>" {
                assert_eq!(node.to_string(), "1", "in {}", tree);
            }
        }
    }
}

#[test]
fn unsatisfiable_body_forbids_matches() {
    init_logging();
    let grammar = lang_grammar();
    // No digit may occur at all.
    let formula = Formula::forall(
        Variable::bound("d", "<digit>"),
        Term::Var(start_constant()),
        Formula::False,
    );

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(3);
    assert!(!result.trees.is_empty());
    for tree in &result.trees {
        assert!(tree.conforms_to(&grammar));
        assert!(
            tree.walk().iter().all(|(_, node)| node.symbol() != "<digit>"),
            "{}",
            tree
        );
    }
}

#[test]
fn solutions_satisfy_the_original_formula() {
    init_logging();
    let grammar = lang_grammar();
    let lhs = Variable::bound("l", "<var>");
    let rhs = Variable::bound("r", "<rhs>");
    let formula = Formula::exists_bind(
        Variable::bound("a", "<assgn>"),
        assgn_bind(&lhs, &rhs),
        Term::Var(start_constant()),
        Formula::smt("(distinct l \"z\")", vec![lhs]),
    );

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(3);
    assert!(!result.trees.is_empty());

    let graph = GrammarGraph::from_grammar(&grammar);
    let predicates = PredicateRegistry::standard();
    let smt = StrEqSolver::new();
    let evaluator = Evaluator::new(&graph, &predicates, &smt);
    for tree in &result.trees {
        assert_eq!(
            evaluator.evaluate_with_constant(&formula.normalize(), tree),
            EvalResult::True,
            "{}",
            tree
        );
    }
}

#[test]
fn further_calls_continue_the_stream() {
    init_logging();
    let grammar = lang_grammar();
    let formula = Formula::forall(
        Variable::bound("a", "<assgn>"),
        Term::Var(start_constant()),
        Formula::True,
    );

    let mut solver = Solver::new(grammar, &formula, SolverConfig::default()).unwrap();
    let first = solver.solve(2);
    let second = solver.solve(2);
    assert_eq!(first.status, RunStatus::Satisfied);
    assert_eq!(second.status, RunStatus::Satisfied);
    assert_eq!(first.trees.len() + second.trees.len(), 4);
}

#[test]
fn timeout_is_reported_with_partial_results() {
    init_logging();
    let grammar = lang_grammar();
    let formula = Formula::forall(
        Variable::bound("a", "<assgn>"),
        Term::Var(start_constant()),
        Formula::True,
    );

    let mut config = SolverConfig::default();
    config.timeout_seconds = Some(0.0);
    let mut solver = Solver::new(grammar, &formula, config).unwrap();
    let result = solver.solve(100);
    assert_eq!(result.status, RunStatus::Timeout);
    assert!(result.trees.is_empty());
}

/// `lhs := rhs` pairs of a yield of the assignment-sequence grammar.
fn parse_assignments(text: &str) -> Vec<(String, String)> {
    text.split(" ; ")
        .map(|stmt| {
            let mut parts = stmt.splitn(2, " := ");
            (
                parts.next().unwrap().to_owned(),
                parts.next().unwrap().to_owned(),
            )
        })
        .collect()
}

/// Every right-hand-side variable has a defining assignment strictly
/// earlier in the sequence.
fn def_use_holds(assignments: &[(String, String)]) -> bool {
    assignments.iter().enumerate().all(|(index, (_, rhs))| {
        !rhs.chars().all(|c| c.is_ascii_alphabetic())
            || assignments[..index].iter().any(|(lhs, _)| lhs == rhs)
    })
}

/// forall assignments b `{lb := rb}`: forall variables u in rb:
/// exists assignment d `{ld := rd}` with before(d, b) and ld == u.
fn def_use_formula() -> Formula {
    let b = Variable::bound("b", "<assgn>");
    let lb = Variable::bound("lb", "<var>");
    let rb = Variable::bound("rb", "<rhs>");
    let d = Variable::bound("d", "<assgn>");
    let ld = Variable::bound("ld", "<var>");
    let rd = Variable::bound("rd", "<rhs>");
    let u = Variable::bound("u", "<var>");

    let witness = Formula::exists_bind(
        d.clone(),
        assgn_bind(&ld, &rd),
        Term::Var(start_constant()),
        Formula::and(vec![
            Formula::predicate("before", vec![Term::Var(d), Term::Var(b.clone())]),
            Formula::predicate("same_text", vec![Term::Var(ld), Term::Var(u.clone())]),
        ]),
    );
    Formula::forall_bind(
        b,
        assgn_bind(&lb, &rb),
        Term::Var(start_constant()),
        Formula::forall(u, Term::Var(rb.clone()), witness),
    )
}

/// exists assignment a `{la := ra}`: exists variable u2 in ra with
/// u2 == "x", forcing at least one use of `x`.
fn forced_use_formula() -> Formula {
    let a = Variable::bound("a", "<assgn>");
    let la = Variable::bound("la", "<var>");
    let ra = Variable::bound("ra", "<rhs>");
    let u2 = Variable::bound("u2", "<var>");
    Formula::exists_bind(
        a,
        assgn_bind(&la, &ra),
        Term::Var(start_constant()),
        Formula::exists(
            u2.clone(),
            Term::Var(ra.clone()),
            Formula::predicate("same_text", vec![Term::Var(u2), Term::Str("x".to_owned())]),
        ),
    )
}

#[test]
fn declaration_is_inserted_before_use() {
    init_logging();
    let grammar = lang_grammar();
    let formula = Formula::and(vec![def_use_formula(), forced_use_formula()]);

    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(2);
    assert!(!result.trees.is_empty());
    for tree in &result.trees {
        assert!(tree.conforms_to(&grammar));
        let assignments = parse_assignments(&tree.to_string());
        assert!(assignments.len() >= 2, "{}", tree);
        assert!(
            assignments.iter().any(|(_, rhs)| rhs == "x"),
            "{}",
            tree
        );
        assert!(def_use_holds(&assignments), "{}", tree);
    }
}

#[test]
fn conflicting_constraints_are_both_respected() {
    init_logging();
    let grammar = lang_grammar();

    // forall assignment pairs in document order: distinct left-hand sides.
    let p = Variable::bound("p", "<assgn>");
    let lp = Variable::bound("lp", "<var>");
    let rp = Variable::bound("rp", "<rhs>");
    let q = Variable::bound("q", "<assgn>");
    let lq = Variable::bound("lq", "<var>");
    let rq = Variable::bound("rq", "<rhs>");
    let no_redecl = Formula::forall_bind(
        p.clone(),
        assgn_bind(&lp, &rp),
        Term::Var(start_constant()),
        Formula::forall_bind(
            q.clone(),
            assgn_bind(&lq, &rq),
            Term::Var(start_constant()),
            Formula::or(vec![
                Formula::not(Formula::predicate(
                    "before",
                    vec![Term::Var(p), Term::Var(q)],
                )),
                Formula::predicate(
                    "different_text",
                    vec![Term::Var(lp), Term::Var(lq)],
                ),
            ]),
        ),
    );

    let formula = Formula::and(vec![def_use_formula(), no_redecl, forced_use_formula()]);
    let mut solver = Solver::new(grammar.clone(), &formula, SolverConfig::default()).unwrap();
    let result = solver.solve(2);
    assert!(!result.trees.is_empty());
    for tree in &result.trees {
        assert!(tree.conforms_to(&grammar));
        let assignments = parse_assignments(&tree.to_string());
        assert!(def_use_holds(&assignments), "{}", tree);
        for (index, (lhs, _)) in assignments.iter().enumerate() {
            assert!(
                assignments[..index].iter().all(|(other, _)| other != lhs),
                "redeclaration of {} in {}",
                lhs,
                tree
            );
        }
    }
}

proptest! {
    #[test]
    fn solving_is_sound_across_configurations(
        seed in 0u64..64,
        max_free in 1usize..6,
        close_depth in 4usize..16,
    ) {
        init_logging();
        let grammar = lang_grammar();
        let lhs = Variable::bound("l", "<var>");
        let rhs = Variable::bound("r", "<rhs>");
        let formula = Formula::exists_bind(
            Variable::bound("a", "<assgn>"),
            assgn_bind(&lhs, &rhs),
            Term::Var(start_constant()),
            Formula::smt("(= l \"y\")", vec![lhs]),
        );

        let mut config = SolverConfig::default();
        config.seed = seed;
        config.max_number_free_instantiations = max_free;
        config.max_close_depth = close_depth;
        let mut solver = Solver::new(grammar.clone(), &formula, config).unwrap();

        let result = solver.solve(2);
        prop_assert!(!result.trees.is_empty());
        for tree in &result.trees {
            prop_assert_eq!(tree.num_open(), 0);
            prop_assert!(tree.conforms_to(&grammar));
            prop_assert!(tree.to_string().contains("y := "));
        }
    }
}
