//! Tree insertion engine.
//!
//! Given a fragment tree and a target tree, computes all grammar-valid ways
//! to graft the fragment into the target. The solver core uses this to
//! manufacture witnesses for existential quantifiers that have no matching
//! subtree yet.
//!
//! Four strategies are explored, in order from least to most invasive:
//! direct substitution of an open leaf, splicing adjacent to an existing
//! subtree of a self-embedding nonterminal, bounded growth of an open leaf
//! until a matching position appears, and wrapping the fragment in a
//! shortest derivation context rooted at an open leaf's nonterminal.
//! Results are deduplicated by string yield; failure is an empty result,
//! never an error.

use log::trace;
use rustc_hash::FxHashSet;

use gramsat_formula::DerivationTree;
use gramsat_grammar::{is_nonterminal, Grammar, GrammarGraph};

/// Default depth bound for the leaf-growth strategy.
pub const DEFAULT_GROWTH_DEPTH: usize = 4;
/// Default bound on shortest wrapping paths materialized per query.
pub const DEFAULT_WRAP_PATHS: usize = 4;

/// Cap on grown subtrees per open leaf, to keep branching finite.
const MAX_GROWTH_PER_LEAF: usize = 32;

/// All grammar-valid ways to graft `fragment` into `target`.
///
/// Every returned tree contains `fragment` as an identity-reachable subtree
/// and conforms to the grammar wherever `target` did. Results are ordered
/// shallow-and-minimal before deep, deduplicated by string yield, and
/// truncated to `max_num_solutions` (unbounded if `None`).
pub fn insert_tree(
    grammar: &Grammar,
    graph: &GrammarGraph,
    fragment: &DerivationTree,
    target: &DerivationTree,
    max_num_solutions: Option<usize>,
) -> Vec<DerivationTree> {
    insert_tree_bounded(
        grammar,
        graph,
        fragment,
        target,
        max_num_solutions,
        DEFAULT_GROWTH_DEPTH,
        DEFAULT_WRAP_PATHS,
    )
}

/// [`insert_tree`] with explicit exploration bounds.
pub fn insert_tree_bounded(
    grammar: &Grammar,
    graph: &GrammarGraph,
    fragment: &DerivationTree,
    target: &DerivationTree,
    max_num_solutions: Option<usize>,
    growth_depth: usize,
    wrap_paths: usize,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();
    let mut seen_yields = FxHashSet::default();
    let limit = max_num_solutions.unwrap_or(usize::MAX);

    let mut push = |tree: DerivationTree, results: &mut Vec<DerivationTree>| {
        if results.len() < limit && seen_yields.insert(tree.to_string()) {
            results.push(tree);
        }
    };

    for tree in direct_substitutions(fragment, target) {
        push(tree, &mut results);
    }
    for tree in self_embeddings(grammar, fragment, target) {
        push(tree, &mut results);
    }
    for tree in leaf_growth(grammar, graph, fragment, target, growth_depth) {
        push(tree, &mut results);
    }
    for tree in leaf_wrappings(grammar, graph, fragment, target, wrap_paths) {
        push(tree, &mut results);
    }

    trace!(
        "insert_tree: {} solutions for fragment '{}' into '{}'",
        results.len(),
        fragment,
        target
    );
    results
}

/// Strategy 1: replace an open leaf of the fragment's nonterminal.
fn direct_substitutions(
    fragment: &DerivationTree,
    target: &DerivationTree,
) -> Vec<DerivationTree> {
    target
        .walk()
        .into_iter()
        .filter(|(_, node)| node.is_open() && node.symbol() == fragment.symbol())
        .filter_map(|(path, _)| target.replace(&path, fragment.clone()))
        .collect()
}

/// Strategy 2: splice the fragment next to an existing subtree of a
/// self-embedding nonterminal, leaving the existing content untouched.
///
/// For every subtree of nonterminal `n` and every alternative of `n` that
/// mentions `n` itself, three placements are tried: the existing subtree's
/// children fill a prefix of the alternative and the fragment derives from
/// the fresh recursive position; the existing subtree itself fills the
/// recursive position with the fragment in a sibling position; and the
/// sibling splice one level down, with the outer positions left open.
/// Whether the fragment lands before or after the existing content follows
/// the alternative's symbol ordering.
fn self_embeddings(
    grammar: &Grammar,
    fragment: &DerivationTree,
    target: &DerivationTree,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();

    for (path, node) in target.walk() {
        if !node.is_nonterminal() {
            continue;
        }
        let symbol = node.symbol().to_owned();
        let alternatives = match grammar.alternatives(&symbol) {
            Some(alternatives) => alternatives,
            None => continue,
        };

        for alternative in alternatives {
            for (self_pos, self_sym) in alternative.iter().enumerate() {
                if *self_sym != symbol {
                    continue;
                }

                // Existing children as a prefix, fragment below the fresh
                // recursive position.
                if let Some(children) = node.children() {
                    let fits = children.len() <= self_pos
                        && children
                            .iter()
                            .zip(alternative.iter())
                            .all(|(child, sym)| child.symbol() == sym.as_str());
                    if fits {
                        for tail in embed_fragment(grammar, &symbol, fragment) {
                            let new_children = alternative
                                .iter()
                                .enumerate()
                                .map(|(index, sym)| {
                                    if index < children.len() {
                                        children[index].clone()
                                    } else if index == self_pos {
                                        tail.clone()
                                    } else {
                                        DerivationTree::auto(sym)
                                    }
                                })
                                .collect();
                            let extended = DerivationTree::node(&symbol, new_children);
                            if let Some(result) = target.replace(&path, extended) {
                                results.push(result);
                            }
                        }
                    }
                }

                // Fragment in a sibling position of the whole existing
                // subtree, directly and one level down.
                for (frag_pos, frag_sym) in alternative.iter().enumerate() {
                    if frag_pos == self_pos || *frag_sym != fragment.symbol() {
                        continue;
                    }
                    let spliced = splice(&symbol, alternative, &node, self_pos, fragment, frag_pos);
                    if let Some(result) = target.replace(&path, spliced.clone()) {
                        results.push(result);
                    }

                    let outer_children = alternative
                        .iter()
                        .enumerate()
                        .map(|(index, sym)| {
                            if index == self_pos {
                                spliced.clone()
                            } else {
                                DerivationTree::auto(sym)
                            }
                        })
                        .collect();
                    let nested = DerivationTree::node(&symbol, outer_children);
                    if let Some(result) = target.replace(&path, nested) {
                        results.push(result);
                    }
                }
            }
        }
    }

    results
}

fn splice(
    symbol: &str,
    alternative: &[String],
    node: &DerivationTree,
    self_pos: usize,
    fragment: &DerivationTree,
    frag_pos: usize,
) -> DerivationTree {
    let children = alternative
        .iter()
        .enumerate()
        .map(|(index, sym)| {
            if index == self_pos {
                node.clone()
            } else if index == frag_pos {
                fragment.clone()
            } else {
                DerivationTree::auto(sym)
            }
        })
        .collect();
    DerivationTree::node(symbol, children)
}

/// One subtree of `symbol` per grammar position that can hold the fragment
/// directly, every other introduced position left open.
fn embed_fragment(
    grammar: &Grammar,
    symbol: &str,
    fragment: &DerivationTree,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();
    for alternative in grammar.alternatives(symbol).unwrap_or(&[]) {
        for (frag_pos, frag_sym) in alternative.iter().enumerate() {
            if *frag_sym != fragment.symbol() {
                continue;
            }
            let children = alternative
                .iter()
                .enumerate()
                .map(|(index, sym)| {
                    if index == frag_pos {
                        fragment.clone()
                    } else {
                        DerivationTree::auto(sym)
                    }
                })
                .collect();
            results.push(DerivationTree::node(symbol, children));
        }
    }
    results
}

/// Strategy 3: expand an open leaf one or more grammar steps (bounded depth)
/// until a position of the fragment's nonterminal appears, then substitute.
fn leaf_growth(
    grammar: &Grammar,
    graph: &GrammarGraph,
    fragment: &DerivationTree,
    target: &DerivationTree,
    growth_depth: usize,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();

    for (path, symbol) in target.open_leaves() {
        let mut grown = grow_into(grammar, graph, &symbol, fragment, growth_depth);
        // Minimal growth sorts before deeper growth.
        grown.sort_by_key(|tree| tree.depth());
        for subtree in grown {
            if let Some(result) = target.replace(&path, subtree) {
                results.push(result);
            }
        }
    }

    results
}

/// All expansions of `symbol` of at most `depth` steps that contain the
/// fragment, with every other introduced position left open.
fn grow_into(
    grammar: &Grammar,
    graph: &GrammarGraph,
    symbol: &str,
    fragment: &DerivationTree,
    depth: usize,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();
    if depth == 0 {
        return results;
    }

    for alternative in grammar.alternatives(symbol).unwrap_or(&[]) {
        for (frag_pos, frag_sym) in alternative.iter().enumerate() {
            if !is_nonterminal(frag_sym) {
                continue;
            }
            let subtrees = if *frag_sym == fragment.symbol() {
                vec![fragment.clone()]
            } else if graph.reachable(frag_sym, fragment.symbol()) {
                grow_into(grammar, graph, frag_sym, fragment, depth - 1)
            } else {
                continue;
            };

            for subtree in subtrees {
                if results.len() >= MAX_GROWTH_PER_LEAF {
                    return results;
                }
                let children = alternative
                    .iter()
                    .enumerate()
                    .map(|(index, sym)| {
                        if index == frag_pos {
                            subtree.clone()
                        } else {
                            DerivationTree::auto(sym)
                        }
                    })
                    .collect();
                results.push(DerivationTree::node(symbol, children));
            }
        }
    }

    results
}

/// Strategy 4: wrap the fragment in a shortest derivation context rooted at
/// an open leaf's nonterminal, then substitute the context at that leaf.
///
/// Reaches positions the depth-bounded growth strategy cannot.
fn leaf_wrappings(
    grammar: &Grammar,
    graph: &GrammarGraph,
    fragment: &DerivationTree,
    target: &DerivationTree,
    wrap_paths: usize,
) -> Vec<DerivationTree> {
    let mut results = Vec::new();

    for (path, symbol) in target.open_leaves() {
        if symbol == fragment.symbol() {
            continue; // already covered by direct substitution
        }
        for wrapped in
            wrap_in_tree_starting_in_bounded(&symbol, fragment, grammar, graph, wrap_paths)
        {
            if let Some(result) = target.replace(&path, wrapped) {
                results.push(result);
            }
        }
    }

    results
}

/// Wrap `fragment` in a minimal derivation context rooted at
/// `start_nonterminal`.
///
/// Returns one tree per shortest grammar-graph path from the starting
/// nonterminal to the fragment's nonterminal (up to an internal bound), each
/// containing the fragment by identity at exactly shortest-path depth.
/// Empty when the fragment's nonterminal is unreachable.
pub fn wrap_in_tree_starting_in(
    start_nonterminal: &str,
    fragment: &DerivationTree,
    grammar: &Grammar,
    graph: &GrammarGraph,
) -> Vec<DerivationTree> {
    wrap_in_tree_starting_in_bounded(
        start_nonterminal,
        fragment,
        grammar,
        graph,
        DEFAULT_WRAP_PATHS,
    )
}

/// [`wrap_in_tree_starting_in`] with an explicit bound on the number of
/// shortest paths materialized.
pub fn wrap_in_tree_starting_in_bounded(
    start_nonterminal: &str,
    fragment: &DerivationTree,
    grammar: &Grammar,
    graph: &GrammarGraph,
    wrap_paths: usize,
) -> Vec<DerivationTree> {
    graph
        .shortest_paths(start_nonterminal, fragment.symbol(), wrap_paths)
        .into_iter()
        .filter_map(|chain| materialize_chain(grammar, &chain, fragment))
        .collect()
}

/// Materialize a derivation chain top-down, filling every intermediate node
/// with the first grammar alternative that continues the chain and leaving
/// all other introduced positions open.
fn materialize_chain(
    grammar: &Grammar,
    chain: &[String],
    fragment: &DerivationTree,
) -> Option<DerivationTree> {
    let mut acc = fragment.clone();
    for window in chain.windows(2).rev() {
        let (parent, child_sym) = (&window[0], &window[1]);
        let alternative = grammar
            .alternatives(parent)?
            .iter()
            .find(|alternative| alternative.iter().any(|sym| sym == child_sym))?;
        let child_pos = alternative.iter().position(|sym| sym == child_sym)?;
        let children = alternative
            .iter()
            .enumerate()
            .map(|(index, sym)| {
                if index == child_pos {
                    acc.clone()
                } else {
                    DerivationTree::auto(sym)
                }
            })
            .collect();
        acc = DerivationTree::node(parent, children);
    }
    Some(acc)
}
