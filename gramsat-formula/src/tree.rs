//! Derivation trees.
//!
//! A derivation tree is a rooted, ordered tree representing a (partial)
//! parse. Nodes carry a symbol (terminal text or a nonterminal label) and an
//! identity token that is stable across cloning and grafting. Trees are
//! immutable values: every transformation returns a new tree that shares all
//! unmodified subtrees with its input.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashSet;

use gramsat_grammar::{is_nonterminal, Grammar};

/// Identity token of a tree node.
///
/// Assigned from a process-wide counter at node creation. Cloning and
/// grafting preserve it, so "does this tree contain that exact subtree" is an
/// identity lookup, not a structural comparison. It is an explicit integer
/// rather than pointer equality so it survives serialization.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId {
    token: u64,
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn fresh() -> NodeId {
        NodeId {
            token: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The raw token value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.token
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.token)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Address of a node relative to one concrete tree snapshot: the sequence of
/// child indices from the root.
pub type Path = Vec<usize>;

/// Strict document order on paths.
///
/// True when the node at `a` ends before the node at `b` starts. A path
/// never precedes itself, a prefix, or an extension of itself (those pairs
/// overlap).
pub fn path_precedes(a: &[usize], b: &[usize]) -> bool {
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            return x < y;
        }
    }
    false
}

struct NodeData {
    id: NodeId,
    symbol: String,
    /// `None` for open nodes, the ordered children for closed nodes.
    children: Option<Vec<DerivationTree>>,
}

/// A plain parse tree as produced by an external parser: symbols only, no
/// node identities. `None` children mark unexpanded nonterminals.
#[derive(Clone, PartialEq, Debug)]
pub struct ParseTree {
    pub symbol: String,
    pub children: Option<Vec<ParseTree>>,
}

/// A (partial) derivation tree.
///
/// Cloning is cheap (reference-counted). Structural equality ignores node
/// identities; identity containment is answered by [`DerivationTree::find_node`].
#[derive(Clone)]
pub struct DerivationTree {
    data: Rc<NodeData>,
}

impl DerivationTree {
    /// An open node: a nonterminal not yet expanded.
    pub fn open(symbol: &str) -> DerivationTree {
        debug_assert!(is_nonterminal(symbol));
        DerivationTree {
            data: Rc::new(NodeData {
                id: NodeId::fresh(),
                symbol: symbol.to_owned(),
                children: None,
            }),
        }
    }

    /// A closed terminal leaf.
    pub fn leaf(symbol: &str) -> DerivationTree {
        DerivationTree {
            data: Rc::new(NodeData {
                id: NodeId::fresh(),
                symbol: symbol.to_owned(),
                children: Some(Vec::new()),
            }),
        }
    }

    /// An open node for nonterminal symbols, a terminal leaf otherwise.
    pub fn auto(symbol: &str) -> DerivationTree {
        if is_nonterminal(symbol) {
            DerivationTree::open(symbol)
        } else {
            DerivationTree::leaf(symbol)
        }
    }

    /// Import a parse produced outside the solver, assigning fresh node
    /// ids throughout.
    pub fn from_parse_tree(parse: &ParseTree) -> DerivationTree {
        match &parse.children {
            None => DerivationTree::auto(&parse.symbol),
            Some(children) => DerivationTree::node(
                &parse.symbol,
                children.iter().map(DerivationTree::from_parse_tree).collect(),
            ),
        }
    }

    /// A closed node with the given ordered children.
    ///
    /// The caller is responsible for the children matching a grammar
    /// alternative of `symbol`; the tree itself never verifies this.
    pub fn node(symbol: &str, children: Vec<DerivationTree>) -> DerivationTree {
        DerivationTree {
            data: Rc::new(NodeData {
                id: NodeId::fresh(),
                symbol: symbol.to_owned(),
                children: Some(children),
            }),
        }
    }

    /// Close this node in place: same symbol, same identity token, the given
    /// ordered children.
    ///
    /// Unlike [`DerivationTree::node`] no fresh identity is minted, so
    /// anchors referencing the node stay valid across the expansion.
    pub fn expand(&self, children: Vec<DerivationTree>) -> DerivationTree {
        debug_assert!(self.is_open());
        DerivationTree {
            data: Rc::new(NodeData {
                id: self.data.id,
                symbol: self.data.symbol.clone(),
                children: Some(children),
            }),
        }
    }

    /// The node's identity token.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.data.id
    }

    /// The node's symbol.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.data.symbol
    }

    /// Whether this node is still open (not yet expanded).
    #[inline]
    pub fn is_open(&self) -> bool {
        self.data.children.is_none()
    }

    /// Whether this node's symbol is a nonterminal label.
    #[inline]
    pub fn is_nonterminal(&self) -> bool {
        is_nonterminal(&self.data.symbol)
    }

    /// The node's children, or `None` while the node is open.
    pub fn children(&self) -> Option<&[DerivationTree]> {
        self.data.children.as_deref()
    }

    /// The subtree at a path, if the path is valid for this tree.
    pub fn subtree(&self, path: &[usize]) -> Option<&DerivationTree> {
        let mut current = self;
        for &index in path {
            current = current.children()?.get(index)?;
        }
        Some(current)
    }

    /// A new tree with the subtree at `path` replaced.
    ///
    /// Shares every untouched subtree with `self`. Returns `None` if the
    /// path is not valid for this tree.
    pub fn replace(&self, path: &[usize], replacement: DerivationTree) -> Option<DerivationTree> {
        match path.split_first() {
            None => Some(replacement),
            Some((&index, rest)) => {
                let children = self.children()?;
                let child = children.get(index)?;
                let new_child = child.replace(rest, replacement)?;
                let mut new_children = children.to_vec();
                new_children[index] = new_child;
                Some(DerivationTree {
                    data: Rc::new(NodeData {
                        id: self.data.id,
                        symbol: self.data.symbol.clone(),
                        children: Some(new_children),
                    }),
                })
            }
        }
    }

    /// Path of the node with the given identity, if this tree contains it.
    pub fn find_node(&self, id: NodeId) -> Option<Path> {
        if self.data.id == id {
            return Some(Vec::new());
        }
        for (index, child) in self.children()?.iter().enumerate() {
            if let Some(mut path) = child.find_node(id) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    /// Whether this tree contains a node with the given identity.
    pub fn contains(&self, id: NodeId) -> bool {
        self.find_node(id).is_some()
    }

    /// All nodes in preorder, paired with their paths.
    pub fn walk(&self) -> Vec<(Path, DerivationTree)> {
        let mut result = Vec::new();
        let mut stack = vec![(Vec::new(), self.clone())];
        while let Some((path, tree)) = stack.pop() {
            if let Some(children) = tree.children() {
                for (index, child) in children.iter().enumerate().rev() {
                    let mut child_path = path.clone();
                    child_path.push(index);
                    stack.push((child_path, child.clone()));
                }
            }
            result.push((path, tree));
        }
        result
    }

    /// Paths and symbols of all open leaves, in document order.
    pub fn open_leaves(&self) -> Vec<(Path, String)> {
        self.walk()
            .into_iter()
            .filter(|(_, tree)| tree.is_open())
            .map(|(path, tree)| (path, tree.symbol().to_owned()))
            .collect()
    }

    /// Number of open leaves.
    pub fn num_open(&self) -> usize {
        self.walk().iter().filter(|(_, tree)| tree.is_open()).count()
    }

    /// Height of the tree: 1 for a single node.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .unwrap_or(&[])
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// All vertical chains of exactly `k` nonterminal symbols, following
    /// direct parent-child links (terminal children break no chain since they
    /// never continue one).
    pub fn k_paths(&self, k: usize) -> FxHashSet<Vec<String>> {
        let mut result = FxHashSet::default();
        if k == 0 {
            return result;
        }
        for (_, tree) in self.walk() {
            if tree.is_nonterminal() {
                tree.collect_chains(&mut vec![tree.symbol().to_owned()], k, &mut result);
            }
        }
        result
    }

    fn collect_chains(&self, chain: &mut Vec<String>, k: usize, result: &mut FxHashSet<Vec<String>>) {
        if chain.len() == k {
            result.insert(chain.clone());
            return;
        }
        for child in self.children().unwrap_or(&[]) {
            if child.is_nonterminal() {
                chain.push(child.symbol().to_owned());
                child.collect_chains(chain, k, result);
                chain.pop();
            }
        }
    }

    /// Whether every closed nonterminal node's children match one of the
    /// grammar's alternatives for that nonterminal.
    pub fn conforms_to(&self, grammar: &Grammar) -> bool {
        for (_, tree) in self.walk() {
            if !tree.is_nonterminal() {
                continue;
            }
            let children = match tree.children() {
                Some(children) => children,
                None => continue,
            };
            let symbols: Vec<&str> = children.iter().map(|child| child.symbol()).collect();
            let matched = grammar
                .alternatives(tree.symbol())
                .map_or(false, |alternatives| {
                    alternatives.iter().any(|alternative| {
                        alternative.len() == symbols.len()
                            && alternative.iter().zip(&symbols).all(|(a, b)| a == b)
                    })
                });
            if !matched {
                return false;
            }
        }
        true
    }
}

/// The string yield: terminals concatenated in order, open nonterminals
/// printed as their label.
impl fmt::Display for DerivationTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.children() {
            None => write!(f, "{}", self.symbol()),
            Some(children) => {
                if children.is_empty() && !self.is_nonterminal() {
                    write!(f, "{}", self.symbol())?;
                }
                for child in children {
                    fmt::Display::fmt(child, f)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for DerivationTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.children() {
            None => write!(f, "({:?} {})", self.id(), self.symbol()),
            Some(children) => {
                write!(f, "({:?} {}", self.id(), self.symbol())?;
                for child in children {
                    write!(f, " {:?}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Structural equality: same symbols and open/closed shape, identities
/// ignored.
impl PartialEq for DerivationTree {
    fn eq(&self, other: &DerivationTree) -> bool {
        self.symbol() == other.symbol()
            && match (self.children(), other.children()) {
                (None, None) => true,
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

impl Eq for DerivationTree {}

#[cfg(test)]
mod tests {
    use super::*;

    use gramsat_grammar::grammar;

    #[test]
    fn from_parse_tree_assigns_fresh_ids() {
        let parse = ParseTree {
            symbol: "<assgn>".to_owned(),
            children: Some(vec![
                ParseTree {
                    symbol: "<var>".to_owned(),
                    children: Some(vec![ParseTree {
                        symbol: "x".to_owned(),
                        children: None,
                    }]),
                },
                ParseTree {
                    symbol: " := ".to_owned(),
                    children: None,
                },
                ParseTree {
                    symbol: "<rhs>".to_owned(),
                    children: None,
                },
            ]),
        };

        let first = DerivationTree::from_parse_tree(&parse);
        let second = DerivationTree::from_parse_tree(&parse);
        assert_eq!(first, second);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.to_string(), "x := <rhs>");
        assert_eq!(first.num_open(), 1);
    }

    fn assgn_tree() -> DerivationTree {
        // x := 1
        dt!("<assgn>" => [
            dt!("<var>" => [dt!("x")]),
            dt!(" := "),
            dt!("<rhs>" => [dt!("<digit>" => [dt!("1")])]),
        ])
    }

    fn two_stmt_tree() -> DerivationTree {
        // x := 1 ; <assgn>
        dt!("<start>" => [
            dt!("<stmt>" => [
                assgn_tree(),
                dt!(" ; "),
                dt!("<stmt>" => [dt!("<assgn>")]),
            ]),
        ])
    }

    #[test]
    fn display_yield() {
        assert_eq!(assgn_tree().to_string(), "x := 1");
        assert_eq!(two_stmt_tree().to_string(), "x := 1 ; <assgn>");
    }

    #[test]
    fn open_and_closed() {
        let tree = two_stmt_tree();
        assert!(!tree.is_open());
        let leaves = tree.open_leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].1, "<assgn>");
        assert_eq!(tree.num_open(), 1);
    }

    #[test]
    fn subtree_and_paths() {
        let tree = two_stmt_tree();
        let assgn = tree.subtree(&[0, 0]).unwrap();
        assert_eq!(assgn.symbol(), "<assgn>");
        assert_eq!(assgn.to_string(), "x := 1");
        assert!(tree.subtree(&[0, 3]).is_none());
    }

    #[test]
    fn replace_shares_and_preserves_identity() {
        let tree = two_stmt_tree();
        let untouched_id = tree.subtree(&[0, 0]).unwrap().id();

        let replacement = assgn_tree();
        let replacement_id = replacement.id();
        let new_tree = tree.replace(&[0, 2, 0], replacement).unwrap();

        assert_eq!(new_tree.to_string(), "x := 1 ; x := 1");
        // Node identities survive the rebuild along the spine.
        assert_eq!(new_tree.id(), tree.id());
        assert!(new_tree.contains(untouched_id));
        assert_eq!(new_tree.find_node(replacement_id), Some(vec![0, 2, 0]));
        // The original snapshot is unchanged.
        assert_eq!(tree.to_string(), "x := 1 ; <assgn>");
    }

    #[test]
    fn expand_preserves_identity() {
        let leaf = DerivationTree::open("<assgn>");
        let id = leaf.id();
        let expanded = leaf.expand(vec![dt!("<var>"), dt!(" := "), dt!("<rhs>")]);
        assert_eq!(expanded.id(), id);
        assert!(!expanded.is_open());
        assert_eq!(expanded.to_string(), "<var> := <rhs>");
        // The open snapshot is unchanged.
        assert!(leaf.is_open());
    }

    #[test]
    fn find_node_is_identity_based() {
        let a = assgn_tree();
        let b = assgn_tree();
        assert_eq!(a, b);
        assert!(a.contains(a.id()));
        assert!(!a.contains(b.id()));
    }

    #[test]
    fn document_order() {
        assert!(path_precedes(&[0, 0], &[0, 2]));
        assert!(!path_precedes(&[0, 2], &[0, 0]));
        assert!(!path_precedes(&[0], &[0, 1]));
        assert!(!path_precedes(&[0, 1], &[0]));
        assert!(!path_precedes(&[1, 5], &[1, 5]));
    }

    #[test]
    fn k_path_chains() {
        let tree = two_stmt_tree();
        let chains = tree.k_paths(2);
        assert!(chains.contains(&vec!["<start>".to_owned(), "<stmt>".to_owned()]));
        assert!(chains.contains(&vec!["<stmt>".to_owned(), "<stmt>".to_owned()]));
        assert!(chains.contains(&vec!["<stmt>".to_owned(), "<assgn>".to_owned()]));
        assert!(!chains.contains(&vec!["<start>".to_owned(), "<assgn>".to_owned()]));
    }

    #[test]
    fn grammar_conformance() {
        let grammar = grammar![
            "<start>" => [["<stmt>"]];
            "<stmt>" => [["<assgn>", " ; ", "<stmt>"], ["<assgn>"]];
            "<assgn>" => [["<var>", " := ", "<rhs>"]];
            "<rhs>" => [["<var>"], ["<digit>"]];
            "<var>" => [["x"], ["y"]];
            "<digit>" => [["0"], ["1"]];
        ];
        assert!(two_stmt_tree().conforms_to(&grammar));

        let bogus = dt!("<stmt>" => [dt!("<rhs>")]);
        assert!(!bogus.conforms_to(&grammar));
    }

    #[test]
    fn depth() {
        assert_eq!(assgn_tree().depth(), 4);
        assert_eq!(DerivationTree::open("<start>").depth(), 1);
    }
}
