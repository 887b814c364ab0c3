//! Subgraph-monomorphism enumeration with attribute subsumption.
//!
//! Given a pattern graph `L` and a target graph `G`, [`find_matching`]
//! enumerates every injective map `L.nodes → G.nodes` such that every
//! pattern edge has an image edge and every pattern attribute value is a
//! subset of the image's value. Enumeration is lazy (the iterator owns a
//! backtracking stack and callers may stop after the first match) and
//! deterministic: pattern nodes and candidates are visited in lexicographic
//! identifier order, so the full sequence is reproducible.
//!
//! Candidate lists are pre-filtered by degree and attribute subsumption;
//! edge consistency is checked incrementally against already-assigned
//! neighbours.
//!
//! # Citations
//! - Subgraph isomorphism: Ullmann, "An algorithm for subgraph isomorphism" (1976)
//! - Backtracking with forward checking: Haralick & Elliot, "Increasing tree
//!   search efficiency for constraint satisfaction problems" (1980)
//! - VF2-style candidate pruning: Cordella et al., "A (sub)graph isomorphism
//!   algorithm for matching large graphs" (2004)

use crate::attribute_set::attrs_included;
use crate::graph::{Graph, NodeId};
use crate::homomorphism::NodeMapping;
use std::collections::{BTreeMap, BTreeSet};

/// Lazy iterator over the matches of a pattern in a target graph.
///
/// The underlying graphs must not be mutated while the iterator is alive
/// (the borrow checker enforces this for safe callers).
pub struct Matches<'a> {
    pattern: &'a Graph,
    target: &'a Graph,
    pattern_nodes: Vec<NodeId>,
    candidates: Vec<Vec<NodeId>>,
    cursors: Vec<usize>,
    assignment: NodeMapping,
    used: BTreeSet<NodeId>,
    emitted_empty: bool,
    done: bool,
}

impl<'a> Matches<'a> {
    fn new(
        target: &'a Graph,
        pattern: &'a Graph,
        restriction: Option<&BTreeMap<NodeId, BTreeSet<NodeId>>>,
    ) -> Self {
        let pattern_nodes: Vec<NodeId> = pattern.node_ids().cloned().collect();
        let mut candidates = Vec::with_capacity(pattern_nodes.len());
        let mut viable = true;
        for p in &pattern_nodes {
            let p_attrs = pattern.get_node_attrs(p).cloned().unwrap_or_default();
            let p_out = pattern.out_degree(p);
            let p_in = pattern.in_degree(p);
            let allowed = restriction.and_then(|r| r.get(p));
            let node_candidates: Vec<NodeId> = target
                .nodes()
                .filter(|(g, g_attrs)| {
                    if let Some(allowed) = allowed {
                        if !allowed.contains(*g) {
                            return false;
                        }
                    }
                    target.out_degree(g) >= p_out
                        && target.in_degree(g) >= p_in
                        && attrs_included(&p_attrs, g_attrs)
                })
                .map(|(g, _)| g.clone())
                .collect();
            if node_candidates.is_empty() {
                viable = false;
            }
            candidates.push(node_candidates);
        }
        Self {
            pattern,
            target,
            pattern_nodes,
            candidates,
            cursors: Vec::new(),
            assignment: NodeMapping::new(),
            used: BTreeSet::new(),
            emitted_empty: false,
            done: !viable,
        }
    }

    /// Checks the candidate against edges between the pattern node at
    /// `depth` and all previously assigned pattern nodes (and itself, for
    /// loops), with attribute subsumption on each image edge.
    fn consistent(&self, depth: usize, candidate: &NodeId) -> bool {
        let p = &self.pattern_nodes[depth];
        for (q, image) in self
            .assignment
            .iter()
            .chain(std::iter::once((p, candidate)))
        {
            if let Some(p_attrs) = self.pattern.get_edge_attrs(p, q) {
                match self.target.get_edge_attrs(candidate, image) {
                    Some(g_attrs) if attrs_included(p_attrs, g_attrs) => {}
                    _ => return false,
                }
            }
            if q == p {
                continue;
            }
            if let Some(p_attrs) = self.pattern.get_edge_attrs(q, p) {
                match self.target.get_edge_attrs(image, candidate) {
                    Some(g_attrs) if attrs_included(p_attrs, g_attrs) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    fn unassign(&mut self, depth: usize) {
        let p = self.pattern_nodes[depth].clone();
        if let Some(image) = self.assignment.remove(&p) {
            self.used.remove(&image);
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = NodeMapping;

    fn next(&mut self) -> Option<NodeMapping> {
        if self.done {
            return None;
        }
        let n = self.pattern_nodes.len();
        if n == 0 {
            // The empty pattern has exactly one (empty) occurrence.
            if self.emitted_empty {
                self.done = true;
                return None;
            }
            self.emitted_empty = true;
            return Some(NodeMapping::new());
        }
        // Resume after a previously emitted full assignment.
        if self.assignment.len() == n {
            self.unassign(n - 1);
        }
        loop {
            let depth = self.assignment.len();
            if depth == n {
                return Some(self.assignment.clone());
            }
            if self.cursors.len() == depth {
                self.cursors.push(0);
            }
            let mut cursor = self.cursors[depth];
            let mut advanced = false;
            while cursor < self.candidates[depth].len() {
                let candidate = self.candidates[depth][cursor].clone();
                cursor += 1;
                if self.used.contains(&candidate) {
                    continue;
                }
                if self.consistent(depth, &candidate) {
                    self.cursors[depth] = cursor;
                    let p = self.pattern_nodes[depth].clone();
                    self.used.insert(candidate.clone());
                    self.assignment.insert(p, candidate);
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                self.cursors.pop();
                if depth == 0 {
                    self.done = true;
                    return None;
                }
                self.unassign(depth - 1);
            }
        }
    }
}

/// Enumerates all monomorphisms of `pattern` into `target`.
pub fn find_matching<'a>(target: &'a Graph, pattern: &'a Graph) -> Matches<'a> {
    Matches::new(target, pattern, None)
}

/// Enumerates matches with each pattern node restricted to a permitted set
/// of target nodes (used for typed matching inside hierarchies).
pub fn find_matching_restricted<'a>(
    target: &'a Graph,
    pattern: &'a Graph,
    restriction: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> Matches<'a> {
    Matches::new(target, pattern, Some(restriction))
}

impl Graph {
    /// Enumerates all monomorphisms of `pattern` into this graph.
    pub fn find_matching<'a>(&'a self, pattern: &'a Graph) -> Matches<'a> {
        find_matching(self, pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_set::{attrs, AttributeSet, Attributes};
    use crate::homomorphism::mapping;

    fn n(id: &str) -> NodeId {
        NodeId::from(id)
    }

    #[test]
    fn single_node_pattern_matches_every_node() {
        let target = Graph::from_elements(["a", "b", "c"], []).unwrap();
        let pattern = Graph::from_elements(["x"], []).unwrap();
        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(
            found,
            vec![
                mapping([("x", "a")]),
                mapping([("x", "b")]),
                mapping([("x", "c")]),
            ]
        );
    }

    #[test]
    fn edges_constrain_matches() {
        let target = Graph::from_elements(["a", "b", "c"], [("a", "b"), ("b", "c")]).unwrap();
        let pattern = Graph::from_elements(["x", "y"], [("x", "y")]).unwrap();
        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(
            found,
            vec![mapping([("x", "a"), ("y", "b")]), mapping([("x", "b"), ("y", "c")])]
        );
    }

    #[test]
    fn matches_are_injective() {
        let target = Graph::from_elements(["a", "b"], [("a", "b"), ("b", "a")]).unwrap();
        let pattern = Graph::from_elements(["x", "y"], [("x", "y"), ("y", "x")]).unwrap();
        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        // x and y must land on distinct nodes.
        assert_eq!(found.len(), 2);
        for m in found {
            assert_ne!(m[&n("x")], m[&n("y")]);
        }
    }

    #[test]
    fn attribute_subsumption_filters_candidates() {
        let mut target = Graph::new();
        target
            .add_node("a", attrs([("color", AttributeSet::strings(["blue", "red"]))]))
            .unwrap();
        target
            .add_node("b", attrs([("color", AttributeSet::strings(["red"]))]))
            .unwrap();
        let mut pattern = Graph::new();
        pattern
            .add_node("x", attrs([("color", AttributeSet::strings(["blue"]))]))
            .unwrap();

        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(found, vec![mapping([("x", "a")])]);
    }

    #[test]
    fn edge_attributes_must_be_subsumed() {
        let mut target = Graph::from_elements(["a", "b", "c"], []).unwrap();
        target
            .add_edge("a", "b", attrs([("friends", AttributeSet::finite([true.into()]))]))
            .unwrap();
        target.add_edge("b", "c", Attributes::new()).unwrap();

        let mut pattern = Graph::from_elements(["x", "y"], []).unwrap();
        pattern
            .add_edge("x", "y", attrs([("friends", AttributeSet::finite([true.into()]))]))
            .unwrap();

        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(found, vec![mapping([("x", "a"), ("y", "b")])]);
    }

    #[test]
    fn self_loops_require_loops() {
        let mut target = Graph::from_elements(["a", "b"], [("a", "a"), ("a", "b")]).unwrap();
        target.add_node("c", Attributes::new()).unwrap();
        let pattern = Graph::from_elements(["x"], [("x", "x")]).unwrap();
        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(found, vec![mapping([("x", "a")])]);
    }

    #[test]
    fn enumeration_is_lazy_and_stable() {
        let target =
            Graph::from_elements(["a", "b", "c", "d"], [("a", "b"), ("b", "c"), ("c", "d")])
                .unwrap();
        let pattern = Graph::from_elements(["x", "y"], [("x", "y")]).unwrap();

        let first = target.find_matching(&pattern).next();
        assert_eq!(first, Some(mapping([("x", "a"), ("y", "b")])));

        let run1: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        let run2: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(run1, run2);
        assert_eq!(run1.len(), 3);
    }

    #[test]
    fn restriction_limits_candidates() {
        let target = Graph::from_elements(["a", "b"], []).unwrap();
        let pattern = Graph::from_elements(["x"], []).unwrap();
        let restriction: BTreeMap<NodeId, BTreeSet<NodeId>> =
            [(n("x"), [n("b")].into_iter().collect())].into_iter().collect();
        let found: Vec<NodeMapping> =
            find_matching_restricted(&target, &pattern, &restriction).collect();
        assert_eq!(found, vec![mapping([("x", "b")])]);
    }

    #[test]
    fn empty_pattern_matches_once() {
        let target = Graph::from_elements(["a"], []).unwrap();
        let pattern = Graph::new();
        let found: Vec<NodeMapping> = target.find_matching(&pattern).collect();
        assert_eq!(found, vec![NodeMapping::new()]);
    }

    #[test]
    fn no_match_returns_empty_sequence() {
        let target = Graph::from_elements(["a"], []).unwrap();
        let pattern = Graph::from_elements(["x", "y"], [("x", "y")]).unwrap();
        assert_eq!(target.find_matching(&pattern).count(), 0);
    }
}
