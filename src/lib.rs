//! ReGraph: attributed graph rewriting with sesqui-pushout semantics.
//!
//! This crate implements rewriting of directed simple graphs whose nodes
//! and edges carry attribute maps over possibly infinite value sets:
//!
//! - an attribute-set lattice closed under union, intersection and
//!   difference, with finite sets, integer intervals and regular languages
//!   as infinite carriers ([`attribute_set`]);
//! - graphs with attribute-aware primitives (clone, merge, relabel) and
//!   homomorphisms as data ([`graph`], [`homomorphism`]);
//! - lazy subgraph-monomorphism enumeration with attribute subsumption
//!   ([`matching`]);
//! - rules as spans `L ← P → R` and their sesqui-pushout application
//!   ([`rule`], [`rewrite`]);
//! - hierarchies: DAGs of graphs related by typing homomorphisms, with
//!   backward and forward propagation of rewrites ([`hierarchy`]);
//! - revision control over graphs and hierarchies: branches, merges and
//!   rollbacks on an append-only revision DAG ([`audit`]).
//!
//! # Example
//!
//! ```
//! use regraph::prelude::*;
//!
//! let mut graph = Graph::new();
//! graph.add_node("alice", attrs([("age", AttributeSet::ints([32]))])).unwrap();
//! graph.add_node("bob", attrs([("age", AttributeSet::ints([27]))])).unwrap();
//! graph.add_edge("alice", "bob", attrs([("friends", AttributeSet::finite([true.into()]))])).unwrap();
//!
//! // A rule that clones whatever matches `x`.
//! let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
//! rule.inject_clone_node(&NodeId::from("x"), None).unwrap();
//!
//! let instance = graph.find_matching(rule.lhs()).next().unwrap();
//! graph.rewrite(&rule, &instance).unwrap();
//! assert_eq!(graph.node_count(), 3);
//! ```
//!
//! # Citations
//! - Corradini, Heindel, Hermann, König, "Sesqui-Pushout Rewriting" (ICGT 2006)
//! - Ehrig, Ehrig, Prange, Taentzer, "Fundamentals of Algebraic Graph
//!   Transformation" (2006)

pub mod attribute_set;
pub mod audit;
pub mod fingerprint;
pub mod graph;
pub mod hierarchy;
pub mod homomorphism;
pub mod json;
pub mod matching;
pub(crate) mod propagation;
pub mod rewrite;
pub mod rule;

pub use attribute_set::{Atom, AttributeSet, AttributeSetError, Attributes, IntegerSet, RegexSet};
pub use audit::{AuditError, CommitId, VersionedGraph, VersionedHierarchy};
pub use graph::{Graph, GraphError, NodeId};
pub use hierarchy::{Hierarchy, HierarchyError, PTyping, RhsTyping};
pub use homomorphism::{HomomorphismError, NodeMapping};
pub use matching::Matches;
pub use rewrite::RewritingError;
pub use rule::{Rule, RuleError};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::attribute_set::{
        attrs, Atom, AttributeSet, AttributeSetError, Attributes, Endpoint, IntegerSet, RegexSet,
    };
    pub use crate::audit::{AuditError, CommitId, VersionedGraph, VersionedHierarchy};
    pub use crate::fingerprint::HashValue;
    pub use crate::graph::{Graph, GraphError, NodeId};
    pub use crate::hierarchy::{Hierarchy, HierarchyError, PTyping, Relation, RhsTyping};
    pub use crate::homomorphism::{
        check_homomorphism, compose, mapping, HomomorphismError, NodeMapping,
    };
    pub use crate::json::JsonError;
    pub use crate::matching::{find_matching, find_matching_restricted, Matches};
    pub use crate::rewrite::{pullback_complement, pushout, RewritingError};
    pub use crate::rule::{Rule, RuleError};
}

#[cfg(test)]
mod tests {
    //! End-to-end scenarios across the component boundaries.

    use crate::prelude::*;

    fn n(id: &str) -> NodeId {
        NodeId::from(id)
    }

    /// Build a small social graph, clone a node, merge two others, and
    /// check the attribute accumulation on the merged node.
    #[test]
    fn build_and_rewrite_scenario() {
        let mut g = Graph::new();
        g.add_node(
            "1",
            attrs([
                ("color", AttributeSet::strings(["blue"])),
                ("name", AttributeSet::strings(["alice"])),
            ]),
        )
        .unwrap();
        g.add_node("2", attrs([("color", AttributeSet::strings(["blue"]))]))
            .unwrap();
        g.add_node(
            "3",
            attrs([
                ("color", AttributeSet::strings(["blue"])),
                ("name", AttributeSet::strings(["john"])),
            ]),
        )
        .unwrap();
        let friends = attrs([("friends", AttributeSet::finite([true.into()]))]);
        g.add_edge("1", "2", friends.clone()).unwrap();
        g.add_edge("3", "2", friends).unwrap();

        let clone = g.clone_node(&n("2"), None).unwrap();
        assert_eq!(clone, n("2'"));
        let merged = g.merge_nodes(&[n("1"), n("3")], None).unwrap();
        assert_eq!(merged, n("1_3"));

        let node_ids: Vec<NodeId> = g.node_ids().cloned().collect();
        assert_eq!(node_ids, vec![n("1_3"), n("2"), n("2'")]);
        assert!(g.exists_edge(&n("1_3"), &n("2")));
        assert!(g.exists_edge(&n("1_3"), &n("2'")));
        assert_eq!(g.edge_count(), 2);

        let merged_attrs = g.get_node_attrs(&n("1_3")).unwrap();
        assert!(merged_attrs["color"].equals(&AttributeSet::strings(["blue"])));
        assert!(merged_attrs["name"].equals(&AttributeSet::strings(["alice", "john"])));
    }

    /// Matching with edge-attribute subsumption before and after an
    /// attribute removal.
    #[test]
    fn matcher_with_attributes_scenario() {
        let mut g = Graph::new();
        g.add_node("1_3", Attributes::new()).unwrap();
        g.add_node("2", Attributes::new()).unwrap();
        g.add_node("2'", Attributes::new()).unwrap();
        let friends = attrs([("friends", AttributeSet::finite([true.into()]))]);
        g.add_edge("1_3", "2", friends.clone()).unwrap();
        g.add_edge("1_3", "2'", friends.clone()).unwrap();

        let mut pattern = Graph::from_elements(["x", "y"], []).unwrap();
        pattern.add_edge("x", "y", friends.clone()).unwrap();

        assert_eq!(g.find_matching(&pattern).count(), 2);

        g.remove_edge_attrs(&n("1_3"), &n("2"), &friends).unwrap();
        let found: Vec<NodeMapping> = g.find_matching(&pattern).collect();
        assert_eq!(found, vec![mapping([("x", "1_3"), ("y", "2'")])]);
    }

    /// Backward propagation: cloning a type node clones every instance.
    #[test]
    fn backward_propagation_scenario() {
        let mut h = Hierarchy::new();
        let g = Graph::from_elements(
            ["protein", "region", "binding"],
            [("protein", "binding"), ("region", "binding")],
        )
        .unwrap();
        let t = Graph::from_elements(["agent", "action"], [("agent", "action")]).unwrap();
        h.add_graph("g", g, Attributes::new()).unwrap();
        h.add_graph("t", t, Attributes::new()).unwrap();
        h.add_typing(
            "g",
            "t",
            mapping([
                ("protein", "agent"),
                ("region", "agent"),
                ("binding", "action"),
            ]),
        )
        .unwrap();

        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        rule.inject_clone_node(&n("x"), None).unwrap();
        h.rewrite("t", &rule, &mapping([("x", "agent")]), None, None, false)
            .unwrap();

        let t_nodes: Vec<NodeId> = h.get_graph("t").unwrap().node_ids().cloned().collect();
        assert_eq!(t_nodes, vec![n("action"), n("agent"), n("agent'")]);

        let g_nodes: Vec<NodeId> = h.get_graph("g").unwrap().node_ids().cloned().collect();
        assert_eq!(
            g_nodes,
            vec![
                n("binding"),
                n("protein"),
                n("protein'"),
                n("region"),
                n("region'"),
            ]
        );

        // The typing stays total and structure-preserving.
        let typing = h.direct_typing("g", "t").unwrap().clone();
        check_homomorphism(h.get_graph("g").unwrap(), h.get_graph("t").unwrap(), &typing)
            .unwrap();
        assert_eq!(typing.len(), 5);
        // Each clone is typed by one of the two agent copies.
        let agent_copies: Vec<&NodeId> = typing
            .values()
            .filter(|v| v.as_str().starts_with("agent"))
            .collect();
        assert_eq!(agent_copies.len(), 4);
    }

    /// Backward propagation with `p_typing`: assigned instances are
    /// retyped instead of cloned.
    #[test]
    fn backward_propagation_with_assignment() {
        let mut h = Hierarchy::new();
        let g = Graph::from_elements(["protein"], []).unwrap();
        let t = Graph::from_elements(["agent"], []).unwrap();
        h.add_graph("g", g, Attributes::new()).unwrap();
        h.add_graph("t", t, Attributes::new()).unwrap();
        h.add_typing("g", "t", mapping([("protein", "agent")])).unwrap();

        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        let (p_clone, _) = rule.inject_clone_node(&n("x"), None).unwrap();

        let p_typing: PTyping = [(
            "g".to_string(),
            [(n("protein"), p_clone)].into_iter().collect(),
        )]
        .into_iter()
        .collect();

        h.rewrite(
            "t",
            &rule,
            &mapping([("x", "agent")]),
            Some(&p_typing),
            None,
            false,
        )
        .unwrap();

        // No cloning happened in g; protein follows the assigned copy.
        assert_eq!(h.get_graph("g").unwrap().node_count(), 1);
        let typing = h.direct_typing("g", "t").unwrap();
        assert_eq!(typing[&n("protein")], n("agent'"));
    }

    /// Forward propagation: merging instances merges their types.
    #[test]
    fn forward_propagation_scenario() {
        let mut h = Hierarchy::new();
        let g2 = Graph::from_elements(["good_circle", "bad_circle"], []).unwrap();
        let quality = Graph::from_elements(["good", "bad"], []).unwrap();
        h.add_graph("g2", g2, Attributes::new()).unwrap();
        h.add_graph("quality", quality, Attributes::new()).unwrap();
        h.add_typing(
            "g2",
            "quality",
            mapping([("good_circle", "good"), ("bad_circle", "bad")]),
        )
        .unwrap();

        let mut rule = Rule::from_pattern(Graph::from_elements(["x", "y"], []).unwrap());
        rule.inject_merge_nodes(&[n("x"), n("y")], None).unwrap();
        h.rewrite(
            "g2",
            &rule,
            &mapping([("x", "good_circle"), ("y", "bad_circle")]),
            None,
            None,
            false,
        )
        .unwrap();

        let merged_g2 = n("bad_circle_good_circle");
        assert!(h.get_graph("g2").unwrap().contains_node(&merged_g2));

        let quality_nodes: Vec<NodeId> =
            h.get_graph("quality").unwrap().node_ids().cloned().collect();
        assert_eq!(quality_nodes, vec![n("bad_good")]);

        let typing = h.direct_typing("g2", "quality").unwrap();
        assert_eq!(typing[&merged_g2], n("bad_good"));
    }

    /// Forward propagation of additions without `rhs_typing` cascades new
    /// nodes into every descendant; with `rhs_typing` the provided image
    /// is used.
    #[test]
    fn forward_propagation_of_additions() {
        let mut h = Hierarchy::new();
        h.add_graph("g", Graph::from_elements(["a"], []).unwrap(), Attributes::new())
            .unwrap();
        h.add_graph("t", Graph::from_elements(["ty"], []).unwrap(), Attributes::new())
            .unwrap();
        h.add_typing("g", "t", mapping([("a", "ty")])).unwrap();

        let mut rule = Rule::from_pattern(Graph::new());
        rule.inject_add_node("fresh", Attributes::new()).unwrap();

        // Without rhs_typing: 'fresh' cascades into t.
        let mut h1 = h.clone();
        h1.rewrite("g", &rule, &NodeMapping::new(), None, None, false)
            .unwrap();
        assert!(h1.get_graph("g").unwrap().contains_node(&n("fresh")));
        assert!(h1.get_graph("t").unwrap().contains_node(&n("fresh")));
        let typing = h1.direct_typing("g", "t").unwrap();
        assert_eq!(typing[&n("fresh")], n("fresh"));

        // With rhs_typing: 'fresh' is typed by the existing node.
        let rhs_typing: RhsTyping = [(
            "t".to_string(),
            [(n("fresh"), n("ty"))].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        let mut h2 = h.clone();
        h2.rewrite("g", &rule, &NodeMapping::new(), None, Some(&rhs_typing), false)
            .unwrap();
        assert_eq!(h2.get_graph("t").unwrap().node_count(), 1);
        let typing = h2.direct_typing("g", "t").unwrap();
        assert_eq!(typing[&n("fresh")], n("ty"));
    }

    /// Strict mode rejects every rule that would force propagation, with
    /// the offending element and graph named.
    #[test]
    fn strict_mode_denials() {
        let mut h = Hierarchy::new();
        let g = Graph::from_elements(["protein"], []).unwrap();
        let t = Graph::from_elements(["agent", "action"], []).unwrap();
        h.add_graph("g", g, Attributes::new()).unwrap();
        h.add_graph("t", t, Attributes::new()).unwrap();
        h.add_typing("g", "t", mapping([("protein", "agent")])).unwrap();

        // Deleting a node with an inbound instance.
        let mut deleter = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        deleter.inject_remove_node(&n("x")).unwrap();
        let err = h.rewrite("t", &deleter, &mapping([("x", "agent")]), None, None, true);
        assert!(matches!(
            err,
            Err(HierarchyError::Rewriting(RewritingError::ForcedPropagation { .. }))
        ));
        // Deleting the uninstantiated node is fine.
        h.rewrite("t", &deleter, &mapping([("x", "action")]), None, None, true)
            .unwrap();

        // Cloning with instances and no assignment.
        let mut cloner = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        cloner.inject_clone_node(&n("x"), None).unwrap();
        let err = h.rewrite("t", &cloner, &mapping([("x", "agent")]), None, None, true);
        assert!(matches!(
            err,
            Err(HierarchyError::Rewriting(RewritingError::ForcedPropagation { .. }))
        ));

        // Adding a node without rhs_typing in the graph below.
        let mut adder = Rule::from_pattern(Graph::new());
        adder.inject_add_node("fresh", Attributes::new()).unwrap();
        let err = h.rewrite("g", &adder, &NodeMapping::new(), None, None, true);
        assert!(matches!(
            err,
            Err(HierarchyError::Rewriting(RewritingError::ForcedPropagation { .. }))
        ));

        // The same addition with a full rhs_typing is accepted.
        let rhs_typing: RhsTyping = [(
            "t".to_string(),
            [(n("fresh"), n("agent"))].into_iter().collect(),
        )]
        .into_iter()
        .collect();
        h.rewrite("g", &adder, &NodeMapping::new(), None, Some(&rhs_typing), true)
            .unwrap();
        assert_eq!(h.get_graph("t").unwrap().node_count(), 1);
    }

    /// Triangles commute after propagation through a three-level chain.
    #[test]
    fn propagation_keeps_triangles_commuting() {
        let mut h = Hierarchy::new();
        let bottom = Graph::from_elements(["p1", "p2"], []).unwrap();
        let mid = Graph::from_elements(["agent"], []).unwrap();
        let top = Graph::from_elements(["entity"], []).unwrap();
        h.add_graph("bottom", bottom, Attributes::new()).unwrap();
        h.add_graph("mid", mid, Attributes::new()).unwrap();
        h.add_graph("top", top, Attributes::new()).unwrap();
        h.add_typing("bottom", "mid", mapping([("p1", "agent"), ("p2", "agent")]))
            .unwrap();
        h.add_typing("mid", "top", mapping([("agent", "entity")])).unwrap();
        h.add_typing(
            "bottom",
            "top",
            mapping([("p1", "entity"), ("p2", "entity")]),
        )
        .unwrap();

        // Clone in the middle; bottom clones too, top is unaffected.
        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        rule.inject_clone_node(&n("x"), None).unwrap();
        h.rewrite("mid", &rule, &mapping([("x", "agent")]), None, None, false)
            .unwrap();

        assert_eq!(h.get_graph("bottom").unwrap().node_count(), 4);
        assert_eq!(h.get_graph("mid").unwrap().node_count(), 2);
        assert_eq!(h.get_graph("top").unwrap().node_count(), 1);

        // bottom -> mid -> top agrees with bottom -> top on every node.
        let via_mid = compose(
            h.direct_typing("bottom", "mid").unwrap(),
            h.direct_typing("mid", "top").unwrap(),
        )
        .unwrap();
        let direct = h.direct_typing("bottom", "top").unwrap().clone();
        assert_eq!(via_mid, direct);
    }

    /// Relations survive rewriting and drop stale entries.
    #[test]
    fn relations_revalidated_after_rewrite() {
        let mut h = Hierarchy::new();
        h.add_graph(
            "left",
            Graph::from_elements(["a", "b"], []).unwrap(),
            Attributes::new(),
        )
        .unwrap();
        h.add_graph(
            "right",
            Graph::from_elements(["x"], []).unwrap(),
            Attributes::new(),
        )
        .unwrap();
        h.add_relation(
            "left",
            "right",
            [(n("a"), n("x")), (n("b"), n("x"))].into_iter().collect(),
        )
        .unwrap();

        let mut deleter = Rule::from_pattern(Graph::from_elements(["d"], []).unwrap());
        deleter.inject_remove_node(&n("d")).unwrap();
        h.rewrite("left", &deleter, &mapping([("d", "a")]), None, None, false)
            .unwrap();

        let relation = h.get_relation("left", "right").unwrap();
        assert_eq!(relation.len(), 1);
        assert!(relation.contains(&(n("b"), n("x"))));
    }

    /// JSON round trip at the graph level.
    #[test]
    fn graph_json_round_trip() {
        let mut g = Graph::new();
        g.add_node(
            "a",
            attrs([
                ("color", AttributeSet::strings(["blue"])),
                ("span", AttributeSet::integers(IntegerSet::from_ints([1, 2, 3]))),
            ]),
        )
        .unwrap();
        g.add_node("b", Attributes::new()).unwrap();
        g.add_edge("a", "b", attrs([("kind", AttributeSet::regex("[a-z]+").unwrap())]))
            .unwrap();
        let back = Graph::from_json(&g.to_json()).unwrap();
        assert_eq!(g, back);
    }

    /// Audit scenario: three commits on a hierarchy, rollback to the
    /// first; heads move, history is retained, state equals the state
    /// after the first commit.
    #[test]
    fn audit_rollback_scenario() {
        let mut h = Hierarchy::new();
        h.add_graph("shapes", Graph::new(), Attributes::new()).unwrap();

        let mut vh = VersionedHierarchy::new(h, "master");

        let add = |node: &str| {
            let mut rule = Rule::from_pattern(Graph::new());
            rule.inject_add_node(node, Attributes::new()).unwrap();
            rule
        };

        let a = vh
            .rewrite("shapes", &add("circle"), &NodeMapping::new(), None, None, "commit a")
            .unwrap();
        vh.rewrite("shapes", &add("square"), &NodeMapping::new(), None, None, "commit b")
            .unwrap();
        vh.rewrite("shapes", &add("triangle"), &NodeMapping::new(), None, None, "commit c")
            .unwrap();

        let history_before = vh.print_history();
        assert!(history_before.contains("commit a"));
        assert!(history_before.contains("commit b"));
        assert!(history_before.contains("commit c"));

        vh.rollback(&a).unwrap();

        let shapes = vh.hierarchy().get_graph("shapes").unwrap();
        assert!(shapes.contains_node(&n("circle")));
        assert!(!shapes.contains_node(&n("square")));
        assert!(!shapes.contains_node(&n("triangle")));
        assert_eq!(vh.head("master").unwrap(), a);
        // No new commits were appended and none were destroyed.
        assert_eq!(vh.print_history(), history_before);
    }

    /// Branching and merging a versioned graph replays the other branch's
    /// rewrites onto the current one.
    #[test]
    fn versioned_graph_merge_scenario() {
        let mut g = Graph::new();
        g.add_node("seed", Attributes::new()).unwrap();
        let mut vg = VersionedGraph::new(g, "master");

        let mut grow = Rule::from_pattern(Graph::from_elements(["s"], []).unwrap());
        grow.inject_add_node("leaf", Attributes::new()).unwrap();
        grow.inject_add_edge(&n("leaf"), &n("s"), Attributes::new())
            .unwrap();

        vg.branch("feature").unwrap();
        vg.rewrite(&grow, &mapping([("s", "seed")]), "grow a leaf")
            .unwrap();
        vg.switch_branch("master").unwrap();
        assert!(!vg.graph().contains_node(&n("leaf")));

        vg.merge_with("feature").unwrap();
        assert!(vg.graph().contains_node(&n("leaf")));
        assert!(vg.graph().exists_edge(&n("leaf"), &n("seed")));
    }
}
