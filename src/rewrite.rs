//! The sesqui-pushout rewrite engine.
//!
//! Rewriting a graph `G` along a rule `L ←ℓ P →ρ R` at an instance
//! `m: L → G` is computed in two categorical halves:
//!
//! 1. [`pullback_complement`], the final pullback complement of
//!    `P → L → G`: clones matched nodes once per extra ℓ-preimage, then
//!    deletes unmatched elements and attribute differences;
//! 2. [`pushout`], the pushout of `P → G* ← P → R`: adds `R`-elements with
//!    no ρ-preimage, then merges the ρ-fibers and unions attributes.
//!
//! Preserved identifiers survive in place; clone and added-node identifiers
//! are minted deterministically from the target graph's id-space.
//! [`Rule::apply_to`] chains the two halves on a scratch copy, so a failed
//! rewrite leaves the input untouched.
//!
//! # Citations
//! - Corradini, Heindel, Hermann, König, "Sesqui-Pushout Rewriting" (ICGT 2006)
//! - Final pullback complements: Dyckhoff & Tholen, "Exponentiable morphisms,
//!   partial products and pullback complements" (1987)

use crate::attribute_set::{sub_attrs, AttributeSetError};
use crate::graph::{Graph, GraphError, NodeId};
use crate::homomorphism::{
    check_homomorphism, identity_mapping, is_monic, keys_by_value, HomomorphismError, NodeMapping,
};
use crate::rule::Rule;
use std::collections::BTreeSet;
use std::fmt;

/// Error type for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewritingError {
    /// The instance is not a valid homomorphism `L → G`.
    InvalidMatch(HomomorphismError),
    /// The instance is not injective.
    MatchNotInjective,
    /// An attribute difference is inexpressible on a preserved element.
    AttributeIncompatible {
        /// Description of the offending element.
        element: String,
        /// The underlying lattice failure.
        reason: AttributeSetError,
    },
    /// Strict-mode denial: the rule would force propagation.
    ForcedPropagation {
        /// The hierarchy graph that would be affected.
        graph: String,
        /// Description of the offending rule element.
        element: String,
        /// What kind of propagation would be forced.
        action: &'static str,
    },
    /// An underlying graph edit failed.
    Graph(GraphError),
}

impl fmt::Display for RewritingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewritingError::InvalidMatch(err) => write!(f, "invalid match: {}", err),
            RewritingError::MatchNotInjective => {
                write!(f, "invalid match: the instance is not injective")
            }
            RewritingError::AttributeIncompatible { element, reason } => {
                write!(f, "attribute incompatible on {}: {}", element, reason)
            }
            RewritingError::ForcedPropagation {
                graph,
                element,
                action,
            } => write!(
                f,
                "strict rewriting denied: {} would force {} in graph '{}'",
                element, action, graph
            ),
            RewritingError::Graph(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RewritingError {}

impl From<GraphError> for RewritingError {
    fn from(err: GraphError) -> Self {
        RewritingError::Graph(err)
    }
}

impl From<AttributeSetError> for RewritingError {
    fn from(err: AttributeSetError) -> Self {
        RewritingError::AttributeIncompatible {
            element: "a preserved element".to_string(),
            reason: err,
        }
    }
}

/// The final pullback complement of `P →ℓ L →m G`.
///
/// Returns the complement graph `G*` together with `P → G*` and `G* → G`.
/// `m` must be monic. Matched nodes with several ℓ-preimages are cloned
/// (first preimage keeps the original identifier, later ones get minted
/// clones, in preimage order); unmatched `L`-elements are removed with
/// cascading; attribute differences `L ∖ P` are subtracted from survivors.
pub fn pullback_complement(
    p: &Graph,
    lhs: &Graph,
    g: &Graph,
    p_lhs: &NodeMapping,
    instance: &NodeMapping,
) -> Result<(Graph, NodeMapping, NodeMapping), RewritingError> {
    check_homomorphism(p, lhs, p_lhs).map_err(RewritingError::InvalidMatch)?;
    check_homomorphism(lhs, g, instance).map_err(RewritingError::InvalidMatch)?;
    if !is_monic(instance) {
        return Err(RewritingError::MatchNotInjective);
    }

    let mut gm = g.clone();
    let mut p_gm = NodeMapping::new();
    let mut gm_g = identity_mapping(g.node_ids());

    // Clone or remove matched nodes according to their ℓ-fiber.
    for l_node in lhs.node_ids() {
        let g_node = &instance[l_node];
        let preimages = keys_by_value(p_lhs, l_node);
        match preimages.len() {
            0 => {
                gm.remove_node(g_node)?;
                gm_g.remove(g_node);
            }
            1 => {
                p_gm.insert(preimages[0].clone(), g_node.clone());
            }
            _ => {
                for (index, p_node) in preimages.iter().enumerate() {
                    if index == 0 {
                        p_gm.insert(p_node.clone(), g_node.clone());
                    } else {
                        let clone = gm.clone_node(g_node, None)?;
                        p_gm.insert(p_node.clone(), clone.clone());
                        gm_g.insert(clone, g_node.clone());
                    }
                }
            }
        }
    }

    // Remove edges matched by L but not preserved by P, per preimage pair.
    for (lu, lv, _) in lhs.edges() {
        for pu in keys_by_value(p_lhs, lu) {
            for pv in keys_by_value(p_lhs, lv) {
                if !p.exists_edge(&pu, &pv) {
                    let (gu, gv) = (&p_gm[&pu], &p_gm[&pv]);
                    if gm.exists_edge(gu, gv) {
                        gm.remove_edge(gu, gv)?;
                    }
                }
            }
        }
    }

    // Subtract attribute differences L ∖ P from preserved elements.
    for (p_node, p_attrs) in p.nodes() {
        let l_node = &p_lhs[p_node];
        if let Some(l_attrs) = lhs.get_node_attrs(l_node) {
            let removed = sub_attrs(l_attrs, p_attrs).map_err(|reason| {
                RewritingError::AttributeIncompatible {
                    element: format!("node '{}'", p_node),
                    reason,
                }
            })?;
            if !removed.is_empty() {
                gm.remove_node_attrs(&p_gm[p_node], &removed)?;
            }
        }
    }
    for (pu, pv, p_attrs) in p.edges() {
        let (lu, lv) = (&p_lhs[pu], &p_lhs[pv]);
        if let Some(l_attrs) = lhs.get_edge_attrs(lu, lv) {
            let removed = sub_attrs(l_attrs, p_attrs).map_err(|reason| {
                RewritingError::AttributeIncompatible {
                    element: format!("edge '{}'->'{}'", pu, pv),
                    reason,
                }
            })?;
            if !removed.is_empty() {
                gm.remove_edge_attrs(&p_gm[pu], &p_gm[pv], &removed)?;
            }
        }
    }

    Ok((gm, p_gm, gm_g))
}

/// The pushout of the span `G* ←p_gm P →ρ R`.
///
/// Returns the derived graph `G'` together with `G* → G'` and `R → G'`.
/// `R`-nodes with no ρ-preimage are added (identifiers minted from the
/// target's id-space); ρ-fibers of size two or more merge the corresponding
/// `G*`-nodes; added edges and attribute differences union in.
pub fn pushout(
    p: &Graph,
    gm: &Graph,
    rhs: &Graph,
    p_gm: &NodeMapping,
    p_rhs: &NodeMapping,
) -> Result<(Graph, NodeMapping, NodeMapping), RewritingError> {
    let mut d = gm.clone();
    let mut gm_d = identity_mapping(gm.node_ids());
    let mut rhs_d = NodeMapping::new();

    // Nodes: add, keep, or merge according to the ρ-fiber.
    for (r_node, r_attrs) in rhs.nodes() {
        let fiber = keys_by_value(p_rhs, r_node);
        match fiber.len() {
            0 => {
                let fresh = d.generate_new_id(r_node);
                d.add_node(fresh.clone(), r_attrs.clone())?;
                rhs_d.insert(r_node.clone(), fresh);
            }
            1 => {
                let image = gm_d[&p_gm[&fiber[0]]].clone();
                rhs_d.insert(r_node.clone(), image);
            }
            _ => {
                let mut members: Vec<NodeId> = Vec::new();
                for p_node in &fiber {
                    let image = gm_d[&p_gm[p_node]].clone();
                    if !members.contains(&image) {
                        members.push(image);
                    }
                }
                let merged = d.merge_nodes(&members, None)?;
                let member_set: BTreeSet<NodeId> = members.into_iter().collect();
                for image in gm_d.values_mut() {
                    if member_set.contains(image) {
                        *image = merged.clone();
                    }
                }
                for image in rhs_d.values_mut() {
                    if member_set.contains(image) {
                        *image = merged.clone();
                    }
                }
                rhs_d.insert(r_node.clone(), merged);
            }
        }
    }

    // Edges: ensure every R-edge has an image, unioning attributes in.
    for (ru, rv, r_attrs) in rhs.edges() {
        let (du, dv) = (rhs_d[ru].clone(), rhs_d[rv].clone());
        if d.exists_edge(&du, &dv) {
            d.add_edge_attrs(&du, &dv, r_attrs)?;
        } else {
            d.add_edge(du, dv, r_attrs.clone())?;
        }
    }

    // Node attributes: union R's values into preserved and merged images.
    for (r_node, r_attrs) in rhs.nodes() {
        if !keys_by_value(p_rhs, r_node).is_empty() {
            d.add_node_attrs(&rhs_d[r_node], r_attrs)?;
        }
    }

    Ok((d, gm_d, rhs_d))
}

impl Rule {
    /// Applies the rule to `graph` at `instance`, producing the derived
    /// graph and the RHS instance `R → G'`.
    ///
    /// The construction is pure: the input graph is untouched. Use
    /// [`Graph::rewrite`] for the in-place variant.
    pub fn apply_to(
        &self,
        graph: &Graph,
        instance: &NodeMapping,
    ) -> Result<(Graph, NodeMapping), RewritingError> {
        let (gm, p_gm, _gm_g) =
            pullback_complement(self.p(), self.lhs(), graph, self.p_lhs(), instance)?;
        let (g_prime, _gm_gp, rhs_instance) =
            pushout(self.p(), &gm, self.rhs(), &p_gm, self.p_rhs())?;
        Ok((g_prime, rhs_instance))
    }
}

impl Graph {
    /// Rewrites this graph in place along `rule` at `instance`.
    ///
    /// Atomic in intent: the rewrite happens on a scratch copy and is
    /// swapped in only on success.
    pub fn rewrite(
        &mut self,
        rule: &Rule,
        instance: &NodeMapping,
    ) -> Result<NodeMapping, RewritingError> {
        let (g_prime, rhs_instance) = rule.apply_to(self, instance)?;
        *self = g_prime;
        Ok(rhs_instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_set::{attrs, attrs_equal, AttributeSet, Attributes};
    use crate::homomorphism::{compose, mapping};

    fn n(id: &str) -> NodeId {
        NodeId::from(id)
    }

    #[test]
    fn identity_rule_is_identity() {
        let mut g = Graph::from_elements(["a", "b"], [("a", "b")]).unwrap();
        let snapshot = g.clone();
        let rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        let rhs_instance = g.rewrite(&rule, &mapping([("x", "a")])).unwrap();
        assert_eq!(g, snapshot);
        assert_eq!(rhs_instance, mapping([("x", "a")]));
    }

    #[test]
    fn invalid_match_is_rejected_and_graph_untouched() {
        let mut g = Graph::from_elements(["a", "b"], []).unwrap();
        let snapshot = g.clone();
        let rule = Rule::from_pattern(Graph::from_elements(["x", "y"], [("x", "y")]).unwrap());
        // No edge a->b, so the instance is not a homomorphism.
        let err = g.rewrite(&rule, &mapping([("x", "a"), ("y", "b")]));
        assert!(matches!(err, Err(RewritingError::InvalidMatch(_))));
        assert_eq!(g, snapshot);

        // Non-injective instance.
        let rule2 = Rule::from_pattern(Graph::from_elements(["x", "y"], []).unwrap());
        let err = g.rewrite(&rule2, &mapping([("x", "a"), ("y", "a")]));
        assert!(matches!(err, Err(RewritingError::MatchNotInjective)));
    }

    #[test]
    fn deletion_cascades_edges() {
        let mut g = Graph::from_elements(["a", "b", "c"], [("a", "b"), ("b", "c")]).unwrap();
        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        rule.inject_remove_node(&n("x")).unwrap();
        g.rewrite(&rule, &mapping([("x", "b")])).unwrap();
        assert!(!g.contains_node(&n("b")));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn clone_and_add_scenario() {
        // G = a -> b -> c -> d; clone the node matched by 1, remove the
        // edge (2,3), add new_node and an edge new_node -> 1.
        let mut g =
            Graph::from_elements(["a", "b", "c", "d"], [("a", "b"), ("b", "c"), ("c", "d")])
                .unwrap();
        let pattern = Graph::from_elements(["1", "2", "3"], [("2", "3")]).unwrap();
        let mut rule = Rule::from_pattern(pattern);
        rule.inject_clone_node(&n("1"), None).unwrap();
        rule.inject_remove_edge(&n("2"), &n("3")).unwrap();
        rule.inject_add_node("new_node", Attributes::new()).unwrap();
        rule.inject_add_edge(&n("new_node"), &n("1"), Attributes::new())
            .unwrap();

        let instance = mapping([("1", "a"), ("2", "c"), ("3", "d")]);
        let rhs_instance = g.rewrite(&rule, &instance).unwrap();

        let expected_nodes: Vec<NodeId> =
            ["a", "a'", "b", "c", "d", "new_node"].iter().map(|s| n(s)).collect();
        let got_nodes: Vec<NodeId> = g.node_ids().cloned().collect();
        assert_eq!(got_nodes, expected_nodes);

        assert!(g.exists_edge(&n("a"), &n("b")));
        assert!(g.exists_edge(&n("a'"), &n("b")));
        assert!(g.exists_edge(&n("new_node"), &n("a")));
        assert!(!g.exists_edge(&n("c"), &n("d")));
        assert_eq!(g.edge_count(), 3);

        assert_eq!(rhs_instance[&n("new_node")], n("new_node"));
        assert_eq!(rhs_instance[&n("1")], n("a"));
    }

    #[test]
    fn merge_via_rule() {
        let mut g = Graph::new();
        g.add_node("1", attrs([("color", AttributeSet::strings(["blue"]))]))
            .unwrap();
        g.add_node("3", attrs([("color", AttributeSet::strings(["red"]))]))
            .unwrap();
        g.add_node("2", Attributes::new()).unwrap();
        g.add_edge("1", "2", Attributes::new()).unwrap();
        g.add_edge("3", "2", Attributes::new()).unwrap();

        let mut rule = Rule::from_pattern(Graph::from_elements(["x", "y"], []).unwrap());
        rule.inject_merge_nodes(&[n("x"), n("y")], None).unwrap();

        let rhs_instance = g.rewrite(&rule, &mapping([("x", "1"), ("y", "3")])).unwrap();
        let merged = n("1_3");
        assert!(g.contains_node(&merged));
        assert!(g.exists_edge(&merged, &n("2")));
        assert_eq!(g.node_count(), 2);
        let got = g.get_node_attrs(&merged).unwrap();
        assert!(got["color"].contains(&"blue".into()));
        assert!(got["color"].contains(&"red".into()));
        assert_eq!(rhs_instance[&n("x_y")], merged);
    }

    #[test]
    fn attribute_removal_via_rule() {
        let mut g = Graph::new();
        g.add_node(
            "a",
            attrs([("color", AttributeSet::strings(["blue", "red"]))]),
        )
        .unwrap();
        let mut pattern = Graph::new();
        pattern
            .add_node("x", attrs([("color", AttributeSet::strings(["blue"]))]))
            .unwrap();
        let mut rule = Rule::from_pattern(pattern);
        rule.inject_remove_node_attrs(&n("x"), &attrs([("color", AttributeSet::strings(["blue"]))]))
            .unwrap();

        g.rewrite(&rule, &mapping([("x", "a")])).unwrap();
        let got = g.get_node_attrs(&n("a")).unwrap();
        assert!(attrs_equal(
            got,
            &attrs([("color", AttributeSet::strings(["red"]))])
        ));
    }

    #[test]
    fn rewrite_then_inverse_restores_for_clone_free_rules() {
        let mut g = Graph::from_elements(["a", "b"], [("a", "b")]).unwrap();
        let snapshot = g.clone();

        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        rule.inject_add_node("fresh", Attributes::new()).unwrap();
        rule.inject_add_edge(&n("fresh"), &n("x"), Attributes::new())
            .unwrap();

        let rhs_instance = g.rewrite(&rule, &mapping([("x", "a")])).unwrap();
        assert!(g.contains_node(&n("fresh")));

        // The inverse rule, matched at the RHS instance, undoes the change.
        let inverse = rule.inverted();
        let back: NodeMapping = rhs_instance;
        g.rewrite(&inverse, &back).unwrap();
        assert_eq!(g, snapshot);
    }

    #[test]
    fn pullback_complement_factors_through_original() {
        let g = Graph::from_elements(["a", "b"], [("a", "b")]).unwrap();
        let pattern = Graph::from_elements(["x", "y"], [("x", "y")]).unwrap();
        let mut rule = Rule::from_pattern(pattern);
        rule.inject_clone_node(&n("x"), None).unwrap();

        let instance = mapping([("x", "a"), ("y", "b")]);
        let (gm, p_gm, gm_g) =
            pullback_complement(rule.p(), rule.lhs(), &g, rule.p_lhs(), &instance).unwrap();
        // Every G*-node maps back into G, and P factors through G*.
        check_homomorphism(&gm, &g, &gm_g).unwrap();
        check_homomorphism(rule.p(), &gm, &p_gm).unwrap();
        // The composite P -> G* -> G agrees with m ∘ ℓ.
        let via_gm = compose(&p_gm, &gm_g).unwrap();
        let via_lhs = compose(rule.p_lhs(), &instance).unwrap();
        assert_eq!(via_gm, via_lhs);
    }
}
