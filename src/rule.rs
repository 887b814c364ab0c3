//! Rewriting rules: spans `L ← P → R`.
//!
//! A [`Rule`] is a span of graphs with two homomorphisms. `L` is the matched
//! pattern, `P` the preserved interface, `R` the produced result. The
//! derived transformations follow from the span shape: an `L`-element with
//! no preimage under `P → L` is deleted, multiple preimages clone it; an
//! `R`-element with no preimage under `P → R` is added, multiple preimages
//! merge their clones.
//!
//! Rules are built either explicitly (all three graphs and both mappings,
//! validated) or in transform-from-pattern mode: start from `L` with
//! `P = R = L` and inject primitive edits, each of which keeps the span
//! well-formed.
//!
//! # Citations
//! - Sesqui-pushout rewriting: Corradini, Heindel, Hermann, König,
//!   "Sesqui-Pushout Rewriting" (ICGT 2006)
//! - Span-based rules: Ehrig et al., "Fundamentals of Algebraic Graph
//!   Transformation" (2006)

use crate::attribute_set::{sub_attrs, union_attrs, AttributeSetError, Attributes};
use crate::graph::{Graph, GraphError, NodeId};
use crate::homomorphism::{
    check_homomorphism, identity_mapping, keys_by_value, HomomorphismError, NodeMapping,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Error type for rule construction and injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A span homomorphism is invalid.
    InvalidSpan(HomomorphismError),
    /// The referenced node is not in the named part of the span.
    MissingNode {
        /// `"lhs"`, `"p"` or `"rhs"`.
        part: &'static str,
        /// The missing node.
        node: NodeId,
    },
    /// The referenced edge is not in the named part of the span.
    MissingEdge {
        /// `"lhs"`, `"p"` or `"rhs"`.
        part: &'static str,
        /// Edge origin.
        from: NodeId,
        /// Edge destination.
        to: NodeId,
    },
    /// Cloning was requested for a node the rule already removes.
    AlreadyRemoved(NodeId),
    /// An underlying graph edit failed.
    Graph(GraphError),
    /// An attribute operation failed.
    Attribute(AttributeSetError),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidSpan(err) => write!(f, "invalid rule span: {}", err),
            RuleError::MissingNode { part, node } => {
                write!(f, "node '{}' does not exist in the {} graph", node, part)
            }
            RuleError::MissingEdge { part, from, to } => {
                write!(f, "edge '{}'->'{}' does not exist in the {} graph", from, to, part)
            }
            RuleError::AlreadyRemoved(node) => write!(
                f,
                "cannot inject cloning: node '{}' is already removed by the rule",
                node
            ),
            RuleError::Graph(err) => write!(f, "{}", err),
            RuleError::Attribute(err) => write!(f, "attribute error: {}", err),
        }
    }
}

impl std::error::Error for RuleError {}

impl From<HomomorphismError> for RuleError {
    fn from(err: HomomorphismError) -> Self {
        RuleError::InvalidSpan(err)
    }
}

impl From<GraphError> for RuleError {
    fn from(err: GraphError) -> Self {
        RuleError::Graph(err)
    }
}

impl From<AttributeSetError> for RuleError {
    fn from(err: AttributeSetError) -> Self {
        RuleError::Attribute(err)
    }
}

/// A rewriting rule `L ←ℓ P →ρ R`.
///
/// Immutable once built, except through the `inject_*` family which keeps
/// the span well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    p: Graph,
    lhs: Graph,
    rhs: Graph,
    p_lhs: NodeMapping,
    p_rhs: NodeMapping,
}

impl Rule {
    /// Builds a rule from an explicit span, validating both homomorphisms.
    pub fn new(
        p: Graph,
        lhs: Graph,
        rhs: Graph,
        p_lhs: NodeMapping,
        p_rhs: NodeMapping,
    ) -> Result<Self, RuleError> {
        check_homomorphism(&p, &lhs, &p_lhs)?;
        check_homomorphism(&p, &rhs, &p_rhs)?;
        Ok(Self {
            p,
            lhs,
            rhs,
            p_lhs,
            p_rhs,
        })
    }

    /// Starts transform-from-pattern mode: `P = R = L` with identity
    /// mappings. Injections then specialize the span.
    pub fn from_pattern(lhs: Graph) -> Self {
        let ids = identity_mapping(lhs.node_ids());
        Self {
            p: lhs.clone(),
            rhs: lhs.clone(),
            lhs,
            p_lhs: ids.clone(),
            p_rhs: ids,
        }
    }

    /// The identity rule on the empty pattern.
    pub fn identity() -> Self {
        Self::from_pattern(Graph::new())
    }

    /// The pattern graph `L`.
    #[inline]
    pub fn lhs(&self) -> &Graph {
        &self.lhs
    }

    /// The preserved interface `P`.
    #[inline]
    pub fn p(&self) -> &Graph {
        &self.p
    }

    /// The result graph `R`.
    #[inline]
    pub fn rhs(&self) -> &Graph {
        &self.rhs
    }

    /// The homomorphism `P → L`.
    #[inline]
    pub fn p_lhs(&self) -> &NodeMapping {
        &self.p_lhs
    }

    /// The homomorphism `P → R`.
    #[inline]
    pub fn p_rhs(&self) -> &NodeMapping {
        &self.p_rhs
    }

    // ------------------------------------------------------------------
    // Injections
    // ------------------------------------------------------------------

    /// Injects cloning of the `L`-node `n`: adds a second preimage in `P`
    /// and a corresponding vertex in `R`. Returns the new `P` and `R`
    /// identifiers.
    pub fn inject_clone_node(
        &mut self,
        n: &NodeId,
        new_node_id: Option<NodeId>,
    ) -> Result<(NodeId, NodeId), RuleError> {
        let p_nodes = keys_by_value(&self.p_lhs, n);
        let Some(some_p_node) = p_nodes.first() else {
            if self.lhs.contains_node(n) {
                return Err(RuleError::AlreadyRemoved(n.clone()));
            }
            return Err(RuleError::MissingNode {
                part: "lhs",
                node: n.clone(),
            });
        };
        let p_new = self.p.clone_node(some_p_node, new_node_id)?;
        self.p_lhs.insert(p_new.clone(), n.clone());

        // Mirror the clone into the rhs, reconnecting through ρ.
        let rhs_base = self
            .p_rhs
            .get(some_p_node)
            .cloned()
            .unwrap_or_else(|| p_new.clone());
        let rhs_new = self.rhs.generate_new_id(&NodeId::new(format!("{}'", rhs_base)));
        let attrs = self.p.get_node_attrs(&p_new).cloned().unwrap_or_default();
        self.rhs.add_node(rhs_new.clone(), attrs)?;
        self.p_rhs.insert(p_new.clone(), rhs_new.clone());

        let preds: Vec<NodeId> = self.p.predecessors(&p_new).cloned().collect();
        for pred in preds {
            if pred == p_new {
                continue;
            }
            if let Some(rhs_pred) = self.p_rhs.get(&pred) {
                if !self.rhs.exists_edge(rhs_pred, &rhs_new) {
                    let attrs = self
                        .p
                        .get_edge_attrs(&pred, &p_new)
                        .cloned()
                        .unwrap_or_default();
                    self.rhs.add_edge(rhs_pred.clone(), rhs_new.clone(), attrs)?;
                }
            }
        }
        let succs: Vec<NodeId> = self.p.successors(&p_new).cloned().collect();
        for suc in succs {
            if let Some(rhs_suc) = self.p_rhs.get(&suc) {
                if !self.rhs.exists_edge(&rhs_new, rhs_suc) {
                    let attrs = self
                        .p
                        .get_edge_attrs(&p_new, &suc)
                        .cloned()
                        .unwrap_or_default();
                    self.rhs.add_edge(rhs_new.clone(), rhs_suc.clone(), attrs)?;
                }
            }
        }
        Ok((p_new, rhs_new))
    }

    /// Injects removal of a node: deletes the given `P`-node (and its `R`
    /// image when no other preimage shares it).
    pub fn inject_remove_node(&mut self, p_node: &NodeId) -> Result<(), RuleError> {
        if !self.p.contains_node(p_node) {
            return Err(RuleError::MissingNode {
                part: "p",
                node: p_node.clone(),
            });
        }
        self.p.remove_node(p_node)?;
        self.p_lhs.remove(p_node);
        if let Some(rhs_node) = self.p_rhs.remove(p_node) {
            if keys_by_value(&self.p_rhs, &rhs_node).is_empty() && self.rhs.contains_node(&rhs_node)
            {
                self.rhs.remove_node(&rhs_node)?;
            }
        }
        Ok(())
    }

    /// Injects removal of the edge between two `P`-nodes.
    pub fn inject_remove_edge(&mut self, u: &NodeId, v: &NodeId) -> Result<(), RuleError> {
        if !self.p.exists_edge(u, v) {
            return Err(RuleError::MissingEdge {
                part: "p",
                from: u.clone(),
                to: v.clone(),
            });
        }
        self.p.remove_edge(u, v)?;
        if let (Some(ru), Some(rv)) = (self.p_rhs.get(u).cloned(), self.p_rhs.get(v).cloned()) {
            if self.rhs.exists_edge(&ru, &rv) {
                self.rhs.remove_edge(&ru, &rv)?;
            }
        }
        Ok(())
    }

    /// Injects addition of a fresh node to `R`.
    pub fn inject_add_node(
        &mut self,
        node_id: impl Into<NodeId>,
        attrs: Attributes,
    ) -> Result<(), RuleError> {
        self.rhs.add_node(node_id, attrs)?;
        Ok(())
    }

    /// Injects addition of an edge between two `R`-nodes.
    pub fn inject_add_edge(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: Attributes,
    ) -> Result<(), RuleError> {
        self.rhs.add_edge(u.clone(), v.clone(), attrs)?;
        Ok(())
    }

    /// Injects merging of a set of `P`-nodes: their `R`-images are merged.
    /// Returns the merged `R`-identifier.
    pub fn inject_merge_nodes(
        &mut self,
        p_nodes: &[NodeId],
        node_id: Option<NodeId>,
    ) -> Result<NodeId, RuleError> {
        let mut rhs_targets: Vec<NodeId> = Vec::new();
        for p_node in p_nodes {
            let target = self
                .p_rhs
                .get(p_node)
                .cloned()
                .ok_or_else(|| RuleError::MissingNode {
                    part: "p",
                    node: p_node.clone(),
                })?;
            if !rhs_targets.contains(&target) {
                rhs_targets.push(target);
            }
        }
        let merged = self.rhs.merge_nodes(&rhs_targets, node_id)?;
        for image in self.p_rhs.values_mut() {
            if rhs_targets.contains(image) {
                *image = merged.clone();
            }
        }
        Ok(merged)
    }

    /// Injects addition of node attributes on an `R`-node.
    pub fn inject_add_node_attrs(
        &mut self,
        rhs_node: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), RuleError> {
        if !self.rhs.contains_node(rhs_node) {
            return Err(RuleError::MissingNode {
                part: "rhs",
                node: rhs_node.clone(),
            });
        }
        self.rhs.add_node_attrs(rhs_node, attrs)?;
        Ok(())
    }

    /// Injects removal of node attributes: subtracted from the `P`-node and
    /// its `R`-image, leaving the difference recorded in `L`.
    pub fn inject_remove_node_attrs(
        &mut self,
        p_node: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), RuleError> {
        if !self.p.contains_node(p_node) {
            return Err(RuleError::MissingNode {
                part: "p",
                node: p_node.clone(),
            });
        }
        self.p.remove_node_attrs(p_node, attrs)?;
        if let Some(rhs_node) = self.p_rhs.get(p_node).cloned() {
            self.rhs.remove_node_attrs(&rhs_node, attrs)?;
        }
        Ok(())
    }

    /// Injects addition of edge attributes on an `R`-edge.
    pub fn inject_add_edge_attrs(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), RuleError> {
        if !self.rhs.exists_edge(u, v) {
            return Err(RuleError::MissingEdge {
                part: "rhs",
                from: u.clone(),
                to: v.clone(),
            });
        }
        self.rhs.add_edge_attrs(u, v, attrs)?;
        Ok(())
    }

    /// Injects removal of edge attributes from a `P`-edge and its `R`-image.
    pub fn inject_remove_edge_attrs(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), RuleError> {
        if !self.p.exists_edge(u, v) {
            return Err(RuleError::MissingEdge {
                part: "p",
                from: u.clone(),
                to: v.clone(),
            });
        }
        self.p.remove_edge_attrs(u, v, attrs)?;
        if let (Some(ru), Some(rv)) = (self.p_rhs.get(u).cloned(), self.p_rhs.get(v).cloned()) {
            if self.rhs.exists_edge(&ru, &rv) {
                self.rhs.remove_edge_attrs(&ru, &rv, attrs)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    /// `L`-nodes with no preimage under ℓ: deleted by the rule.
    pub fn removed_nodes(&self) -> BTreeSet<NodeId> {
        self.lhs
            .node_ids()
            .filter(|n| keys_by_value(&self.p_lhs, n).is_empty())
            .cloned()
            .collect()
    }

    /// `P`-node pairs whose `L`-images form an edge absent from `P`:
    /// deleted by the rule.
    pub fn removed_edges(&self) -> BTreeSet<(NodeId, NodeId)> {
        let mut out = BTreeSet::new();
        for (lu, lv, _) in self.lhs.edges() {
            for pu in keys_by_value(&self.p_lhs, lu) {
                for pv in keys_by_value(&self.p_lhs, lv) {
                    if !self.p.exists_edge(&pu, &pv) {
                        out.insert((pu.clone(), pv.clone()));
                    }
                }
            }
        }
        out
    }

    /// Attribute values present in `L` but absent from every preimage in
    /// `P`, keyed by `L`-node: removed by the rule.
    pub fn removed_node_attrs(&self) -> Result<BTreeMap<NodeId, Attributes>, AttributeSetError> {
        let mut out = BTreeMap::new();
        for (l_node, l_attrs) in self.lhs.nodes() {
            let preimages = keys_by_value(&self.p_lhs, l_node);
            if preimages.is_empty() {
                continue;
            }
            let mut preserved = Attributes::new();
            for p_node in &preimages {
                if let Some(p_attrs) = self.p.get_node_attrs(p_node) {
                    preserved = union_attrs(&preserved, p_attrs)?;
                }
            }
            let removed = sub_attrs(l_attrs, &preserved)?;
            if !removed.is_empty() {
                out.insert(l_node.clone(), removed);
            }
        }
        Ok(out)
    }

    /// Attribute values removed from preserved edges, keyed by `P`-pair.
    pub fn removed_edge_attrs(
        &self,
    ) -> Result<BTreeMap<(NodeId, NodeId), Attributes>, AttributeSetError> {
        let mut out = BTreeMap::new();
        for (pu, pv, p_attrs) in self.p.edges() {
            let (Some(lu), Some(lv)) = (self.p_lhs.get(pu), self.p_lhs.get(pv)) else {
                continue;
            };
            if let Some(l_attrs) = self.lhs.get_edge_attrs(lu, lv) {
                let removed = sub_attrs(l_attrs, p_attrs)?;
                if !removed.is_empty() {
                    out.insert((pu.clone(), pv.clone()), removed);
                }
            }
        }
        Ok(out)
    }

    /// `L`-nodes with at least two preimages, with their sorted preimages:
    /// cloned by the rule.
    pub fn cloned_nodes(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut out = BTreeMap::new();
        for l_node in self.lhs.node_ids() {
            let preimages = keys_by_value(&self.p_lhs, l_node);
            if preimages.len() >= 2 {
                out.insert(l_node.clone(), preimages);
            }
        }
        out
    }

    /// `R`-nodes with no preimage under ρ: added by the rule.
    pub fn added_nodes(&self) -> BTreeSet<NodeId> {
        self.rhs
            .node_ids()
            .filter(|n| keys_by_value(&self.p_rhs, n).is_empty())
            .cloned()
            .collect()
    }

    /// `R`-edges that are not images of any `P`-edge: added by the rule.
    pub fn added_edges(&self) -> BTreeSet<(NodeId, NodeId)> {
        let mut preserved = BTreeSet::new();
        for (pu, pv, _) in self.p.edges() {
            if let (Some(ru), Some(rv)) = (self.p_rhs.get(pu), self.p_rhs.get(pv)) {
                preserved.insert((ru.clone(), rv.clone()));
            }
        }
        self.rhs
            .edges()
            .map(|(u, v, _)| (u.clone(), v.clone()))
            .filter(|edge| !preserved.contains(edge))
            .collect()
    }

    /// Attribute values present in `R` beyond every preimage in `P`, keyed
    /// by `R`-node: added by the rule (preserved nodes only).
    pub fn added_node_attrs(&self) -> Result<BTreeMap<NodeId, Attributes>, AttributeSetError> {
        let mut out = BTreeMap::new();
        for (r_node, r_attrs) in self.rhs.nodes() {
            let preimages = keys_by_value(&self.p_rhs, r_node);
            if preimages.is_empty() {
                continue;
            }
            let mut preserved = Attributes::new();
            for p_node in &preimages {
                if let Some(p_attrs) = self.p.get_node_attrs(p_node) {
                    preserved = union_attrs(&preserved, p_attrs)?;
                }
            }
            let added = sub_attrs(r_attrs, &preserved)?;
            if !added.is_empty() {
                out.insert(r_node.clone(), added);
            }
        }
        Ok(out)
    }

    /// Attribute values added on preserved edges, keyed by `R`-pair.
    pub fn added_edge_attrs(
        &self,
    ) -> Result<BTreeMap<(NodeId, NodeId), Attributes>, AttributeSetError> {
        let mut out = BTreeMap::new();
        for (ru, rv, r_attrs) in self.rhs.edges() {
            let mut preserved: Option<Attributes> = None;
            for (pu, pv, p_attrs) in self.p.edges() {
                if self.p_rhs.get(pu) == Some(ru) && self.p_rhs.get(pv) == Some(rv) {
                    let merged = match preserved.take() {
                        Some(existing) => union_attrs(&existing, p_attrs)?,
                        None => p_attrs.clone(),
                    };
                    preserved = Some(merged);
                }
            }
            if let Some(preserved) = preserved {
                let added = sub_attrs(r_attrs, &preserved)?;
                if !added.is_empty() {
                    out.insert((ru.clone(), rv.clone()), added);
                }
            }
        }
        Ok(out)
    }

    /// `R`-nodes with at least two preimages, with their sorted preimage
    /// sets: the rule merges those preimages' clones.
    pub fn merged_nodes(&self) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        let mut out = BTreeMap::new();
        for r_node in self.rhs.node_ids() {
            let preimages = keys_by_value(&self.p_rhs, r_node);
            if preimages.len() >= 2 {
                out.insert(r_node.clone(), preimages.into_iter().collect());
            }
        }
        out
    }

    /// Whether the rule deletes or clones anything (drives backward
    /// propagation).
    pub fn is_restrictive(&self) -> Result<bool, AttributeSetError> {
        Ok(!self.removed_nodes().is_empty()
            || !self.removed_edges().is_empty()
            || !self.cloned_nodes().is_empty()
            || !self.removed_node_attrs()?.is_empty()
            || !self.removed_edge_attrs()?.is_empty())
    }

    /// Whether the rule adds or merges anything (drives forward
    /// propagation).
    pub fn is_relaxing(&self) -> Result<bool, AttributeSetError> {
        Ok(!self.added_nodes().is_empty()
            || !self.added_edges().is_empty()
            || !self.merged_nodes().is_empty()
            || !self.added_node_attrs()?.is_empty()
            || !self.added_edge_attrs()?.is_empty())
    }

    /// The reverse span `R ← P → L`.
    pub fn inverted(&self) -> Rule {
        Rule {
            p: self.p.clone(),
            lhs: self.rhs.clone(),
            rhs: self.lhs.clone(),
            p_lhs: self.p_rhs.clone(),
            p_rhs: self.p_lhs.clone(),
        }
    }

    /// Whether the rule is an identity: `P = L = R` with identity mappings.
    pub fn is_identity(&self) -> bool {
        let ids = identity_mapping(self.p.node_ids());
        self.p == self.lhs && self.p == self.rhs && self.p_lhs == ids && self.p_rhs == ids
    }
}
