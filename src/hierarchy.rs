//! Hierarchies of typed graphs.
//!
//! A [`Hierarchy`] is a DAG of graphs whose edges carry typing
//! homomorphisms. Three invariants hold at all times: the DAG is acyclic,
//! every typing is total and attribute-preserving, and every pair of paths
//! between the same two graphs composes to the same mapping
//! (commutativity). A hierarchy may additionally hold symmetric relations
//! between pairs of graphs; relations carry no propagation obligation.
//!
//! Rewriting a member graph (see [`Hierarchy::rewrite`]) re-establishes all
//! three invariants by propagating deletions and clones to ancestors and
//! additions and merges to descendants; the protocol lives in the
//! `propagation` module.
//!
//! # Citations
//! - Kahn, "Topological sorting of large networks" (1962)
//! - Ehrig et al., "Fundamentals of Algebraic Graph Transformation" (2006)

use crate::attribute_set::{AttributeSetError, Attributes};
use crate::graph::{Graph, GraphError, NodeId};
use crate::homomorphism::{
    check_homomorphism, compose, keys_by_value, HomomorphismError, NodeMapping,
};
use crate::matching::find_matching_restricted;
use crate::propagation;
use crate::rewrite::RewritingError;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Assignment of ancestor nodes to specific interface clones:
/// ancestor graph id → (ancestor node → `P`-node).
pub type PTyping = BTreeMap<String, BTreeMap<NodeId, NodeId>>;

/// Typing of added RHS elements in descendants:
/// descendant graph id → (RHS node → descendant node).
pub type RhsTyping = BTreeMap<String, BTreeMap<NodeId, NodeId>>;

/// A symmetric node relation between two graphs.
pub type Relation = BTreeSet<(NodeId, NodeId)>;

/// Error type for hierarchy operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The referenced graph is not in the hierarchy.
    MissingGraph(String),
    /// A graph with this identifier already exists.
    GraphAlreadyExists(String),
    /// The referenced typing edge does not exist.
    MissingTyping(String, String),
    /// A typing between these graphs already exists.
    TypingAlreadyExists(String, String),
    /// Adding this typing would create a cycle.
    CycleDetected(String, String),
    /// Two paths between the same graphs compose differently.
    CommutativityViolation {
        /// Source graph of the disagreeing paths.
        source: String,
        /// Target graph of the disagreeing paths.
        target: String,
    },
    /// A proposed typing is not a homomorphism.
    InvalidTyping {
        /// Typing source.
        source: String,
        /// Typing target.
        target: String,
        /// The underlying failure.
        reason: HomomorphismError,
    },
    /// A relation references a node outside its graphs.
    InvalidRelation {
        /// Left graph.
        left: String,
        /// Right graph.
        right: String,
        /// The offending node.
        node: NodeId,
    },
    /// The referenced relation does not exist.
    MissingRelation(String, String),
    /// An invalid `p_typing` / `rhs_typing` specification.
    InvalidTypingSpecification(String),
    /// A rewrite failed.
    Rewriting(RewritingError),
    /// An underlying graph edit failed.
    Graph(GraphError),
    /// An attribute operation failed.
    Attribute(AttributeSetError),
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::MissingGraph(id) => {
                write!(f, "graph '{}' is not in the hierarchy", id)
            }
            HierarchyError::GraphAlreadyExists(id) => {
                write!(f, "graph '{}' already exists in the hierarchy", id)
            }
            HierarchyError::MissingTyping(s, t) => {
                write!(f, "no typing '{}'->'{}'", s, t)
            }
            HierarchyError::TypingAlreadyExists(s, t) => {
                write!(f, "typing '{}'->'{}' already exists", s, t)
            }
            HierarchyError::CycleDetected(s, t) => {
                write!(f, "typing '{}'->'{}' would create a cycle", s, t)
            }
            HierarchyError::CommutativityViolation { source, target } => write!(
                f,
                "paths from '{}' to '{}' compose to different mappings",
                source, target
            ),
            HierarchyError::InvalidTyping {
                source,
                target,
                reason,
            } => write!(f, "invalid typing '{}'->'{}': {}", source, target, reason),
            HierarchyError::InvalidRelation { left, right, node } => write!(
                f,
                "relation '{}'~'{}' references missing node '{}'",
                left, right, node
            ),
            HierarchyError::MissingRelation(left, right) => {
                write!(f, "no relation between '{}' and '{}'", left, right)
            }
            HierarchyError::InvalidTypingSpecification(msg) => {
                write!(f, "invalid typing specification: {}", msg)
            }
            HierarchyError::Rewriting(err) => write!(f, "{}", err),
            HierarchyError::Graph(err) => write!(f, "{}", err),
            HierarchyError::Attribute(err) => write!(f, "attribute error: {}", err),
        }
    }
}

impl std::error::Error for HierarchyError {}

impl From<RewritingError> for HierarchyError {
    fn from(err: RewritingError) -> Self {
        HierarchyError::Rewriting(err)
    }
}

impl From<GraphError> for HierarchyError {
    fn from(err: GraphError) -> Self {
        HierarchyError::Graph(err)
    }
}

impl From<AttributeSetError> for HierarchyError {
    fn from(err: AttributeSetError) -> Self {
        HierarchyError::Attribute(err)
    }
}

/// A member graph with its hierarchy-level attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The graph itself (owned by the hierarchy).
    pub graph: Graph,
    /// Attributes attached to the hierarchy node.
    pub attrs: Attributes,
}

/// A DAG of graphs with typing homomorphisms and symmetric relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub(crate) graphs: BTreeMap<String, GraphNode>,
    /// `typing[src][tgt]` is the homomorphism typing `src` by `tgt`.
    pub(crate) typing: BTreeMap<String, BTreeMap<String, NodeMapping>>,
    /// Relations keyed by the lexicographically ordered graph pair.
    pub(crate) relations: BTreeMap<(String, String), Relation>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates over member graph identifiers.
    pub fn graph_ids(&self) -> impl Iterator<Item = &String> {
        self.graphs.keys()
    }

    /// Whether a graph is a member.
    pub fn contains_graph(&self, id: &str) -> bool {
        self.graphs.contains_key(id)
    }

    /// Borrows a member graph.
    pub fn get_graph(&self, id: &str) -> Result<&Graph, HierarchyError> {
        self.graphs
            .get(id)
            .map(|node| &node.graph)
            .ok_or_else(|| HierarchyError::MissingGraph(id.to_string()))
    }

    /// Borrows a member graph's hierarchy attributes.
    pub fn get_graph_attrs(&self, id: &str) -> Result<&Attributes, HierarchyError> {
        self.graphs
            .get(id)
            .map(|node| &node.attrs)
            .ok_or_else(|| HierarchyError::MissingGraph(id.to_string()))
    }

    /// Adds a graph, taking ownership.
    pub fn add_graph(
        &mut self,
        id: impl Into<String>,
        graph: Graph,
        attrs: Attributes,
    ) -> Result<(), HierarchyError> {
        let id = id.into();
        if self.graphs.contains_key(&id) {
            return Err(HierarchyError::GraphAlreadyExists(id));
        }
        self.typing.insert(id.clone(), BTreeMap::new());
        self.graphs.insert(id, GraphNode { graph, attrs });
        Ok(())
    }

    /// Removes a graph. With `reconnect`, typings through the removed node
    /// are composed so every surviving ancestor stays typed by every
    /// surviving descendant it reached through the removed graph.
    pub fn remove_graph(&mut self, id: &str, reconnect: bool) -> Result<(), HierarchyError> {
        if !self.graphs.contains_key(id) {
            return Err(HierarchyError::MissingGraph(id.to_string()));
        }
        if reconnect {
            let preds = self.predecessors(id);
            let succs = self.successors(id);
            for pred in &preds {
                for succ in &succs {
                    if self.direct_typing(pred, succ).is_none() {
                        let through = compose(
                            &self.typing[pred][id],
                            &self.typing[id][succ],
                        )
                        .map_err(|reason| HierarchyError::InvalidTyping {
                            source: pred.clone(),
                            target: succ.clone(),
                            reason,
                        })?;
                        self.typing
                            .entry(pred.clone())
                            .or_default()
                            .insert(succ.clone(), through);
                    }
                }
            }
        }
        self.typing.remove(id);
        for targets in self.typing.values_mut() {
            targets.remove(id);
        }
        self.relations
            .retain(|(left, right), _| left != id && right != id);
        self.graphs.remove(id);
        Ok(())
    }

    /// The direct typing mapping `src → tgt`, if that edge exists.
    pub fn direct_typing(&self, src: &str, tgt: &str) -> Option<&NodeMapping> {
        self.typing.get(src).and_then(|targets| targets.get(tgt))
    }

    /// Iterates over all typing edges as `(src, tgt, mapping)`.
    pub fn typings(&self) -> impl Iterator<Item = (&String, &String, &NodeMapping)> {
        self.typing.iter().flat_map(|(src, targets)| {
            targets.iter().map(move |(tgt, mapping)| (src, tgt, mapping))
        })
    }

    /// Adds a typing edge, validating the homomorphism, acyclicity, and
    /// commutativity with every existing path.
    pub fn add_typing(
        &mut self,
        src: &str,
        tgt: &str,
        mapping: NodeMapping,
    ) -> Result<(), HierarchyError> {
        let src_graph = self.get_graph(src)?;
        let tgt_graph = self.get_graph(tgt)?;
        if self.direct_typing(src, tgt).is_some() {
            return Err(HierarchyError::TypingAlreadyExists(
                src.to_string(),
                tgt.to_string(),
            ));
        }
        if src == tgt || self.descendants(tgt).contains(src) {
            return Err(HierarchyError::CycleDetected(
                src.to_string(),
                tgt.to_string(),
            ));
        }
        check_homomorphism(src_graph, tgt_graph, &mapping).map_err(|reason| {
            HierarchyError::InvalidTyping {
                source: src.to_string(),
                target: tgt.to_string(),
                reason,
            }
        })?;

        self.typing
            .entry(src.to_string())
            .or_default()
            .insert(tgt.to_string(), mapping);

        // Commutativity: every path pair affected by the new edge must
        // agree. Check and roll the edge back on violation.
        let mut sources: BTreeSet<String> = self.ancestors(src);
        sources.insert(src.to_string());
        let mut targets: BTreeSet<String> = self.descendants(tgt);
        targets.insert(tgt.to_string());
        for source in &sources {
            for target in &targets {
                let compositions = self.all_path_compositions(source, target);
                if compositions.windows(2).any(|pair| pair[0] != pair[1]) {
                    if let Some(targets) = self.typing.get_mut(src) {
                        targets.remove(tgt);
                    }
                    return Err(HierarchyError::CommutativityViolation {
                        source: source.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Removes a typing edge.
    pub fn remove_typing(&mut self, src: &str, tgt: &str) -> Result<(), HierarchyError> {
        let removed = self
            .typing
            .get_mut(src)
            .map(|targets| targets.remove(tgt).is_some())
            .unwrap_or(false);
        if !removed {
            return Err(HierarchyError::MissingTyping(
                src.to_string(),
                tgt.to_string(),
            ));
        }
        Ok(())
    }

    /// Direct typing targets of a graph.
    pub fn successors(&self, id: &str) -> Vec<String> {
        self.typing
            .get(id)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Graphs directly typed by this graph.
    pub fn predecessors(&self, id: &str) -> Vec<String> {
        self.typing
            .iter()
            .filter(|(_, targets)| targets.contains_key(id))
            .map(|(src, _)| src.clone())
            .collect()
    }

    /// All graphs from which this graph is reachable (transitive
    /// predecessors), i.e. the graphs a rewrite here propagates *to*
    /// backward.
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<String> = self.predecessors(id).into();
        while let Some(graph) = queue.pop_front() {
            if out.insert(graph.clone()) {
                queue.extend(self.predecessors(&graph));
            }
        }
        out
    }

    /// All graphs reachable from this graph (transitive successors).
    pub fn descendants(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<String> = self.successors(id).into();
        while let Some(graph) = queue.pop_front() {
            if out.insert(graph.clone()) {
                queue.extend(self.successors(&graph));
            }
        }
        out
    }

    /// Composes the typing along a concrete path of graph identifiers.
    pub fn compose_path_typing(&self, path: &[&str]) -> Result<NodeMapping, HierarchyError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(NodeMapping::new());
        };
        let mut current = match rest.first() {
            Some(second) => self
                .direct_typing(first, second)
                .cloned()
                .ok_or_else(|| {
                    HierarchyError::MissingTyping(first.to_string(), second.to_string())
                })?,
            None => return Ok(NodeMapping::new()),
        };
        for window in rest.windows(2) {
            let step = self.direct_typing(window[0], window[1]).ok_or_else(|| {
                HierarchyError::MissingTyping(window[0].to_string(), window[1].to_string())
            })?;
            current = compose(&current, step).map_err(|reason| HierarchyError::InvalidTyping {
                source: window[0].to_string(),
                target: window[1].to_string(),
                reason,
            })?;
        }
        Ok(current)
    }

    /// The composed typing `src → tgt` along any path (all paths agree by
    /// the commutativity invariant). `None` when `tgt` is unreachable.
    pub fn get_typing(&self, src: &str, tgt: &str) -> Option<NodeMapping> {
        self.all_path_compositions(src, tgt).into_iter().next()
    }

    /// Every path composition from `src` to `tgt`, for invariant checking.
    fn all_path_compositions(&self, src: &str, tgt: &str) -> Vec<NodeMapping> {
        let mut out = Vec::new();
        // Depth-first over the DAG; each frame carries the composition so far.
        fn walk(
            h: &Hierarchy,
            current: &str,
            tgt: &str,
            acc: Option<&NodeMapping>,
            out: &mut Vec<NodeMapping>,
        ) {
            if current == tgt {
                if let Some(acc) = acc {
                    out.push(acc.clone());
                }
                return;
            }
            if let Some(targets) = h.typing.get(current) {
                for (next, step) in targets {
                    let composed = match acc {
                        Some(acc) => match compose(acc, step) {
                            Ok(composed) => composed,
                            Err(_) => continue,
                        },
                        None => step.clone(),
                    };
                    walk(h, next, tgt, Some(&composed), out);
                }
            }
        }
        walk(self, src, tgt, None, &mut out);
        out
    }

    /// Adds a symmetric relation between two graphs.
    pub fn add_relation(
        &mut self,
        left: &str,
        right: &str,
        relation: Relation,
    ) -> Result<(), HierarchyError> {
        let left_graph = self.get_graph(left)?;
        let right_graph = self.get_graph(right)?;
        for (l_node, r_node) in &relation {
            if !left_graph.contains_node(l_node) {
                return Err(HierarchyError::InvalidRelation {
                    left: left.to_string(),
                    right: right.to_string(),
                    node: l_node.clone(),
                });
            }
            if !right_graph.contains_node(r_node) {
                return Err(HierarchyError::InvalidRelation {
                    left: left.to_string(),
                    right: right.to_string(),
                    node: r_node.clone(),
                });
            }
        }
        let (key, stored) = Self::normalize_relation(left, right, relation);
        self.relations.insert(key, stored);
        Ok(())
    }

    fn normalize_relation(
        left: &str,
        right: &str,
        relation: Relation,
    ) -> ((String, String), Relation) {
        if left <= right {
            ((left.to_string(), right.to_string()), relation)
        } else {
            (
                (right.to_string(), left.to_string()),
                relation.into_iter().map(|(l, r)| (r, l)).collect(),
            )
        }
    }

    /// Borrows the relation between two graphs (pairs oriented from the
    /// lexicographically smaller graph).
    pub fn get_relation(&self, left: &str, right: &str) -> Option<&Relation> {
        let key = if left <= right {
            (left.to_string(), right.to_string())
        } else {
            (right.to_string(), left.to_string())
        };
        self.relations.get(&key)
    }

    /// Removes a relation.
    pub fn remove_relation(&mut self, left: &str, right: &str) -> Result<(), HierarchyError> {
        let key = if left <= right {
            (left.to_string(), right.to_string())
        } else {
            (right.to_string(), left.to_string())
        };
        if self.relations.remove(&key).is_none() {
            return Err(HierarchyError::MissingRelation(
                left.to_string(),
                right.to_string(),
            ));
        }
        Ok(())
    }

    /// Graphs related to the given one.
    pub fn adjacent_relations(&self, id: &str) -> Vec<String> {
        self.relations
            .keys()
            .filter_map(|(left, right)| {
                if left == id {
                    Some(right.clone())
                } else if right == id {
                    Some(left.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// The image of a node under every outbound typing.
    pub fn node_type(
        &self,
        graph_id: &str,
        node: &NodeId,
    ) -> Result<BTreeMap<String, NodeId>, HierarchyError> {
        let graph = self.get_graph(graph_id)?;
        if !graph.contains_node(node) {
            return Err(HierarchyError::Graph(GraphError::MissingNode(node.clone())));
        }
        let mut out = BTreeMap::new();
        if let Some(targets) = self.typing.get(graph_id) {
            for (tgt, mapping) in targets {
                if let Some(image) = mapping.get(node) {
                    out.insert(tgt.clone(), image.clone());
                }
            }
        }
        Ok(out)
    }

    /// Enumerates matches of `pattern` in a member graph, optionally
    /// restricted by a typing of pattern nodes in typing graphs of the
    /// member: `pattern_typing[target_graph][pattern_node] = type node`.
    pub fn find_matching(
        &self,
        graph_id: &str,
        pattern: &Graph,
        pattern_typing: Option<&BTreeMap<String, NodeMapping>>,
    ) -> Result<Vec<NodeMapping>, HierarchyError> {
        let graph = self.get_graph(graph_id)?;
        let Some(pattern_typing) = pattern_typing else {
            return Ok(graph.find_matching(pattern).collect());
        };

        let mut restriction: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for (target, node_types) in pattern_typing {
            let typing = self.get_typing(graph_id, target).ok_or_else(|| {
                HierarchyError::MissingTyping(graph_id.to_string(), target.to_string())
            })?;
            for (pattern_node, wanted) in node_types {
                let allowed: BTreeSet<NodeId> = keys_by_value(&typing, wanted).into_iter().collect();
                match restriction.get_mut(pattern_node) {
                    Some(existing) => {
                        *existing = existing.intersection(&allowed).cloned().collect();
                    }
                    None => {
                        restriction.insert(pattern_node.clone(), allowed);
                    }
                }
            }
        }
        Ok(find_matching_restricted(graph, pattern, &restriction).collect())
    }

    /// Rewrites a member graph and propagates: backward to ancestors
    /// (deletions, clones), forward to descendants (additions, merges).
    ///
    /// In strict mode the rewrite is rejected with an actionable
    /// [`RewritingError::ForcedPropagation`] whenever it would force any
    /// change outside the rewritten graph.
    ///
    /// Returns the RHS instance `R → G'`.
    pub fn rewrite(
        &mut self,
        graph_id: &str,
        rule: &Rule,
        instance: &NodeMapping,
        p_typing: Option<&PTyping>,
        rhs_typing: Option<&RhsTyping>,
        strict: bool,
    ) -> Result<NodeMapping, HierarchyError> {
        propagation::rewrite_in_hierarchy(self, graph_id, rule, instance, p_typing, rhs_typing, strict)
    }
}
