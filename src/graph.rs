//! Attributed simple directed graphs.
//!
//! A [`Graph`] stores nodes and edges carrying attribute maps. Storage is
//! arena-like: node attributes plus two adjacency maps (outgoing with edge
//! attributes, incoming as a plain set), all ordered containers, so that
//! every iteration is in lexicographic node order and every derived
//! identifier is deterministic.
//!
//! Graphs are simple: at most one edge per ordered pair, loops allowed.
//!
//! # Invariants
//! - Every edge endpoint is a present node.
//! - `succ` and `pred` are mirror images of each other.
//! - Node identifiers are unique by construction of the map.

use crate::attribute_set::{add_attrs, attrs_equal, remove_attrs, AttributeSetError, Attributes};
use crate::fingerprint::HashValue;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Unique identifier for a node within a graph.
///
/// A transparent wrapper over its string representation; ordering is
/// lexicographic, which is the total order all deterministic enumeration in
/// this crate derives from.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates an identifier from anything string-like.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The referenced node does not exist.
    MissingNode(NodeId),
    /// A node with this identifier already exists.
    NodeAlreadyExists(NodeId),
    /// The referenced edge does not exist.
    MissingEdge(NodeId, NodeId),
    /// An edge between this ordered pair already exists.
    EdgeAlreadyExists(NodeId, NodeId),
    /// Relabelling would collide with an existing identifier.
    RelabelCollision(NodeId),
    /// A bulk relabelling does not map to distinct identifiers.
    RelabelNotInjective,
    /// An attribute operation failed.
    Attribute(AttributeSetError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::MissingNode(id) => write!(f, "node '{}' does not exist", id),
            GraphError::NodeAlreadyExists(id) => write!(f, "node '{}' already exists", id),
            GraphError::MissingEdge(u, v) => write!(f, "edge '{}'->'{}' does not exist", u, v),
            GraphError::EdgeAlreadyExists(u, v) => {
                write!(f, "edge '{}'->'{}' already exists", u, v)
            }
            GraphError::RelabelCollision(id) => {
                write!(f, "cannot relabel: node '{}' already exists", id)
            }
            GraphError::RelabelNotInjective => {
                write!(f, "relabelling does not map nodes to distinct identifiers")
            }
            GraphError::Attribute(err) => write!(f, "attribute error: {}", err),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<AttributeSetError> for GraphError {
    fn from(err: AttributeSetError) -> Self {
        GraphError::Attribute(err)
    }
}

/// An attributed simple directed graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Attributes>,
    succ: BTreeMap<NodeId, BTreeMap<NodeId, Attributes>>,
    pred: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Graph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.succ.values().map(|targets| targets.len()).sum()
    }

    /// Iterates over nodes with their attributes, in lexicographic order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Attributes)> {
        self.nodes.iter()
    }

    /// Iterates over node identifiers in lexicographic order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Iterates over edges `(from, to, attrs)` in lexicographic order.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId, &Attributes)> {
        self.succ
            .iter()
            .flat_map(|(u, targets)| targets.iter().map(move |(v, attrs)| (u, v, attrs)))
    }

    /// Whether a node exists.
    #[inline]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Whether an edge exists.
    pub fn exists_edge(&self, u: &NodeId, v: &NodeId) -> bool {
        self.succ
            .get(u)
            .map(|targets| targets.contains_key(v))
            .unwrap_or(false)
    }

    /// Attributes of a node.
    pub fn get_node_attrs(&self, id: &NodeId) -> Option<&Attributes> {
        self.nodes.get(id)
    }

    /// Attributes of an edge.
    pub fn get_edge_attrs(&self, u: &NodeId, v: &NodeId) -> Option<&Attributes> {
        self.succ.get(u).and_then(|targets| targets.get(v))
    }

    /// Successors of a node (empty when the node is absent).
    pub fn successors<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.succ.get(id).into_iter().flat_map(|targets| targets.keys())
    }

    /// Predecessors of a node (empty when the node is absent).
    pub fn predecessors<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.pred.get(id).into_iter().flatten()
    }

    /// Out-degree (loops count once).
    pub fn out_degree(&self, id: &NodeId) -> usize {
        self.succ.get(id).map(|targets| targets.len()).unwrap_or(0)
    }

    /// In-degree (loops count once).
    pub fn in_degree(&self, id: &NodeId) -> usize {
        self.pred.get(id).map(|sources| sources.len()).unwrap_or(0)
    }

    /// Adds a node. Fails when the identifier is taken.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        attrs: Attributes,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::NodeAlreadyExists(id));
        }
        self.succ.insert(id.clone(), BTreeMap::new());
        self.pred.insert(id.clone(), BTreeSet::new());
        self.nodes.insert(id, attrs);
        Ok(())
    }

    /// Adds a batch of nodes.
    pub fn add_nodes_from(
        &mut self,
        nodes: impl IntoIterator<Item = (NodeId, Attributes)>,
    ) -> Result<(), GraphError> {
        for (id, attrs) in nodes {
            self.add_node(id, attrs)?;
        }
        Ok(())
    }

    /// Removes a node, cascading over incident edges.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::MissingNode(id.clone()));
        }
        let outgoing: Vec<NodeId> = self.successors(id).cloned().collect();
        for v in outgoing {
            if let Some(sources) = self.pred.get_mut(&v) {
                sources.remove(id);
            }
        }
        let incoming: Vec<NodeId> = self.predecessors(id).cloned().collect();
        for u in incoming {
            if let Some(targets) = self.succ.get_mut(&u) {
                targets.remove(id);
            }
        }
        self.succ.remove(id);
        self.pred.remove(id);
        self.nodes.remove(id);
        Ok(())
    }

    /// Adds an edge. Fails when the edge exists or an endpoint is missing.
    pub fn add_edge(
        &mut self,
        u: impl Into<NodeId>,
        v: impl Into<NodeId>,
        attrs: Attributes,
    ) -> Result<(), GraphError> {
        let u = u.into();
        let v = v.into();
        if !self.nodes.contains_key(&u) {
            return Err(GraphError::MissingNode(u));
        }
        if !self.nodes.contains_key(&v) {
            return Err(GraphError::MissingNode(v));
        }
        if self.exists_edge(&u, &v) {
            return Err(GraphError::EdgeAlreadyExists(u, v));
        }
        self.pred.entry(v.clone()).or_default().insert(u.clone());
        self.succ.entry(u).or_default().insert(v, attrs);
        Ok(())
    }

    /// Adds a batch of edges.
    pub fn add_edges_from(
        &mut self,
        edges: impl IntoIterator<Item = (NodeId, NodeId, Attributes)>,
    ) -> Result<(), GraphError> {
        for (u, v, attrs) in edges {
            self.add_edge(u, v, attrs)?;
        }
        Ok(())
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, u: &NodeId, v: &NodeId) -> Result<(), GraphError> {
        let removed = self
            .succ
            .get_mut(u)
            .map(|targets| targets.remove(v).is_some())
            .unwrap_or(false);
        if !removed {
            return Err(GraphError::MissingEdge(u.clone(), v.clone()));
        }
        if let Some(sources) = self.pred.get_mut(v) {
            sources.remove(u);
        }
        Ok(())
    }

    /// Unions the given attributes into a node, key-wise.
    pub fn add_node_attrs(&mut self, id: &NodeId, attrs: &Attributes) -> Result<(), GraphError> {
        let existing = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::MissingNode(id.clone()))?;
        add_attrs(existing, attrs)?;
        Ok(())
    }

    /// Subtracts the given attributes from a node, key-wise; emptied keys
    /// are erased.
    pub fn remove_node_attrs(
        &mut self,
        id: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), GraphError> {
        let existing = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::MissingNode(id.clone()))?;
        remove_attrs(existing, attrs)?;
        Ok(())
    }

    /// Replaces a node's attribute map.
    pub fn set_node_attrs(&mut self, id: &NodeId, attrs: Attributes) -> Result<(), GraphError> {
        let existing = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::MissingNode(id.clone()))?;
        *existing = attrs;
        Ok(())
    }

    /// Unions the given attributes into an edge, key-wise.
    pub fn add_edge_attrs(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), GraphError> {
        let existing = self
            .succ
            .get_mut(u)
            .and_then(|targets| targets.get_mut(v))
            .ok_or_else(|| GraphError::MissingEdge(u.clone(), v.clone()))?;
        add_attrs(existing, attrs)?;
        Ok(())
    }

    /// Subtracts the given attributes from an edge, key-wise.
    pub fn remove_edge_attrs(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: &Attributes,
    ) -> Result<(), GraphError> {
        let existing = self
            .succ
            .get_mut(u)
            .and_then(|targets| targets.get_mut(v))
            .ok_or_else(|| GraphError::MissingEdge(u.clone(), v.clone()))?;
        remove_attrs(existing, attrs)?;
        Ok(())
    }

    /// Replaces an edge's attribute map.
    pub fn set_edge_attrs(
        &mut self,
        u: &NodeId,
        v: &NodeId,
        attrs: Attributes,
    ) -> Result<(), GraphError> {
        let existing = self
            .succ
            .get_mut(u)
            .and_then(|targets| targets.get_mut(v))
            .ok_or_else(|| GraphError::MissingEdge(u.clone(), v.clone()))?;
        *existing = attrs;
        Ok(())
    }

    /// Mints a fresh identifier from a base name: the base itself when free,
    /// otherwise the base with the first free numeric suffix.
    pub fn generate_new_id(&self, base: &NodeId) -> NodeId {
        if !self.nodes.contains_key(base) {
            return base.clone();
        }
        let mut suffix = 1u64;
        loop {
            let candidate = NodeId::new(format!("{}{}", base, suffix));
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Clones a node: a disjoint copy of its attributes, with every incident
    /// edge duplicated onto the clone (attributes deep-copied). A loop on
    /// the original becomes four edges: original→original, original→clone,
    /// clone→original and clone→clone, all carrying the loop's attributes.
    ///
    /// When `name` is omitted the clone id is the original id with a prime
    /// appended, minted collision-free.
    pub fn clone_node(&mut self, id: &NodeId, name: Option<NodeId>) -> Result<NodeId, GraphError> {
        let attrs = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::MissingNode(id.clone()))?
            .clone();
        let new_id = match name {
            Some(name) => {
                if self.nodes.contains_key(&name) {
                    return Err(GraphError::NodeAlreadyExists(name));
                }
                name
            }
            None => self.generate_new_id(&NodeId::new(format!("{}'", id))),
        };
        self.add_node(new_id.clone(), attrs)?;

        let incoming: Vec<(NodeId, Attributes)> = self
            .predecessors(id)
            .filter(|u| *u != id)
            .map(|u| {
                let attrs = self
                    .get_edge_attrs(u, id)
                    .cloned()
                    .unwrap_or_default();
                (u.clone(), attrs)
            })
            .collect();
        let outgoing: Vec<(NodeId, Attributes)> = self
            .successors(id)
            .filter(|v| *v != id)
            .map(|v| {
                let attrs = self
                    .get_edge_attrs(id, v)
                    .cloned()
                    .unwrap_or_default();
                (v.clone(), attrs)
            })
            .collect();
        let self_loop = self.get_edge_attrs(id, id).cloned();

        for (u, attrs) in incoming {
            self.add_edge(u, new_id.clone(), attrs)?;
        }
        for (v, attrs) in outgoing {
            self.add_edge(new_id.clone(), v, attrs)?;
        }
        if let Some(loop_attrs) = self_loop {
            self.add_edge(id.clone(), new_id.clone(), loop_attrs.clone())?;
            self.add_edge(new_id.clone(), id.clone(), loop_attrs.clone())?;
            self.add_edge(new_id.clone(), new_id.clone(), loop_attrs)?;
        }
        Ok(new_id)
    }

    /// Merges a set of nodes into one.
    ///
    /// Attribute maps union key-wise; every edge incident to a member is
    /// redirected onto the merged node, parallel redirected edges union
    /// their attributes, and loops on or between members collapse to a
    /// single loop carrying the union of all contributing edge attributes.
    ///
    /// Merging a single node is the identity. The default identifier is the
    /// sorted member ids joined with `_`.
    pub fn merge_nodes(
        &mut self,
        ids: &[NodeId],
        name: Option<NodeId>,
    ) -> Result<NodeId, GraphError> {
        let members: BTreeSet<NodeId> = ids.iter().cloned().collect();
        for id in &members {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::MissingNode(id.clone()));
            }
        }
        if members.len() == 1 {
            let only = ids[0].clone();
            if let Some(name) = name {
                if name != only {
                    self.relabel_node(&only, name.clone())?;
                    return Ok(name);
                }
            }
            return Ok(only);
        }

        let new_id = match name {
            Some(name) => {
                if self.nodes.contains_key(&name) && !members.contains(&name) {
                    return Err(GraphError::NodeAlreadyExists(name));
                }
                name
            }
            None => {
                let joined = members
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join("_");
                let base = NodeId::new(joined);
                if self.nodes.contains_key(&base) && !members.contains(&base) {
                    self.generate_new_id(&base)
                } else {
                    base
                }
            }
        };

        let mut merged_attrs = Attributes::new();
        let mut incoming: BTreeMap<NodeId, Attributes> = BTreeMap::new();
        let mut outgoing: BTreeMap<NodeId, Attributes> = BTreeMap::new();
        let mut loop_attrs: Option<Attributes> = None;

        for member in &members {
            let attrs = self
                .nodes
                .get(member)
                .cloned()
                .unwrap_or_default();
            add_attrs(&mut merged_attrs, &attrs)?;

            let sources: Vec<NodeId> = self.predecessors(member).cloned().collect();
            for u in sources {
                let attrs = self.get_edge_attrs(&u, member).cloned().unwrap_or_default();
                if members.contains(&u) {
                    match loop_attrs.as_mut() {
                        Some(existing) => add_attrs(existing, &attrs)?,
                        None => loop_attrs = Some(attrs),
                    }
                } else {
                    match incoming.get_mut(&u) {
                        Some(existing) => add_attrs(existing, &attrs)?,
                        None => {
                            incoming.insert(u, attrs);
                        }
                    }
                }
            }
            let targets: Vec<NodeId> = self.successors(member).cloned().collect();
            for v in targets {
                if members.contains(&v) {
                    // Counted already from the predecessor side.
                    continue;
                }
                let attrs = self.get_edge_attrs(member, &v).cloned().unwrap_or_default();
                match outgoing.get_mut(&v) {
                    Some(existing) => add_attrs(existing, &attrs)?,
                    None => {
                        outgoing.insert(v, attrs);
                    }
                }
            }
        }

        for member in &members {
            self.remove_node(member)?;
        }
        self.add_node(new_id.clone(), merged_attrs)?;
        for (u, attrs) in incoming {
            self.add_edge(u, new_id.clone(), attrs)?;
        }
        for (v, attrs) in outgoing {
            self.add_edge(new_id.clone(), v, attrs)?;
        }
        if let Some(attrs) = loop_attrs {
            self.add_edge(new_id.clone(), new_id.clone(), attrs)?;
        }
        Ok(new_id)
    }

    /// Renames a node, preserving attributes and edges.
    pub fn relabel_node(&mut self, old: &NodeId, new: impl Into<NodeId>) -> Result<(), GraphError> {
        let new = new.into();
        if self.nodes.contains_key(&new) {
            return Err(GraphError::RelabelCollision(new));
        }
        self.clone_node(old, Some(new))?;
        self.remove_node(old)?;
        Ok(())
    }

    /// Bulk relabelling; renames routed through fresh temporaries so that
    /// permutations of identifiers are legal. Keys absent from the mapping
    /// keep their identifier.
    pub fn relabel_nodes(
        &mut self,
        mapping: &BTreeMap<NodeId, NodeId>,
    ) -> Result<(), GraphError> {
        let targets: BTreeSet<&NodeId> = mapping.values().collect();
        if targets.len() != mapping.len() {
            return Err(GraphError::RelabelNotInjective);
        }
        let mut pending: Vec<(NodeId, NodeId)> = Vec::new();
        for (old, new) in mapping {
            if old == new {
                continue;
            }
            if !self.nodes.contains_key(old) {
                return Err(GraphError::MissingNode(old.clone()));
            }
            if self.nodes.contains_key(new) {
                let temp = self.generate_new_id(new);
                self.relabel_node(old, temp.clone())?;
                pending.push((temp, new.clone()));
            } else {
                self.relabel_node(old, new.clone())?;
            }
        }
        for (temp, new) in pending {
            self.relabel_node(&temp, new)?;
        }
        Ok(())
    }

    /// Deterministic structural fingerprint over the sorted node, edge and
    /// attribute structure.
    pub fn fingerprint(&self) -> HashValue {
        let canonical =
            serde_json::to_vec(self).unwrap_or_default();
        HashValue::hash_with_domain(b"GRAPH", &canonical)
    }
}

/// Element-wise equality: same node set, same edge set, attribute maps
/// equal under lattice equality.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        if self.nodes.len() != other.nodes.len() || self.edge_count() != other.edge_count() {
            return false;
        }
        for (id, attrs) in &self.nodes {
            match other.nodes.get(id) {
                Some(other_attrs) if attrs_equal(attrs, other_attrs) => {}
                _ => return false,
            }
        }
        for (u, v, attrs) in self.edges() {
            match other.get_edge_attrs(u, v) {
                Some(other_attrs) if attrs_equal(attrs, other_attrs) => {}
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Graph {}

impl Graph {
    /// Builds a graph from plain node ids and attribute-free edges.
    pub fn from_elements<'a>(
        nodes: impl IntoIterator<Item = &'a str>,
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        for id in nodes {
            graph.add_node(id, Attributes::new())?;
        }
        for (u, v) in edges {
            graph.add_edge(u, v, Attributes::new())?;
        }
        Ok(graph)
    }
}
