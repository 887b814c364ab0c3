//! Graph homomorphisms as data.
//!
//! A homomorphism is a total map between node sets that preserves edges and
//! attributes by subsumption. Mappings are plain ordered maps, detached from
//! the graphs they relate; validation, composition and fiber computations
//! are free functions over `(source, target, mapping)` triples.
//!
//! # Citations
//! - Attributed graph morphisms: Ehrig, Ehrig, Prange, Taentzer,
//!   "Fundamentals of Algebraic Graph Transformation" (2006)

use crate::attribute_set::attrs_included;
use crate::graph::{Graph, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A node-to-node mapping between two graphs.
pub type NodeMapping = BTreeMap<NodeId, NodeId>;

/// Error type for homomorphism validation and composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomomorphismError {
    /// A source node has no image.
    NotTotal(NodeId),
    /// A node maps outside the target graph.
    InvalidTarget {
        /// The source node.
        node: NodeId,
        /// Its (absent) image.
        image: NodeId,
    },
    /// A source edge has no image edge.
    EdgeNotPreserved {
        /// Source-edge origin.
        from: NodeId,
        /// Source-edge destination.
        to: NodeId,
    },
    /// Node attributes are not subsumed by the image's attributes.
    NodeAttributesNotPreserved(NodeId),
    /// Edge attributes are not subsumed by the image edge's attributes.
    EdgeAttributesNotPreserved {
        /// Source-edge origin.
        from: NodeId,
        /// Source-edge destination.
        to: NodeId,
    },
    /// Two mappings do not compose (an image is missing from the second).
    NotComposable(NodeId),
}

impl fmt::Display for HomomorphismError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomomorphismError::NotTotal(node) => {
                write!(f, "mapping is not total: node '{}' has no image", node)
            }
            HomomorphismError::InvalidTarget { node, image } => write!(
                f,
                "node '{}' maps to '{}', which is not in the target graph",
                node, image
            ),
            HomomorphismError::EdgeNotPreserved { from, to } => write!(
                f,
                "edge '{}'->'{}' has no corresponding edge in the target graph",
                from, to
            ),
            HomomorphismError::NodeAttributesNotPreserved(node) => write!(
                f,
                "attributes of node '{}' are not subsumed by its image",
                node
            ),
            HomomorphismError::EdgeAttributesNotPreserved { from, to } => write!(
                f,
                "attributes of edge '{}'->'{}' are not subsumed by its image",
                from, to
            ),
            HomomorphismError::NotComposable(node) => write!(
                f,
                "mappings do not compose: image of '{}' is not in the domain of the second",
                node
            ),
        }
    }
}

impl std::error::Error for HomomorphismError {}

/// Validates that `mapping` is a homomorphism from `source` to `target`:
/// total, edge-preserving, and attribute-preserving by subsumption on both
/// nodes and edges.
pub fn check_homomorphism(
    source: &Graph,
    target: &Graph,
    mapping: &NodeMapping,
) -> Result<(), HomomorphismError> {
    for (node, attrs) in source.nodes() {
        let image = mapping
            .get(node)
            .ok_or_else(|| HomomorphismError::NotTotal(node.clone()))?;
        let image_attrs =
            target
                .get_node_attrs(image)
                .ok_or_else(|| HomomorphismError::InvalidTarget {
                    node: node.clone(),
                    image: image.clone(),
                })?;
        if !attrs_included(attrs, image_attrs) {
            return Err(HomomorphismError::NodeAttributesNotPreserved(node.clone()));
        }
    }
    for (u, v, attrs) in source.edges() {
        let (iu, iv) = match (mapping.get(u), mapping.get(v)) {
            (Some(iu), Some(iv)) => (iu, iv),
            _ => {
                return Err(HomomorphismError::EdgeNotPreserved {
                    from: u.clone(),
                    to: v.clone(),
                })
            }
        };
        match target.get_edge_attrs(iu, iv) {
            Some(image_attrs) => {
                if !attrs_included(attrs, image_attrs) {
                    return Err(HomomorphismError::EdgeAttributesNotPreserved {
                        from: u.clone(),
                        to: v.clone(),
                    });
                }
            }
            None => {
                return Err(HomomorphismError::EdgeNotPreserved {
                    from: u.clone(),
                    to: v.clone(),
                })
            }
        }
    }
    Ok(())
}

/// Composes two mappings: `(g ∘ f)(x) = g(f(x))`.
pub fn compose(f: &NodeMapping, g: &NodeMapping) -> Result<NodeMapping, HomomorphismError> {
    let mut out = NodeMapping::new();
    for (node, mid) in f {
        let image = g
            .get(mid)
            .ok_or_else(|| HomomorphismError::NotComposable(node.clone()))?;
        out.insert(node.clone(), image.clone());
    }
    Ok(out)
}

/// The identity mapping on a set of nodes.
pub fn identity_mapping<'a>(nodes: impl IntoIterator<Item = &'a NodeId>) -> NodeMapping {
    nodes
        .into_iter()
        .map(|node| (node.clone(), node.clone()))
        .collect()
}

/// Whether the mapping is injective.
pub fn is_monic(mapping: &NodeMapping) -> bool {
    let images: BTreeSet<&NodeId> = mapping.values().collect();
    images.len() == mapping.len()
}

/// The fiber of `value`: all keys mapping onto it, in order.
pub fn keys_by_value(mapping: &NodeMapping, value: &NodeId) -> Vec<NodeId> {
    mapping
        .iter()
        .filter(|(_, image)| *image == value)
        .map(|(key, _)| key.clone())
        .collect()
}

/// Image of a node subset.
pub fn image(mapping: &NodeMapping, subset: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    subset
        .iter()
        .filter_map(|node| mapping.get(node).cloned())
        .collect()
}

/// Preimage of a node subset.
pub fn preimage(mapping: &NodeMapping, subset: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    mapping
        .iter()
        .filter(|(_, image)| subset.contains(*image))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Builds a mapping from `(from, to)` string pairs.
pub fn mapping<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> NodeMapping {
    pairs
        .into_iter()
        .map(|(from, to)| (NodeId::from(from), NodeId::from(to)))
        .collect()
}
