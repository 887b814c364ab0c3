//! The JSON surface.
//!
//! Graphs serialize as `{nodes: [{id, attrs}], edges: [{from, to, attrs}]}`;
//! attribute values as `{type, data}` with the variant name in `type`;
//! hierarchies as a spanning tree `{name, top_graph, children, typings,
//! relations}` rooted at the lexicographically first untyped graph, each
//! child nested under its lexicographically first typing target, with the
//! complete typing mappings and relations carried in the flat arrays so
//! arbitrary DAGs round-trip exactly.
//!
//! Import errors carry the path to the offending element through the
//! structure (e.g. `nodes[3].attrs.color.data`).

use crate::attribute_set::{Atom, AttributeSet, Attributes, Endpoint, IntegerSet};
use crate::graph::{Graph, NodeId};
use crate::hierarchy::{GraphNode, Hierarchy, Relation};
use crate::homomorphism::NodeMapping;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Error type for JSON import and export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    /// Path through the JSON structure to the offending element.
    pub path: String,
    /// What went wrong there.
    pub reason: String,
}

impl JsonError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid JSON at {}: {}", self.path, self.reason)
    }
}

impl std::error::Error for JsonError {}

// ----------------------------------------------------------------------
// Attribute values
// ----------------------------------------------------------------------

fn atom_to_json(atom: &Atom) -> Value {
    match atom {
        Atom::Bool(b) => Value::Bool(*b),
        Atom::Int(i) => json!(i),
        Atom::Str(s) => Value::String(s.clone()),
    }
}

fn atom_from_json(value: &Value, path: &str) -> Result<Atom, JsonError> {
    match value {
        Value::Bool(b) => Ok(Atom::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Atom::Int)
            .ok_or_else(|| JsonError::new(path, "expected an integer atom")),
        Value::String(s) => Ok(Atom::Str(s.clone())),
        _ => Err(JsonError::new(path, "expected a boolean, integer or string atom")),
    }
}

fn endpoint_to_json(endpoint: &Endpoint) -> Value {
    match endpoint {
        Endpoint::NegInf => Value::String("-inf".to_string()),
        Endpoint::Finite(i) => json!(i),
        Endpoint::PosInf => Value::String("inf".to_string()),
    }
}

fn endpoint_from_json(value: &Value, path: &str) -> Result<Endpoint, JsonError> {
    match value {
        Value::String(s) if s == "-inf" => Ok(Endpoint::NegInf),
        Value::String(s) if s == "inf" => Ok(Endpoint::PosInf),
        Value::Number(n) => n
            .as_i64()
            .map(Endpoint::Finite)
            .ok_or_else(|| JsonError::new(path, "expected an integer endpoint")),
        _ => Err(JsonError::new(path, "expected an integer, \"-inf\" or \"inf\"")),
    }
}

/// Serializes an attribute value as `{type, data}`.
pub fn attribute_set_to_json(value: &AttributeSet) -> Value {
    match value {
        AttributeSet::Empty => json!({"type": "EmptySet"}),
        AttributeSet::Universal => json!({"type": "UniversalSet"}),
        AttributeSet::Finite(atoms) => json!({
            "type": "FiniteSet",
            "data": atoms.iter().map(atom_to_json).collect::<Vec<_>>(),
        }),
        AttributeSet::Integers(set) => json!({
            "type": "IntegerSet",
            "data": set
                .intervals()
                .iter()
                .map(|(lo, hi)| Value::Array(vec![endpoint_to_json(lo), endpoint_to_json(hi)]))
                .collect::<Vec<_>>(),
        }),
        AttributeSet::Regex(set) => json!({
            "type": "RegexSet",
            "data": set.pattern(),
        }),
    }
}

/// Deserializes an attribute value from `{type, data}`.
pub fn attribute_set_from_json(value: &Value, path: &str) -> Result<AttributeSet, JsonError> {
    let object = value
        .as_object()
        .ok_or_else(|| JsonError::new(path, "expected an attribute-value object"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonError::new(format!("{}.type", path), "missing variant tag"))?;
    let data_path = format!("{}.data", path);
    match kind {
        "EmptySet" => Ok(AttributeSet::Empty),
        "UniversalSet" => Ok(AttributeSet::Universal),
        "FiniteSet" => {
            let data = object
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| JsonError::new(&data_path, "expected a list of atoms"))?;
            let mut atoms = Vec::with_capacity(data.len());
            for (index, item) in data.iter().enumerate() {
                atoms.push(atom_from_json(item, &format!("{}[{}]", data_path, index))?);
            }
            Ok(AttributeSet::finite(atoms))
        }
        "IntegerSet" => {
            let data = object
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| JsonError::new(&data_path, "expected a list of intervals"))?;
            let mut intervals = Vec::with_capacity(data.len());
            for (index, item) in data.iter().enumerate() {
                let item_path = format!("{}[{}]", data_path, index);
                let pair = item
                    .as_array()
                    .filter(|pair| pair.len() == 2)
                    .ok_or_else(|| JsonError::new(&item_path, "expected a [lo, hi] pair"))?;
                let lo = endpoint_from_json(&pair[0], &format!("{}[0]", item_path))?;
                let hi = endpoint_from_json(&pair[1], &format!("{}[1]", item_path))?;
                intervals.push((lo, hi));
            }
            Ok(AttributeSet::integers(IntegerSet::from_intervals(intervals)))
        }
        "RegexSet" => {
            let pattern = object
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::new(&data_path, "expected a pattern string"))?;
            AttributeSet::regex(pattern)
                .map_err(|err| JsonError::new(&data_path, err.to_string()))
        }
        other => Err(JsonError::new(
            format!("{}.type", path),
            format!("unknown attribute-set variant '{}'", other),
        )),
    }
}

fn attrs_to_json(attrs: &Attributes) -> Value {
    let mut object = Map::new();
    for (key, value) in attrs {
        object.insert(key.clone(), attribute_set_to_json(value));
    }
    Value::Object(object)
}

fn attrs_from_json(value: &Value, path: &str) -> Result<Attributes, JsonError> {
    let object = value
        .as_object()
        .ok_or_else(|| JsonError::new(path, "expected an attribute map"))?;
    let mut attrs = Attributes::new();
    for (key, item) in object {
        attrs.insert(
            key.clone(),
            attribute_set_from_json(item, &format!("{}.{}", path, key))?,
        );
    }
    Ok(attrs)
}

// ----------------------------------------------------------------------
// Graphs
// ----------------------------------------------------------------------

impl Graph {
    /// Serializes the graph in the `{nodes, edges}` shape, elements in
    /// deterministic order.
    pub fn to_json(&self) -> Value {
        json!({
            "nodes": self
                .nodes()
                .map(|(id, attrs)| json!({"id": id.as_str(), "attrs": attrs_to_json(attrs)}))
                .collect::<Vec<_>>(),
            "edges": self
                .edges()
                .map(|(u, v, attrs)| {
                    json!({"from": u.as_str(), "to": v.as_str(), "attrs": attrs_to_json(attrs)})
                })
                .collect::<Vec<_>>(),
        })
    }

    /// Reads a graph back from the `{nodes, edges}` shape.
    pub fn from_json(value: &Value) -> Result<Graph, JsonError> {
        let mut graph = Graph::new();
        let nodes = value
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| JsonError::new("nodes", "expected a node list"))?;
        for (index, node) in nodes.iter().enumerate() {
            let path = format!("nodes[{}]", index);
            let id = node
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::new(format!("{}.id", path), "missing node id"))?;
            let attrs = match node.get("attrs") {
                Some(attrs) => attrs_from_json(attrs, &format!("{}.attrs", path))?,
                None => Attributes::new(),
            };
            graph
                .add_node(id, attrs)
                .map_err(|err| JsonError::new(&path, err.to_string()))?;
        }
        let edges = value
            .get("edges")
            .and_then(Value::as_array)
            .ok_or_else(|| JsonError::new("edges", "expected an edge list"))?;
        for (index, edge) in edges.iter().enumerate() {
            let path = format!("edges[{}]", index);
            let from = edge
                .get("from")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::new(format!("{}.from", path), "missing edge origin"))?;
            let to = edge
                .get("to")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::new(format!("{}.to", path), "missing edge target"))?;
            let attrs = match edge.get("attrs") {
                Some(attrs) => attrs_from_json(attrs, &format!("{}.attrs", path))?,
                None => Attributes::new(),
            };
            graph
                .add_edge(from, to, attrs)
                .map_err(|err| JsonError::new(&path, err.to_string()))?;
        }
        Ok(graph)
    }
}

// ----------------------------------------------------------------------
// Hierarchies
// ----------------------------------------------------------------------

fn mapping_to_json(mapping: &NodeMapping) -> Value {
    let mut object = Map::new();
    for (from, to) in mapping {
        object.insert(from.as_str().to_string(), Value::String(to.as_str().to_string()));
    }
    Value::Object(object)
}

fn mapping_from_json(value: &Value, path: &str) -> Result<NodeMapping, JsonError> {
    let object = value
        .as_object()
        .ok_or_else(|| JsonError::new(path, "expected a node mapping object"))?;
    let mut mapping = NodeMapping::new();
    for (from, to) in object {
        let to = to
            .as_str()
            .ok_or_else(|| JsonError::new(format!("{}.{}", path, from), "expected a node id"))?;
        mapping.insert(NodeId::from(from.as_str()), NodeId::from(to));
    }
    Ok(mapping)
}

impl Hierarchy {
    /// Serializes the hierarchy: a spanning tree rooted at the first
    /// untyped graph plus the complete flat typing and relation lists.
    pub fn to_json(&self) -> Value {
        // Spanning forest: each graph nests under its first typing target.
        let mut children_of: BTreeMap<&String, Vec<&String>> = BTreeMap::new();
        let mut roots: Vec<&String> = Vec::new();
        for id in self.graphs.keys() {
            match self.typing.get(id).and_then(|targets| targets.keys().next()) {
                Some(parent) => children_of.entry(parent).or_default().push(id),
                None => roots.push(id),
            }
        }

        fn subtree(
            h: &Hierarchy,
            id: &String,
            children_of: &BTreeMap<&String, Vec<&String>>,
        ) -> Value {
            let node = &h.graphs[id];
            json!({
                "name": id,
                "graph": node.graph.to_json(),
                "attrs": attrs_to_json(&node.attrs),
                "children": children_of
                    .get(id)
                    .map(|children| {
                        children
                            .iter()
                            .map(|child| subtree(h, child, children_of))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default(),
            })
        }

        let (top_name, top_graph, top_attrs, mut children) = match roots.split_first() {
            Some((top, rest)) => {
                let node = &self.graphs[*top];
                let mut children: Vec<Value> = children_of
                    .get(*top)
                    .map(|kids| {
                        kids.iter()
                            .map(|child| subtree(self, child, &children_of))
                            .collect()
                    })
                    .unwrap_or_default();
                // Extra roots (a hierarchy may have several sinks) ride along
                // in the children list; the typings array is authoritative.
                for other in rest {
                    children.push(subtree(self, other, &children_of));
                }
                (
                    (*top).clone(),
                    node.graph.to_json(),
                    attrs_to_json(&node.attrs),
                    children,
                )
            }
            None => (String::new(), json!(null), json!({}), Vec::new()),
        };
        children.sort_by_key(|child| {
            child
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        });

        json!({
            "name": top_name,
            "top_graph": top_graph,
            "attrs": top_attrs,
            "children": children,
            "typings": self
                .typings()
                .map(|(src, tgt, mapping)| {
                    json!({"from": src, "to": tgt, "mapping": mapping_to_json(mapping)})
                })
                .collect::<Vec<_>>(),
            "relations": self
                .relations
                .iter()
                .map(|((left, right), pairs)| {
                    json!({
                        "left": left,
                        "right": right,
                        "pairs": pairs
                            .iter()
                            .map(|(l, r)| json!([l.as_str(), r.as_str()]))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
        })
    }

    /// Reads a hierarchy back from [`Hierarchy::to_json`]'s shape.
    pub fn from_json(value: &Value) -> Result<Hierarchy, JsonError> {
        let mut hierarchy = Hierarchy::new();

        fn collect_graphs(
            value: &Value,
            path: &str,
            out: &mut Vec<(String, Graph, Attributes)>,
        ) -> Result<(), JsonError> {
            let name = value
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| JsonError::new(format!("{}.name", path), "missing graph name"))?;
            let graph_value = value
                .get("graph")
                .or_else(|| value.get("top_graph"))
                .ok_or_else(|| JsonError::new(path, "missing graph payload"))?;
            let graph = Graph::from_json(graph_value)
                .map_err(|err| JsonError::new(format!("{}.{}", path, err.path), err.reason))?;
            let attrs = match value.get("attrs") {
                Some(attrs) => attrs_from_json(attrs, &format!("{}.attrs", path))?,
                None => Attributes::new(),
            };
            out.push((name.to_string(), graph, attrs));
            if let Some(children) = value.get("children").and_then(Value::as_array) {
                for (index, child) in children.iter().enumerate() {
                    collect_graphs(child, &format!("{}.children[{}]", path, index), out)?;
                }
            }
            Ok(())
        }

        let mut graphs = Vec::new();
        if value.get("name").and_then(Value::as_str).is_some_and(|n| !n.is_empty()) {
            collect_graphs(value, "", &mut graphs)?;
        }
        for (name, graph, attrs) in graphs {
            hierarchy
                .add_graph(name.clone(), graph, attrs)
                .map_err(|err| JsonError::new(name, err.to_string()))?;
        }

        if let Some(typings) = value.get("typings").and_then(Value::as_array) {
            for (index, typing) in typings.iter().enumerate() {
                let path = format!("typings[{}]", index);
                let from = typing
                    .get("from")
                    .and_then(Value::as_str)
                    .ok_or_else(|| JsonError::new(format!("{}.from", path), "missing source"))?;
                let to = typing
                    .get("to")
                    .and_then(Value::as_str)
                    .ok_or_else(|| JsonError::new(format!("{}.to", path), "missing target"))?;
                let mapping = mapping_from_json(
                    typing
                        .get("mapping")
                        .ok_or_else(|| JsonError::new(&path, "missing mapping"))?,
                    &format!("{}.mapping", path),
                )?;
                hierarchy
                    .add_typing(from, to, mapping)
                    .map_err(|err| JsonError::new(&path, err.to_string()))?;
            }
        }

        if let Some(relations) = value.get("relations").and_then(Value::as_array) {
            for (index, relation) in relations.iter().enumerate() {
                let path = format!("relations[{}]", index);
                let left = relation
                    .get("left")
                    .and_then(Value::as_str)
                    .ok_or_else(|| JsonError::new(format!("{}.left", path), "missing left graph"))?;
                let right = relation.get("right").and_then(Value::as_str).ok_or_else(|| {
                    JsonError::new(format!("{}.right", path), "missing right graph")
                })?;
                let pairs = relation
                    .get("pairs")
                    .and_then(Value::as_array)
                    .ok_or_else(|| JsonError::new(format!("{}.pairs", path), "missing pairs"))?;
                let mut rel = Relation::new();
                for (pair_index, pair) in pairs.iter().enumerate() {
                    let pair_path = format!("{}.pairs[{}]", path, pair_index);
                    let items = pair
                        .as_array()
                        .filter(|items| items.len() == 2)
                        .ok_or_else(|| JsonError::new(&pair_path, "expected a node pair"))?;
                    let (Some(l), Some(r)) = (items[0].as_str(), items[1].as_str()) else {
                        return Err(JsonError::new(&pair_path, "expected node ids"));
                    };
                    rel.insert((NodeId::from(l), NodeId::from(r)));
                }
                hierarchy
                    .add_relation(left, right, rel)
                    .map_err(|err| JsonError::new(&path, err.to_string()))?;
            }
        }

        Ok(hierarchy)
    }
}

impl GraphNode {
    /// Serializes the member graph with its attributes.
    pub fn to_json(&self) -> Value {
        json!({"graph": self.graph.to_json(), "attrs": attrs_to_json(&self.attrs)})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_set::attrs;
    use crate::homomorphism::mapping;

    fn rich_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node(
            "a",
            attrs([
                ("color", AttributeSet::strings(["blue", "red"])),
                ("count", AttributeSet::ints([1, 2])),
                ("any", AttributeSet::Universal),
                ("nothing", AttributeSet::Empty),
            ]),
        )
        .unwrap();
        g.add_node(
            "b",
            attrs([
                (
                    "range",
                    AttributeSet::integers(IntegerSet::from_intervals([
                        (Endpoint::NegInf, Endpoint::Finite(0)),
                        (Endpoint::Finite(10), Endpoint::Finite(20)),
                    ])),
                ),
                ("name", AttributeSet::regex("[a-z]+").unwrap()),
            ]),
        )
        .unwrap();
        g.add_edge("a", "b", attrs([("weight", AttributeSet::ints([7]))]))
            .unwrap();
        g
    }

    #[test]
    fn graph_round_trip() {
        let g = rich_graph();
        let back = Graph::from_json(&g.to_json()).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn integer_set_sentinels() {
        let value = attribute_set_to_json(&AttributeSet::integers(IntegerSet::all()));
        assert_eq!(value["data"][0][0], "-inf");
        assert_eq!(value["data"][0][1], "inf");
        let back = attribute_set_from_json(&value, "attrs").unwrap();
        assert!(back.equals(&AttributeSet::integers(IntegerSet::all())));
    }

    #[test]
    fn errors_carry_paths() {
        let bad = json!({"nodes": [{"id": "a", "attrs": {"k": {"type": "Bogus"}}}], "edges": []});
        let err = Graph::from_json(&bad).unwrap_err();
        assert_eq!(err.path, "nodes[0].attrs.k.type");

        let bad_edge = json!({"nodes": [{"id": "a"}], "edges": [{"from": "a", "to": "ghost"}]});
        let err = Graph::from_json(&bad_edge).unwrap_err();
        assert_eq!(err.path, "edges[0]");

        let bad_regex = json!({"nodes": [{"id": "a", "attrs": {"k": {"type": "RegexSet", "data": "("}}}], "edges": []});
        let err = Graph::from_json(&bad_regex).unwrap_err();
        assert_eq!(err.path, "nodes[0].attrs.k.data");
    }

    #[test]
    fn hierarchy_round_trip() {
        let mut h = Hierarchy::new();
        let g = Graph::from_elements(["protein", "binding"], [("protein", "binding")]).unwrap();
        let t = Graph::from_elements(["agent", "action"], [("agent", "action")]).unwrap();
        h.add_graph("g", g, Attributes::new()).unwrap();
        h.add_graph("t", t, Attributes::new()).unwrap();
        h.add_typing("g", "t", mapping([("protein", "agent"), ("binding", "action")]))
            .unwrap();
        h.add_relation(
            "g",
            "t",
            [(NodeId::from("protein"), NodeId::from("agent"))]
                .into_iter()
                .collect(),
        )
        .unwrap();

        let value = h.to_json();
        assert_eq!(value["name"], "t");
        let back = Hierarchy::from_json(&value).unwrap();
        assert_eq!(h, back);
    }
}
