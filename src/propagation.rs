//! Rewrite propagation inside a hierarchy.
//!
//! A rewrite at graph `G` must leave every hierarchy invariant intact.
//! Restrictive effects (deletions, clones, attribute removals) propagate
//! *backward* to the ancestors typed by `G`; relaxing effects (additions,
//! merges, attribute additions) propagate *forward* to the descendants `G`
//! is typed by. After both passes every affected typing is rebuilt so that
//! all triangles commute, and relations are re-validated.
//!
//! All bookkeeping is computed against the old hierarchy first; the
//! hierarchy is mutated only once every new graph and typing is known, so a
//! failed rewrite leaves it untouched.

use crate::attribute_set::{attrs_included, intersect_attrs};
use crate::graph::{Graph, NodeId};
use crate::hierarchy::{Hierarchy, HierarchyError, PTyping, RhsTyping};
use crate::homomorphism::{
    check_homomorphism, compose, identity_mapping, is_monic, keys_by_value, NodeMapping,
};
use crate::rewrite::{pullback_complement, pushout, RewritingError};
use crate::rule::Rule;
use std::collections::{BTreeMap, BTreeSet};

/// The two categorical halves of the base rewrite, with every factor map.
pub(crate) struct BaseRewrite {
    pub gm: Graph,
    pub p_gm: NodeMapping,
    pub gm_g: NodeMapping,
    pub g_prime: Graph,
    pub gm_gp: NodeMapping,
    pub rhs_instance: NodeMapping,
}

/// A rewritten ancestor: the new graph, a map onto the old ancestor, and a
/// (total) map into the rewritten origin's pullback complement.
pub(crate) struct AncestorUpdate {
    pub graph: Graph,
    pub to_old: NodeMapping,
    pub to_origin: NodeMapping,
}

/// A rewritten descendant: the new graph, the (possibly non-injective) map
/// from old nodes onto their survivors, and the image of the RHS.
pub(crate) struct DescendantUpdate {
    pub graph: Graph,
    pub old_to_new: NodeMapping,
    pub rhs_image: NodeMapping,
}

/// Entry point used by [`Hierarchy::rewrite`].
pub(crate) fn rewrite_in_hierarchy(
    h: &mut Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
    p_typing: Option<&PTyping>,
    rhs_typing: Option<&RhsTyping>,
    strict: bool,
) -> Result<NodeMapping, HierarchyError> {
    let g = h.get_graph(graph_id)?;
    check_homomorphism(rule.lhs(), g, instance)
        .map_err(|reason| HierarchyError::Rewriting(RewritingError::InvalidMatch(reason)))?;
    if !is_monic(instance) {
        return Err(HierarchyError::Rewriting(RewritingError::MatchNotInjective));
    }
    validate_p_typing(h, graph_id, rule, instance, p_typing)?;
    validate_rhs_typing(h, graph_id, rule, rhs_typing)?;
    if strict {
        check_strict(h, graph_id, rule, instance, p_typing, rhs_typing)?;
    }

    let base = rewrite_base(h, graph_id, rule, instance)?;
    let ancestors = propagate_backward(h, graph_id, rule, instance, &base, p_typing)?;
    let descendants = propagate_forward(h, graph_id, rule, instance, &base, rhs_typing)?;

    let new_typings = compute_typings(h, graph_id, rule, &base, &ancestors, &descendants)?;

    // Point of no return: swap graphs, install typings, revalidate relations.
    if let Some(node) = h.graphs.get_mut(graph_id) {
        node.graph = base.g_prime.clone();
    }
    for (id, update) in &ancestors {
        if let Some(node) = h.graphs.get_mut(id) {
            node.graph = update.graph.clone();
        }
    }
    for (id, update) in &descendants {
        if let Some(node) = h.graphs.get_mut(id) {
            node.graph = update.graph.clone();
        }
    }
    for ((src, tgt), mapping) in new_typings {
        if let Some(targets) = h.typing.get_mut(&src) {
            targets.insert(tgt, mapping);
        }
    }
    revalidate_relations(h);

    Ok(base.rhs_instance)
}

/// The base rewrite: final pullback complement then pushout.
fn rewrite_base(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
) -> Result<BaseRewrite, HierarchyError> {
    let g = h.get_graph(graph_id)?;
    let (gm, p_gm, gm_g) = pullback_complement(rule.p(), rule.lhs(), g, rule.p_lhs(), instance)?;
    let (g_prime, gm_gp, rhs_instance) = pushout(rule.p(), &gm, rule.rhs(), &p_gm, rule.p_rhs())?;
    Ok(BaseRewrite {
        gm,
        p_gm,
        gm_g,
        g_prime,
        gm_gp,
        rhs_instance,
    })
}

fn validate_p_typing(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
    p_typing: Option<&PTyping>,
) -> Result<(), HierarchyError> {
    let Some(p_typing) = p_typing else {
        return Ok(());
    };
    let ancestors = h.ancestors(graph_id);
    for (ancestor_id, assignments) in p_typing {
        if !ancestors.contains(ancestor_id) {
            return Err(HierarchyError::InvalidTypingSpecification(format!(
                "'{}' is not an ancestor of '{}'",
                ancestor_id, graph_id
            )));
        }
        let ancestor_graph = h.get_graph(ancestor_id)?;
        let origin_typing = h
            .get_typing(ancestor_id, graph_id)
            .ok_or_else(|| HierarchyError::MissingTyping(ancestor_id.clone(), graph_id.to_string()))?;
        for (a_node, p_node) in assignments {
            if !ancestor_graph.contains_node(a_node) {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "node '{}' is not in graph '{}'",
                    a_node, ancestor_id
                )));
            }
            let Some(l_node) = rule.p_lhs().get(p_node) else {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "'{}' is not an interface node of the rule",
                    p_node
                )));
            };
            let Some(origin) = instance.get(l_node) else {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "pattern node '{}' has no image in the instance",
                    l_node
                )));
            };
            if origin_typing.get(a_node) != Some(origin) {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "node '{}' of '{}' is not an instance of the cloned node '{}'",
                    a_node, ancestor_id, l_node
                )));
            }
        }
    }
    Ok(())
}

fn validate_rhs_typing(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    rhs_typing: Option<&RhsTyping>,
) -> Result<(), HierarchyError> {
    let Some(rhs_typing) = rhs_typing else {
        return Ok(());
    };
    let descendants = h.descendants(graph_id);
    for (descendant_id, assignments) in rhs_typing {
        if !descendants.contains(descendant_id) {
            return Err(HierarchyError::InvalidTypingSpecification(format!(
                "'{}' is not a descendant of '{}'",
                descendant_id, graph_id
            )));
        }
        let descendant_graph = h.get_graph(descendant_id)?;
        for (r_node, d_node) in assignments {
            if !rule.rhs().contains_node(r_node) {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "'{}' is not a node of the rule's right-hand side",
                    r_node
                )));
            }
            if !descendant_graph.contains_node(d_node) {
                return Err(HierarchyError::InvalidTypingSpecification(format!(
                    "node '{}' is not in graph '{}'",
                    d_node, descendant_id
                )));
            }
        }
    }
    Ok(())
}

/// Strict-mode admission: reject any rule that would force a change
/// outside the rewritten graph, naming the element and the graph.
fn check_strict(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
    p_typing: Option<&PTyping>,
    rhs_typing: Option<&RhsTyping>,
) -> Result<(), HierarchyError> {
    let denied = |graph: &str, element: String, action: &'static str| {
        Err(HierarchyError::Rewriting(RewritingError::ForcedPropagation {
            graph: graph.to_string(),
            element,
            action,
        }))
    };

    // Backward direction: deletions and clones with inbound instances.
    for ancestor_id in h.ancestors(graph_id) {
        let Some(origin_typing) = h.get_typing(&ancestor_id, graph_id) else {
            continue;
        };
        let ancestor_graph = h.get_graph(&ancestor_id)?;
        for l_node in rule.removed_nodes() {
            if let Some(origin) = instance.get(&l_node) {
                if !keys_by_value(&origin_typing, origin).is_empty() {
                    return denied(&ancestor_id, format!("removed node '{}'", l_node), "deletion");
                }
            }
        }
        for (pu, pv) in rule.removed_edges() {
            let (gu, gv) = (&instance[&rule.p_lhs()[&pu]], &instance[&rule.p_lhs()[&pv]]);
            for (u, v, _) in ancestor_graph.edges() {
                if origin_typing.get(u) == Some(gu) && origin_typing.get(v) == Some(gv) {
                    return denied(
                        &ancestor_id,
                        format!("removed edge '{}'->'{}'", pu, pv),
                        "deletion",
                    );
                }
            }
        }
        for (l_node, removed) in rule.removed_node_attrs()? {
            let origin = &instance[&l_node];
            for a_node in keys_by_value(&origin_typing, origin) {
                if let Some(a_attrs) = ancestor_graph.get_node_attrs(&a_node) {
                    if !intersect_attrs(a_attrs, &removed)?.is_empty() {
                        return denied(
                            &ancestor_id,
                            format!("removed attributes of '{}'", l_node),
                            "attribute deletion",
                        );
                    }
                }
            }
        }
        for ((pu, pv), removed) in rule.removed_edge_attrs()? {
            let (gu, gv) = (&instance[&rule.p_lhs()[&pu]], &instance[&rule.p_lhs()[&pv]]);
            for (u, v, a_attrs) in ancestor_graph.edges() {
                if origin_typing.get(u) == Some(gu)
                    && origin_typing.get(v) == Some(gv)
                    && !intersect_attrs(a_attrs, &removed)?.is_empty()
                {
                    return denied(
                        &ancestor_id,
                        format!("removed attributes of edge '{}'->'{}'", pu, pv),
                        "attribute deletion",
                    );
                }
            }
        }
        for (l_node, _clones) in rule.cloned_nodes() {
            let origin = &instance[&l_node];
            for a_node in keys_by_value(&origin_typing, origin) {
                let assigned = p_typing
                    .and_then(|p| p.get(&ancestor_id))
                    .map(|m| m.contains_key(&a_node))
                    .unwrap_or(false);
                if !assigned {
                    return denied(
                        &ancestor_id,
                        format!("cloned node '{}' (instance '{}')", l_node, a_node),
                        "cloning",
                    );
                }
            }
        }
    }

    // Forward direction: additions and merges in every direct successor.
    for successor in h.successors(graph_id) {
        let Some(typing) = h.direct_typing(graph_id, &successor).cloned() else {
            continue;
        };
        let successor_graph = h.get_graph(&successor)?;

        let image_of_rhs = |r_node: &NodeId| -> Option<NodeId> {
            let fiber = keys_by_value(rule.p_rhs(), r_node);
            if let Some(p_node) = fiber.first() {
                let l_node = rule.p_lhs().get(p_node)?;
                let g_node = instance.get(l_node)?;
                return typing.get(g_node).cloned();
            }
            rhs_typing
                .and_then(|r| r.get(&successor))
                .and_then(|m| m.get(r_node))
                .cloned()
        };

        for r_node in rule.added_nodes() {
            match image_of_rhs(&r_node) {
                None => {
                    return denied(&successor, format!("added node '{}'", r_node), "addition");
                }
                Some(target) => {
                    let target_attrs = successor_graph
                        .get_node_attrs(&target)
                        .cloned()
                        .unwrap_or_default();
                    let r_attrs = rule.rhs().get_node_attrs(&r_node).cloned().unwrap_or_default();
                    if !attrs_included(&r_attrs, &target_attrs) {
                        return denied(
                            &successor,
                            format!("attributes of added node '{}'", r_node),
                            "attribute addition",
                        );
                    }
                }
            }
        }
        for (ru, rv) in rule.added_edges() {
            let (Some(du), Some(dv)) = (image_of_rhs(&ru), image_of_rhs(&rv)) else {
                return denied(
                    &successor,
                    format!("added edge '{}'->'{}'", ru, rv),
                    "addition",
                );
            };
            if !successor_graph.exists_edge(&du, &dv) {
                return denied(
                    &successor,
                    format!("added edge '{}'->'{}'", ru, rv),
                    "addition",
                );
            }
        }
        for (r_node, added) in rule.added_node_attrs()? {
            if let Some(target) = image_of_rhs(&r_node) {
                let target_attrs = successor_graph
                    .get_node_attrs(&target)
                    .cloned()
                    .unwrap_or_default();
                if !attrs_included(&added, &target_attrs) {
                    return denied(
                        &successor,
                        format!("added attributes of '{}'", r_node),
                        "attribute addition",
                    );
                }
            }
        }
        for (r_node, fiber) in rule.merged_nodes() {
            let mut images = BTreeSet::new();
            for p_node in &fiber {
                if let Some(l_node) = rule.p_lhs().get(p_node) {
                    if let Some(g_node) = instance.get(l_node) {
                        if let Some(image) = typing.get(g_node) {
                            images.insert(image.clone());
                        }
                    }
                }
            }
            if images.len() > 1 {
                return denied(&successor, format!("merged node '{}'", r_node), "merge");
            }
        }
    }
    Ok(())
}

/// Backward propagation: one independent update per ancestor.
fn propagate_backward(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
    base: &BaseRewrite,
    p_typing: Option<&PTyping>,
) -> Result<BTreeMap<String, AncestorUpdate>, HierarchyError> {
    let mut updates = BTreeMap::new();
    for ancestor_id in h.ancestors(graph_id) {
        let Some(origin_typing) = h.get_typing(&ancestor_id, graph_id) else {
            continue;
        };
        let mut graph = h.get_graph(&ancestor_id)?.clone();
        let mut to_old = identity_mapping(graph.node_ids());
        let mut to_origin = origin_typing.clone();

        // Deletions: every instance of a removed origin node goes, with
        // cascading edges.
        for l_node in rule.removed_nodes() {
            let Some(origin) = instance.get(&l_node) else {
                continue;
            };
            for a_node in keys_by_value(&origin_typing, origin) {
                graph.remove_node(&a_node)?;
                to_old.remove(&a_node);
                to_origin.remove(&a_node);
            }
        }

        // Clones: an instance either follows its `p_typing` assignment or
        // is cloned once per interface copy.
        for (l_node, p_nodes) in rule.cloned_nodes() {
            let origin = &instance[&l_node];
            for a_node in keys_by_value(&origin_typing, origin) {
                let assigned = p_typing
                    .and_then(|p| p.get(&ancestor_id))
                    .and_then(|m| m.get(&a_node));
                if let Some(p_node) = assigned {
                    to_origin.insert(a_node.clone(), base.p_gm[p_node].clone());
                } else {
                    for (index, p_node) in p_nodes.iter().enumerate() {
                        if index == 0 {
                            to_origin.insert(a_node.clone(), base.p_gm[p_node].clone());
                        } else {
                            let copy = graph.clone_node(&a_node, None)?;
                            to_old.insert(copy.clone(), a_node.clone());
                            to_origin.insert(copy, base.p_gm[p_node].clone());
                        }
                    }
                }
            }
        }

        // Repair pass: restore subsumption against the pullback complement
        // by intersecting node attributes, dropping edges whose image edge
        // is gone, and intersecting edge attributes.
        let node_ids: Vec<NodeId> = graph.node_ids().cloned().collect();
        for a_node in &node_ids {
            let origin = &to_origin[a_node];
            let origin_attrs = base.gm.get_node_attrs(origin).cloned().unwrap_or_default();
            let current = graph.get_node_attrs(a_node).cloned().unwrap_or_default();
            let meet = intersect_attrs(&current, &origin_attrs)?;
            graph.set_node_attrs(a_node, meet)?;
        }
        let edges: Vec<(NodeId, NodeId)> = graph
            .edges()
            .map(|(u, v, _)| (u.clone(), v.clone()))
            .collect();
        for (u, v) in edges {
            let (ou, ov) = (&to_origin[&u], &to_origin[&v]);
            match base.gm.get_edge_attrs(ou, ov) {
                None => graph.remove_edge(&u, &v)?,
                Some(origin_attrs) => {
                    let current = graph.get_edge_attrs(&u, &v).cloned().unwrap_or_default();
                    let meet = intersect_attrs(&current, origin_attrs)?;
                    graph.set_edge_attrs(&u, &v, meet)?;
                }
            }
        }

        updates.insert(
            ancestor_id,
            AncestorUpdate {
                graph,
                to_old,
                to_origin,
            },
        );
    }
    Ok(updates)
}

/// Forward propagation: one independent update per descendant.
fn propagate_forward(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    instance: &NodeMapping,
    base: &BaseRewrite,
    rhs_typing: Option<&RhsTyping>,
) -> Result<BTreeMap<String, DescendantUpdate>, HierarchyError> {
    let mut updates = BTreeMap::new();
    for descendant_id in h.descendants(graph_id) {
        let Some(typing) = h.get_typing(graph_id, &descendant_id) else {
            continue;
        };
        let mut graph = h.get_graph(&descendant_id)?.clone();
        let mut old_to_new = identity_mapping(graph.node_ids());
        let mut rhs_image = NodeMapping::new();

        // Preserved and merged RHS nodes: follow the fiber's types,
        // merging when a fiber's instances are typed apart.
        for r_node in rule.rhs().node_ids() {
            let fiber = keys_by_value(rule.p_rhs(), r_node);
            if fiber.is_empty() {
                continue;
            }
            let mut targets: Vec<NodeId> = Vec::new();
            for p_node in &fiber {
                let l_node = &rule.p_lhs()[p_node];
                let g_node = &instance[l_node];
                let old_target = &typing[g_node];
                let current = old_to_new[old_target].clone();
                if !targets.contains(&current) {
                    targets.push(current);
                }
            }
            if targets.len() > 1 {
                let merged = graph.merge_nodes(&targets, None)?;
                let target_set: BTreeSet<NodeId> = targets.into_iter().collect();
                for image in old_to_new.values_mut() {
                    if target_set.contains(image) {
                        *image = merged.clone();
                    }
                }
                for image in rhs_image.values_mut() {
                    if target_set.contains(image) {
                        *image = merged.clone();
                    }
                }
                rhs_image.insert(r_node.clone(), merged);
            } else if let Some(only) = targets.into_iter().next() {
                rhs_image.insert(r_node.clone(), only);
            }
        }

        // Additions: use the provided typing, otherwise add a fresh node.
        for r_node in rule.added_nodes() {
            let assigned = rhs_typing
                .and_then(|r| r.get(&descendant_id))
                .and_then(|m| m.get(&r_node));
            let attrs = rule.rhs().get_node_attrs(&r_node).cloned().unwrap_or_default();
            match assigned {
                Some(d_node) => {
                    let current = old_to_new[d_node].clone();
                    graph.add_node_attrs(&current, &attrs)?;
                    rhs_image.insert(r_node.clone(), current);
                }
                None => {
                    let fresh = graph.generate_new_id(&r_node);
                    graph.add_node(fresh.clone(), attrs)?;
                    rhs_image.insert(r_node.clone(), fresh);
                }
            }
        }

        // Edges and attributes: ensure every RHS element's image exists and
        // subsumes, unioning in whatever the rule added.
        for (ru, rv, r_attrs) in rule.rhs().edges() {
            let (du, dv) = (rhs_image[ru].clone(), rhs_image[rv].clone());
            if graph.exists_edge(&du, &dv) {
                graph.add_edge_attrs(&du, &dv, r_attrs)?;
            } else {
                graph.add_edge(du, dv, r_attrs.clone())?;
            }
        }
        for (r_node, r_attrs) in rule.rhs().nodes() {
            if let Some(image) = rhs_image.get(r_node) {
                graph.add_node_attrs(image, r_attrs)?;
            }
        }

        updates.insert(
            descendant_id,
            DescendantUpdate {
                graph,
                old_to_new,
                rhs_image,
            },
        );
    }
    Ok(updates)
}

/// Rebuilds every typing edge touched by the rewrite. Computed before any
/// mutation; failure here aborts the whole rewrite.
fn compute_typings(
    h: &Hierarchy,
    graph_id: &str,
    rule: &Rule,
    base: &BaseRewrite,
    ancestors: &BTreeMap<String, AncestorUpdate>,
    descendants: &BTreeMap<String, DescendantUpdate>,
) -> Result<BTreeMap<(String, String), NodeMapping>, HierarchyError> {
    let mut out = BTreeMap::new();
    for (src, tgt, old_map) in h.typings() {
        let mapping = if src == graph_id {
            let Some(desc) = descendants.get(tgt) else {
                continue;
            };
            let mut mapping = NodeMapping::new();
            for gm_node in base.gm.node_ids() {
                let g_prime_node = &base.gm_gp[gm_node];
                let old_g = &base.gm_g[gm_node];
                let old_target = &old_map[old_g];
                mapping.insert(g_prime_node.clone(), desc.old_to_new[old_target].clone());
            }
            for r_node in rule.added_nodes() {
                mapping.insert(
                    base.rhs_instance[&r_node].clone(),
                    desc.rhs_image[&r_node].clone(),
                );
            }
            mapping
        } else if let Some(a) = ancestors.get(src) {
            if tgt == graph_id {
                compose(&a.to_origin, &base.gm_gp).map_err(|reason| {
                    HierarchyError::InvalidTyping {
                        source: src.clone(),
                        target: tgt.clone(),
                        reason,
                    }
                })?
            } else if let Some(b) = ancestors.get(tgt) {
                ancestor_to_ancestor(src, tgt, a, b, old_map)?
            } else if let Some(d) = descendants.get(tgt) {
                let mut mapping = NodeMapping::new();
                for a_node in a.graph.node_ids() {
                    let old_a = &a.to_old[a_node];
                    let old_target = &old_map[old_a];
                    mapping.insert(a_node.clone(), d.old_to_new[old_target].clone());
                }
                mapping
            } else {
                let mut mapping = NodeMapping::new();
                for a_node in a.graph.node_ids() {
                    let old_a = &a.to_old[a_node];
                    mapping.insert(a_node.clone(), old_map[old_a].clone());
                }
                mapping
            }
        } else if let Some(d1) = descendants.get(src) {
            let Some(d2) = descendants.get(tgt) else {
                continue;
            };
            let mut mapping = NodeMapping::new();
            for (old_node, old_target) in old_map {
                mapping.insert(
                    d1.old_to_new[old_node].clone(),
                    d2.old_to_new[old_target].clone(),
                );
            }
            for r_node in rule.added_nodes() {
                mapping.insert(
                    d1.rhs_image[&r_node].clone(),
                    d2.rhs_image[&r_node].clone(),
                );
            }
            mapping
        } else if let Some(d2) = descendants.get(tgt) {
            let mut mapping = NodeMapping::new();
            for (old_node, old_target) in old_map {
                mapping.insert(old_node.clone(), d2.old_to_new[old_target].clone());
            }
            mapping
        } else {
            continue;
        };
        out.insert((src.clone(), tgt.clone()), mapping);
    }
    Ok(out)
}

/// Typing between two rewritten ancestors. Copies of a node are matched by
/// their common image in the pullback complement; an inconsistent set of
/// `p_typing` assignments has no total solution and is rejected.
fn ancestor_to_ancestor(
    src: &str,
    tgt: &str,
    a: &AncestorUpdate,
    b: &AncestorUpdate,
    old_map: &NodeMapping,
) -> Result<NodeMapping, HierarchyError> {
    let mut copies: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for (b_node, b_old) in &b.to_old {
        copies.entry(b_old.clone()).or_default().push(b_node.clone());
    }
    let mut mapping = NodeMapping::new();
    for a_node in a.graph.node_ids() {
        let old_a = &a.to_old[a_node];
        let old_b = &old_map[old_a];
        let candidates = copies.get(old_b).cloned().unwrap_or_default();
        let chosen = match candidates.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            _ => candidates
                .iter()
                .find(|b_node| b.to_origin.get(*b_node) == a.to_origin.get(a_node))
                .cloned(),
        };
        match chosen {
            Some(image) => {
                mapping.insert(a_node.clone(), image);
            }
            None => {
                return Err(HierarchyError::CommutativityViolation {
                    source: src.to_string(),
                    target: tgt.to_string(),
                });
            }
        }
    }
    Ok(mapping)
}

/// Drops relation pairs whose nodes vanished.
fn revalidate_relations(h: &mut Hierarchy) {
    let graphs = h.graphs.clone();
    for ((left, right), relation) in h.relations.iter_mut() {
        let (Some(left_node), Some(right_node)) = (graphs.get(left), graphs.get(right)) else {
            continue;
        };
        relation.retain(|(l, r)| {
            left_node.graph.contains_node(l) && right_node.graph.contains_node(r)
        });
    }
}
