//! Revision control over graphs and hierarchies.
//!
//! [`VersionedGraph`] and [`VersionedHierarchy`] wrap an object with an
//! append-only revision DAG. Every rewrite is a commit carrying a
//! replayable delta (the rule with its recorded instances); branches keep
//! materialized per-branch states; merging replays the other branch's
//! deltas since the nearest common ancestor; rolling back applies inverse
//! deltas (graphs) or replays the surviving lineage from the initial
//! snapshot (hierarchies). Revisions are never destroyed: a rollback only
//! repositions heads.
//!
//! Commit identifiers are domain-separated SHA-256 over the parent ids,
//! branch, message and a per-object sequence number, so they are
//! deterministic and carry no wall-clock component. Each revision also
//! stores a non-semantic timestamp for history listings.
//!
//! # Citations
//! - Commit DAGs: Chacon & Straub, "Pro Git" (2014)
//! - Inverse rewrites: Ehrig et al., "Fundamentals of Algebraic Graph
//!   Transformation", Chapter 6 (2006)

use crate::fingerprint::HashValue;
use crate::graph::{Graph, GraphError, NodeId};
use crate::hierarchy::{Hierarchy, HierarchyError, PTyping, RhsTyping};
use crate::homomorphism::NodeMapping;
use crate::rewrite::RewritingError;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque identifier of a revision.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// The full hex representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the audit layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The referenced branch does not exist.
    UnknownBranch(String),
    /// A branch with this name already exists.
    BranchAlreadyExists(String),
    /// The referenced commit does not exist.
    UnknownCommit(String),
    /// Two heads share no common ancestor.
    NoCommonAncestor(String, String),
    /// Replaying a delta onto the current branch failed.
    MergeConflict(String),
    /// A rewrite failed.
    Rewriting(RewritingError),
    /// A hierarchy operation failed.
    Hierarchy(HierarchyError),
    /// A graph operation failed.
    Graph(GraphError),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::UnknownBranch(name) => write!(f, "branch '{}' does not exist", name),
            AuditError::BranchAlreadyExists(name) => {
                write!(f, "branch '{}' already exists", name)
            }
            AuditError::UnknownCommit(id) => write!(f, "commit '{}' does not exist", id),
            AuditError::NoCommonAncestor(a, b) => {
                write!(f, "branches '{}' and '{}' share no common ancestor", a, b)
            }
            AuditError::MergeConflict(msg) => write!(f, "merge conflict: {}", msg),
            AuditError::Rewriting(err) => write!(f, "{}", err),
            AuditError::Hierarchy(err) => write!(f, "{}", err),
            AuditError::Graph(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AuditError {}

impl From<RewritingError> for AuditError {
    fn from(err: RewritingError) -> Self {
        AuditError::Rewriting(err)
    }
}

impl From<HierarchyError> for AuditError {
    fn from(err: HierarchyError) -> Self {
        AuditError::Hierarchy(err)
    }
}

impl From<GraphError> for AuditError {
    fn from(err: GraphError) -> Self {
        AuditError::Graph(err)
    }
}

/// What a revision records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionKind {
    /// The root revision.
    Initial,
    /// A rewrite commit (its delta is stored alongside).
    Rewrite,
    /// A branch creation, from the named source branch.
    Branch {
        /// The branch this one forked from.
        from: String,
    },
    /// A merge of another branch's head into this branch.
    Merge {
        /// The merged branch.
        other: String,
    },
}

/// A node of the revision DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Unique identifier.
    pub id: CommitId,
    /// The branch the revision was committed on.
    pub branch: String,
    /// One parent, or two for merge revisions.
    pub parents: Vec<CommitId>,
    /// Human-readable message.
    pub message: String,
    /// Seconds since the Unix epoch (display only, not part of the id).
    pub timestamp: u64,
    /// Payload kind.
    pub kind: RevisionKind,
}

/// A replayable graph rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDelta {
    /// The applied rule.
    pub rule: Rule,
    /// The instance `L → G` it was applied at.
    pub lhs_instance: NodeMapping,
    /// The resulting instance `R → G'`.
    pub rhs_instance: NodeMapping,
}

impl GraphDelta {
    /// The algebraic inverse: the reverse span applied at the RHS instance.
    pub fn inverted(&self) -> GraphDelta {
        GraphDelta {
            rule: self.rule.inverted(),
            lhs_instance: self.rhs_instance.clone(),
            rhs_instance: self.lhs_instance.clone(),
        }
    }
}

/// A replayable hierarchy rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyDelta {
    /// The rewritten member graph.
    pub graph_id: String,
    /// The applied rule.
    pub rule: Rule,
    /// The instance it was applied at.
    pub lhs_instance: NodeMapping,
    /// Clone assignments for ancestors.
    pub p_typing: Option<PTyping>,
    /// Typing of added elements in descendants.
    pub rhs_typing: Option<RhsTyping>,
}

/// The branch/head/revision bookkeeping shared by both wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RevisionLog {
    heads: BTreeMap<String, CommitId>,
    current: String,
    revisions: BTreeMap<CommitId, Revision>,
    order: Vec<CommitId>,
    seq: u64,
}

impl RevisionLog {
    fn new(init_branch: &str) -> Self {
        let mut log = Self {
            heads: BTreeMap::new(),
            current: init_branch.to_string(),
            revisions: BTreeMap::new(),
            order: Vec::new(),
            seq: 0,
        };
        // The commit installs itself as the branch head.
        log.commit(init_branch, Vec::new(), RevisionKind::Initial, "initial");
        log
    }

    fn mint_id(&mut self, branch: &str, message: &str, parents: &[CommitId]) -> CommitId {
        let mut data = Vec::new();
        data.extend_from_slice(&self.seq.to_le_bytes());
        data.extend_from_slice(branch.as_bytes());
        data.push(0);
        data.extend_from_slice(message.as_bytes());
        for parent in parents {
            data.push(0);
            data.extend_from_slice(parent.as_str().as_bytes());
        }
        self.seq += 1;
        CommitId(HashValue::hash_with_domain(b"COMMIT", &data).to_hex())
    }

    fn commit(
        &mut self,
        branch: &str,
        parents: Vec<CommitId>,
        kind: RevisionKind,
        message: &str,
    ) -> CommitId {
        let id = self.mint_id(branch, message, &parents);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.revisions.insert(
            id.clone(),
            Revision {
                id: id.clone(),
                branch: branch.to_string(),
                parents,
                message: message.to_string(),
                timestamp,
                kind,
            },
        );
        self.order.push(id.clone());
        self.heads.insert(branch.to_string(), id.clone());
        id
    }

    fn head(&self, branch: &str) -> Result<CommitId, AuditError> {
        self.heads
            .get(branch)
            .cloned()
            .ok_or_else(|| AuditError::UnknownBranch(branch.to_string()))
    }

    /// The first-parent chain from a commit down to the root, inclusive.
    fn first_parent_chain(&self, from: &CommitId) -> Vec<CommitId> {
        let mut chain = Vec::new();
        let mut cursor = Some(from.clone());
        while let Some(id) = cursor {
            cursor = self
                .revisions
                .get(&id)
                .and_then(|rev| rev.parents.first().cloned());
            chain.push(id);
        }
        chain
    }

    /// The nearest common ancestor of two heads along first-parent chains.
    fn common_ancestor(&self, a: &CommitId, b: &CommitId) -> Option<CommitId> {
        let ancestors_of_a: BTreeSet<CommitId> = self.first_parent_chain(a).into_iter().collect();
        self.first_parent_chain(b)
            .into_iter()
            .find(|id| ancestors_of_a.contains(id))
    }

    /// Every commit strictly below `target` in the revision DAG.
    fn descendants_of(&self, target: &CommitId) -> BTreeSet<CommitId> {
        let mut out = BTreeSet::new();
        // The DAG is small; a fixpoint over the parent lists is simplest.
        loop {
            let mut changed = false;
            for rev in self.revisions.values() {
                if out.contains(&rev.id) {
                    continue;
                }
                if rev
                    .parents
                    .iter()
                    .any(|p| p == target || out.contains(p))
                {
                    out.insert(rev.id.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        out
    }

    fn history(&self) -> Vec<&Revision> {
        self.order
            .iter()
            .filter_map(|id| self.revisions.get(id))
            .collect()
    }

    fn print_history(&self) -> String {
        let mut out = String::new();
        for rev in self.history() {
            out.push_str(&format!(
                "{}  {}  {}  {}\n",
                rev.timestamp,
                rev.id.short(),
                rev.branch,
                rev.message
            ));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.history()
                .into_iter()
                .map(|rev| {
                    serde_json::json!({
                        "timestamp": rev.timestamp,
                        "id": rev.id.as_str(),
                        "branch": rev.branch,
                        "message": rev.message,
                    })
                })
                .collect(),
        )
    }
}

/// A graph under revision control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedGraph {
    branches: BTreeMap<String, Graph>,
    deltas: BTreeMap<CommitId, Vec<GraphDelta>>,
    log: RevisionLog,
}

impl VersionedGraph {
    /// Wraps a graph, creating the initial revision on `init_branch`.
    pub fn new(graph: Graph, init_branch: &str) -> Self {
        let log = RevisionLog::new(init_branch);
        let mut branches = BTreeMap::new();
        branches.insert(init_branch.to_string(), graph);
        Self {
            branches,
            deltas: BTreeMap::new(),
            log,
        }
    }

    /// The current branch's graph.
    pub fn graph(&self) -> &Graph {
        &self.branches[&self.log.current]
    }

    /// The current branch name.
    pub fn current_branch(&self) -> &str {
        &self.log.current
    }

    /// All branch names.
    pub fn branches(&self) -> Vec<String> {
        self.branches.keys().cloned().collect()
    }

    /// The head commit of a branch.
    pub fn head(&self, branch: &str) -> Result<CommitId, AuditError> {
        self.log.head(branch)
    }

    /// Rewrites the current branch's graph and commits the delta.
    /// Returns the new commit id.
    pub fn rewrite(
        &mut self,
        rule: &Rule,
        instance: &NodeMapping,
        message: &str,
    ) -> Result<CommitId, AuditError> {
        let graph = self
            .branches
            .get_mut(&self.log.current)
            .ok_or_else(|| AuditError::UnknownBranch(self.log.current.clone()))?;
        let rhs_instance = graph.rewrite(rule, instance)?;
        let parent = self.log.head(&self.log.current.clone())?;
        let branch = self.log.current.clone();
        let id = self
            .log
            .commit(&branch, vec![parent], RevisionKind::Rewrite, message);
        self.deltas.insert(
            id.clone(),
            vec![GraphDelta {
                rule: rule.clone(),
                lhs_instance: instance.clone(),
                rhs_instance,
            }],
        );
        Ok(id)
    }

    /// Creates a branch at the current head and switches to it.
    pub fn branch(&mut self, name: &str) -> Result<CommitId, AuditError> {
        if self.branches.contains_key(name) {
            return Err(AuditError::BranchAlreadyExists(name.to_string()));
        }
        let parent = self.log.head(&self.log.current.clone())?;
        let from = self.log.current.clone();
        let state = self.branches[&from].clone();
        self.branches.insert(name.to_string(), state);
        let id = self.log.commit(
            name,
            vec![parent],
            RevisionKind::Branch { from },
            &format!("branch '{}'", name),
        );
        self.log.current = name.to_string();
        Ok(id)
    }

    /// Repositions the working head onto another branch.
    pub fn switch_branch(&mut self, name: &str) -> Result<(), AuditError> {
        if !self.branches.contains_key(name) {
            return Err(AuditError::UnknownBranch(name.to_string()));
        }
        self.log.current = name.to_string();
        Ok(())
    }

    /// Merges another branch into the current one by replaying its deltas
    /// since the nearest common ancestor. Records a two-parent merge
    /// commit; the other branch is left in place.
    pub fn merge_with(&mut self, other: &str) -> Result<CommitId, AuditError> {
        let current_head = self.log.head(&self.log.current.clone())?;
        let other_head = self.log.head(other)?;
        let ancestor = self
            .log
            .common_ancestor(&current_head, &other_head)
            .ok_or_else(|| {
                AuditError::NoCommonAncestor(self.log.current.clone(), other.to_string())
            })?;

        let mut to_replay: Vec<CommitId> = Vec::new();
        for id in self.log.first_parent_chain(&other_head) {
            if id == ancestor {
                break;
            }
            to_replay.push(id);
        }
        to_replay.reverse();

        let branch = self.log.current.clone();
        for id in &to_replay {
            if let Some(deltas) = self.deltas.get(id).cloned() {
                let graph = self
                    .branches
                    .get_mut(&branch)
                    .ok_or_else(|| AuditError::UnknownBranch(branch.clone()))?;
                for delta in &deltas {
                    apply_graph_delta(graph, delta)
                        .map_err(|err| AuditError::MergeConflict(err.to_string()))?;
                }
            }
        }

        let id = self.log.commit(
            &branch,
            vec![current_head, other_head],
            RevisionKind::Merge {
                other: other.to_string(),
            },
            &format!("merge '{}'", other),
        );
        Ok(id)
    }

    /// Rolls back to a commit: every branch whose lineage passes through an
    /// undone revision applies the inverse deltas in reverse order and gets
    /// a repositioned head. No revision is destroyed.
    pub fn rollback(&mut self, commit_id: &CommitId) -> Result<(), AuditError> {
        if !self.log.revisions.contains_key(commit_id) {
            return Err(AuditError::UnknownCommit(commit_id.to_string()));
        }
        let undone = self.log.descendants_of(commit_id);
        let branch_names: Vec<String> = self.branches.keys().cloned().collect();
        for branch in branch_names {
            let head = self.log.head(&branch)?;
            let mut new_head = head.clone();
            let mut to_undo: Vec<CommitId> = Vec::new();
            for id in self.log.first_parent_chain(&head) {
                if undone.contains(&id) {
                    to_undo.push(id);
                } else {
                    new_head = id;
                    break;
                }
            }
            if to_undo.is_empty() {
                continue;
            }
            let graph = self
                .branches
                .get_mut(&branch)
                .ok_or_else(|| AuditError::UnknownBranch(branch.clone()))?;
            for id in &to_undo {
                if let Some(deltas) = self.deltas.get(id).cloned() {
                    for delta in deltas.iter().rev() {
                        apply_graph_delta(graph, &delta.inverted())?;
                    }
                }
            }
            self.log.heads.insert(branch.clone(), new_head);
        }
        Ok(())
    }

    /// Flat chronological history listing.
    pub fn print_history(&self) -> String {
        self.log.print_history()
    }

    /// History as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.log.to_json()
    }
}

/// Replays a delta, relabelling freshly minted RHS nodes onto the recorded
/// identifiers so that replay and rollback converge to recorded states.
fn apply_graph_delta(graph: &mut Graph, delta: &GraphDelta) -> Result<(), AuditError> {
    let rhs_fresh = graph.rewrite(&delta.rule, &delta.lhs_instance)?;
    let mut relabel: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    for (r_node, recorded) in &delta.rhs_instance {
        if let Some(fresh) = rhs_fresh.get(r_node) {
            if fresh != recorded {
                relabel.insert(fresh.clone(), recorded.clone());
            }
        }
    }
    if !relabel.is_empty() {
        graph.relabel_nodes(&relabel)?;
    }
    Ok(())
}

/// A hierarchy under revision control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedHierarchy {
    branches: BTreeMap<String, Hierarchy>,
    initial: Hierarchy,
    deltas: BTreeMap<CommitId, Vec<HierarchyDelta>>,
    log: RevisionLog,
}

impl VersionedHierarchy {
    /// Wraps a hierarchy, creating the initial revision on `init_branch`.
    pub fn new(hierarchy: Hierarchy, init_branch: &str) -> Self {
        let log = RevisionLog::new(init_branch);
        let mut branches = BTreeMap::new();
        branches.insert(init_branch.to_string(), hierarchy.clone());
        Self {
            branches,
            initial: hierarchy,
            deltas: BTreeMap::new(),
            log,
        }
    }

    /// The current branch's hierarchy.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.branches[&self.log.current]
    }

    /// The current branch name.
    pub fn current_branch(&self) -> &str {
        &self.log.current
    }

    /// All branch names.
    pub fn branches(&self) -> Vec<String> {
        self.branches.keys().cloned().collect()
    }

    /// The head commit of a branch.
    pub fn head(&self, branch: &str) -> Result<CommitId, AuditError> {
        self.log.head(branch)
    }

    /// Rewrites a member graph (non-strict, with propagation) and commits.
    pub fn rewrite(
        &mut self,
        graph_id: &str,
        rule: &Rule,
        instance: &NodeMapping,
        p_typing: Option<&PTyping>,
        rhs_typing: Option<&RhsTyping>,
        message: &str,
    ) -> Result<CommitId, AuditError> {
        let hierarchy = self
            .branches
            .get_mut(&self.log.current)
            .ok_or_else(|| AuditError::UnknownBranch(self.log.current.clone()))?;
        hierarchy.rewrite(graph_id, rule, instance, p_typing, rhs_typing, false)?;
        let parent = self.log.head(&self.log.current.clone())?;
        let branch = self.log.current.clone();
        let id = self
            .log
            .commit(&branch, vec![parent], RevisionKind::Rewrite, message);
        self.deltas.insert(
            id.clone(),
            vec![HierarchyDelta {
                graph_id: graph_id.to_string(),
                rule: rule.clone(),
                lhs_instance: instance.clone(),
                p_typing: p_typing.cloned(),
                rhs_typing: rhs_typing.cloned(),
            }],
        );
        Ok(id)
    }

    /// Creates a branch at the current head and switches to it.
    pub fn branch(&mut self, name: &str) -> Result<CommitId, AuditError> {
        if self.branches.contains_key(name) {
            return Err(AuditError::BranchAlreadyExists(name.to_string()));
        }
        let parent = self.log.head(&self.log.current.clone())?;
        let from = self.log.current.clone();
        let state = self.branches[&from].clone();
        self.branches.insert(name.to_string(), state);
        let id = self.log.commit(
            name,
            vec![parent],
            RevisionKind::Branch { from },
            &format!("branch '{}'", name),
        );
        self.log.current = name.to_string();
        Ok(id)
    }

    /// Repositions the working head onto another branch.
    pub fn switch_branch(&mut self, name: &str) -> Result<(), AuditError> {
        if !self.branches.contains_key(name) {
            return Err(AuditError::UnknownBranch(name.to_string()));
        }
        self.log.current = name.to_string();
        Ok(())
    }

    /// Merges another branch into the current one by replaying its deltas
    /// since the nearest common ancestor.
    pub fn merge_with(&mut self, other: &str) -> Result<CommitId, AuditError> {
        let current_head = self.log.head(&self.log.current.clone())?;
        let other_head = self.log.head(other)?;
        let ancestor = self
            .log
            .common_ancestor(&current_head, &other_head)
            .ok_or_else(|| {
                AuditError::NoCommonAncestor(self.log.current.clone(), other.to_string())
            })?;

        let mut to_replay: Vec<CommitId> = Vec::new();
        for id in self.log.first_parent_chain(&other_head) {
            if id == ancestor {
                break;
            }
            to_replay.push(id);
        }
        to_replay.reverse();

        let branch = self.log.current.clone();
        for id in &to_replay {
            if let Some(deltas) = self.deltas.get(id).cloned() {
                let hierarchy = self
                    .branches
                    .get_mut(&branch)
                    .ok_or_else(|| AuditError::UnknownBranch(branch.clone()))?;
                for delta in &deltas {
                    apply_hierarchy_delta(hierarchy, delta)
                        .map_err(|err| AuditError::MergeConflict(err.to_string()))?;
                }
            }
        }

        let id = self.log.commit(
            &branch,
            vec![current_head, other_head],
            RevisionKind::Merge {
                other: other.to_string(),
            },
            &format!("merge '{}'", other),
        );
        Ok(id)
    }

    /// Rolls back to a commit by replaying each affected branch's surviving
    /// lineage from the initial snapshot. Heads move; revisions stay.
    pub fn rollback(&mut self, commit_id: &CommitId) -> Result<(), AuditError> {
        if !self.log.revisions.contains_key(commit_id) {
            return Err(AuditError::UnknownCommit(commit_id.to_string()));
        }
        let undone = self.log.descendants_of(commit_id);
        let branch_names: Vec<String> = self.branches.keys().cloned().collect();
        for branch in branch_names {
            let head = self.log.head(&branch)?;
            let chain = self.log.first_parent_chain(&head);
            if !chain.iter().any(|id| undone.contains(id)) {
                continue;
            }
            let mut new_head = None;
            for id in &chain {
                if !undone.contains(id) {
                    new_head = Some(id.clone());
                    break;
                }
            }
            let Some(new_head) = new_head else {
                continue;
            };
            // Replay the surviving lineage, oldest first.
            let mut state = self.initial.clone();
            let surviving: Vec<CommitId> = chain
                .iter()
                .rev()
                .filter(|id| !undone.contains(*id))
                .cloned()
                .collect();
            for id in &surviving {
                if let Some(deltas) = self.deltas.get(id).cloned() {
                    for delta in &deltas {
                        apply_hierarchy_delta(&mut state, delta)?;
                    }
                }
            }
            self.branches.insert(branch.clone(), state);
            self.log.heads.insert(branch.clone(), new_head);
        }
        Ok(())
    }

    /// Flat chronological history listing.
    pub fn print_history(&self) -> String {
        self.log.print_history()
    }

    /// History as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.log.to_json()
    }
}

fn apply_hierarchy_delta(
    hierarchy: &mut Hierarchy,
    delta: &HierarchyDelta,
) -> Result<(), AuditError> {
    hierarchy.rewrite(
        &delta.graph_id,
        &delta.rule,
        &delta.lhs_instance,
        delta.p_typing.as_ref(),
        delta.rhs_typing.as_ref(),
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_set::Attributes;
    use crate::homomorphism::mapping;

    fn add_rule(node: &str) -> Rule {
        let mut rule = Rule::from_pattern(Graph::new());
        rule.inject_add_node(node, Attributes::new()).unwrap();
        rule
    }

    fn remove_rule() -> Rule {
        let mut rule = Rule::from_pattern(Graph::from_elements(["x"], []).unwrap());
        rule.inject_remove_node(&NodeId::from("x")).unwrap();
        rule
    }

    #[test]
    fn rewrite_commits_and_history_grows() {
        let mut vg = VersionedGraph::new(Graph::new(), "master");
        vg.rewrite(&add_rule("a"), &NodeMapping::new(), "add a")
            .unwrap();
        vg.rewrite(&add_rule("b"), &NodeMapping::new(), "add b")
            .unwrap();
        assert!(vg.graph().contains_node(&NodeId::from("a")));
        assert!(vg.graph().contains_node(&NodeId::from("b")));
        let history = vg.print_history();
        assert!(history.contains("add a"));
        assert!(history.contains("add b"));
        assert_eq!(history.lines().count(), 3);
    }

    #[test]
    fn branch_and_switch_keep_states_separate() {
        let mut vg = VersionedGraph::new(Graph::new(), "master");
        vg.rewrite(&add_rule("a"), &NodeMapping::new(), "add a")
            .unwrap();
        vg.branch("feature").unwrap();
        assert_eq!(vg.current_branch(), "feature");
        vg.rewrite(&add_rule("b"), &NodeMapping::new(), "add b")
            .unwrap();
        assert!(vg.graph().contains_node(&NodeId::from("b")));

        vg.switch_branch("master").unwrap();
        assert!(!vg.graph().contains_node(&NodeId::from("b")));
        assert!(vg.graph().contains_node(&NodeId::from("a")));
    }

    #[test]
    fn merge_replays_other_branch() {
        let mut vg = VersionedGraph::new(Graph::new(), "master");
        vg.rewrite(&add_rule("a"), &NodeMapping::new(), "add a")
            .unwrap();
        vg.branch("feature").unwrap();
        vg.rewrite(&add_rule("b"), &NodeMapping::new(), "add b")
            .unwrap();
        vg.switch_branch("master").unwrap();
        vg.rewrite(&add_rule("c"), &NodeMapping::new(), "add c")
            .unwrap();

        vg.merge_with("feature").unwrap();
        assert!(vg.graph().contains_node(&NodeId::from("a")));
        assert!(vg.graph().contains_node(&NodeId::from("b")));
        assert!(vg.graph().contains_node(&NodeId::from("c")));
        // The merge commit has two parents.
        let head = vg.head("master").unwrap();
        let rev = vg.log.revisions.get(&head).unwrap();
        assert_eq!(rev.parents.len(), 2);
        // The feature branch is untouched.
        vg.switch_branch("feature").unwrap();
        assert!(!vg.graph().contains_node(&NodeId::from("c")));
    }

    #[test]
    fn rollback_applies_inverses_and_moves_heads() {
        let mut vg = VersionedGraph::new(Graph::new(), "master");
        let a = vg
            .rewrite(&add_rule("a"), &NodeMapping::new(), "add a")
            .unwrap();
        vg.rewrite(&add_rule("b"), &NodeMapping::new(), "add b")
            .unwrap();
        vg.rewrite(&add_rule("c"), &NodeMapping::new(), "add c")
            .unwrap();

        let history_before = vg.print_history();
        vg.rollback(&a).unwrap();
        assert!(vg.graph().contains_node(&NodeId::from("a")));
        assert!(!vg.graph().contains_node(&NodeId::from("b")));
        assert!(!vg.graph().contains_node(&NodeId::from("c")));
        assert_eq!(vg.head("master").unwrap(), a);
        // History is retained, no new commits were appended.
        assert_eq!(vg.print_history(), history_before);
    }

    #[test]
    fn rollback_of_removal_restores_node() {
        let mut graph = Graph::new();
        graph.add_node("x", Attributes::new()).unwrap();
        graph.add_node("keep", Attributes::new()).unwrap();
        let mut vg = VersionedGraph::new(graph, "master");
        let before = vg.graph().clone();

        let keep = vg
            .rewrite(&add_rule("marker"), &NodeMapping::new(), "marker")
            .unwrap();
        vg.rewrite(&remove_rule(), &mapping([("x", "x")]), "drop x")
            .unwrap();
        assert!(!vg.graph().contains_node(&NodeId::from("x")));

        vg.rollback(&keep).unwrap();
        assert!(vg.graph().contains_node(&NodeId::from("x")));
        assert!(vg.graph().contains_node(&NodeId::from("marker")));
        let mut expected = before;
        expected.add_node("marker", Attributes::new()).unwrap();
        assert_eq!(vg.graph(), &expected);
    }

    #[test]
    fn unknown_branch_and_commit_errors() {
        let mut vg = VersionedGraph::new(Graph::new(), "master");
        assert!(matches!(
            vg.switch_branch("nope"),
            Err(AuditError::UnknownBranch(_))
        ));
        assert!(matches!(
            vg.rollback(&CommitId("deadbeef".to_string())),
            Err(AuditError::UnknownCommit(_))
        ));
        vg.branch("dev").unwrap();
        assert!(matches!(
            vg.branch("dev"),
            Err(AuditError::BranchAlreadyExists(_))
        ));
    }
}
