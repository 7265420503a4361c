//! The project/subsystem hierarchy.
//!
//! Nodes live in an arena indexed by [`NodeId`]; a node reaches its parent
//! through an explicit index instead of an owning pointer, so upward signal
//! propagation is an iterative walk to the root with no cycle risk (parents
//! are fixed at creation and only ever point at older nodes).

use crate::models::{Milestone, NodeId};
use crate::notify::Observer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What flavor of system a node is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Tree root; owns the team context relevant to permission checks.
    Project {
        /// Id of the lead developer, if one is appointed
        #[serde(skip_serializing_if = "Option::is_none")]
        lead_developer: Option<String>,
        /// Project version, bumped by version-update events
        version: u32,
    },
    /// Any non-root node.
    Subsystem,
}

/// One node in the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemNode {
    /// Node name
    pub name: String,

    /// Node description
    pub description: String,

    /// Project or subsystem
    pub kind: NodeKind,

    /// Parent node; None at the root
    pub parent: Option<NodeId>,

    /// Direct children, in creation order
    pub children: Vec<NodeId>,

    /// Milestone this node has achieved
    pub milestone: Milestone,

    /// Observers attached to this node
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observers: Vec<Observer>,
}

impl SystemNode {
    /// Returns true for tree roots.
    pub fn is_project(&self) -> bool {
        matches!(self.kind, NodeKind::Project { .. })
    }
}

/// Arena of system nodes. Removed nodes leave a tombstone so ids stay
/// stable; looking one up reports `NotFound`.
#[derive(Debug, Default)]
pub struct SystemTree {
    nodes: Vec<Option<SystemNode>>,
}

impl SystemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new root project.
    pub fn add_project(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        lead_developer: Option<String>,
    ) -> Result<NodeId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("project name must not be empty".to_string()));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(SystemNode {
            name,
            description: description.into(),
            kind: NodeKind::Project {
                lead_developer,
                version: 1,
            },
            parent: None,
            children: Vec::new(),
            milestone: Milestone::default(),
            observers: Vec::new(),
        }));
        Ok(id)
    }

    /// Create a subsystem under `parent`. The parent index is fixed here
    /// and never reassigned, which is what keeps the tree acyclic.
    pub fn add_subsystem(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<NodeId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("subsystem name must not be empty".to_string()));
        }
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(SystemNode {
            name,
            description: description.into(),
            kind: NodeKind::Subsystem,
            parent: Some(parent),
            children: Vec::new(),
            milestone: Milestone::default(),
            observers: Vec::new(),
        }));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&SystemNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::NotFound(format!("system node {}", id)))
    }

    /// Look up a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SystemNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::NotFound(format!("system node {}", id)))
    }

    /// The chain from `id` up to its root, starting at `id` itself.
    pub fn chain_to_root(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut chain = vec![id];
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            chain.push(parent);
            current = self.node(parent)?;
        }
        Ok(chain)
    }

    /// The project a node ultimately belongs to.
    pub fn project_of(&self, id: NodeId) -> Result<NodeId> {
        Ok(*self
            .chain_to_root(id)?
            .last()
            .unwrap_or(&id))
    }

    /// Lead developer of the project `id` belongs to, if one is appointed.
    pub fn lead_of(&self, id: NodeId) -> Result<Option<String>> {
        let project = self.project_of(id)?;
        match &self.node(project)?.kind {
            NodeKind::Project { lead_developer, .. } => Ok(lead_developer.clone()),
            NodeKind::Subsystem => Ok(None),
        }
    }

    /// All direct and indirect children of `id`, excluding `id` itself,
    /// pre-order.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.node(current)?.children.iter().rev().copied());
        }
        Ok(result)
    }

    /// Attach an observer. Attaching the same observer twice is a no-op;
    /// returns whether the set changed.
    pub fn attach(&mut self, id: NodeId, observer: Observer) -> Result<bool> {
        let node = self.node_mut(id)?;
        if node.observers.contains(&observer) {
            return Ok(false);
        }
        node.observers.push(observer);
        Ok(true)
    }

    /// Detach an observer. Detaching an unattached observer is a no-op;
    /// returns whether the set changed.
    pub fn detach(&mut self, id: NodeId, observer: &Observer) -> Result<bool> {
        let node = self.node_mut(id)?;
        let before = node.observers.len();
        node.observers.retain(|attached| attached != observer);
        Ok(node.observers.len() != before)
    }

    /// Highest milestone achieved by any direct or indirect child, or None
    /// for a leaf.
    pub fn highest_descendant_milestone(&self, id: NodeId) -> Result<Option<Milestone>> {
        let mut highest: Option<Milestone> = None;
        for child in self.descendants(id)? {
            let milestone = &self.node(child)?.milestone;
            if highest.as_ref().is_none_or(|h| milestone > h) {
                highest = Some(milestone.clone());
            }
        }
        Ok(highest)
    }

    /// Declare that `id` has achieved `milestone`.
    ///
    /// The new milestone must not exceed the highest milestone among the
    /// node's direct and indirect children (when it has any), and must be
    /// greater than or equal to the node's current milestone. Equality with
    /// the current milestone is permitted; re-declaring is harmless.
    pub fn declare_milestone(&mut self, id: NodeId, milestone: Milestone) -> Result<()> {
        if let Some(highest) = self.highest_descendant_milestone(id)? {
            if milestone > highest {
                return Err(Error::InvalidMilestone(format!(
                    "{} exceeds the highest subsystem milestone {}",
                    milestone, highest
                )));
            }
        }
        let node = self.node_mut(id)?;
        if milestone < node.milestone {
            return Err(Error::InvalidMilestone(format!(
                "{} is below the current milestone {}",
                milestone, node.milestone
            )));
        }
        debug!(node = %id, %milestone, "declared achieved milestone");
        node.milestone = milestone;
        Ok(())
    }

    /// Remove `id` and its whole subtree from the arena, unlinking it from
    /// its parent. Returns every removed node id (the root of the removed
    /// subtree first). The caller is responsible for tearing down
    /// registrations against the removed nodes beforehand or right after.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let parent = self.node(id)?.parent;
        let mut removed = vec![id];
        removed.extend(self.descendants(id)?);
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        for node in &removed {
            self.nodes[node.0] = None;
        }
        debug!(node = %id, count = removed.len(), "removed subtree");
        Ok(removed)
    }

    /// Deep-copy the subtree rooted at `project` into a fresh root project
    /// named `new_name`. Structure, descriptions, and milestones are
    /// copied; observers are not (watchers of the source do not silently
    /// become watchers of the fork). Returns the new project's id.
    pub fn fork_project(&mut self, project: NodeId, new_name: impl Into<String>) -> Result<NodeId> {
        let source = self.node(project)?;
        if !source.is_project() {
            return Err(Error::InvalidInput(format!(
                "{} is not a project and cannot be forked",
                project
            )));
        }
        let description = source.description.clone();
        let milestone = source.milestone.clone();
        let lead = match &source.kind {
            NodeKind::Project { lead_developer, .. } => lead_developer.clone(),
            NodeKind::Subsystem => None,
        };
        let fork = self.add_project(new_name, description, lead)?;
        self.node_mut(fork)?.milestone = milestone;
        self.copy_children(project, fork)?;
        Ok(fork)
    }

    fn copy_children(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let children = self.node(from)?.children.clone();
        for child in children {
            let (name, description, milestone) = {
                let node = self.node(child)?;
                (node.name.clone(), node.description.clone(), node.milestone.clone())
            };
            let copy = self.add_subsystem(to, name, description)?;
            self.node_mut(copy)?.milestone = milestone;
            self.copy_children(child, copy)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ObserverKind;

    fn sample_tree() -> (SystemTree, NodeId, NodeId, NodeId) {
        let mut tree = SystemTree::new();
        let project = tree
            .add_project("office", "Office suite", Some("lea".to_string()))
            .unwrap();
        let word = tree.add_subsystem(project, "word", "Word processor").unwrap();
        let clippy = tree.add_subsystem(word, "clippy", "Assistant").unwrap();
        (tree, project, word, clippy)
    }

    #[test]
    fn test_chain_to_root_is_leaf_first() {
        let (tree, project, word, clippy) = sample_tree();
        assert_eq!(tree.chain_to_root(clippy).unwrap(), vec![clippy, word, project]);
        assert_eq!(tree.chain_to_root(project).unwrap(), vec![project]);
    }

    #[test]
    fn test_project_of_and_lead() {
        let (tree, project, _, clippy) = sample_tree();
        assert_eq!(tree.project_of(clippy).unwrap(), project);
        assert_eq!(tree.lead_of(clippy).unwrap(), Some("lea".to_string()));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut tree = SystemTree::new();
        assert!(matches!(
            tree.add_project("  ", "x", None),
            Err(Error::InvalidInput(_))
        ));
        let project = tree.add_project("p", "x", None).unwrap();
        assert!(matches!(
            tree.add_subsystem(project, "", "x"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let (mut tree, _, word, _) = sample_tree();
        let observer = Observer::new("alice", ObserverKind::CreateBugReport);
        assert!(tree.attach(word, observer.clone()).unwrap());
        assert!(!tree.attach(word, observer.clone()).unwrap());
        assert_eq!(tree.node(word).unwrap().observers.len(), 1);

        assert!(tree.detach(word, &observer).unwrap());
        assert!(!tree.detach(word, &observer).unwrap());
    }

    #[test]
    fn test_milestone_cannot_exceed_children() {
        let (mut tree, project, word, clippy) = sample_tree();
        // Leaf first: clippy has no children, anything goes.
        tree.declare_milestone(clippy, Milestone::new(vec![1, 2])).unwrap();
        tree.declare_milestone(word, Milestone::new(vec![1, 1])).unwrap();

        // Project may match the highest descendant but not exceed it.
        assert!(matches!(
            tree.declare_milestone(project, Milestone::new(vec![2])),
            Err(Error::InvalidMilestone(_))
        ));
        tree.declare_milestone(project, Milestone::new(vec![1, 2])).unwrap();
    }

    #[test]
    fn test_milestone_never_regresses() {
        let (mut tree, _, _, clippy) = sample_tree();
        tree.declare_milestone(clippy, Milestone::new(vec![2])).unwrap();
        assert!(matches!(
            tree.declare_milestone(clippy, Milestone::new(vec![1])),
            Err(Error::InvalidMilestone(_))
        ));
        // Re-declaring the current milestone is permitted.
        tree.declare_milestone(clippy, Milestone::new(vec![2])).unwrap();
    }

    #[test]
    fn test_remove_subtree_tombstones_nodes() {
        let (mut tree, project, word, clippy) = sample_tree();
        let removed = tree.remove_subtree(word).unwrap();
        assert_eq!(removed, vec![word, clippy]);
        assert!(tree.node(word).is_err());
        assert!(tree.node(clippy).is_err());
        assert!(tree.node(project).unwrap().children.is_empty());
    }

    #[test]
    fn test_fork_copies_structure_not_observers() {
        let (mut tree, project, word, _) = sample_tree();
        tree.attach(word, Observer::new("alice", ObserverKind::CreateBugReport))
            .unwrap();

        let fork = tree.fork_project(project, "office-ng").unwrap();
        let fork_children = tree.node(fork).unwrap().children.clone();
        assert_eq!(fork_children.len(), 1);
        let fork_word = tree.node(fork_children[0]).unwrap();
        assert_eq!(fork_word.name, "word");
        assert!(fork_word.observers.is_empty());
        // Grandchild came along too.
        assert_eq!(fork_word.children.len(), 1);
    }

    #[test]
    fn test_fork_requires_a_project() {
        let (mut tree, _, word, _) = sample_tree();
        assert!(matches!(
            tree.fork_project(word, "nope"),
            Err(Error::InvalidInput(_))
        ));
    }
}
