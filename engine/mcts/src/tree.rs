//! Revision tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by NodeId indices.
//! Children are listed in their parent's `children`; the parent link is a
//! plain index. Nodes are never removed.

use crate::node::{ExpansionState, NodeId, RevisionNode};

/// Revision tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct SearchTree<T> {
    /// Arena storing all nodes
    nodes: Vec<RevisionNode<T>>,

    /// Root node index (always 0)
    root: NodeId,
}

impl<T> SearchTree<T> {
    /// Create a new tree holding only the root revision.
    pub fn new(root_content: T, max_children: usize, exploration_weight: f64) -> Self {
        let root_node = RevisionNode::new_root(root_content, max_children, exploration_weight);
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    ///
    /// Panics if the id does not belong to this tree.
    #[inline]
    pub fn get(&self, id: NodeId) -> &RevisionNode<T> {
        &self.nodes[id.index()]
    }

    /// Get a node by ID, or None for ids outside this tree.
    #[inline]
    pub fn try_get(&self, id: NodeId) -> Option<&RevisionNode<T>> {
        self.nodes.get(id.index())
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut RevisionNode<T> {
        &mut self.nodes[id.index()]
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (never true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &RevisionNode<T>> {
        self.nodes.iter()
    }

    pub fn content(&self, id: NodeId) -> &T {
        &self.get(id).content
    }

    pub fn fully_expanded(&self, id: NodeId) -> bool {
        self.get(id).fully_expanded()
    }

    pub fn expansion_state(&self, id: NodeId) -> ExpansionState {
        self.get(id).expansion_state()
    }

    /// Add a child revision under `parent_id` and return its id.
    ///
    /// The child inherits the parent's branching cap. The cap itself is not
    /// checked here; expansion is responsible for staying within it.
    pub fn add_child(&mut self, parent_id: NodeId, content: T, exploration_weight: f64) -> NodeId {
        let child_id = NodeId(self.nodes.len() as u32);
        let max_children = self.get(parent_id).max_children;
        self.nodes.push(RevisionNode::new_child(
            child_id,
            parent_id,
            content,
            max_children,
            exploration_weight,
        ));
        self.get_mut(parent_id).children.push(child_id);
        child_id
    }

    /// UCT value of a node as seen from its parent. None for the root.
    pub fn uct_value(&self, id: NodeId) -> Option<f64> {
        let node = self.get(id);
        if node.is_root() {
            return None;
        }
        Some(node.uct_score(self.get(node.parent).visits))
    }

    /// Select the child of `node_id` with the highest UCT value.
    ///
    /// Ties go to the child expanded first.
    pub fn select_child(&self, node_id: NodeId) -> Option<NodeId> {
        let node = self.get(node_id);
        let parent_visits = node.visits;

        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let score = self.get(child_id).uct_score(parent_visits);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child_id, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Child of `node_id` with the most visits, ties to the first.
    pub fn most_visited_child(&self, node_id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for &child_id in &self.get(node_id).children {
            let visits = self.get(child_id).visits;
            match best {
                Some((_, best_visits)) if visits <= best_visits => {}
                _ => best = Some((child_id, visits)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Descend from `from` by visit count until reaching a leaf.
    ///
    /// Visit count rather than mean score is the confidence signal once the
    /// budget is spent. Returns `from` itself when it has no children.
    pub fn best_leaf(&self, from: NodeId) -> NodeId {
        let mut current = from;
        while let Some(child) = self.most_visited_child(current) {
            current = child;
        }
        current
    }

    /// Backpropagate a score from a node up to the root.
    /// Every node on the path gets one visit and the same score.
    pub fn backpropagate(&mut self, leaf_id: NodeId, score: f64) {
        let mut current_id = leaf_id;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visits += 1;
            node.value += score;
            current_id = node.parent;
        }
    }

    /// Node ids from `id` up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = id;
        while current.is_some() {
            path.push(current);
            current = self.get(current).parent;
        }
        path
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        self.path_to_root(id).len().saturating_sub(1)
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visits,
            root_value: root.mean_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        node.children
            .iter()
            .map(|id| self.compute_max_depth(*id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about a revision tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f64,
    pub max_depth: u32,
}
