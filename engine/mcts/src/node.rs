//! Search tree node representation.
//!
//! Each node holds one revision of the answer being refined, together with
//! the visit statistics used for UCT selection. Nodes live in the arena owned
//! by [`SearchTree`](crate::tree::SearchTree) and refer to each other by
//! [`NodeId`].

use std::fmt;

/// Guards the UCT terms against division by zero for unvisited nodes.
pub const UCT_EPSILON: f64 = 1e-6;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Short display label: four lowercase letters (more past 26^4 nodes).
    ///
    /// Derived from the arena index, so labels are unique within a tree.
    pub fn label(self) -> String {
        let mut n = self.0;
        let mut letters = Vec::with_capacity(4);
        for _ in 0..4 {
            letters.push(b'a' + (n % 26) as u8);
            n /= 26;
        }
        while n > 0 {
            letters.push(b'a' + (n % 26) as u8);
            n /= 26;
        }
        letters.iter().rev().map(|&b| char::from(b)).collect()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("none")
        } else {
            f.write_str(&self.label())
        }
    }
}

/// Where a node is in its expansion lifecycle.
///
/// Nodes only ever move forward through these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Unexpanded,
    PartiallyExpanded,
    FullyExpanded,
}

/// A node in the revision tree.
#[derive(Debug, Clone)]
pub struct RevisionNode<T> {
    /// This node's own arena index
    pub id: NodeId,

    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// The revision held by this node
    pub content: T,

    /// Children in expansion order
    pub children: Vec<NodeId>,

    /// Number of backpropagation passes through this node
    pub visits: u32,

    /// Sum of scores backpropagated through this node
    pub value: f64,

    /// Branching factor cap, fixed at creation
    pub max_children: usize,

    /// Exploration constant for this node's UCT score, fixed at creation
    pub exploration_weight: f64,
}

impl<T> RevisionNode<T> {
    /// Create a new root node.
    pub fn new_root(content: T, max_children: usize, exploration_weight: f64) -> Self {
        Self {
            id: NodeId(0),
            parent: NodeId::NONE,
            content,
            children: Vec::new(),
            visits: 0,
            value: 0.0,
            max_children,
            exploration_weight,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        id: NodeId,
        parent: NodeId,
        content: T,
        max_children: usize,
        exploration_weight: f64,
    ) -> Self {
        Self {
            id,
            parent,
            content,
            children: Vec::new(),
            visits: 0,
            value: 0.0,
            max_children,
            exploration_weight,
        }
    }

    #[inline]
    pub fn label(&self) -> String {
        self.id.label()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn fully_expanded(&self) -> bool {
        self.children.len() >= self.max_children
    }

    /// How many more children expansion may add.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.max_children.saturating_sub(self.children.len())
    }

    pub fn expansion_state(&self) -> ExpansionState {
        if self.children.is_empty() {
            ExpansionState::Unexpanded
        } else if self.fully_expanded() {
            ExpansionState::FullyExpanded
        } else {
            ExpansionState::PartiallyExpanded
        }
    }

    /// Average score per visit. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / self.visits as f64
        }
    }

    /// Calculate the UCT score for this node given its parent's visit count.
    ///
    /// UCT = value / (visits + ε) + w * sqrt(ln(N_parent) / (visits + ε))
    ///
    /// An unvisited parent contributes no exploration bonus; the selection
    /// protocol never scores children of an unvisited node, so this only
    /// matters for trees abandoned between expansion and backpropagation.
    #[inline]
    pub fn uct_score(&self, parent_visits: u32) -> f64 {
        let visits = self.visits as f64 + UCT_EPSILON;
        let log_parent = if parent_visits == 0 {
            0.0
        } else {
            (parent_visits as f64).ln()
        };
        self.value / visits + self.exploration_weight * (log_parent / visits).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(!NodeId(0).is_none());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_labels_are_short_and_unique() {
        assert_eq!(NodeId(0).label(), "aaaa");
        assert_eq!(NodeId(1).label(), "aaab");
        assert_eq!(NodeId(26).label(), "aaba");
        assert_eq!(NodeId(26 * 26 * 26 * 26).label(), "baaaa");
        assert_eq!(NodeId(3).to_string(), "aaad");
        assert_eq!(NodeId::NONE.to_string(), "none");
    }

    #[test]
    fn test_new_root() {
        let node = RevisionNode::new_root("draft".to_string(), 3, 1.414);

        assert!(node.is_root());
        assert_eq!(node.visits, 0);
        assert!(node.value.abs() < 1e-12);
        assert!(node.children.is_empty());
        assert_eq!(node.max_children, 3);
        assert_eq!(node.content, "draft");
        assert_eq!(node.expansion_state(), ExpansionState::Unexpanded);
    }

    #[test]
    fn test_expansion_state_follows_children() {
        let mut node = RevisionNode::new_root((), 2, 1.0);
        assert!(!node.fully_expanded());
        assert_eq!(node.remaining_capacity(), 2);

        node.children.push(NodeId(1));
        assert_eq!(node.expansion_state(), ExpansionState::PartiallyExpanded);
        assert!(!node.fully_expanded());

        node.children.push(NodeId(2));
        assert_eq!(node.expansion_state(), ExpansionState::FullyExpanded);
        assert!(node.fully_expanded());
        assert_eq!(node.remaining_capacity(), 0);
    }

    #[test]
    fn test_mean_value() {
        let mut node = RevisionNode::new_root((), 2, 1.0);
        assert!(node.mean_value().abs() < 1e-12);

        node.visits = 4;
        node.value = 30.0;
        assert!((node.mean_value() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_uct_score() {
        let mut node = RevisionNode::new_child(NodeId(1), NodeId(0), (), 2, 1.414);
        node.visits = 2;
        node.value = 14.0;

        // 14 / 2 + 1.414 * sqrt(ln(10) / 2)
        let expected = 7.0 + 1.414 * ((10f64).ln() / 2.0).sqrt();
        assert!((node.uct_score(10) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_uct_unvisited_is_finite() {
        let node = RevisionNode::new_child(NodeId(1), NodeId(0), (), 2, 1.414);
        let score = node.uct_score(1);
        assert!(score.is_finite());

        let score = node.uct_score(5);
        assert!(score.is_finite());
        assert!(score > 0.0);
    }

    #[test]
    fn test_uct_increases_with_exploration_weight() {
        let mut low = RevisionNode::new_child(NodeId(1), NodeId(0), (), 2, 0.5);
        low.visits = 3;
        low.value = 12.0;
        let mut high = low.clone();
        high.exploration_weight = 2.0;

        assert!(high.uct_score(7) > low.uct_score(7));
    }

    #[test]
    fn test_uct_unvisited_parent_has_no_bonus() {
        let mut node = RevisionNode::new_child(NodeId(1), NodeId(0), (), 2, 1.414);
        node.visits = 1;
        node.value = 5.0;
        assert!((node.uct_score(0) - 5.0 / (1.0 + UCT_EPSILON)).abs() < 1e-9);
    }
}
