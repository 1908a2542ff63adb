//! Decision tree structure and evaluation.

use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::NodeIndex;
use crate::dataset::batch_features::ExampleView;
use crate::tree::node::{Leaf, Split, TreeNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision tree stored as a flat node list rooted at node 0.
///
/// A tree without nodes is the empty tree: it routes every example to node 0
/// and contributes nothing to predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Creates a tree from its nodes.
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        DecisionTree { nodes }
    }

    /// Creates the empty tree.
    pub const fn empty() -> Self {
        DecisionTree { nodes: Vec::new() }
    }

    /// Single leaf tree.
    pub fn from_leaf(values: Vec<f32>) -> Self {
        DecisionTree::new(vec![TreeNode::leaf(values)])
    }

    /// Returns true for the empty tree.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns all nodes.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Returns the node at the given index.
    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Iterates over the splits of the tree.
    pub fn splits(&self) -> impl Iterator<Item = &Split> {
        self.nodes.iter().filter_map(|node| match node {
            TreeNode::Split(split) => Some(split),
            TreeNode::Leaf(_) => None,
        })
    }

    /// Iterates over the leaves of the tree.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.nodes.iter().filter_map(|node| match node {
            TreeNode::Leaf(leaf) => Some(leaf),
            TreeNode::Split(_) => None,
        })
    }

    /// Number of output slots needed by the widest leaf.
    pub fn required_slots(&self) -> usize {
        self.leaves().map(Leaf::required_slots).max().unwrap_or(0)
    }

    /// Index of the leaf `example` lands in. Returns 0 for the empty tree.
    ///
    /// The tree must have passed [`validate`](Self::validate).
    #[inline]
    pub fn traverse(&self, example: &ExampleView<'_>) -> NodeIndex {
        let mut node_index = 0;
        while let Some(TreeNode::Split(split)) = self.nodes.get(node_index) {
            node_index = split.next_node(example);
        }
        node_index
    }

    /// Leaf `example` lands in, with its index. `None` for the empty tree.
    #[inline]
    pub fn evaluate(&self, example: &ExampleView<'_>) -> Option<(NodeIndex, &Leaf)> {
        let node_index = self.traverse(example);
        match self.nodes.get(node_index) {
            Some(TreeNode::Leaf(leaf)) => Some((node_index, leaf)),
            _ => None,
        }
    }

    /// Validates the tree structure.
    ///
    /// Every split must have two in-bounds children, no node may be reached
    /// twice from the root, sparse leaves must have aligned index and value
    /// lists, and membership sets must be strictly ascending.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let num_nodes = self.nodes.len();
        let mut visited = vec![false; num_nodes];
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return Err(BoostedTreesError::invalid_model(format!(
                    "Node {} is reachable more than once",
                    index
                )));
            }
            visited[index] = true;

            match &self.nodes[index] {
                TreeNode::Split(split) => {
                    let (left, right) = split.children();
                    if left >= num_nodes || right >= num_nodes {
                        return Err(BoostedTreesError::invalid_model(format!(
                            "Node {} has invalid child indices ({}, {}) for {} nodes",
                            index, left, right, num_nodes
                        )));
                    }
                    if let Split::CategoricalIdSetMembership(s) = split {
                        if s.feature_ids.windows(2).any(|pair| pair[0] >= pair[1]) {
                            return Err(BoostedTreesError::invalid_model(format!(
                                "Node {} membership set is not sorted",
                                index
                            )));
                        }
                    }
                    stack.push(right);
                    stack.push(left);
                }
                TreeNode::Leaf(Leaf::SparseVector { index: slots, value }) => {
                    if slots.len() != value.len() {
                        return Err(BoostedTreesError::invalid_model(format!(
                            "Leaf {} has {} indices but {} values",
                            index,
                            slots.len(),
                            value.len()
                        )));
                    }
                }
                TreeNode::Leaf(Leaf::Vector(_)) => {}
            }
        }
        Ok(())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, index: NodeIndex, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self.nodes.get(index) {
            Some(TreeNode::Split(split)) => {
                writeln!(f, "{}[{}] {}", indent, index, split)?;
                let (left, right) = split.children();
                if depth < self.nodes.len() {
                    self.fmt_node(f, left, depth + 1)?;
                    self.fmt_node(f, right, depth + 1)?;
                }
                Ok(())
            }
            Some(TreeNode::Leaf(leaf)) => writeln!(f, "{}[{}] leaf {:?}", indent, index, leaf),
            None => writeln!(f, "{}[{}] <missing>", indent, index),
        }
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "<empty tree>");
        }
        self.fmt_node(f, 0, 0)
    }
}
