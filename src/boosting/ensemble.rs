//! In-memory tree ensemble.
//!
//! The ensemble holds the trees, their weights and per-tree metadata. At most
//! the last tree may still be growing; when `growing_metadata` is present the
//! trainer is working on that tree.

use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::TreeIndex;
use crate::prediction::dropout::DropoutSelection;
use crate::tree::tree::DecisionTree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static EMPTY_TREE: DecisionTree = DecisionTree::empty();

/// Per-tree bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeMetadata {
    /// Whether the tree is complete
    pub is_finalized: bool,
    /// How many times the tree's weight was rescaled
    pub num_tree_weight_updates: u32,
    /// Number of layers grown so far
    pub num_layers_grown: u32,
}

impl TreeMetadata {
    /// Metadata of a complete tree with one weight update.
    pub fn finalized() -> Self {
        TreeMetadata {
            is_finalized: true,
            num_tree_weight_updates: 1,
            num_layers_grown: 0,
        }
    }

    /// Metadata of a tree that is still growing.
    pub fn growing() -> Self {
        TreeMetadata {
            is_finalized: false,
            num_tree_weight_updates: 1,
            num_layers_grown: 0,
        }
    }
}

/// Progress of the trainer on the current tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowingMetadata {
    /// Trees attempted so far
    pub num_trees_attempted: u64,
    /// Layers attempted so far
    pub num_layers_attempted: u64,
}

/// Weighted ensemble of decision trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTreeEnsemble {
    /// Trees in insertion order
    pub trees: Vec<DecisionTree>,
    /// One weight per tree
    pub tree_weights: Vec<f32>,
    /// One metadata entry per tree
    pub tree_metadata: Vec<TreeMetadata>,
    /// Present while the last tree is under construction
    pub growing_metadata: Option<GrowingMetadata>,
}

impl DecisionTreeEnsemble {
    /// Creates an empty ensemble.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tree.
    pub fn add_tree(&mut self, tree: DecisionTree, weight: f32, metadata: TreeMetadata) {
        self.trees.push(tree);
        self.tree_weights.push(weight);
        self.tree_metadata.push(metadata);
    }

    /// Builder form of [`add_tree`](Self::add_tree).
    pub fn with_tree(mut self, tree: DecisionTree, weight: f32, metadata: TreeMetadata) -> Self {
        self.add_tree(tree, weight, metadata);
        self
    }

    /// Marks the ensemble as being grown.
    pub fn with_growing_metadata(mut self, growing_metadata: GrowingMetadata) -> Self {
        self.growing_metadata = Some(growing_metadata);
        self
    }

    /// Number of trees.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Returns true if tree `index` is finalized.
    pub fn is_finalized(&self, index: TreeIndex) -> bool {
        self.tree_metadata
            .get(index)
            .map_or(false, |metadata| metadata.is_finalized)
    }

    /// Checks the ensemble invariants and validates every tree.
    pub fn validate(&self) -> Result<()> {
        let num_trees = self.trees.len();
        if self.tree_weights.len() != num_trees {
            return Err(BoostedTreesError::invalid_model(format!(
                "Ensemble has {} trees but {} weights",
                num_trees,
                self.tree_weights.len()
            )));
        }
        if self.tree_metadata.len() != num_trees {
            return Err(BoostedTreesError::invalid_model(format!(
                "Ensemble has {} trees but {} metadata entries",
                num_trees,
                self.tree_metadata.len()
            )));
        }
        if let Some((index, weight)) = self
            .tree_weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(BoostedTreesError::invalid_model(format!(
                "Tree {} has invalid weight {}",
                index, weight
            )));
        }
        if let Some(index) = self
            .tree_metadata
            .iter()
            .take(num_trees.saturating_sub(1))
            .position(|metadata| !metadata.is_finalized)
        {
            return Err(BoostedTreesError::invalid_model(format!(
                "Only the last tree may be non-finalized, tree {} is not",
                index
            )));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                BoostedTreesError::invalid_model(format!("Tree {}: {}", index, e))
            })?;
        }
        Ok(())
    }

    /// Tree the partitioner routes examples through: the last tree while it
    /// is still growing, otherwise the empty tree.
    pub fn partition_tree(&self) -> &DecisionTree {
        match self.trees.len().checked_sub(1) {
            Some(last) if !self.is_finalized(last) => &self.trees[last],
            _ => &EMPTY_TREE,
        }
    }

    /// Trees that dropout must never select.
    ///
    /// Tree 0 is the bias tree when `center_bias` is set, and the tree being
    /// grown is protected while `growing_metadata` is present.
    pub fn dropout_exclusions(&self, center_bias: bool) -> HashSet<TreeIndex> {
        let mut excluded = HashSet::new();
        if center_bias {
            excluded.insert(0);
        }
        if self.growing_metadata.is_some() {
            if let Some(last) = self.trees.len().checked_sub(1) {
                excluded.insert(last);
            }
        }
        excluded
    }

    /// Rescales weights after `num_trees_to_add` new trees, starting at
    /// `new_trees_first_index`, were trained against a dropped-out ensemble.
    ///
    /// The new trees must already be part of the ensemble.
    pub fn apply_dropout_update(
        &mut self,
        selection: &DropoutSelection,
        new_trees_first_index: TreeIndex,
        num_trees_to_add: usize,
    ) -> Result<()> {
        if new_trees_first_index + num_trees_to_add > self.trees.len() {
            return Err(BoostedTreesError::invalid_argument(format!(
                "New trees [{}, {}) are not part of an ensemble of {} trees",
                new_trees_first_index,
                new_trees_first_index + num_trees_to_add,
                self.trees.len()
            )));
        }

        let mut weights = self.tree_weights.clone();
        let mut num_updates: Vec<u32> = self
            .tree_metadata
            .iter()
            .map(|metadata| metadata.num_tree_weight_updates)
            .collect();
        selection.rebalance_weights(
            new_trees_first_index,
            num_trees_to_add,
            &mut weights,
            &mut num_updates,
        )?;

        self.tree_weights = weights;
        for (metadata, updates) in self.tree_metadata.iter_mut().zip(num_updates) {
            metadata.num_tree_weight_updates = updates;
        }
        log::debug!(
            "Rebalanced {} dropped trees and {} new trees",
            selection.len(),
            num_trees_to_add
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn leaf(value: f32) -> DecisionTree {
        DecisionTree::from_leaf(vec![value])
    }

    fn finalized_ensemble(num_trees: usize) -> DecisionTreeEnsemble {
        (0..num_trees).fold(DecisionTreeEnsemble::new(), |ensemble, i| {
            ensemble.with_tree(leaf(i as f32), 1.0, TreeMetadata::finalized())
        })
    }

    #[test]
    fn test_validate_ok() {
        let ensemble = finalized_ensemble(3).with_tree(leaf(1.0), 0.5, TreeMetadata::growing());
        assert!(ensemble.validate().is_ok());
        assert!(DecisionTreeEnsemble::new().validate().is_ok());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut ensemble = finalized_ensemble(2);
        ensemble.tree_weights.pop();
        assert_eq!(ensemble.validate().unwrap_err().category(), "invalid_model");

        let mut ensemble = finalized_ensemble(2);
        ensemble.tree_metadata.push(TreeMetadata::finalized());
        assert!(ensemble.validate().is_err());
    }

    #[test]
    fn test_validate_weights() {
        let mut ensemble = finalized_ensemble(2);
        ensemble.tree_weights[1] = -1.0;
        assert!(ensemble.validate().is_err());
        ensemble.tree_weights[1] = f32::NAN;
        assert!(ensemble.validate().is_err());
    }

    #[test]
    fn test_validate_growing_tree_not_last() {
        let ensemble = DecisionTreeEnsemble::new()
            .with_tree(leaf(1.0), 1.0, TreeMetadata::growing())
            .with_tree(leaf(1.0), 1.0, TreeMetadata::finalized());
        assert!(ensemble.validate().is_err());
    }

    #[test]
    fn test_partition_tree() {
        let ensemble = finalized_ensemble(2);
        assert!(ensemble.partition_tree().is_empty());
        assert!(DecisionTreeEnsemble::new().partition_tree().is_empty());

        let growing = finalized_ensemble(2).with_tree(leaf(9.0), 1.0, TreeMetadata::growing());
        assert_eq!(growing.partition_tree(), &leaf(9.0));
    }

    #[test]
    fn test_dropout_exclusions() {
        let ensemble = finalized_ensemble(4);
        assert!(ensemble.dropout_exclusions(false).is_empty());
        assert_eq!(ensemble.dropout_exclusions(true), [0].into_iter().collect());

        let growing = ensemble.with_growing_metadata(GrowingMetadata::default());
        assert_eq!(growing.dropout_exclusions(true), [0, 3].into_iter().collect());
        assert_eq!(growing.dropout_exclusions(false), [3].into_iter().collect());

        let empty = DecisionTreeEnsemble::new().with_growing_metadata(GrowingMetadata::default());
        assert!(empty.dropout_exclusions(false).is_empty());
    }

    #[test]
    fn test_apply_dropout_update() {
        let mut ensemble = finalized_ensemble(4);
        let selection = DropoutSelection::new(vec![1], vec![1.0]).unwrap();

        ensemble.apply_dropout_update(&selection, 3, 1).unwrap();

        assert_relative_eq!(ensemble.tree_weights[1], 0.5);
        assert_relative_eq!(ensemble.tree_weights[3], 0.5);
        assert_eq!(ensemble.tree_metadata[1].num_tree_weight_updates, 2);
        assert_eq!(ensemble.tree_metadata[3].num_tree_weight_updates, 2);
        assert_eq!(ensemble.tree_metadata[0].num_tree_weight_updates, 1);
        assert!(ensemble.validate().is_ok());
    }

    #[test]
    fn test_apply_dropout_update_requires_new_trees() {
        let mut ensemble = finalized_ensemble(2);
        let selection = DropoutSelection::new(vec![0], vec![1.0]).unwrap();
        assert!(ensemble.apply_dropout_update(&selection, 2, 1).is_err());
        assert_eq!(ensemble.tree_weights, vec![1.0, 1.0]);
    }
}
