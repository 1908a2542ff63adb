//! Additive evaluation of a tree ensemble over a feature batch.
//!
//! Each example's prediction is the weighted sum of the leaves it reaches.
//! Two outputs are produced at once: one without the dropped trees and one
//! with every participating tree.

use crate::boosting::ensemble::DecisionTreeEnsemble;
use crate::core::constants::{MIN_BLOCK_COST, TREE_TRAVERSAL_COST};
use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::Score;
use crate::core::utils::threading::WorkerPool;
use crate::dataset::batch_features::BatchFeatures;
use crate::prediction::dropout::DropoutSelection;
use crate::tree::tree::DecisionTree;
use ndarray::Array2;
use std::ops::Range;

struct ActiveTree<'a> {
    tree: &'a DecisionTree,
    weight: f32,
    dropped: bool,
}

/// Prediction outputs, both `[batch_size, prediction_vector_size]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsemblePredictions {
    /// Sum over participating trees that were not dropped
    pub predictions: Array2<Score>,
    /// Sum over all participating trees
    pub no_dropout_predictions: Array2<Score>,
}

/// Weighted sum of trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleAdditiveTrees;

impl MultipleAdditiveTrees {
    /// Evaluates `ensemble` on every example of `features`.
    ///
    /// `tree_weights` replaces the ensemble's own weights (for averaging).
    /// Trees with weight 0, empty trees and, if `only_finalized` is set,
    /// non-finalized trees do not participate. Trees in `dropped` only
    /// contribute to `no_dropout_predictions`.
    pub fn predict(
        ensemble: &DecisionTreeEnsemble,
        tree_weights: &[f32],
        only_finalized: bool,
        dropped: &DropoutSelection,
        features: &BatchFeatures,
        pool: &WorkerPool,
        prediction_vector_size: usize,
    ) -> Result<EnsemblePredictions> {
        if tree_weights.len() != ensemble.num_trees() {
            return Err(BoostedTreesError::dimension_mismatch(
                format!("{} tree weights", ensemble.num_trees()),
                format!("{}", tree_weights.len()),
            ));
        }

        let active = Self::active_trees(ensemble, tree_weights, only_finalized, dropped);
        for (position, tree) in active.iter().enumerate() {
            tree.tree.validate()?;
            let required = tree.tree.required_slots();
            if required > prediction_vector_size {
                return Err(BoostedTreesError::invalid_model(format!(
                    "Participating tree {} writes {} output slots, prediction vector has {}",
                    position, required, prediction_vector_size
                )));
            }
            features.check_tree_columns(tree.tree)?;
        }

        let batch_size = features.batch_size();
        let width = prediction_vector_size;
        log::debug!(
            "Predicting {} examples with {} of {} trees ({} dropped)",
            batch_size,
            active.len(),
            ensemble.num_trees(),
            dropped.len()
        );

        let mut predictions = Vec::with_capacity(batch_size * width);
        let mut no_dropout_predictions = Vec::with_capacity(batch_size * width);

        if !active.is_empty() && width > 0 {
            let cost_per_example = (TREE_TRAVERSAL_COST * active.len()).max(1);
            let min_examples_per_block = (MIN_BLOCK_COST / cost_per_example).max(1);
            let ranges = pool
                .block_info(batch_size, min_examples_per_block)
                .ranges(batch_size);
            log::trace!("Prediction split into {} blocks", ranges.len());

            let blocks = pool.map_blocks(ranges, |range| {
                Self::predict_block(&active, features, range, width)
            });
            for (block_predictions, block_no_dropout) in blocks {
                predictions.extend(block_predictions);
                no_dropout_predictions.extend(block_no_dropout);
            }
        } else {
            predictions.resize(batch_size * width, 0.0);
            no_dropout_predictions.resize(batch_size * width, 0.0);
        }

        let to_matrix = |values: Vec<Score>| {
            Array2::from_shape_vec((batch_size, width), values).map_err(|e| {
                BoostedTreesError::dimension_mismatch(
                    format!("{} prediction values", batch_size * width),
                    e.to_string(),
                )
            })
        };
        Ok(EnsemblePredictions {
            predictions: to_matrix(predictions)?,
            no_dropout_predictions: to_matrix(no_dropout_predictions)?,
        })
    }

    fn active_trees<'a>(
        ensemble: &'a DecisionTreeEnsemble,
        tree_weights: &[f32],
        only_finalized: bool,
        dropped: &DropoutSelection,
    ) -> Vec<ActiveTree<'a>> {
        ensemble
            .trees
            .iter()
            .zip(tree_weights)
            .enumerate()
            .filter(|&(index, (tree, &weight))| {
                weight != 0.0
                    && !tree.is_empty()
                    && (!only_finalized || ensemble.is_finalized(index))
            })
            .map(|(index, (tree, &weight))| ActiveTree {
                tree,
                weight,
                dropped: dropped.contains(index),
            })
            .collect()
    }

    fn predict_block(
        active: &[ActiveTree<'_>],
        features: &BatchFeatures,
        range: Range<usize>,
        width: usize,
    ) -> (Vec<Score>, Vec<Score>) {
        let mut predictions = vec![0.0; range.len() * width];
        let mut no_dropout = vec![0.0; range.len() * width];

        for (row, example_index) in range.enumerate() {
            let example = features.example(example_index);
            let slots = row * width..(row + 1) * width;
            let prediction_row = &mut predictions[slots.clone()];
            let no_dropout_row = &mut no_dropout[slots];

            for tree in active {
                if let Some((_, leaf)) = tree.tree.evaluate(&example) {
                    if !tree.dropped {
                        leaf.accumulate(tree.weight, prediction_row);
                    }
                    leaf.accumulate(tree.weight, no_dropout_row);
                }
            }
        }
        (predictions, no_dropout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::ensemble::TreeMetadata;
    use crate::dataset::batch_features::FeatureInputs;
    use crate::tree::node::TreeNode;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn stump(threshold: f32, left: f32, right: f32) -> DecisionTree {
        DecisionTree::new(vec![
            TreeNode::dense_split(0, 0, threshold, 1, 2),
            TreeNode::leaf(vec![left]),
            TreeNode::leaf(vec![right]),
        ])
    }

    fn features() -> BatchFeatures {
        let inputs = FeatureInputs::new().with_dense_float(arr2(&[[0.0], [1.0], [2.0]]));
        BatchFeatures::from_inputs(&inputs).unwrap()
    }

    fn pool() -> WorkerPool {
        WorkerPool::new(2).unwrap()
    }

    #[test]
    fn test_weighted_sum() {
        let ensemble = DecisionTreeEnsemble::new()
            .with_tree(stump(0.5, 1.0, 2.0), 1.0, TreeMetadata::finalized())
            .with_tree(stump(1.5, 10.0, 20.0), 0.5, TreeMetadata::finalized());
        let out = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap();

        assert_relative_eq!(out.predictions[[0, 0]], 6.0);
        assert_relative_eq!(out.predictions[[1, 0]], 7.0);
        assert_relative_eq!(out.predictions[[2, 0]], 12.0);
        assert_eq!(out.predictions, out.no_dropout_predictions);
    }

    #[test]
    fn test_dropped_tree_only_in_no_dropout() {
        let ensemble = DecisionTreeEnsemble::new()
            .with_tree(DecisionTree::from_leaf(vec![1.0]), 1.0, TreeMetadata::finalized())
            .with_tree(DecisionTree::from_leaf(vec![4.0]), 1.0, TreeMetadata::finalized());
        let dropped = DropoutSelection::new(vec![1], vec![1.0]).unwrap();
        let out = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &dropped,
            &features(),
            &pool(),
            1,
        )
        .unwrap();

        for row in 0..3 {
            assert_relative_eq!(out.predictions[[row, 0]], 1.0);
            assert_relative_eq!(out.no_dropout_predictions[[row, 0]], 5.0);
        }
    }

    #[test]
    fn test_skips_non_finalized_and_zero_weight() {
        let ensemble = DecisionTreeEnsemble::new()
            .with_tree(DecisionTree::from_leaf(vec![1.0]), 0.0, TreeMetadata::finalized())
            .with_tree(DecisionTree::empty(), 1.0, TreeMetadata::finalized())
            .with_tree(DecisionTree::from_leaf(vec![3.0]), 1.0, TreeMetadata::growing());

        let finalized_only = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap();
        assert!(finalized_only.predictions.iter().all(|&v| v == 0.0));

        let with_growing = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            false,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap();
        assert!(with_growing.predictions.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_sparse_leaf_accumulation() {
        let ensemble = DecisionTreeEnsemble::new()
            .with_tree(
                DecisionTree::new(vec![TreeNode::sparse_leaf(vec![2], vec![1.5])]),
                2.0,
                TreeMetadata::finalized(),
            )
            .with_tree(DecisionTree::from_leaf(vec![1.0, 1.0]), 1.0, TreeMetadata::finalized());
        let out = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            3,
        )
        .unwrap();
        assert_eq!(out.predictions.shape(), &[3, 3]);
        for row in 0..3 {
            assert_eq!(out.predictions.row(row).to_vec(), vec![1.0, 1.0, 3.0]);
        }
    }

    #[test]
    fn test_leaf_wider_than_prediction_vector() {
        let ensemble = DecisionTreeEnsemble::new().with_tree(
            DecisionTree::from_leaf(vec![1.0, 2.0]),
            1.0,
            TreeMetadata::finalized(),
        );
        let err = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap_err();
        assert_eq!(err.category(), "invalid_model");
    }

    #[test]
    fn test_weight_length_mismatch() {
        let ensemble = DecisionTreeEnsemble::new().with_tree(
            DecisionTree::from_leaf(vec![1.0]),
            1.0,
            TreeMetadata::finalized(),
        );
        assert!(MultipleAdditiveTrees::predict(
            &ensemble,
            &[],
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .is_err());
    }

    #[test]
    fn test_malformed_tree_is_rejected() {
        let ensemble = DecisionTreeEnsemble::new().with_tree(
            DecisionTree::new(vec![
                TreeNode::dense_split(0, 0, 0.0, 1, 4),
                TreeNode::leaf(vec![1.0]),
            ]),
            1.0,
            TreeMetadata::finalized(),
        );
        let err = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap_err();
        assert_eq!(err.category(), "invalid_model");
    }

    #[test]
    fn test_missing_feature_column() {
        let ensemble = DecisionTreeEnsemble::new().with_tree(
            DecisionTree::new(vec![
                TreeNode::dense_split(3, 0, 0.0, 1, 2),
                TreeNode::leaf(vec![1.0]),
                TreeNode::leaf(vec![2.0]),
            ]),
            1.0,
            TreeMetadata::finalized(),
        );
        let err = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features(),
            &pool(),
            1,
        )
        .unwrap_err();
        assert_eq!(err.category(), "invalid_argument");
    }

    #[test]
    fn test_large_batch_matches_sequential() {
        let rows: Vec<[f32; 1]> = (0..5000).map(|i| [(i % 7) as f32]).collect();
        let inputs = FeatureInputs::new().with_dense_float(arr2(&rows));
        let features = BatchFeatures::from_inputs(&inputs).unwrap();
        let ensemble = (0..10).fold(DecisionTreeEnsemble::new(), |e, i| {
            e.with_tree(stump(i as f32 * 0.5, 1.0, -1.0), 0.1, TreeMetadata::finalized())
        });

        let parallel = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features,
            &WorkerPool::new(4).unwrap(),
            1,
        )
        .unwrap();
        let sequential = MultipleAdditiveTrees::predict(
            &ensemble,
            &ensemble.tree_weights,
            true,
            &DropoutSelection::empty(),
            &features,
            &WorkerPool::new(1).unwrap(),
            1,
        )
        .unwrap();
        assert_eq!(parallel, sequential);
    }
}
