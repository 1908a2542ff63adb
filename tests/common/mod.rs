//! Common test utilities for boosted-trees-rust integration tests.

#![allow(dead_code)]

use boosted_trees_rust::*;
use ndarray::Array2;
use rand::prelude::*;

/// Random dense features in [-5, 5)
pub fn create_dense_features(num_samples: usize, num_features: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, num_features), |_| rng.gen_range(-5.0..5.0))
}

/// Sparse float column where roughly half of the examples carry a value
pub fn create_sparse_float_column(num_samples: usize, seed: u64) -> SparseFeatureColumn<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let entries: Vec<(usize, usize, f32)> = (0..num_samples)
        .filter_map(|example| {
            if rng.gen_bool(0.5) {
                Some((example, 0, rng.gen_range(-1.0..1.0)))
            } else {
                None
            }
        })
        .collect();
    SparseFeatureColumn::from_entries(num_samples, 1, &entries)
}

/// Categorical column with up to three ids in [0, 10) per example
pub fn create_sparse_int_column(num_samples: usize, seed: u64) -> SparseFeatureColumn<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let id_sets: Vec<Vec<i64>> = (0..num_samples)
        .map(|_| {
            let count = rng.gen_range(0..4);
            (0..count).map(|_| rng.gen_range(0..10)).collect()
        })
        .collect();
    SparseFeatureColumn::from_id_sets(&id_sets)
}

/// One column of every feature family
pub fn create_mixed_inputs(num_samples: usize) -> FeatureInputs {
    FeatureInputs::new()
        .with_dense_float(create_dense_features(num_samples, 2, 42))
        .with_sparse_float(create_sparse_float_column(num_samples, 7))
        .with_sparse_int(create_sparse_int_column(num_samples, 11))
}

/// dense[column] <= threshold ? left : right
pub fn dense_stump(column: usize, threshold: f32, left: Vec<f32>, right: Vec<f32>) -> DecisionTree {
    DecisionTree::new(vec![
        TreeNode::dense_split(column, 0, threshold, 1, 2),
        TreeNode::leaf(left),
        TreeNode::leaf(right),
    ])
}

/// Three level tree using every split type
pub fn mixed_tree() -> DecisionTree {
    DecisionTree::new(vec![
        TreeNode::dense_split(0, 0, 0.0, 1, 2),
        TreeNode::sparse_split(0, 0, 0.0, DefaultDirection::Right, 3, 4),
        TreeNode::set_membership_split(0, vec![2, 5, 7], 5, 6),
        TreeNode::leaf(vec![1.0]),
        TreeNode::categorical_split(0, 3, 7, 8),
        TreeNode::leaf(vec![-2.0]),
        TreeNode::sparse_leaf(vec![0], vec![0.5]),
        TreeNode::leaf(vec![4.0]),
        TreeNode::leaf(vec![-0.25]),
    ])
}

/// `num_trees` finalized single-leaf trees; tree i outputs `i + 1` with weight 1
pub fn constant_ensemble(num_trees: usize) -> DecisionTreeEnsemble {
    (0..num_trees).fold(DecisionTreeEnsemble::new(), |ensemble, i| {
        ensemble.with_tree(
            DecisionTree::from_leaf(vec![(i + 1) as f32]),
            1.0,
            TreeMetadata::finalized(),
        )
    })
}

/// Learner config with the dropout tuner
pub fn dropout_learner_config(dropout_probability: f32, skip_probability: f32) -> LearnerConfig {
    LearnerConfig {
        learning_rate_tuner: Some(LearningRateConfig::Dropout(LearningRateDropoutDrivenConfig {
            dropout_probability,
            probability_of_skipping_dropout: skip_probability,
            learning_rate: 1.0,
        })),
        ..LearnerConfig::default()
    }
}

/// Scalar seed tensor
pub fn seed(value: i64) -> ndarray::ArrayD<i64> {
    ndarray::arr0(value).into_dyn()
}

/// Reference evaluation of one example, tree by tree
pub fn reference_prediction(
    ensemble: &DecisionTreeEnsemble,
    features: &BatchFeatures,
    example: usize,
    width: usize,
) -> Vec<f32> {
    let mut output = vec![0.0; width];
    for (tree, &weight) in ensemble.trees.iter().zip(&ensemble.tree_weights) {
        if let Some((_, leaf)) = tree.evaluate(&features.example(example)) {
            leaf.accumulate(weight, &mut output);
        }
    }
    output
}
