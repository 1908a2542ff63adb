//! Core data types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prediction and leaf value type.
pub type Score = f32;

/// Tree node identifier type. Node 0 is always the root.
pub type NodeIndex = usize;

/// Position of a tree inside an ensemble.
pub type TreeIndex = usize;

/// Index of a feature column inside its feature family (dense, sparse float,
/// sparse int).
pub type FeatureColumn = usize;

/// Categorical feature id carried by sparse int columns.
pub type CategoricalId = i64;

/// Leaf id written by the example partitioner.
pub type PartitionId = i32;

/// How multi-class problems are mapped onto trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClassStrategy {
    /// One tree per class except the reference class
    TreePerClass,
    /// Multi-output trees using the full hessian
    FullHessian,
    /// Multi-output trees using the diagonal of the hessian
    DiagonalHessian,
}

impl Default for MultiClassStrategy {
    fn default() -> Self {
        MultiClassStrategy::TreePerClass
    }
}

impl fmt::Display for MultiClassStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiClassStrategy::TreePerClass => write!(f, "tree_per_class"),
            MultiClassStrategy::FullHessian => write!(f, "full_hessian"),
            MultiClassStrategy::DiagonalHessian => write!(f, "diagonal_hessian"),
        }
    }
}

/// How trees are grown by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowingMode {
    /// A tree only joins the prediction once it is finalized
    WholeTree,
    /// Partially grown trees take part in prediction
    LayerByLayer,
}

impl Default for GrowingMode {
    fn default() -> Self {
        GrowingMode::WholeTree
    }
}

impl fmt::Display for GrowingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowingMode::WholeTree => write!(f, "whole_tree"),
            GrowingMode::LayerByLayer => write!(f, "layer_by_layer"),
        }
    }
}

/// Branch taken by a sparse float split when the example lacks the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultDirection {
    /// Absent values follow the left child
    Left,
    /// Absent values follow the right child
    Right,
}

impl Default for DefaultDirection {
    fn default() -> Self {
        DefaultDirection::Left
    }
}
