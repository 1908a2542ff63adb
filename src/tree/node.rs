//! Tree node definitions.
//!
//! A node is either a [`Leaf`] holding a prediction vector or a [`Split`]
//! that routes an example to one of two children.

use crate::core::types::{CategoricalId, DefaultDirection, FeatureColumn, NodeIndex, Score};
use crate::dataset::batch_features::ExampleView;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tree node: a leaf or a binary split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Terminal node
    Leaf(Leaf),
    /// Internal node
    Split(Split),
}

impl TreeNode {
    /// Leaf with a dense prediction vector.
    pub fn leaf(values: Vec<Score>) -> Self {
        TreeNode::Leaf(Leaf::Vector(values))
    }

    /// Leaf with a sparse prediction vector.
    pub fn sparse_leaf(index: Vec<usize>, value: Vec<Score>) -> Self {
        TreeNode::Leaf(Leaf::SparseVector { index, value })
    }

    /// Split on a dense float column.
    pub fn dense_split(
        feature_column: FeatureColumn,
        dimension_id: usize,
        threshold: f32,
        left_id: NodeIndex,
        right_id: NodeIndex,
    ) -> Self {
        TreeNode::Split(Split::DenseFloat(DenseFloatBinarySplit {
            feature_column,
            dimension_id,
            threshold,
            left_id,
            right_id,
        }))
    }

    /// Split on a sparse float column.
    pub fn sparse_split(
        feature_column: FeatureColumn,
        dimension_id: usize,
        threshold: f32,
        default_direction: DefaultDirection,
        left_id: NodeIndex,
        right_id: NodeIndex,
    ) -> Self {
        TreeNode::Split(Split::SparseFloat(SparseFloatBinarySplit {
            feature_column,
            dimension_id,
            threshold,
            default_direction,
            left_id,
            right_id,
        }))
    }

    /// Split on the presence of one categorical id.
    pub fn categorical_split(
        feature_column: FeatureColumn,
        feature_id: CategoricalId,
        left_id: NodeIndex,
        right_id: NodeIndex,
    ) -> Self {
        TreeNode::Split(Split::CategoricalId(CategoricalIdBinarySplit {
            feature_column,
            feature_id,
            left_id,
            right_id,
        }))
    }

    /// Split on membership in a set of categorical ids. The ids are sorted.
    pub fn set_membership_split(
        feature_column: FeatureColumn,
        mut feature_ids: Vec<CategoricalId>,
        left_id: NodeIndex,
        right_id: NodeIndex,
    ) -> Self {
        feature_ids.sort_unstable();
        feature_ids.dedup();
        TreeNode::Split(Split::CategoricalIdSetMembership(
            CategoricalIdSetMembershipBinarySplit {
                feature_column,
                feature_ids,
                left_id,
                right_id,
            },
        ))
    }

    /// Returns true if this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf(_))
    }
}

/// Prediction vector stored in a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leaf {
    /// Value for every output slot, starting at slot 0
    Vector(Vec<Score>),
    /// Values for the listed output slots only
    SparseVector {
        /// Output slots
        index: Vec<usize>,
        /// Values aligned with `index`
        value: Vec<Score>,
    },
}

impl Leaf {
    /// Number of output slots the leaf needs.
    pub fn required_slots(&self) -> usize {
        match self {
            Leaf::Vector(values) => values.len(),
            Leaf::SparseVector { index, .. } => index.iter().max().map_or(0, |max| max + 1),
        }
    }

    /// Adds `weight * leaf` into `output`.
    ///
    /// Slots beyond the end of `output` must have been rejected beforehand.
    #[inline]
    pub fn accumulate(&self, weight: f32, output: &mut [Score]) {
        match self {
            Leaf::Vector(values) => {
                for (out, value) in output.iter_mut().zip(values) {
                    *out += weight * value;
                }
            }
            Leaf::SparseVector { index, value } => {
                for (&slot, value) in index.iter().zip(value) {
                    if let Some(out) = output.get_mut(slot) {
                        *out += weight * value;
                    }
                }
            }
        }
    }
}

/// `value <= threshold` on a dense float column goes left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseFloatBinarySplit {
    /// Dense float column
    pub feature_column: FeatureColumn,
    /// Dimension inside the column
    #[serde(default)]
    pub dimension_id: usize,
    /// Split threshold
    pub threshold: f32,
    /// Left child
    pub left_id: NodeIndex,
    /// Right child
    pub right_id: NodeIndex,
}

/// `value <= threshold` on a sparse float column goes left; absent values
/// follow `default_direction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseFloatBinarySplit {
    /// Sparse float column
    pub feature_column: FeatureColumn,
    /// Dimension inside the column
    #[serde(default)]
    pub dimension_id: usize,
    /// Split threshold
    pub threshold: f32,
    /// Branch for examples without a value
    #[serde(default)]
    pub default_direction: DefaultDirection,
    /// Left child
    pub left_id: NodeIndex,
    /// Right child
    pub right_id: NodeIndex,
}

/// Examples carrying `feature_id` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalIdBinarySplit {
    /// Sparse int column
    pub feature_column: FeatureColumn,
    /// Categorical id tested for
    pub feature_id: CategoricalId,
    /// Left child
    pub left_id: NodeIndex,
    /// Right child
    pub right_id: NodeIndex,
}

/// Examples carrying any id of `feature_ids` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalIdSetMembershipBinarySplit {
    /// Sparse int column
    pub feature_column: FeatureColumn,
    /// Sorted ids routed left
    pub feature_ids: Vec<CategoricalId>,
    /// Left child
    pub left_id: NodeIndex,
    /// Right child
    pub right_id: NodeIndex,
}

/// Binary split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Threshold on a dense float column
    DenseFloat(DenseFloatBinarySplit),
    /// Threshold on a sparse float column
    SparseFloat(SparseFloatBinarySplit),
    /// Equality with a single categorical id
    CategoricalId(CategoricalIdBinarySplit),
    /// Membership in a set of categorical ids
    CategoricalIdSetMembership(CategoricalIdSetMembershipBinarySplit),
}

impl Split {
    /// Left and right children.
    pub fn children(&self) -> (NodeIndex, NodeIndex) {
        match self {
            Split::DenseFloat(s) => (s.left_id, s.right_id),
            Split::SparseFloat(s) => (s.left_id, s.right_id),
            Split::CategoricalId(s) => (s.left_id, s.right_id),
            Split::CategoricalIdSetMembership(s) => (s.left_id, s.right_id),
        }
    }

    /// Column the split reads.
    pub fn feature_column(&self) -> FeatureColumn {
        match self {
            Split::DenseFloat(s) => s.feature_column,
            Split::SparseFloat(s) => s.feature_column,
            Split::CategoricalId(s) => s.feature_column,
            Split::CategoricalIdSetMembership(s) => s.feature_column,
        }
    }

    /// Whether `example` goes to the left child.
    #[inline]
    pub fn goes_left(&self, example: &ExampleView<'_>) -> bool {
        match self {
            // NaN and missing values fail the comparison and go right
            Split::DenseFloat(s) => example
                .dense_float(s.feature_column, s.dimension_id)
                .map_or(false, |value| value <= s.threshold),
            Split::SparseFloat(s) => match example.sparse_float(s.feature_column, s.dimension_id) {
                Some(value) => value <= s.threshold,
                None => s.default_direction == DefaultDirection::Left,
            },
            Split::CategoricalId(s) => example
                .sparse_int(s.feature_column)
                .binary_search(&s.feature_id)
                .is_ok(),
            Split::CategoricalIdSetMembership(s) => example
                .sparse_int(s.feature_column)
                .iter()
                .any(|id| s.feature_ids.binary_search(id).is_ok()),
        }
    }

    /// Child `example` is routed to.
    #[inline]
    pub fn next_node(&self, example: &ExampleView<'_>) -> NodeIndex {
        let (left, right) = self.children();
        if self.goes_left(example) {
            left
        } else {
            right
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::DenseFloat(s) => write!(
                f,
                "dense[{}][{}] <= {}",
                s.feature_column, s.dimension_id, s.threshold
            ),
            Split::SparseFloat(s) => write!(
                f,
                "sparse[{}][{}] <= {} (default {:?})",
                s.feature_column, s.dimension_id, s.threshold, s.default_direction
            ),
            Split::CategoricalId(s) => write!(f, "{} in int[{}]", s.feature_id, s.feature_column),
            Split::CategoricalIdSetMembership(s) => {
                write!(f, "int[{}] in {:?}", s.feature_column, s.feature_ids)
            }
        }
    }
}
