//! Decision trees.
//!
//! Trees are flat node lists with node 0 as the root. Splits read dense
//! float, sparse float or categorical columns; leaves carry dense or sparse
//! prediction vectors.

pub mod node;
pub mod tree;

pub use node::{
    CategoricalIdBinarySplit, CategoricalIdSetMembershipBinarySplit, DenseFloatBinarySplit, Leaf,
    SparseFloatBinarySplit, Split, TreeNode,
};
pub use tree::DecisionTree;
