//! # Boosted Trees Rust
//!
//! Evaluation of gradient-boosted decision tree ensembles: batched
//! prediction with optional dropout (DART) and averaging, and partitioning of
//! examples over the leaves of the tree being grown.
//!
//! ## Features
//!
//! - **Mixed feature families**: dense float matrices, sparse float columns
//!   and sparse categorical id sets in one batch.
//! - **Reproducible dropout**: the dropped trees are a function of the seed,
//!   so the trainer and the evaluator agree on them.
//! - **Parallel evaluation**: examples are split into contiguous blocks and
//!   evaluated on a Rayon worker pool.
//! - **Shared ensembles**: readers either lock the ensemble for a call or work
//!   on a consistent snapshot while a trainer keeps updating it.
//!
//! ## Quick Start
//!
//! ```rust
//! use boosted_trees_rust::{
//!     DecisionTree, DecisionTreeEnsemble, DecisionTreeEnsembleResource, FeatureInputs,
//!     GradientTreesPrediction, LearnerConfig, PredictionOptions, TreeMetadata, TreeNode,
//!     WorkerPool,
//! };
//! use ndarray::arr2;
//!
//! # fn main() -> boosted_trees_rust::Result<()> {
//! // dense[0] <= 0.5 ? 1.0 : -1.0
//! let tree = DecisionTree::new(vec![
//!     TreeNode::dense_split(0, 0, 0.5, 1, 2),
//!     TreeNode::leaf(vec![1.0]),
//!     TreeNode::leaf(vec![-1.0]),
//! ]);
//! let ensemble = DecisionTreeEnsemble::new().with_tree(tree, 0.5, TreeMetadata::finalized());
//! let resource = DecisionTreeEnsembleResource::new(ensemble)?;
//!
//! let op = GradientTreesPrediction::new(&LearnerConfig::default(), PredictionOptions::new())?;
//! let inputs = FeatureInputs::new().with_dense_float(arr2(&[[0.0], [1.0]]));
//! let pool = WorkerPool::new(2)?;
//!
//! let output = op.compute(&resource, &inputs, None, &pool)?;
//! assert_eq!(output.predictions, arr2(&[[0.5f32], [-0.5]]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Fundamental types, constants, error handling and the worker pool
//! - [`config`]: Learner configuration and entry point options
//! - [`dataset`]: Validated feature batches
//! - [`tree`]: Decision tree structure and evaluation
//! - [`boosting`]: Tree ensembles and the shared ensemble resource
//! - [`prediction`]: Dropout, averaging, prediction and partitioning

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Feature batch module
pub mod dataset;

// Decision tree module
pub mod tree;

// Ensemble module
pub mod boosting;

// Prediction module
pub mod prediction;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{BoostedTreesError, Result},
    types::*,
    utils::threading::{BlockInfo, PoolConfig, WorkerPool},
};

// Re-export configuration functionality
pub use config::{
    AveragingConfig, LearnerConfig, LearningRateConfig, LearningRateDropoutDrivenConfig,
    LearningRateFixedConfig, LearningRateLineSearchConfig, PartitionOptions, PredictionOptions,
};

// Re-export dataset functionality
pub use dataset::{BatchFeatures, ExampleView, FeatureInputs, FeatureStats, SparseFeatureColumn};

// Re-export tree functionality
pub use tree::{DecisionTree, Leaf, Split, TreeNode};

// Re-export ensemble functionality
pub use boosting::{
    DecisionTreeEnsemble, DecisionTreeEnsembleResource, EnsembleView, GrowingMetadata,
    LockedEnsemble, TreeMetadata,
};

// Re-export prediction functionality
pub use prediction::{
    AveragingStrategy, DropoutSelection, DropoutSelector, ExamplePartitioner,
    GradientTreesPartitionExamples, GradientTreesPrediction, MultipleAdditiveTrees,
    PredictionOutput,
};

// Version information
pub use crate::core::constants::BOOSTED_TREES_RUST_VERSION as VERSION;

/// Initialize the library.
///
/// Installs the `env_logger` backend for the `log` facade (honouring
/// `RUST_LOG`) unless the host application already installed a logger.
/// Calling it is optional and calling it twice is harmless.
///
/// # Examples
///
/// ```rust
/// fn main() -> boosted_trees_rust::Result<()> {
///     boosted_trees_rust::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    crate::core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    crate::core::is_core_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        assert!(init().is_ok());
        assert!(is_initialized());
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
