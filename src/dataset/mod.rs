//! Feature batches.
//!
//! A batch groups the feature columns of one call: dense float matrices,
//! sparse float columns and sparse categorical columns. Columns are validated
//! once and then read concurrently by the evaluation workers.

pub mod batch_features;

pub use batch_features::{
    infer_batch_size, BatchFeatures, ExampleView, FeatureInputs, FeatureStats,
    SparseFeatureColumn,
};
