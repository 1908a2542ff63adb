//! Per-entry-point options.

use serde::{Deserialize, Serialize};

/// Options of the prediction entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionOptions {
    /// Hold the ensemble's exclusive guard for the whole call
    pub use_locking: bool,
    /// Tree 0 is a bias tree and is never dropped
    pub center_bias: bool,
    /// Apply dropout when the learner uses the dropout learning rate tuner
    pub apply_dropout: bool,
    /// Apply the learner's averaging config
    pub apply_averaging: bool,
}

impl PredictionOptions {
    /// Options with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `use_locking`
    pub fn with_locking(mut self, use_locking: bool) -> Self {
        self.use_locking = use_locking;
        self
    }

    /// Set `center_bias`
    pub fn with_center_bias(mut self, center_bias: bool) -> Self {
        self.center_bias = center_bias;
        self
    }

    /// Set `apply_dropout`
    pub fn with_dropout(mut self, apply_dropout: bool) -> Self {
        self.apply_dropout = apply_dropout;
        self
    }

    /// Set `apply_averaging`
    pub fn with_averaging(mut self, apply_averaging: bool) -> Self {
        self.apply_averaging = apply_averaging;
        self
    }
}

/// Options of the partitioning entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionOptions {
    /// Hold the ensemble's exclusive guard for the whole call
    pub use_locking: bool,
}

impl PartitionOptions {
    /// Options with locking on or off.
    pub fn new(use_locking: bool) -> Self {
        PartitionOptions { use_locking }
    }
}
