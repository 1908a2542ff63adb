//! Configuration for the evaluation entry points.
//!
//! [`LearnerConfig`] carries the fields of the trainer's learner
//! configuration that prediction depends on. [`PredictionOptions`] and
//! [`PartitionOptions`] are the per-entry-point flags.

pub mod learner;
pub mod options;

pub use learner::{
    AveragingConfig, LearnerConfig, LearningRateConfig, LearningRateDropoutDrivenConfig,
    LearningRateFixedConfig, LearningRateLineSearchConfig,
};
pub use options::{PartitionOptions, PredictionOptions};
