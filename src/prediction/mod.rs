//! Prediction pipeline.
//!
//! - [`ops`]: the prediction and partitioning entry points
//! - [`predictor`]: additive evaluation of an ensemble
//! - [`dropout`]: seeded selection of dropped trees and weight rebalancing
//! - [`averaging`]: reweighting of the most recent trees
//! - [`partition`]: leaf assignment for the tree being grown

pub mod averaging;
pub mod dropout;
pub mod ops;
pub mod partition;
pub mod predictor;

pub use averaging::AveragingStrategy;
pub use dropout::{DropoutSelection, DropoutSelector};
pub use ops::{GradientTreesPartitionExamples, GradientTreesPrediction, PredictionOutput};
pub use partition::ExamplePartitioner;
pub use predictor::{EnsemblePredictions, MultipleAdditiveTrees};
