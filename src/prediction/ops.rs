//! Entry points: ensemble prediction and example partitioning.
//!
//! Both are configured once and then called with a shared ensemble resource,
//! the raw feature tensors and a worker pool.

use crate::boosting::resource::DecisionTreeEnsembleResource;
use crate::config::learner::LearnerConfig;
use crate::config::options::{PartitionOptions, PredictionOptions};
use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::{PartitionId, Score};
use crate::core::utils::threading::WorkerPool;
use crate::dataset::batch_features::{BatchFeatures, FeatureInputs};
use crate::prediction::averaging::AveragingStrategy;
use crate::prediction::dropout::{DropoutSelection, DropoutSelector};
use crate::prediction::partition::ExamplePartitioner;
use crate::prediction::predictor::MultipleAdditiveTrees;
use ndarray::{Array1, Array2, ArrayD};
use std::borrow::Cow;

/// Outputs of [`GradientTreesPrediction::compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    /// `[batch_size, V]` predictions without the dropped trees
    pub predictions: Array2<Score>,
    /// `[batch_size, V]` predictions with every participating tree
    pub no_dropout_predictions: Array2<Score>,
    /// `[2, K]`: dropped tree indices in row 0, their original weights in row 1
    pub dropout_info: Array2<f32>,
}

/// Ensemble prediction entry point.
#[derive(Debug, Clone)]
pub struct GradientTreesPrediction {
    options: PredictionOptions,
    prediction_vector_size: usize,
    only_finalized_trees: bool,
    dropout: Option<DropoutSelector>,
    averaging: Option<AveragingStrategy>,
}

impl GradientTreesPrediction {
    /// Validates the learner config and resolves the options against it.
    pub fn new(learner_config: &LearnerConfig, options: PredictionOptions) -> Result<Self> {
        learner_config.check_num_classes()?;

        let averaging = if options.apply_averaging {
            learner_config.averaging_strategy()?
        } else {
            None
        };
        let dropout = if options.apply_dropout {
            learner_config
                .dropout_config()
                .cloned()
                .map(DropoutSelector::new)
        } else {
            None
        };

        log::debug!(
            "Prediction op: num_classes={}, strategy={}, growing_mode={}, dropout={}, averaging={:?}",
            learner_config.num_classes,
            learner_config.multi_class_strategy,
            learner_config.growing_mode,
            dropout.is_some(),
            averaging
        );

        Ok(GradientTreesPrediction {
            options,
            prediction_vector_size: learner_config.prediction_vector_size(),
            only_finalized_trees: learner_config.only_finalized_trees(),
            dropout,
            averaging,
        })
    }

    /// Size of each prediction vector.
    pub fn prediction_vector_size(&self) -> usize {
        self.prediction_vector_size
    }

    /// Whether this op applies dropout.
    pub fn applies_dropout(&self) -> bool {
        self.dropout.is_some()
    }

    /// Predicts the batch described by `inputs`.
    ///
    /// `seed` must be a scalar whenever dropout is applied; it is ignored
    /// otherwise.
    pub fn compute(
        &self,
        resource: &DecisionTreeEnsembleResource,
        inputs: &FeatureInputs,
        seed: Option<&ArrayD<i64>>,
        pool: &WorkerPool,
    ) -> Result<PredictionOutput> {
        let ensemble = resource.view(self.options.use_locking)?;
        let features = BatchFeatures::from_inputs(inputs)?;

        let selection = match self.dropout {
            Some(ref selector) => {
                let seed = scalar_seed(seed)?;
                let excluded = ensemble.dropout_exclusions(self.options.center_bias);
                selector.select(seed, &excluded, &ensemble.tree_weights)?
            }
            None => DropoutSelection::empty(),
        };

        let tree_weights: Cow<'_, [f32]> = match self.averaging {
            Some(strategy) => Cow::Owned(strategy.averaged_weights(&ensemble.tree_weights)),
            None => Cow::Borrowed(ensemble.tree_weights.as_slice()),
        };

        let output = MultipleAdditiveTrees::predict(
            &ensemble,
            &tree_weights,
            self.only_finalized_trees,
            &selection,
            &features,
            pool,
            self.prediction_vector_size,
        )?;

        Ok(PredictionOutput {
            predictions: output.predictions,
            no_dropout_predictions: output.no_dropout_predictions,
            dropout_info: selection.to_info_matrix(),
        })
    }
}

fn scalar_seed(seed: Option<&ArrayD<i64>>) -> Result<u64> {
    match seed {
        Some(tensor) if tensor.ndim() == 0 => tensor
            .iter()
            .next()
            // Reinterpret the bits of negative seeds
            .map(|&value| value as u64)
            .ok_or_else(|| BoostedTreesError::invalid_argument("Seed must be a scalar.")),
        _ => Err(BoostedTreesError::invalid_argument("Seed must be a scalar.")),
    }
}

/// Example partitioning entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientTreesPartitionExamples {
    options: PartitionOptions,
}

impl GradientTreesPartitionExamples {
    /// Creates the op.
    pub fn new(options: PartitionOptions) -> Self {
        GradientTreesPartitionExamples { options }
    }

    /// Leaf id of every example in the tree being grown, or 0 for every
    /// example when no tree is being grown.
    pub fn compute(
        &self,
        resource: &DecisionTreeEnsembleResource,
        inputs: &FeatureInputs,
        pool: &WorkerPool,
    ) -> Result<Array1<PartitionId>> {
        let ensemble = resource.view(self.options.use_locking)?;
        let features = BatchFeatures::from_inputs(inputs)?;
        let partition_ids = ExamplePartitioner::partition(
            ensemble.partition_tree(),
            &features,
            pool.num_threads(),
            pool,
        )?;
        Ok(Array1::from(partition_ids))
    }
}
