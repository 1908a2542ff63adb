//! Seeded dropout of trees (DART).
//!
//! Selection is a pure function of the seed, the excluded set and the number
//! of trees, so the trainer and the evaluator can reproduce each other's
//! choice.

use crate::config::learner::LearningRateDropoutDrivenConfig;
use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::TreeIndex;
use crate::core::utils::random::Random;
use ndarray::Array2;
use std::collections::HashSet;

/// Trees dropped for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropoutSelection {
    dropped_trees: Vec<TreeIndex>,
    original_weights: Vec<f32>,
}

impl DropoutSelection {
    /// Selection without dropped trees.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a selection from dropped indices and their weights.
    ///
    /// The pairs are sorted by tree index.
    pub fn new(dropped_trees: Vec<TreeIndex>, original_weights: Vec<f32>) -> Result<Self> {
        if dropped_trees.len() != original_weights.len() {
            return Err(BoostedTreesError::dimension_mismatch(
                format!("{} original weights", dropped_trees.len()),
                format!("{}", original_weights.len()),
            ));
        }
        let mut pairs: Vec<(TreeIndex, f32)> = dropped_trees.into_iter().zip(original_weights).collect();
        pairs.sort_by_key(|&(index, _)| index);
        if pairs.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(BoostedTreesError::invalid_argument("Dropped tree indices must be unique"));
        }
        Ok(DropoutSelection {
            dropped_trees: pairs.iter().map(|p| p.0).collect(),
            original_weights: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Dropped tree indices, ascending.
    pub fn dropped_trees(&self) -> &[TreeIndex] {
        &self.dropped_trees
    }

    /// Weights of the dropped trees before dropout.
    pub fn original_weights(&self) -> &[f32] {
        &self.original_weights
    }

    /// Number of dropped trees.
    pub fn len(&self) -> usize {
        self.dropped_trees.len()
    }

    /// Returns true if no tree was dropped.
    pub fn is_empty(&self) -> bool {
        self.dropped_trees.is_empty()
    }

    /// Returns true if `tree` was dropped.
    #[inline]
    pub fn contains(&self, tree: TreeIndex) -> bool {
        self.dropped_trees.binary_search(&tree).is_ok()
    }

    /// `[2, K]` matrix: dropped indices in row 0, original weights in row 1.
    pub fn to_info_matrix(&self) -> Array2<f32> {
        let k = self.len();
        Array2::from_shape_fn((2, k), |(row, col)| {
            if row == 0 {
                self.dropped_trees[col] as f32
            } else {
                self.original_weights[col]
            }
        })
    }

    /// Rescales tree weights after `num_trees_to_add` trees were trained
    /// against the dropped-out ensemble.
    ///
    /// With `k` dropped trees of total weight `S`, the new trees share
    /// `S / (k + 1)` evenly and each dropped tree is scaled by `k / (k + 1)`.
    /// New trees past the end of `weights` are appended. Every touched tree has
    /// its update counter bumped.
    pub fn rebalance_weights(
        &self,
        new_trees_first_index: TreeIndex,
        num_trees_to_add: usize,
        weights: &mut Vec<f32>,
        num_updates: &mut Vec<u32>,
    ) -> Result<()> {
        if weights.len() != num_updates.len() {
            return Err(BoostedTreesError::dimension_mismatch(
                format!("{} update counters", weights.len()),
                format!("{}", num_updates.len()),
            ));
        }
        if new_trees_first_index > weights.len() {
            return Err(BoostedTreesError::invalid_argument(format!(
                "New trees start at {} but only {} weights exist",
                new_trees_first_index,
                weights.len()
            )));
        }
        if let Some(&last) = self.dropped_trees.last() {
            if last >= weights.len() {
                return Err(BoostedTreesError::invalid_argument(format!(
                    "Dropped tree {} out of range for {} weights",
                    last,
                    weights.len()
                )));
            }
        }

        let dropped_sum: f32 = self.original_weights.iter().sum();
        let num_dropped = self.len() as f32;
        let total_new_trees_weight = dropped_sum / (num_dropped + 1.0);

        for i in 0..num_trees_to_add {
            let new_weight = total_new_trees_weight / num_trees_to_add as f32;
            let index = new_trees_first_index + i;
            if index < weights.len() {
                weights[index] = new_weight;
                num_updates[index] += 1;
            } else {
                weights.push(new_weight);
                num_updates.push(1);
            }
        }

        for (&dropped, &original) in self.dropped_trees.iter().zip(&self.original_weights) {
            weights[dropped] = original * num_dropped / (num_dropped + 1.0);
            num_updates[dropped] += 1;
        }
        Ok(())
    }
}

/// Picks the trees to drop for one call.
#[derive(Debug, Clone)]
pub struct DropoutSelector {
    config: LearningRateDropoutDrivenConfig,
}

impl DropoutSelector {
    /// Selector for the given dropout parameters.
    pub fn new(config: LearningRateDropoutDrivenConfig) -> Self {
        DropoutSelector { config }
    }

    /// Dropout parameters.
    pub fn config(&self) -> &LearningRateDropoutDrivenConfig {
        &self.config
    }

    /// Select trees to drop among `weights.len()` trees, never picking an
    /// index in `excluded`.
    pub fn select(
        &self,
        seed: u64,
        excluded: &HashSet<TreeIndex>,
        weights: &[f32],
    ) -> Result<DropoutSelection> {
        self.config.validate()?;

        let dropout_probability = f64::from(self.config.dropout_probability);
        let skip_probability = f64::from(self.config.probability_of_skipping_dropout);
        if dropout_probability == 0.0 || skip_probability == 1.0 {
            return Ok(DropoutSelection::empty());
        }

        let mut rng = Random::with_seed(seed);
        if skip_probability != 0.0 && rng.next_double() < skip_probability {
            log::trace!("Dropout skipped for seed {}", seed);
            return Ok(DropoutSelection::empty());
        }

        let mut selection = DropoutSelection::empty();
        for (index, &weight) in weights.iter().enumerate() {
            if excluded.contains(&index) {
                continue;
            }
            if rng.next_double() < dropout_probability {
                selection.dropped_trees.push(index);
                selection.original_weights.push(weight);
            }
        }

        log::trace!(
            "Dropped {} of {} trees for seed {}",
            selection.len(),
            weights.len(),
            seed
        );
        Ok(selection)
    }
}
