//! Averaging of the most recent trees.
//!
//! Averaging is expressed as a reweighting: trees at or after the averaging
//! start get a linearly decaying factor, so the newest tree counts least.

/// Validated averaging variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AveragingStrategy {
    /// Average over the last `n` trees, `n > 0`
    LastNTrees(u32),
    /// Average over the last fraction of trees, in (0, 1]
    LastPercentTrees(f32),
}

impl AveragingStrategy {
    /// First tree index taking part in averaging.
    pub fn start_index(&self, num_trees: usize) -> usize {
        match *self {
            AveragingStrategy::LastNTrees(n) => num_trees.saturating_sub(n as usize),
            AveragingStrategy::LastPercentTrees(percent) => {
                let start = num_trees as f64 * (1.0 - f64::from(percent));
                start.max(0.0) as usize
            }
        }
    }

    /// Copy of `weights` with the averaging factors applied.
    pub fn averaged_weights(&self, weights: &[f32]) -> Vec<f32> {
        let num_trees = weights.len();
        let start = self.start_index(num_trees).min(num_trees);
        let num_averaged = num_trees - start;

        let mut adjusted = weights.to_vec();
        for (offset, weight) in adjusted[start..].iter_mut().enumerate() {
            *weight = *weight * (num_averaged - offset) as f32 / num_averaged as f32;
        }
        adjusted
    }
}
