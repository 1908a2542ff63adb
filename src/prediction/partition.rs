//! Assignment of examples to the leaves of a single tree.

use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::PartitionId;
use crate::core::utils::threading::WorkerPool;
use crate::dataset::batch_features::BatchFeatures;
use crate::tree::tree::DecisionTree;

/// Routes every example of a batch through one tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExamplePartitioner;

impl ExamplePartitioner {
    /// Leaf id of every example in `tree`.
    ///
    /// Examples are processed in `parallelism` contiguous blocks. The empty
    /// tree maps every example to 0.
    pub fn partition(
        tree: &DecisionTree,
        features: &BatchFeatures,
        parallelism: usize,
        pool: &WorkerPool,
    ) -> Result<Vec<PartitionId>> {
        let batch_size = features.batch_size();
        let mut partition_ids: Vec<PartitionId> = vec![0; batch_size];
        if tree.is_empty() || batch_size == 0 {
            return Ok(partition_ids);
        }

        if PartitionId::try_from(tree.num_nodes()).is_err() {
            return Err(BoostedTreesError::invalid_model(format!(
                "Tree with {} nodes exceeds the partition id range",
                tree.num_nodes()
            )));
        }
        tree.validate()?;
        features.check_tree_columns(tree)?;

        let parallelism = parallelism.max(1);
        let block_size = (batch_size + parallelism - 1) / parallelism;
        log::trace!(
            "Partitioning {} examples in blocks of {}",
            batch_size,
            block_size
        );

        pool.for_each_block_mut(&mut partition_ids, block_size, |start, block| {
            for (offset, slot) in block.iter_mut().enumerate() {
                let leaf = tree.traverse(&features.example(start + offset));
                // Bounded by num_nodes, checked above
                *slot = leaf as PartitionId;
            }
        });
        Ok(partition_ids)
    }
}
