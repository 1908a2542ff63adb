//! Worker pool utilities implemented on top of Rayon.
//!
//! Key components:
//! - [`BlockInfo`] for splitting a count of work items into contiguous blocks
//! - [`WorkerPool`] for running one task per block and joining on completion
//!
//! Every entry point is a fork/join barrier: the calling thread blocks until
//! every block has finished, and tasks never wait on each other. A panic inside
//! a task is re-raised on the calling thread once the join completes.

use crate::core::constants::{DEFAULT_NUM_THREADS, NUM_THREADS_ENV_VAR};
use crate::core::error::{BoostedTreesError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::min;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

/// Number of blocks and the size of each block for `cnt` work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Number of blocks
    pub num_blocks: usize,
    /// Items per block (the last block may be shorter)
    pub block_size: usize,
}

impl BlockInfo {
    /// Compute number of blocks and block size.
    ///
    /// Never produces more blocks than `num_threads`, and never produces blocks
    /// smaller than `min_cnt_per_block` unless there is only one block.
    pub fn new(num_threads: usize, cnt: usize, min_cnt_per_block: usize) -> Self {
        let min_cnt_per_block = min_cnt_per_block.max(1);
        let n = min(
            num_threads.max(1),
            (cnt + min_cnt_per_block - 1) / min_cnt_per_block,
        );
        if n > 1 {
            let block_size = (cnt + n - 1) / n;
            BlockInfo {
                num_blocks: (cnt + block_size - 1) / block_size,
                block_size,
            }
        } else {
            BlockInfo {
                num_blocks: usize::from(cnt > 0),
                block_size: cnt,
            }
        }
    }

    /// Contiguous ranges covering `[0, cnt)`.
    pub fn ranges(&self, cnt: usize) -> Vec<Range<usize>> {
        (0..self.num_blocks)
            .map(|i| {
                let start = i * self.block_size;
                start..min(cnt, start + self.block_size)
            })
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads (0 = use all logical cores)
    pub num_threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            num_threads: DEFAULT_NUM_THREADS,
        }
    }
}

impl PoolConfig {
    /// Load the thread count from `BOOSTED_TREES_NUM_THREADS`, falling back to
    /// the default when the variable is unset.
    pub fn from_environment() -> Result<Self> {
        let mut config = PoolConfig::default();
        if let Ok(val) = std::env::var(NUM_THREADS_ENV_VAR) {
            config.num_threads = val.trim().parse().map_err(|_| {
                BoostedTreesError::config(format!("Invalid {}: {}", NUM_THREADS_ENV_VAR, val))
            })?;
        }
        Ok(config)
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }
}

/// Fixed-size pool of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with the given number of threads (0 = all cores).
    pub fn new(num_threads: usize) -> Result<Self> {
        Self::with_config(&PoolConfig { num_threads })
    }

    /// Build a pool from a [`PoolConfig`].
    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        let num_threads = config.effective_num_threads();
        if num_threads > num_cpus::get() * 2 {
            log::warn!(
                "num_threads ({}) is much larger than available cores ({})",
                num_threads,
                num_cpus::get()
            );
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("boosted-trees-worker-{}", i))
            .build()
            .map_err(|e| BoostedTreesError::threading(format!("Failed to create thread pool: {}", e)))?;
        Ok(WorkerPool { pool })
    }

    /// Number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Block layout for `cnt` items on this pool.
    pub fn block_info(&self, cnt: usize, min_cnt_per_block: usize) -> BlockInfo {
        BlockInfo::new(self.num_threads(), cnt, min_cnt_per_block)
    }

    /// Run `inner_fun` once per range and return the results in range order.
    pub fn map_blocks<R, F>(&self, ranges: Vec<Range<usize>>, inner_fun: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Range<usize>) -> R + Send + Sync,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool
                .install(|| ranges.into_par_iter().map(&inner_fun).collect::<Vec<R>>())
        }));
        match result {
            Ok(results) => results,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Split `output` into contiguous blocks of `block_size` items and run
    /// `inner_fun(block_start, block)` on each block.
    ///
    /// Each task only sees its own slice of `output`.
    pub fn for_each_block_mut<T, F>(&self, output: &mut [T], block_size: usize, inner_fun: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if output.is_empty() {
            return;
        }
        let block_size = block_size.max(1);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                output
                    .par_chunks_mut(block_size)
                    .enumerate()
                    .for_each(|(i, block)| inner_fun(i * block_size, block));
            })
        }));
        if let Err(payload) = result {
            panic::resume_unwind(payload);
        }
    }
}
