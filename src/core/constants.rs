//! System constants and defaults.

/// Crate version string.
pub const BOOSTED_TREES_RUST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of worker threads (0 = use all logical cores).
pub const DEFAULT_NUM_THREADS: usize = 0;

/// Environment variable overriding the worker thread count.
pub const NUM_THREADS_ENV_VAR: &str = "BOOSTED_TREES_NUM_THREADS";

/// Estimated cost of traversing one tree for one example.
pub const TREE_TRAVERSAL_COST: usize = 50;

/// Minimum amount of traversal work worth shipping to a separate worker.
/// Blocks are sized so that each carries at least this much estimated cost.
pub const MIN_BLOCK_COST: usize = 10_000;
