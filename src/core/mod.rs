//! Core infrastructure module.
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: System constants and configuration defaults
//! - [`error`]: Error handling and error types
//! - [`utils`]: Seeded randomness and the worker pool

pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

pub use constants::*;
pub use error::{BoostedTreesError, Result};
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};

static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the core module.
///
/// Installs the `env_logger` backend for the `log` facade unless the host
/// application already installed one. Safe to call more than once.
pub fn initialize_core() -> Result<()> {
    if CORE_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    // Ignore the error: another logger may already be installed by the host.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    log::debug!("boosted-trees-rust {} initialized", BOOSTED_TREES_RUST_VERSION);
    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::SeqCst)
}
