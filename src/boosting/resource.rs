//! Shared, mutable handle to a tree ensemble.
//!
//! Readers either hold the exclusive guard for the duration of their call or
//! take an `Arc` snapshot. Writers hold the exclusive guard and publish a new
//! ensemble atomically, so a snapshot never observes a partial update.

use crate::boosting::ensemble::DecisionTreeEnsemble;
use crate::core::error::Result;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Ensemble shared between the trainer and the evaluation entry points.
#[derive(Debug, Default)]
pub struct DecisionTreeEnsembleResource {
    ensemble: RwLock<Arc<DecisionTreeEnsemble>>,
    mutex: Mutex<()>,
}

impl DecisionTreeEnsembleResource {
    /// Wraps a validated ensemble.
    pub fn new(ensemble: DecisionTreeEnsemble) -> Result<Self> {
        ensemble.validate()?;
        Ok(DecisionTreeEnsembleResource {
            ensemble: RwLock::new(Arc::new(ensemble)),
            mutex: Mutex::new(()),
        })
    }

    /// Current ensemble, without taking the exclusive guard.
    pub fn snapshot(&self) -> Result<Arc<DecisionTreeEnsemble>> {
        let current = self.ensemble.read()?;
        Ok(Arc::clone(&current))
    }

    /// Read view for one call.
    ///
    /// With `use_locking` the view holds the exclusive guard until dropped, so
    /// no writer can run in the meantime.
    pub fn view(&self, use_locking: bool) -> Result<EnsembleView<'_>> {
        if use_locking {
            let guard = self.mutex.lock()?;
            let ensemble = self.snapshot()?;
            Ok(EnsembleView::Locked {
                _guard: guard,
                ensemble,
            })
        } else {
            Ok(EnsembleView::Snapshot(self.snapshot()?))
        }
    }

    /// Takes the exclusive guard for writing.
    pub fn lock(&self) -> Result<LockedEnsemble<'_>> {
        let guard = self.mutex.lock()?;
        Ok(LockedEnsemble {
            resource: self,
            _guard: guard,
        })
    }
}

/// Read view of the ensemble for one call.
#[derive(Debug)]
pub enum EnsembleView<'a> {
    /// Holds the exclusive guard
    Locked {
        /// Exclusive guard, released on drop
        _guard: MutexGuard<'a, ()>,
        /// Ensemble read under the guard
        ensemble: Arc<DecisionTreeEnsemble>,
    },
    /// Unlocked snapshot
    Snapshot(Arc<DecisionTreeEnsemble>),
}

impl EnsembleView<'_> {
    /// Whether the view holds the exclusive guard.
    pub fn is_locked(&self) -> bool {
        matches!(self, EnsembleView::Locked { .. })
    }
}

impl Deref for EnsembleView<'_> {
    type Target = DecisionTreeEnsemble;

    fn deref(&self) -> &DecisionTreeEnsemble {
        match self {
            EnsembleView::Locked { ensemble, .. } => &**ensemble,
            EnsembleView::Snapshot(ensemble) => &**ensemble,
        }
    }
}

/// Exclusive write access to the ensemble.
#[derive(Debug)]
pub struct LockedEnsemble<'a> {
    resource: &'a DecisionTreeEnsembleResource,
    _guard: MutexGuard<'a, ()>,
}

impl LockedEnsemble<'_> {
    /// Current ensemble.
    pub fn ensemble(&self) -> Result<Arc<DecisionTreeEnsemble>> {
        self.resource.snapshot()
    }

    /// Applies `update` to a copy of the ensemble and publishes the copy if
    /// the update succeeds and the result validates.
    pub fn update<R, F>(&mut self, update: F) -> Result<R>
    where
        F: FnOnce(&mut DecisionTreeEnsemble) -> Result<R>,
    {
        let current = self.resource.snapshot()?;
        let mut next = DecisionTreeEnsemble::clone(&current);
        let result = update(&mut next)?;
        self.replace(next)?;
        Ok(result)
    }

    /// Replaces the ensemble.
    pub fn replace(&mut self, ensemble: DecisionTreeEnsemble) -> Result<()> {
        ensemble.validate()?;
        let mut current = self.resource.ensemble.write()?;
        *current = Arc::new(ensemble);
        Ok(())
    }
}
