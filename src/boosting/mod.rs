//! Tree ensembles and their shared handle.

pub mod ensemble;
pub mod resource;

pub use ensemble::{DecisionTreeEnsemble, GrowingMetadata, TreeMetadata};
pub use resource::{DecisionTreeEnsembleResource, EnsembleView, LockedEnsemble};
