//! Utilities shared by the evaluation code.


pub mod random;
pub mod threading;
