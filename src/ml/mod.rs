//! Network definition and training for the distilled energy regressor.
//!
//! The topology is fixed by the artifact contract; only the parameter values
//! vary between runs.

pub mod metrics;
pub mod network;
pub mod train;
