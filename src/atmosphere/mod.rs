//! Environmental state read by the simulation.
//!
//! Currently only wind. [`WindState`] is edited by tooling or configuration
//! and passed by value into every vegetation tick.

pub mod wind;

pub use wind::WindState;
