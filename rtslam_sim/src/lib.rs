// rtslam_sim/src/lib.rs

//! Scenario driver for `rtslam_core`.
//!
//! Loads a scenario, builds a [`rtslam_core::map::SlamMap`] from it and runs a
//! fixed number of prediction steps, logging each robot as it moves.

pub mod cli;
pub mod simulation;

pub use simulation::config::ScenarioConfig;
pub use simulation::runner::Simulation;
