// rtslam_core/src/lib.rs

//! State-estimation core of a real-time localization-and-mapping filter.
//!
//! A [`robot::Robot`] holds its pose and control Gaussians and a
//! [`models::motion::MotionModel`]. Each prediction step runs the model,
//! maps the control perturbation into state space and asks the owning
//! [`map::JointMap`] to propagate the robot's covariance block together with
//! its cross-covariances against every other map object.

pub mod control;
pub mod error;
pub mod gaussian;
pub mod map;
pub mod models;
pub mod prelude;
pub mod robot;
pub mod sensor;
pub mod types;
