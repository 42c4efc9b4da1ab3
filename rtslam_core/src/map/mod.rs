// rtslam_core/src/map/mod.rs

//! The joint state of the filter and the map that owns it.
//!
//! Every map-resident object (robot, landmark...) owns a contiguous slot in a
//! single joint state vector, and the map owns the full joint covariance. Robots
//! never touch that matrix directly: they hand their linearization to
//! [`JointMap::propagate`], which keeps one writer on the shared covariance.

use crate::error::Result;
use crate::gaussian::Gaussian;
use crate::types::{Jacobian, MapId, ObjectHandle, Slot, State};
use nalgebra::DMatrix;

// --- The Map Trait ("Contract") ---
/// What the robot propagator needs from the map it lives in.
pub trait JointMap {
    /// Identifies this map instance.
    fn id(&self) -> MapId;

    /// Where `object`'s state lives in the joint state vector.
    fn slot(&self, object: ObjectHandle) -> Result<Slot>;

    /// The current mean of `object`'s state.
    fn mean(&self, object: ObjectHandle) -> Result<State>;

    /// The marginal Gaussian of `object`: its mean and its own covariance block.
    fn marginal(&self, object: ObjectHandle) -> Result<Gaussian>;

    /// Propagates `object` through a linearized step.
    ///
    /// Writes `x_new` as the object's mean and updates the covariance with
    /// - own block: `P_oo = J * P_oo * J^T + noise`
    /// - cross blocks with every other object: `P_om = J * P_om` (and its transpose).
    ///
    /// Cross blocks receive no additive noise. Shapes are validated before any write.
    fn propagate(
        &mut self,
        object: ObjectHandle,
        x_new: &State,
        jacobian: &Jacobian,
        noise: &DMatrix<f64>,
    ) -> Result<()>;
}

mod joint_state;
mod slam_map;

pub use joint_state::JointState;
pub use slam_map::SlamMap;
