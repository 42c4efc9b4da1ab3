// rtslam_core/src/models/motion/mod.rs

use crate::error::{check_shape, Result};
use crate::types::{Input, Jacobian, State};
use dyn_clone::DynClone;
use nalgebra::DMatrix;
use std::fmt::Debug;

// --- MOTION MODEL TRAIT ---
// Discrete-time kinematics/dynamics of a robot. `x_new = f(x, u, dt)`

/// The one extension point every robot type implements.
///
/// A motion model predicts the robot state one step of length `dt` ahead,
/// from the current state `x` and control `u`, and returns the Jacobians used
/// to linearize the uncertainty propagation around that operating point.
///
/// Implementations must be pure: they read `x`, `u` and `dt` and must not
/// depend on, or mutate, anything else.
pub trait MotionModel: DynClone + Debug + Send + Sync {
    /// Length of the state vector `x`.
    fn state_dim(&self) -> usize;

    /// Length of the control vector `u`.
    fn control_dim(&self) -> usize;

    /// Predicts the new state and computes the Jacobians at the current operating point.
    ///
    /// # Arguments
    /// * `x`: Current state vector.
    /// * `u`: Control vector, assumed constant over `dt`.
    /// * `dt`: Time interval to predict over.
    ///
    /// # Returns
    /// A [`MotionPrediction`] holding `x_new` (`n`), `XNEW_x` (`n x n`) and `XNEW_u` (`n x m`).
    fn move_func(&self, x: &State, u: &Input, dt: f64) -> MotionPrediction;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn MotionModel>`.
dyn_clone::clone_trait_object!(MotionModel);

/// Output of [`MotionModel::move_func`].
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPrediction {
    /// Predicted state.
    pub x_new: State,
    /// Jacobian of `x_new` with respect to the state.
    pub xnew_x: Jacobian,
    /// Jacobian of `x_new` with respect to the control.
    pub xnew_u: Jacobian,
}

impl MotionPrediction {
    /// Verifies that all three outputs have the shapes implied by the given dimensions.
    pub fn check_shapes(&self, state_dim: usize, control_dim: usize) -> Result<()> {
        check_shape("predicted state", (state_dim, 1), self.x_new.shape())?;
        check_shape("XNEW_x", (state_dim, state_dim), self.xnew_x.shape())?;
        check_shape("XNEW_u", (state_dim, control_dim), self.xnew_u.shape())
    }
}

/// Forward-difference step used by [`finite_difference_jacobians`] when none is given.
pub const DEFAULT_JACOBIAN_EPSILON: f64 = 1e-7;

/// Approximates the Jacobians of `f(x, u)` with respect to `x` and `u` by forward differences.
///
/// Meant for models whose analytic Jacobians are impractical to derive.
/// The returned pair is `(df/dx, df/du)`.
pub fn finite_difference_jacobians<F>(f: F, x: &State, u: &Input, epsilon: f64) -> (Jacobian, Jacobian)
where
    F: Fn(&State, &Input) -> State,
{
    let base = f(x, u);
    let out_dim = base.len();

    let mut f_x = DMatrix::zeros(out_dim, x.len());
    for j in 0..x.len() {
        let mut x_perturbed = x.clone();
        x_perturbed[j] += epsilon;
        let column = (f(&x_perturbed, u) - &base) / epsilon;
        f_x.column_mut(j).copy_from(&column);
    }

    let mut f_u = DMatrix::zeros(out_dim, u.len());
    for j in 0..u.len() {
        let mut u_perturbed = u.clone();
        u_perturbed[j] += epsilon;
        let column = (f(x, &u_perturbed) - &base) / epsilon;
        f_u.column_mut(j).copy_from(&column);
    }

    (f_x, f_u)
}

pub mod continuous;
pub mod linear;

pub use continuous::{ContinuousDynamics, EulerDiscretization, VelocityIntegrator};
pub use linear::LinearMotion;
