// rtslam_core/src/models/motion/continuous.rs

use crate::models::motion::{
    finite_difference_jacobians, MotionModel, MotionPrediction, DEFAULT_JACOBIAN_EPSILON,
};
use crate::types::{Input, Jacobian, State};
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A continuous-time model `x_dot = f(x, u)`.
///
/// Wrap it in [`EulerDiscretization`] to obtain a discrete [`MotionModel`].
pub trait ContinuousDynamics: DynClone + Debug + Send + Sync {
    fn state_dim(&self) -> usize;

    fn control_dim(&self) -> usize;

    /// Computes the time derivative of the state vector.
    fn derivatives(&self, x: &State, u: &Input) -> State;

    /// Jacobians `(A, B)` of the derivatives: `A = df/dx` (`n x n`), `B = df/du` (`n x m`).
    ///
    /// Defaults to forward differences; models with a closed form should override it.
    fn jacobians(&self, x: &State, u: &Input) -> (Jacobian, Jacobian) {
        finite_difference_jacobians(
            |x, u| self.derivatives(x, u),
            x,
            u,
            DEFAULT_JACOBIAN_EPSILON,
        )
    }
}

dyn_clone::clone_trait_object!(ContinuousDynamics);

/// First-order discretization of a continuous model:
/// `x_new = x + f(x, u) * dt`, `XNEW_x = I + A * dt`, `XNEW_u = B * dt`.
#[derive(Debug, Clone)]
pub struct EulerDiscretization<D> {
    pub dynamics: D,
}

impl<D: ContinuousDynamics + Clone> EulerDiscretization<D> {
    pub fn new(dynamics: D) -> Self {
        Self { dynamics }
    }
}

impl<D: ContinuousDynamics + Clone> MotionModel for EulerDiscretization<D> {
    fn state_dim(&self) -> usize {
        self.dynamics.state_dim()
    }

    fn control_dim(&self) -> usize {
        self.dynamics.control_dim()
    }

    fn move_func(&self, x: &State, u: &Input, dt: f64) -> MotionPrediction {
        let n = x.len();
        let x_dot = self.dynamics.derivatives(x, u);
        let (a_jac, b_jac) = self.dynamics.jacobians(x, u);

        if x_dot.len() != n || a_jac.shape() != (n, n) {
            // Malformed dynamics: pass the raw outputs on so `check_shapes` reports them.
            return MotionPrediction {
                x_new: x_dot,
                xnew_x: a_jac,
                xnew_u: b_jac * dt,
            };
        }

        MotionPrediction {
            x_new: x + x_dot * dt,
            xnew_x: Jacobian::identity(n, n) + a_jac * dt,
            xnew_u: b_jac * dt,
        }
    }
}

/// Position driven directly by a velocity input: `x_dot = u`.
#[derive(Debug, Clone)]
pub struct VelocityIntegrator {
    /// Number of position axes. State and control both have this length.
    pub axes: usize,
}

impl ContinuousDynamics for VelocityIntegrator {
    fn state_dim(&self) -> usize {
        self.axes
    }

    fn control_dim(&self) -> usize {
        self.axes
    }

    fn derivatives(&self, _x: &State, u: &Input) -> State {
        u.clone()
    }

    fn jacobians(&self, _x: &State, _u: &Input) -> (Jacobian, Jacobian) {
        (
            Jacobian::zeros(self.axes, self.axes),
            Jacobian::identity(self.axes, self.axes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::gaussian::Gaussian;
    use crate::map::JointState;
    use crate::robot::Robot;
    use crate::types::{MapId, MapLink};
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    /// Planar unicycle, `x = [px, py, yaw]`, `u = [v, w]`. Uses the numerical Jacobians.
    #[derive(Debug, Clone)]
    struct Unicycle;

    impl ContinuousDynamics for Unicycle {
        fn state_dim(&self) -> usize {
            3
        }

        fn control_dim(&self) -> usize {
            2
        }

        fn derivatives(&self, x: &State, u: &Input) -> State {
            DVector::from_vec(vec![u[0] * x[2].cos(), u[0] * x[2].sin(), u[1]])
        }
    }

    /// Returns a derivative one entry short of its declared state.
    #[derive(Debug, Clone)]
    struct Truncated;

    impl ContinuousDynamics for Truncated {
        fn state_dim(&self) -> usize {
            2
        }

        fn control_dim(&self) -> usize {
            1
        }

        fn derivatives(&self, _x: &State, u: &Input) -> State {
            u.clone()
        }

        fn jacobians(&self, _x: &State, _u: &Input) -> (Jacobian, Jacobian) {
            (Jacobian::zeros(3, 3), Jacobian::zeros(2, 1))
        }
    }

    #[test]
    fn malformed_dynamics_are_reported_not_panicked() {
        let model = EulerDiscretization::new(Truncated);
        let prediction = model.move_func(&DVector::zeros(2), &DVector::zeros(1), 0.1);

        assert_eq!(
            prediction.check_shapes(2, 1),
            Err(FilterError::DimensionMismatch {
                what: "predicted state",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn malformed_dynamics_fail_a_robot_step() {
        let mut robot = Robot::new(
            "truncated",
            Box::new(EulerDiscretization::new(Truncated)),
            Gaussian::new(2),
        )
        .unwrap();
        let mut map = JointState::new(MapId(0));
        let object = map.allocate(robot.pose());
        robot.link_to_map(MapLink {
            map: MapId(0),
            object,
        });

        assert!(matches!(
            robot.predict(&mut map),
            Err(FilterError::DimensionMismatch { .. })
        ));
        assert_eq!(map.x(), &DVector::zeros(2));
    }

    #[test]
    fn euler_step_of_velocity_integrator() {
        let model = EulerDiscretization::new(VelocityIntegrator { axes: 2 });
        let x = DVector::from_vec(vec![1.0, -1.0]);
        let u = DVector::from_vec(vec![0.5, 2.0]);

        let prediction = model.move_func(&x, &u, 0.2);

        prediction.check_shapes(2, 2).unwrap();
        assert_abs_diff_eq!(prediction.x_new[0], 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.x_new[1], -0.6, epsilon = 1e-12);
        assert_eq!(prediction.xnew_x, Jacobian::identity(2, 2));
        assert_abs_diff_eq!(prediction.xnew_u[(1, 1)], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.xnew_u[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn euler_step_with_numerical_jacobians() {
        let model = EulerDiscretization::new(Unicycle);
        let x = DVector::from_vec(vec![0.0, 0.0, std::f64::consts::FRAC_PI_2]);
        let u = DVector::from_vec(vec![1.0, 0.1]);
        let dt = 0.5;

        let prediction = model.move_func(&x, &u, dt);

        prediction.check_shapes(3, 2).unwrap();
        assert_abs_diff_eq!(prediction.x_new[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.x_new[1], 0.5, epsilon = 1e-12);
        // d(px_new)/d(yaw) = -v sin(yaw) dt
        assert_abs_diff_eq!(prediction.xnew_x[(0, 2)], -0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(prediction.xnew_x[(2, 2)], 1.0, epsilon = 1e-5);
        // d(py_new)/d(v) = sin(yaw) dt
        assert_abs_diff_eq!(prediction.xnew_u[(1, 0)], 0.5, epsilon = 1e-5);
    }
}
