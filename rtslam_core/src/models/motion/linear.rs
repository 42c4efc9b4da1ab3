// rtslam_core/src/models/motion/linear.rs

use crate::error::{check_dim, check_shape, Result};
use crate::models::motion::{MotionModel, MotionPrediction};
use crate::types::{Input, Jacobian, State};

/// A linear time-invariant motion model: `x_new = F * x + B * u * dt`.
///
/// The Jacobians are exact: `XNEW_x = F` and `XNEW_u = B * dt`.
#[derive(Debug, Clone)]
pub struct LinearMotion {
    transition: Jacobian,
    input: Jacobian,
}

impl LinearMotion {
    /// Builds the model from the transition matrix `F` (`n x n`) and input matrix `B` (`n x m`).
    pub fn new(transition: Jacobian, input: Jacobian) -> Result<Self> {
        let n = transition.nrows();
        check_shape("transition matrix", (n, n), transition.shape())?;
        check_dim("input matrix rows", n, input.nrows())?;
        Ok(Self { transition, input })
    }

    /// `x_new = x + u * dt` for a state and control of the same size.
    pub fn integrator(size: usize) -> Self {
        Self {
            transition: Jacobian::identity(size, size),
            input: Jacobian::identity(size, size),
        }
    }

    pub fn transition(&self) -> &Jacobian {
        &self.transition
    }

    pub fn input(&self) -> &Jacobian {
        &self.input
    }
}

impl MotionModel for LinearMotion {
    fn state_dim(&self) -> usize {
        self.transition.nrows()
    }

    fn control_dim(&self) -> usize {
        self.input.ncols()
    }

    fn move_func(&self, x: &State, u: &Input, dt: f64) -> MotionPrediction {
        let xnew_u = &self.input * dt;
        MotionPrediction {
            x_new: &self.transition * x + &xnew_u * u,
            xnew_x: self.transition.clone(),
            xnew_u,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn rejects_mismatched_matrices() {
        assert!(LinearMotion::new(DMatrix::identity(2, 3), DMatrix::zeros(2, 1)).is_err());
        assert!(LinearMotion::new(DMatrix::identity(2, 2), DMatrix::zeros(3, 1)).is_err());
    }

    #[test]
    fn constant_velocity_step() {
        // x = [p, v], u = [a]
        let f = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let model = LinearMotion::new(f, b).unwrap();
        assert_eq!(model.state_dim(), 2);
        assert_eq!(model.control_dim(), 1);

        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![4.0]);
        let prediction = model.move_func(&x, &u, 0.5);

        prediction.check_shapes(2, 1).unwrap();
        assert_abs_diff_eq!(prediction.x_new[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.x_new[1], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(prediction.xnew_u[(1, 0)], 0.5, epsilon = 1e-12);
        assert_eq!(prediction.xnew_x, *model.transition());
    }

    #[test]
    fn integrator_adds_scaled_input() {
        let model = LinearMotion::integrator(1);
        let prediction = model.move_func(
            &DVector::from_element(1, 0.0),
            &DVector::from_element(1, 1.0),
            1.0,
        );
        assert_eq!(prediction.x_new[0], 1.0);
        assert_eq!(prediction.xnew_x[(0, 0)], 1.0);
        assert_eq!(prediction.xnew_u[(0, 0)], 1.0);
    }
}
