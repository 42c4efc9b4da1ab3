// rtslam_core/src/gaussian.rs

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{check_dim, check_shape, Result};

/// A mean vector `x` with its covariance matrix `P`.
///
/// `P` is expected to be symmetric positive-semidefinite. This is not enforced
/// on construction; consumers treat a violation as a caller bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    x: DVector<f64>,
    p: DMatrix<f64>,
}

impl Gaussian {
    /// Creates a Gaussian of the given size with zero mean and zero covariance.
    pub fn new(size: usize) -> Self {
        Self {
            x: DVector::zeros(size),
            p: DMatrix::zeros(size, size),
        }
    }

    /// Bundles an existing mean and covariance, checking that `P` is `n x n`.
    pub fn from_parts(x: DVector<f64>, p: DMatrix<f64>) -> Result<Self> {
        check_shape("gaussian covariance", (x.len(), x.len()), p.shape())?;
        Ok(Self { x, p })
    }

    /// Convenience constructor for an uncorrelated Gaussian.
    pub fn from_diagonal(x: DVector<f64>, variances: &DVector<f64>) -> Result<Self> {
        check_dim("gaussian variances", x.len(), variances.len())?;
        let p = DMatrix::from_diagonal(variances);
        Ok(Self { x, p })
    }

    /// Returns the dimension `n` of the mean vector.
    pub fn size(&self) -> usize {
        self.x.len()
    }

    pub fn x(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Replaces the mean. The new mean must keep the same dimension.
    pub fn set_x(&mut self, x: DVector<f64>) -> Result<()> {
        check_dim("gaussian mean", self.size(), x.len())?;
        self.x = x;
        Ok(())
    }

    /// Replaces the covariance. The new matrix must be `n x n`.
    pub fn set_p(&mut self, p: DMatrix<f64>) -> Result<()> {
        check_shape("gaussian covariance", (self.size(), self.size()), p.shape())?;
        self.p = p;
        Ok(())
    }

    /// Square roots of the diagonal of `P`.
    pub fn std_devs(&self) -> DVector<f64> {
        self.p.diagonal().map(|v| v.max(0.0).sqrt())
    }

    /// Forces `P` to be exactly symmetric: `P = (P + P^T) / 2`.
    pub fn symmetrize(&mut self) {
        self.p = (&self.p + self.p.transpose()) * 0.5;
    }

    // Unchecked writer for callers that already validated shapes.
    pub(crate) fn replace(&mut self, x: DVector<f64>, p: DMatrix<f64>) {
        debug_assert_eq!(x.len(), self.size());
        debug_assert_eq!(p.shape(), (self.size(), self.size()));
        self.x = x;
        self.p = p;
    }
}

impl fmt::Display for Gaussian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: [")?;
        for (i, v) in self.x.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.6}", v)?;
        }
        write!(f, "], sigma: [")?;
        for (i, v) in self.std_devs().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.6}", v)?;
        }
        write!(f, "]")
    }
}
