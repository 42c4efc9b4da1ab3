// rtslam_core/src/control.rs

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{check_dim, check_shape, FilterError, Result};
use crate::gaussian::Gaussian;

/// A discrete-time control input: a Gaussian plus the time interval it spans.
///
/// The mean is the deterministic part of the control, the covariance encodes
/// the random perturbation. Motion models are often specified in continuous
/// time, so the control can also hold continuous-time mean and covariance and
/// convert them into discrete values for a given `dt`.
///
/// Conversions are never re-applied implicitly: changing `dt` leaves the
/// discrete values as they were until one of the `convert_*` methods is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    gaussian: Gaussian,
    /// Time interval covered by this control.
    pub dt: f64,
    /// Continuous-time control vector, present once set.
    x_ct: Option<DVector<f64>>,
    /// Continuous-time perturbation covariance, present once set.
    p_ct: Option<DMatrix<f64>>,
}

impl Control {
    /// Zero control of the given size with `dt = 1`.
    pub fn new(size: usize) -> Self {
        Self::from_gaussian(Gaussian::new(size))
    }

    pub fn from_gaussian(gaussian: Gaussian) -> Self {
        Self::from_gaussian_with_dt(gaussian, 1.0)
    }

    pub fn from_gaussian_with_dt(gaussian: Gaussian, dt: f64) -> Self {
        Self {
            gaussian,
            dt,
            x_ct: None,
            p_ct: None,
        }
    }

    pub fn size(&self) -> usize {
        self.gaussian.size()
    }

    pub fn gaussian(&self) -> &Gaussian {
        &self.gaussian
    }

    /// Discrete control mean.
    pub fn x(&self) -> &DVector<f64> {
        self.gaussian.x()
    }

    /// Discrete perturbation covariance.
    pub fn p(&self) -> &DMatrix<f64> {
        self.gaussian.p()
    }

    pub fn set_x(&mut self, x: DVector<f64>) -> Result<()> {
        self.gaussian.set_x(x)
    }

    pub fn set_p(&mut self, p: DMatrix<f64>) -> Result<()> {
        self.gaussian.set_p(p)
    }

    pub fn continuous_mean(&self) -> Option<&DVector<f64>> {
        self.x_ct.as_ref()
    }

    pub fn continuous_covariance(&self) -> Option<&DMatrix<f64>> {
        self.p_ct.as_ref()
    }

    /// Stores a continuous-time perturbation covariance.
    /// The discrete covariance is left untouched.
    pub fn set_continuous_covariance(&mut self, p_ct: DMatrix<f64>) -> Result<()> {
        check_shape(
            "continuous-time covariance",
            (self.size(), self.size()),
            p_ct.shape(),
        )?;
        self.p_ct = Some(p_ct);
        Ok(())
    }

    /// Stores a continuous-time control vector.
    /// The discrete mean is left untouched.
    pub fn set_continuous_mean(&mut self, x_ct: DVector<f64>) -> Result<()> {
        check_dim("continuous-time mean", self.size(), x_ct.len())?;
        self.x_ct = Some(x_ct);
        Ok(())
    }

    /// Discrete perturbation from the stored continuous covariance: `P = P_ct * dt`.
    ///
    /// White noise variance grows linearly with the integration interval.
    /// `self.dt` is not modified.
    pub fn convert_covariance_from_continuous(&mut self, dt: f64) -> Result<()> {
        let p_ct = self
            .p_ct
            .as_ref()
            .ok_or(FilterError::NotInitialized("continuous-time covariance"))?;
        let p = p_ct * dt;
        self.gaussian.set_p(p)
    }

    /// Stores `p_ct` as the continuous covariance, then converts it for `dt`.
    pub fn convert_covariance_from_continuous_with(
        &mut self,
        p_ct: DMatrix<f64>,
        dt: f64,
    ) -> Result<()> {
        self.set_continuous_covariance(p_ct)?;
        self.convert_covariance_from_continuous(dt)
    }

    /// Discrete control and perturbation from the stored continuous values:
    /// `x = x_ct * dt`, `P = P_ct * dt`, and records `dt`.
    ///
    /// Both continuous values must have been set.
    pub fn convert_from_continuous(&mut self, dt: f64) -> Result<()> {
        let x_ct = self
            .x_ct
            .as_ref()
            .ok_or(FilterError::NotInitialized("continuous-time mean"))?;
        let p_ct = self
            .p_ct
            .as_ref()
            .ok_or(FilterError::NotInitialized("continuous-time covariance"))?;

        let x = x_ct * dt;
        let p = p_ct * dt;
        self.gaussian.replace(x, p);
        self.dt = dt;
        Ok(())
    }

    /// Takes continuous mean and covariance from `continuous`, stores them, and
    /// converts for `dt` as in [`Control::convert_from_continuous`].
    pub fn convert_from_continuous_with(&mut self, continuous: &Gaussian, dt: f64) -> Result<()> {
        check_dim("continuous-time gaussian", self.size(), continuous.size())?;
        self.p_ct = Some(continuous.p().clone());
        self.x_ct = Some(continuous.x().clone());
        self.convert_from_continuous(dt)
    }
}

impl From<Gaussian> for Control {
    fn from(gaussian: Gaussian) -> Self {
        Self::from_gaussian(gaussian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scalar(v: f64) -> DVector<f64> {
        DVector::from_element(1, v)
    }

    fn scalar_cov(v: f64) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, v)
    }

    #[test]
    fn defaults_to_unit_interval() {
        let c = Control::new(2);
        assert_eq!(c.dt, 1.0);
        assert_eq!(c.size(), 2);
        assert!(c.continuous_mean().is_none());
        assert!(c.continuous_covariance().is_none());

        let c = Control::from_gaussian_with_dt(Gaussian::new(2), 0.1);
        assert_eq!(c.dt, 0.1);
    }

    #[test]
    fn setting_continuous_values_checks_dimension() {
        let mut c = Control::new(2);
        assert_eq!(
            c.set_continuous_covariance(DMatrix::identity(3, 3)),
            Err(FilterError::DimensionMismatch {
                what: "continuous-time covariance",
                expected: 2,
                actual: 3
            })
        );
        assert!(c.set_continuous_mean(DVector::zeros(1)).is_err());
        assert!(c.continuous_covariance().is_none());
        assert!(c.continuous_mean().is_none());
    }

    #[test]
    fn setting_continuous_covariance_leaves_discrete_untouched() {
        let mut c = Control::new(1);
        c.set_continuous_covariance(scalar_cov(0.5)).unwrap();
        assert_eq!(c.p()[(0, 0)], 0.0);
    }

    #[test]
    fn covariance_conversion_requires_continuous_covariance() {
        let mut c = Control::new(1);
        assert_eq!(
            c.convert_covariance_from_continuous(0.1),
            Err(FilterError::NotInitialized("continuous-time covariance"))
        );
    }

    #[test]
    fn covariance_scales_linearly_with_dt() {
        let mut c = Control::new(2);
        let p_ct = DMatrix::from_row_slice(2, 2, &[0.3, 0.1, 0.1, 0.2]);
        c.set_continuous_covariance(p_ct).unwrap();

        c.convert_covariance_from_continuous(0.2).unwrap();
        let p1 = c.p() / 0.2;
        c.convert_covariance_from_continuous(3.0).unwrap();
        let p2 = c.p() / 3.0;

        for (a, b) in p1.iter().zip(p2.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        // Only the full conversion records dt.
        assert_eq!(c.dt, 1.0);
    }

    #[test]
    fn covariance_conversion_with_explicit_matrix() {
        let mut c = Control::new(1);
        c.convert_covariance_from_continuous_with(scalar_cov(0.04), 2.0)
            .unwrap();
        assert_abs_diff_eq!(c.p()[(0, 0)], 0.08, epsilon = 1e-12);
        assert_eq!(c.continuous_covariance(), Some(&scalar_cov(0.04)));

        assert!(c
            .convert_covariance_from_continuous_with(DMatrix::zeros(2, 2), 1.0)
            .is_err());
        assert_abs_diff_eq!(c.p()[(0, 0)], 0.08, epsilon = 1e-12);
    }

    #[test]
    fn full_conversion_requires_continuous_mean() {
        let mut c = Control::new(1);
        c.set_continuous_covariance(scalar_cov(0.1)).unwrap();
        assert_eq!(
            c.convert_from_continuous(0.5),
            Err(FilterError::NotInitialized("continuous-time mean"))
        );
        assert_eq!(c.dt, 1.0);
    }

    #[test]
    fn full_conversion_requires_continuous_covariance() {
        let mut c = Control::new(1);
        c.set_continuous_mean(scalar(2.0)).unwrap();
        assert_eq!(
            c.convert_from_continuous(0.5),
            Err(FilterError::NotInitialized("continuous-time covariance"))
        );
        assert_eq!(c.x()[0], 0.0);
    }

    #[test]
    fn full_conversion_integrates_mean_and_covariance() {
        let mut c = Control::new(1);
        c.set_continuous_mean(scalar(2.0)).unwrap();
        c.set_continuous_covariance(scalar_cov(0.04)).unwrap();

        c.convert_from_continuous(0.5).unwrap();

        assert_abs_diff_eq!(c.x()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.p()[(0, 0)], 0.02, epsilon = 1e-12);
        assert_eq!(c.dt, 0.5);
    }

    #[test]
    fn conversion_is_not_reapplied_when_dt_changes() {
        let mut c = Control::new(1);
        c.set_continuous_mean(scalar(2.0)).unwrap();
        c.set_continuous_covariance(scalar_cov(0.04)).unwrap();
        c.convert_from_continuous(0.5).unwrap();

        c.dt = 2.0;
        assert_abs_diff_eq!(c.x()[0], 1.0, epsilon = 1e-12);

        c.convert_from_continuous(c.dt).unwrap();
        assert_abs_diff_eq!(c.x()[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.p()[(0, 0)], 0.08, epsilon = 1e-12);
    }

    #[test]
    fn conversion_from_external_gaussian() {
        let mut c = Control::new(2);
        let continuous = Gaussian::from_diagonal(
            DVector::from_vec(vec![1.0, -2.0]),
            &DVector::from_vec(vec![0.1, 0.4]),
        )
        .unwrap();

        c.convert_from_continuous_with(&continuous, 0.1).unwrap();

        assert_abs_diff_eq!(c.x()[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(c.x()[1], -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(c.p()[(1, 1)], 0.04, epsilon = 1e-12);
        assert_eq!(c.dt, 0.1);
        assert_eq!(c.continuous_mean(), Some(continuous.x()));
    }

    #[test]
    fn conversion_from_external_gaussian_checks_size() {
        let mut c = Control::new(2);
        let err = c
            .convert_from_continuous_with(&Gaussian::new(3), 0.1)
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                what: "continuous-time gaussian",
                expected: 2,
                actual: 3
            }
        );
        assert!(c.continuous_mean().is_none());
    }
}
