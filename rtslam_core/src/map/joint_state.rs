// rtslam_core/src/map/joint_state.rs

use log::trace;
use nalgebra::{DMatrix, DVector};

use crate::error::{check_dim, check_shape, FilterError, Result};
use crate::gaussian::Gaussian;
use crate::map::JointMap;
use crate::types::{Jacobian, MapId, ObjectHandle, Slot, State};

/// The joint state vector and joint covariance of one map.
///
/// Slots are allocated contiguously in insertion order.
#[derive(Debug, Clone)]
pub struct JointState {
    id: MapId,
    x: DVector<f64>,
    p: DMatrix<f64>,
    slots: Vec<Slot>,
}

impl JointState {
    pub fn new(id: MapId) -> Self {
        Self {
            id,
            x: DVector::zeros(0),
            p: DMatrix::zeros(0, 0),
            slots: Vec::new(),
        }
    }

    /// Appends a slot for a new object initialized from `initial`, uncorrelated
    /// with everything already in the map.
    pub fn allocate(&mut self, initial: &Gaussian) -> ObjectHandle {
        let slot = Slot::new(self.x.len(), initial.size());
        let total = slot.end();

        let x = std::mem::replace(&mut self.x, DVector::zeros(0));
        self.x = x.resize_vertically(total, 0.0);
        let p = std::mem::replace(&mut self.p, DMatrix::zeros(0, 0));
        self.p = p.resize(total, total, 0.0);

        self.x.rows_mut(slot.start, slot.size).copy_from(initial.x());
        self.p
            .view_mut((slot.start, slot.start), (slot.size, slot.size))
            .copy_from(initial.p());

        self.slots.push(slot);
        ObjectHandle(self.slots.len() - 1)
    }

    /// Length of the joint state vector.
    pub fn size(&self) -> usize {
        self.x.len()
    }

    pub fn object_count(&self) -> usize {
        self.slots.len()
    }

    pub fn x(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// The covariance block between objects `a` (rows) and `b` (columns).
    pub fn cross_covariance(&self, a: ObjectHandle, b: ObjectHandle) -> Result<DMatrix<f64>> {
        let sa = self.slot(a)?;
        let sb = self.slot(b)?;
        Ok(self
            .p
            .view((sa.start, sb.start), (sa.size, sb.size))
            .clone_owned())
    }

    /// Writes the covariance block between two distinct objects, and its transpose.
    pub fn set_cross_covariance(
        &mut self,
        a: ObjectHandle,
        b: ObjectHandle,
        block: &DMatrix<f64>,
    ) -> Result<()> {
        let sa = self.slot(a)?;
        let sb = self.slot(b)?;
        if a == b {
            return Err(FilterError::SelfCorrelation(a));
        }
        check_shape("cross covariance", (sa.size, sb.size), block.shape())?;
        self.p
            .view_mut((sa.start, sb.start), (sa.size, sb.size))
            .copy_from(block);
        self.p
            .view_mut((sb.start, sa.start), (sb.size, sa.size))
            .copy_from(&block.transpose());
        Ok(())
    }
}

impl JointMap for JointState {
    fn id(&self) -> MapId {
        self.id
    }

    fn slot(&self, object: ObjectHandle) -> Result<Slot> {
        self.slots
            .get(object.0)
            .copied()
            .ok_or(FilterError::UnknownObject(object))
    }

    fn mean(&self, object: ObjectHandle) -> Result<State> {
        let slot = self.slot(object)?;
        Ok(self.x.rows(slot.start, slot.size).clone_owned())
    }

    fn marginal(&self, object: ObjectHandle) -> Result<Gaussian> {
        let slot = self.slot(object)?;
        let x = self.x.rows(slot.start, slot.size).clone_owned();
        let p = self
            .p
            .view((slot.start, slot.start), (slot.size, slot.size))
            .clone_owned();
        Gaussian::from_parts(x, p)
    }

    fn propagate(
        &mut self,
        object: ObjectHandle,
        x_new: &State,
        jacobian: &Jacobian,
        noise: &DMatrix<f64>,
    ) -> Result<()> {
        let slot = self.slot(object)?;
        let (s, k) = (slot.start, slot.size);
        check_dim("propagated mean", k, x_new.len())?;
        check_shape("propagation jacobian", (k, k), jacobian.shape())?;
        check_shape("process noise", (k, k), noise.shape())?;

        // Rows of the object against everything: [P_om | P_oo | P_om'] -> J * rows.
        let rows = self.p.rows(s, k).clone_owned();
        let mut new_rows = jacobian * rows;

        // Own block: (J * P_oo) * J^T + Q, kept exactly symmetric.
        let own = new_rows.columns(s, k) * jacobian.transpose() + noise;
        let own = (&own + own.transpose()) * 0.5;
        new_rows.columns_mut(s, k).copy_from(&own);

        trace!("propagated block of {:?}: {}", object, own);

        self.p.rows_mut(s, k).copy_from(&new_rows);
        self.p.columns_mut(s, k).copy_from(&new_rows.transpose());
        self.x.rows_mut(s, k).copy_from(x_new);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gaussian(x: &[f64], var: &[f64]) -> Gaussian {
        Gaussian::from_diagonal(DVector::from_row_slice(x), &DVector::from_row_slice(var))
            .unwrap()
    }

    #[test]
    fn allocation_appends_contiguous_slots() {
        let mut joint = JointState::new(MapId(1));
        let a = joint.allocate(&gaussian(&[1.0, 2.0], &[0.1, 0.2]));
        let b = joint.allocate(&gaussian(&[3.0], &[0.3]));

        assert_eq!(joint.size(), 3);
        assert_eq!(joint.object_count(), 2);
        assert_eq!(joint.slot(a).unwrap(), Slot::new(0, 2));
        assert_eq!(joint.slot(b).unwrap(), Slot::new(2, 1));
        assert_eq!(joint.mean(b).unwrap()[0], 3.0);
        assert_eq!(joint.p()[(1, 1)], 0.2);
        assert_eq!(joint.p()[(2, 2)], 0.3);
        assert_eq!(joint.cross_covariance(a, b).unwrap(), DMatrix::zeros(2, 1));
    }

    #[test]
    fn cross_covariance_is_written_symmetrically() {
        let mut joint = JointState::new(MapId(1));
        let a = joint.allocate(&gaussian(&[0.0, 0.0], &[1.0, 1.0]));
        let b = joint.allocate(&gaussian(&[0.0], &[1.0]));
        let block = DMatrix::from_row_slice(2, 1, &[0.1, 0.2]);

        joint.set_cross_covariance(a, b, &block).unwrap();

        assert_eq!(joint.cross_covariance(a, b).unwrap(), block);
        assert_eq!(joint.cross_covariance(b, a).unwrap(), block.transpose());
        assert_eq!(
            joint.set_cross_covariance(a, a, &DMatrix::zeros(2, 2)),
            Err(FilterError::SelfCorrelation(a))
        );
        assert!(joint.set_cross_covariance(a, b, &DMatrix::zeros(1, 2)).is_err());
    }

    #[test]
    fn unknown_object_is_reported() {
        let joint = JointState::new(MapId(1));
        assert_eq!(
            joint.mean(ObjectHandle(0)).unwrap_err(),
            FilterError::UnknownObject(ObjectHandle(0))
        );
    }

    #[test]
    fn propagation_scales_cross_terms_and_adds_noise_to_own_block() {
        let mut joint = JointState::new(MapId(1));
        let landmark = joint.allocate(&gaussian(&[5.0], &[1.0]));
        let robot = joint.allocate(&gaussian(&[0.0], &[0.5]));
        joint
            .set_cross_covariance(robot, landmark, &DMatrix::from_element(1, 1, 0.2))
            .unwrap();

        let j = DMatrix::from_element(1, 1, 2.0);
        let q = DMatrix::from_element(1, 1, 0.1);
        joint
            .propagate(robot, &DVector::from_element(1, 1.5), &j, &q)
            .unwrap();

        assert_abs_diff_eq!(joint.x()[1], 1.5, epsilon = 1e-12);
        // 2 * 0.5 * 2 + 0.1
        assert_abs_diff_eq!(joint.p()[(1, 1)], 2.1, epsilon = 1e-12);
        // 2 * 0.2, no noise on cross terms
        assert_abs_diff_eq!(joint.p()[(1, 0)], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(joint.p()[(0, 1)], 0.4, epsilon = 1e-12);
        // Other objects untouched.
        assert_abs_diff_eq!(joint.p()[(0, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(joint.mean(landmark).unwrap()[0], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn propagation_rejects_bad_shapes_without_writing() {
        let mut joint = JointState::new(MapId(1));
        let robot = joint.allocate(&gaussian(&[0.0, 0.0], &[0.5, 0.5]));
        let before = joint.clone();

        let err = joint
            .propagate(
                robot,
                &DVector::zeros(2),
                &DMatrix::identity(2, 2),
                &DMatrix::zeros(3, 3),
            )
            .unwrap_err();

        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                what: "process noise",
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(joint.x(), before.x());
        assert_eq!(joint.p(), before.p());
    }
}
