// rtslam_core/src/error.rs

use crate::types::{MapId, ObjectHandle, RobotHandle, SensorHandle};
use thiserror::Error;

/// Every condition the filter core reports. All of them are raised before
/// the failing operation mutates anything.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    /// A vector or matrix disagrees with the declared size of the entity it is meant for.
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An operation needs continuous-time values that were never set.
    #[error("{0} not initialized")]
    NotInitialized(&'static str),

    #[error("robot '{0}' is not linked to a map")]
    NotLinked(String),

    #[error("robot lives in map {expected:?} but was propagated through map {actual:?}")]
    WrongMap { expected: MapId, actual: MapId },

    #[error("unknown map object {0:?}")]
    UnknownObject(ObjectHandle),

    /// A cross-covariance write named the same object on both sides.
    #[error("cross covariance of {0:?} with itself")]
    SelfCorrelation(ObjectHandle),

    #[error("unknown robot {0:?}")]
    UnknownRobot(RobotHandle),

    #[error("unknown sensor {0:?}")]
    UnknownSensor(SensorHandle),
}

pub type Result<T> = std::result::Result<T, FilterError>;

/// Fails with `DimensionMismatch` unless `actual == expected`.
pub(crate) fn check_dim(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FilterError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Checks that `rows x cols` matches the expected shape, reporting the first offending axis.
pub(crate) fn check_shape(
    what: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    check_dim(what, expected.0, actual.0)?;
    check_dim(what, expected.1, actual.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_sizes() {
        let err = check_dim("control mean", 2, 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dimension mismatch for control mean: expected 2, got 3"
        );
    }

    #[test]
    fn shape_check_reports_column_mismatch() {
        let err = check_shape("XNEW_u", (3, 2), (3, 1)).unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                what: "XNEW_u",
                expected: 2,
                actual: 1
            }
        );
    }
}
