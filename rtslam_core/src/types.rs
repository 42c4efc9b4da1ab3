// rtslam_core/src/types.rs

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Input = DVector<f64>;
pub type Jacobian = DMatrix<f64>;

// --- Core Identifiers ---
// Handles are plain indices into registries owned by the map. Holding one
// never keeps the referenced entity alive.

/// Identifies one map instance, so a robot can tell which map it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct MapId(pub u64);

/// Index of a map-resident object (robot, landmark...) in the map's object registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub usize);

/// Index of a robot in the map's robot arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotHandle(pub usize);

/// Index of a sensor in the map's sensor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorHandle(pub usize);

/// A contiguous range of the joint state vector owned by one map object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// First index of the object's rows in the joint state vector.
    pub start: usize,
    /// Number of state entries.
    pub size: usize,
}

impl Slot {
    pub fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// One past the last index of this slot.
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// The map a robot is resident in, and where its state lives there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLink {
    pub map: MapId,
    pub object: ObjectHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_range_covers_its_entries() {
        let slot = Slot::new(3, 4);
        assert_eq!(slot.end(), 7);
        assert_eq!(slot.range().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
    }
}
