// rtslam_core/src/sensor/mod.rs

use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::types::{RobotHandle, SensorHandle};
use dyn_clone::DynClone;
use std::fmt::Debug;

/// What a sensor gets to see of its robot during one exploration cycle.
#[derive(Debug, Clone, Copy)]
pub struct SensorContext<'a> {
    /// The robot driving this exploration, if it is registered in a map.
    pub robot: Option<RobotHandle>,
    /// The robot's pose after the latest prediction.
    pub pose: &'a Gaussian,
}

// --- SENSOR TRAIT ---
/// The contract the filter core needs from a sensor.
///
/// Observation models, data association and landmark initialization all live
/// behind `process`; the core only fans out to it once per cycle.
pub trait Sensor: DynClone + Debug + Send + Sync {
    /// A human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Records the robot this sensor is mounted on.
    fn link_to_robot(&mut self, robot: RobotHandle);

    /// The robot this sensor is mounted on, if any.
    fn robot(&self) -> Option<RobotHandle>;

    /// Per-cycle processing entry point.
    fn process(&mut self, context: &SensorContext) -> Result<()>;
}

dyn_clone::clone_trait_object!(Sensor);

/// Arena of sensors. Handles are indices and stay valid for the registry's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<Box<dyn Sensor>>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sensor: Box<dyn Sensor>) -> SensorHandle {
        self.sensors.push(sensor);
        SensorHandle(self.sensors.len() - 1)
    }

    pub fn get(&self, handle: SensorHandle) -> Result<&dyn Sensor> {
        self.sensors
            .get(handle.0)
            .map(|s| s.as_ref())
            .ok_or(FilterError::UnknownSensor(handle))
    }

    pub fn get_mut(&mut self, handle: SensorHandle) -> Result<&mut Box<dyn Sensor>> {
        self.sensors
            .get_mut(handle.0)
            .ok_or(FilterError::UnknownSensor(handle))
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorHandle, &dyn Sensor)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (SensorHandle(i), s.as_ref()))
    }
}
