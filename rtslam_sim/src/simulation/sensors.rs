// rtslam_sim/src/simulation/sensors.rs

use log::info;
use rtslam_core::prelude::{RobotHandle, Result, Sensor, SensorContext};

/// A stand-in sensor that logs its robot's pose every time it is explored.
#[derive(Debug, Clone)]
pub struct PoseLogger {
    name: String,
    robot: Option<RobotHandle>,
    cycles: usize,
}

impl PoseLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            robot: None,
            cycles: 0,
        }
    }

    /// How many times this sensor has been explored.
    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl Sensor for PoseLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn link_to_robot(&mut self, robot: RobotHandle) {
        self.robot = Some(robot);
    }

    fn robot(&self) -> Option<RobotHandle> {
        self.robot
    }

    fn process(&mut self, context: &SensorContext) -> Result<()> {
        self.cycles += 1;
        info!(
            "[{}] cycle {} robot {:?}: {}",
            self.name, self.cycles, context.robot, context.pose
        );
        Ok(())
    }
}
