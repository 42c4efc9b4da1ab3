// rtslam_core/src/map/slam_map.rs

use log::debug;
use nalgebra::DMatrix;

use crate::error::{FilterError, Result};
use crate::gaussian::Gaussian;
use crate::map::{JointMap, JointState};
use crate::robot::Robot;
use crate::sensor::{Sensor, SensorRegistry};
use crate::types::{Input, MapId, MapLink, ObjectHandle, RobotHandle, SensorHandle};

/// A map owning the joint state plus the robots and sensors that live in it.
///
/// Robots and sensors refer to each other and to the map only through handles,
/// so there are no ownership cycles. `move_robot` and `explore_sensors` split
/// the borrows so a robot can propagate through a covariance it does not own.
#[derive(Debug, Clone)]
pub struct SlamMap {
    joint: JointState,
    robots: Vec<Robot>,
    sensors: SensorRegistry,
}

impl SlamMap {
    pub fn new(id: MapId) -> Self {
        Self {
            joint: JointState::new(id),
            robots: Vec::new(),
            sensors: SensorRegistry::new(),
        }
    }

    pub fn id(&self) -> MapId {
        self.joint.id()
    }

    pub fn joint(&self) -> &JointState {
        &self.joint
    }

    /// Adds a passive map object (a landmark, for instance) with the given prior.
    pub fn add_object(&mut self, initial: &Gaussian) -> ObjectHandle {
        self.joint.allocate(initial)
    }

    /// Takes ownership of `robot`, allocates its slot from its current pose and
    /// links it to this map.
    pub fn add_robot(&mut self, mut robot: Robot) -> RobotHandle {
        let object = self.joint.allocate(robot.pose());
        let handle = RobotHandle(self.robots.len());
        robot.register(handle);
        robot.link_to_map(MapLink {
            map: self.id(),
            object,
        });
        debug!(
            "robot '{}' added to map {:?} as {:?} ({:?})",
            robot.name(),
            self.id(),
            handle,
            object
        );
        self.robots.push(robot);
        handle
    }

    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) -> SensorHandle {
        self.sensors.add(sensor)
    }

    /// Links a sensor and a robot in both directions.
    pub fn link_sensor(&mut self, robot: RobotHandle, sensor: SensorHandle) -> Result<()> {
        // Resolve both handles before touching either side.
        self.sensors.get(sensor)?;
        let rob = self
            .robots
            .get_mut(robot.0)
            .ok_or(FilterError::UnknownRobot(robot))?;
        rob.link_to_sensor(sensor);
        self.sensors.get_mut(sensor)?.link_to_robot(robot);
        Ok(())
    }

    pub fn robot(&self, handle: RobotHandle) -> Result<&Robot> {
        self.robots
            .get(handle.0)
            .ok_or(FilterError::UnknownRobot(handle))
    }

    pub fn robot_mut(&mut self, handle: RobotHandle) -> Result<&mut Robot> {
        self.robots
            .get_mut(handle.0)
            .ok_or(FilterError::UnknownRobot(handle))
    }

    pub fn robots(&self) -> impl Iterator<Item = (RobotHandle, &Robot)> {
        self.robots
            .iter()
            .enumerate()
            .map(|(i, r)| (RobotHandle(i), r))
    }

    pub fn sensors(&self) -> &SensorRegistry {
        &self.sensors
    }

    /// Runs one prediction step of `handle` against this map's joint covariance.
    pub fn move_robot(&mut self, handle: RobotHandle) -> Result<()> {
        let robot = self
            .robots
            .get_mut(handle.0)
            .ok_or(FilterError::UnknownRobot(handle))?;
        robot.predict(&mut self.joint)
    }

    /// Replaces the control mean of `handle` with `u`, then moves it.
    pub fn move_robot_with_input(&mut self, handle: RobotHandle, u: Input) -> Result<()> {
        let robot = self
            .robots
            .get_mut(handle.0)
            .ok_or(FilterError::UnknownRobot(handle))?;
        robot.predict_with_input(u, &mut self.joint)
    }

    /// Fans out to every sensor linked to `handle`.
    pub fn explore_sensors(&mut self, handle: RobotHandle) -> Result<()> {
        let robot = self
            .robots
            .get(handle.0)
            .ok_or(FilterError::UnknownRobot(handle))?;
        robot.explore_sensors(&mut self.sensors)
    }

    /// Marginal Gaussian of any object in the map.
    pub fn object(&self, object: ObjectHandle) -> Result<Gaussian> {
        self.joint.marginal(object)
    }

    pub fn cross_covariance(&self, a: ObjectHandle, b: ObjectHandle) -> Result<DMatrix<f64>> {
        self.joint.cross_covariance(a, b)
    }

    /// Writes the correlation between two distinct objects. Own blocks are
    /// untouched, so every robot's pose stays in sync with the map.
    pub fn set_cross_covariance(
        &mut self,
        a: ObjectHandle,
        b: ObjectHandle,
        block: &DMatrix<f64>,
    ) -> Result<()> {
        self.joint.set_cross_covariance(a, b, block)
    }
}
