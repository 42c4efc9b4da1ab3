// rtslam_core/src/robot.rs

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, trace, warn};
use nalgebra::DMatrix;

use crate::control::Control;
use crate::error::{check_dim, check_shape, FilterError, Result};
use crate::gaussian::Gaussian;
use crate::map::JointMap;
use crate::models::motion::{MotionModel, MotionPrediction};
use crate::sensor::{SensorContext, SensorRegistry};
use crate::types::{Input, Jacobian, MapLink, RobotHandle, SensorHandle, State};

/// A robot resident in a map: its pose, its control input, and the
/// machinery that propagates both through one prediction step.
///
/// State and control sizes are fixed by the motion model at construction
/// and never change for the robot's lifetime.
#[derive(Debug, Clone)]
pub struct Robot {
    name: String,
    handle: Option<RobotHandle>,
    model: Box<dyn MotionModel>,

    /// Robot Gaussian pose. Mirrors the robot's block of the map after every step.
    pose: Gaussian,
    /// Control Gaussian vector.
    control: Control,

    /// Jacobian of the new state with respect to the old state.
    xnew_x: Jacobian,
    /// Jacobian of the new state with respect to the control.
    xnew_control: Jacobian,
    /// Perturbation in state space, `Q = XNEW_control * control.P * XNEW_control^T`.
    q: DMatrix<f64>,

    /// When set, `Q` is treated as constant and never recomputed by `predict`.
    ///
    /// Set it up right after construction, either by computing `XNEW_control`
    /// and the control covariance and calling
    /// [`Robot::compute_state_perturbation`], or by entering `Q` directly with
    /// [`Robot::set_state_perturbation`].
    pub constant_perturbation: bool,

    map: Option<MapLink>,
    sensors: BTreeSet<SensorHandle>,
}

impl Robot {
    /// Creates a robot driven by `model`, starting at `initial_pose`.
    ///
    /// The pose must have the model's state dimension. The control starts as a
    /// zero Gaussian of the model's control dimension with `dt = 1`.
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn MotionModel>,
        initial_pose: Gaussian,
    ) -> Result<Self> {
        let n = model.state_dim();
        let m = model.control_dim();
        check_dim("robot pose", n, initial_pose.size())?;

        Ok(Self {
            name: name.into(),
            handle: None,
            model,
            pose: initial_pose,
            control: Control::new(m),
            xnew_x: Jacobian::identity(n, n),
            xnew_control: Jacobian::zeros(n, m),
            q: DMatrix::zeros(n, n),
            constant_perturbation: false,
            map: None,
            sensors: BTreeSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The robot's handle in its map's robot arena, once registered.
    pub fn handle(&self) -> Option<RobotHandle> {
        self.handle
    }

    pub fn model(&self) -> &dyn MotionModel {
        &*self.model
    }

    pub fn size_state(&self) -> usize {
        self.model.state_dim()
    }

    pub fn size_control(&self) -> usize {
        self.model.control_dim()
    }

    pub fn pose(&self) -> &Gaussian {
        &self.pose
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Mutable access to the stored control, e.g. to run a continuous-time
    /// conversion for the next step. Its size cannot change through this.
    pub fn control_mut(&mut self) -> &mut Control {
        &mut self.control
    }

    pub fn xnew_x(&self) -> &Jacobian {
        &self.xnew_x
    }

    pub fn xnew_control(&self) -> &Jacobian {
        &self.xnew_control
    }

    /// The perturbation matrix `Q` in state space.
    pub fn perturbation(&self) -> &DMatrix<f64> {
        &self.q
    }

    pub fn map_link(&self) -> Option<MapLink> {
        self.map
    }

    pub fn sensors(&self) -> impl Iterator<Item = SensorHandle> + '_ {
        self.sensors.iter().copied()
    }

    // --- Links ---

    /// Records `sensor` as mounted on this robot. Linking twice is a no-op.
    pub fn link_to_sensor(&mut self, sensor: SensorHandle) {
        self.sensors.insert(sensor);
    }

    /// Records the map this robot lives in and the object slot holding its state.
    pub fn link_to_map(&mut self, link: MapLink) {
        self.map = Some(link);
    }

    pub(crate) fn register(&mut self, handle: RobotHandle) {
        self.handle = Some(handle);
    }

    // --- Control ---

    /// Replaces the stored control wholesale (mean, covariance and dt).
    /// On a size mismatch the current control is left as it was.
    pub fn set_control(&mut self, control: Control) -> Result<()> {
        check_dim("robot control", self.size_control(), control.size())?;
        self.control = control;
        Ok(())
    }

    /// Enters `Q` directly, typically for a constant-perturbation robot.
    pub fn set_state_perturbation(&mut self, q: DMatrix<f64>) -> Result<()> {
        let n = self.size_state();
        check_shape("state perturbation", (n, n), q.shape())?;
        self.q = q;
        Ok(())
    }

    /// Recomputes `Q = XNEW_control * control.P * XNEW_control^T`.
    ///
    /// `XNEW_control` and `control.P` must already hold meaningful values,
    /// either from a previous step or from [`Robot::linearize`]; this is not
    /// checked.
    pub fn compute_state_perturbation(&mut self) {
        self.q = self.perturbation_from(&self.xnew_control);
    }

    fn perturbation_from(&self, xnew_control: &Jacobian) -> DMatrix<f64> {
        let q = xnew_control * self.control.p() * xnew_control.transpose();
        (&q + q.transpose()) * 0.5
    }

    // --- Prediction ---

    /// The robot's link into `map`, once it is known to name a slot of the
    /// robot's state size.
    fn checked_link(&self, map: &dyn JointMap) -> Result<MapLink> {
        let link = self
            .map
            .ok_or_else(|| FilterError::NotLinked(self.name.clone()))?;
        if link.map != map.id() {
            return Err(FilterError::WrongMap {
                expected: link.map,
                actual: map.id(),
            });
        }
        let slot = map.slot(link.object)?;
        check_dim("robot state slot", self.size_state(), slot.size)?;
        Ok(link)
    }

    /// Refreshes `XNEW_x` and `XNEW_control` around the current pose and
    /// control without moving, so `Q` can be computed during setup.
    pub fn linearize(&mut self) -> Result<()> {
        let prediction = self.move_func(self.pose.x())?;
        self.xnew_x = prediction.xnew_x;
        self.xnew_control = prediction.xnew_u;
        Ok(())
    }

    /// Runs the motion model on `x` with the stored control, checking output shapes.
    fn move_func(&self, x: &State) -> Result<MotionPrediction> {
        let prediction = self.model.move_func(x, self.control.x(), self.control.dt);
        prediction.check_shapes(self.size_state(), self.size_control())?;
        Ok(prediction)
    }

    /// Moves one step ahead and updates the map.
    ///
    /// The robot's mean becomes the motion model's prediction, the Jacobians are
    /// refreshed, `Q` is recomputed unless it is constant, and the map updates the
    /// robot's covariance block plus its cross-covariances with every other object.
    ///
    /// Nothing is modified if any check fails.
    pub fn predict(&mut self, map: &mut dyn JointMap) -> Result<()> {
        let link = self.checked_link(map)?;
        let x = map.mean(link.object)?;
        let prediction = self.move_func(&x)?;

        let fresh_q = if self.constant_perturbation {
            if self.q.iter().all(|v| *v == 0.0) {
                warn!(
                    "robot '{}' has constant perturbation but Q was never set up",
                    self.name
                );
            }
            None
        } else {
            Some(self.perturbation_from(&prediction.xnew_u))
        };
        let noise = fresh_q.as_ref().unwrap_or(&self.q);

        map.propagate(link.object, &prediction.x_new, &prediction.xnew_x, noise)?;
        let pose = map.marginal(link.object)?;

        trace!(
            "robot '{}' XNEW_x: {} XNEW_control: {} Q: {}",
            self.name,
            prediction.xnew_x,
            prediction.xnew_u,
            noise
        );

        if let Some(q) = fresh_q {
            self.q = q;
        }
        self.xnew_x = prediction.xnew_x;
        self.xnew_control = prediction.xnew_u;
        self.pose = pose;

        debug!(
            "robot '{}' moved, dt = {}, pose {}",
            self.name, self.control.dt, self.pose
        );
        Ok(())
    }

    /// Sets `control`, then moves one step ahead.
    /// The previous control is restored if the step fails.
    pub fn predict_with_control(&mut self, control: Control, map: &mut dyn JointMap) -> Result<()> {
        check_dim("robot control", self.size_control(), control.size())?;
        let previous = std::mem::replace(&mut self.control, control);
        self.predict(map).inspect_err(|_| self.control = previous)
    }

    /// Replaces only the control mean with `u`, then moves one step ahead.
    /// The previous mean is restored if the step fails.
    pub fn predict_with_input(&mut self, u: Input, map: &mut dyn JointMap) -> Result<()> {
        check_dim("robot control", self.size_control(), u.len())?;
        let previous = self.control.clone();
        self.control.set_x(u)?;
        self.predict(map).inspect_err(|_| self.control = previous)
    }

    // --- Sensors ---

    /// Calls the per-cycle entry point of every linked sensor.
    pub fn explore_sensors(&self, sensors: &mut SensorRegistry) -> Result<()> {
        let context = SensorContext {
            robot: self.handle,
            pose: &self.pose,
        };
        for handle in &self.sensors {
            let sensor = sensors.get_mut(*handle)?;
            trace!("robot '{}' exploring sensor '{}'", self.name, sensor.name());
            sensor.process(&context)?;
        }
        Ok(())
    }
}

impl fmt::Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROBOT '{}'", self.name)?;
        if let Some(handle) = self.handle {
            write!(f, " ({:?})", handle)?;
        }
        writeln!(
            f,
            ": state {}, control {}",
            self.size_state(),
            self.size_control()
        )?;
        writeln!(f, "  pose:    {}", self.pose)?;
        writeln!(f, "  control: {} (dt = {})", self.control.gaussian(), self.control.dt)?;
        write!(f, "  sensors: [")?;
        for (i, s) in self.sensors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s.0)?;
        }
        write!(f, "]")
    }
}
