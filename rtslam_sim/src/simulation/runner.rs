// rtslam_sim/src/simulation/runner.rs

use anyhow::{ensure, Context};
use log::{debug, info};
use nalgebra::DVector;
use rand_distr::{Distribution, Normal};

use rtslam_core::prelude::*;

use super::config::{diagonal, matrix_from_rows, RobotConfig, ScenarioConfig};
use super::prng::SimulationRng;
use super::report::{RobotReport, RunReport};
use super::sensors::PoseLogger;

/// Per-robot driving state: the commanded input and the noise injected into it.
#[derive(Debug)]
struct Driver {
    handle: RobotHandle,
    input: DVector<f64>,
    jitter: Vec<Normal<f64>>,
}

/// A built scenario: one map, its robots and sensors, and the run parameters.
#[derive(Debug)]
pub struct Simulation {
    map: SlamMap,
    drivers: Vec<Driver>,
    rng: SimulationRng,
    seed: Option<u64>,
    dt: f64,
    steps: usize,
    completed: usize,
}

impl Simulation {
    pub fn from_config(config: &ScenarioConfig) -> anyhow::Result<Self> {
        let sim = &config.simulation;
        let dt = sim.dt;
        let mut map = SlamMap::new(MapId(0));

        let objects = config
            .objects
            .iter()
            .map(|o| {
                let cov = diagonal(&o.name, o.mean.len(), &o.covariance)?;
                let prior = Gaussian::from_parts(DVector::from_column_slice(&o.mean), cov)?;
                let handle = map.add_object(&prior);
                debug!("object '{}' added as {:?}", o.name, handle);
                Ok(handle)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut drivers = Vec::with_capacity(config.robots.len());
        for rc in &config.robots {
            let driver = Self::spawn_robot(&mut map, rc, dt)
                .with_context(|| format!("failed to set up robot '{}'", rc.name))?;
            drivers.push(driver);
        }

        for c in &config.correlations {
            let robot = map.robot(drivers[c.robot].handle)?;
            let link = robot
                .map_link()
                .ok_or_else(|| FilterError::NotLinked(robot.name().to_owned()))?;
            let block = matrix_from_rows("correlation", &c.covariance)?;
            map.set_cross_covariance(link.object, objects[c.object], &block)?;
        }

        for sc in &config.sensors {
            let sensor = map.add_sensor(Box::new(PoseLogger::new(&sc.name)));
            map.link_sensor(drivers[sc.robot].handle, sensor)?;
        }

        info!(
            "scenario ready: {} robots, {} objects, {} sensors, joint state size {}",
            drivers.len(),
            objects.len(),
            map.sensors().len(),
            map.joint().size()
        );

        Ok(Self {
            map,
            drivers,
            rng: SimulationRng::new(sim.seed)?,
            seed: sim.seed,
            dt,
            steps: sim.steps,
            completed: 0,
        })
    }

    fn spawn_robot(map: &mut SlamMap, rc: &RobotConfig, dt: f64) -> anyhow::Result<Driver> {
        let model = rc.model.build()?;
        let n = model.state_dim();
        let m = model.control_dim();

        let cov = diagonal("initial_covariance", n, &rc.initial_covariance)?;
        let pose = Gaussian::from_parts(DVector::from_column_slice(&rc.initial_mean), cov)?;
        let mut robot = Robot::new(rc.name.clone(), model, pose)?;

        ensure!(
            rc.control.input.len() == m,
            "control input has {} entries, expected {m}",
            rc.control.input.len()
        );
        let input = DVector::from_column_slice(&rc.control.input);
        let control = robot.control_mut();
        control.dt = dt;
        control.set_x(input.clone())?;
        control.convert_covariance_from_continuous_with(
            diagonal("continuous_covariance", m, &rc.control.continuous_covariance)?,
            dt,
        )?;

        if rc.constant_perturbation {
            // Linearize once around the initial pose to freeze Q for the run.
            robot.linearize()?;
            robot.compute_state_perturbation();
            robot.constant_perturbation = true;
        }

        let jitter = rc
            .control
            .jitter
            .iter()
            .map(|std| Normal::new(0.0, *std))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("invalid input jitter")?;
        ensure!(
            jitter.is_empty() || jitter.len() == m,
            "input jitter has {} entries, expected {m}",
            jitter.len()
        );

        let handle = map.add_robot(robot);
        Ok(Driver {
            handle,
            input,
            jitter,
        })
    }

    pub fn map(&self) -> &SlamMap {
        &self.map
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Prediction steps run so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// One cycle: every robot gets its jittered input and the continuous
    /// noise converted for `dt`, predicts, and explores its sensors.
    pub fn step(&mut self) -> anyhow::Result<()> {
        for driver in &self.drivers {
            let mut u = driver.input.clone();
            for (ui, noise) in u.iter_mut().zip(&driver.jitter) {
                *ui += noise.sample(&mut self.rng.0);
            }

            let control = self.map.robot_mut(driver.handle)?.control_mut();
            control.dt = self.dt;
            control.convert_covariance_from_continuous(self.dt)?;
            self.map.move_robot_with_input(driver.handle, u)?;
            self.map.explore_sensors(driver.handle)?;
        }
        self.completed += 1;

        for (handle, robot) in self.map.robots() {
            info!(
                "step {} robot '{}' ({:?}) mean {:.4} std {:.4}",
                self.completed,
                robot.name(),
                handle,
                robot.pose().x().transpose(),
                robot.pose().std_devs().transpose()
            );
        }
        Ok(())
    }

    /// Runs the remaining steps.
    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.completed < self.steps {
            self.step()
                .with_context(|| format!("step {} failed", self.completed + 1))?;
        }
        Ok(())
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            steps: self.completed,
            dt: self.dt,
            seed: self.seed,
            robots: self.map.robots().map(|(_, r)| RobotReport::from(r)).collect(),
        }
    }
}
