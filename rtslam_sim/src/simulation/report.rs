// rtslam_sim/src/simulation/report.rs

use std::path::Path;

use anyhow::Context;
use nalgebra::DMatrix;
use serde::Serialize;

use rtslam_core::prelude::Robot;

/// End-of-run summary, written as TOML.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub steps: usize,
    pub dt: f64,
    pub seed: Option<u64>,
    pub robots: Vec<RobotReport>,
}

#[derive(Debug, Serialize)]
pub struct RobotReport {
    pub name: String,
    pub mean: Vec<f64>,
    pub std_devs: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub perturbation: Vec<Vec<f64>>,
}

impl From<&Robot> for RobotReport {
    fn from(robot: &Robot) -> Self {
        let pose = robot.pose();
        Self {
            name: robot.name().to_owned(),
            mean: pose.x().iter().copied().collect(),
            std_devs: pose.std_devs().iter().copied().collect(),
            covariance: rows(pose.p()),
            perturbation: rows(robot.perturbation()),
        }
    }
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

impl RunReport {
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to serialize run report")
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("failed to write report to '{}'", path.display()))
    }
}
