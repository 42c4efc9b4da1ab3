// rtslam_sim/src/simulation/config.rs

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use rtslam_core::models::motion::{
    EulerDiscretization, LinearMotion, MotionModel, VelocityIntegrator,
};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub robots: Vec<RobotConfig>,
    /// Passive map objects (landmarks) sharing the joint covariance.
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    /// Initial correlations between a robot and an object.
    #[serde(default)]
    pub correlations: Vec<CorrelationConfig>,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl ScenarioConfig {
    /// Loads `path`, then applies `RTSLAM_` environment overrides
    /// (e.g. `RTSLAM_SIMULATION__STEPS=50`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        ensure!(
            path.exists(),
            "scenario file '{}' does not exist",
            path.display()
        );
        Self::extract(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed("RTSLAM_").split("__")),
        )
        .with_context(|| format!("failed to load scenario '{}'", path.display()))
    }

    pub fn extract(figment: Figment) -> anyhow::Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks serde cannot express.
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.simulation.dt > 0.0,
            "simulation.dt must be positive, got {}",
            self.simulation.dt
        );
        for sensor in &self.sensors {
            ensure!(
                sensor.robot < self.robots.len(),
                "sensor '{}' is mounted on robot {}, but only {} robots are configured",
                sensor.name,
                sensor.robot,
                self.robots.len()
            );
        }
        for c in &self.correlations {
            ensure!(
                c.robot < self.robots.len(),
                "correlation refers to unknown robot {}",
                c.robot
            );
            ensure!(
                c.object < self.objects.len(),
                "correlation refers to unknown object {}",
                c.object
            );
        }
        Ok(())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Number of prediction steps.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Integration interval of every step, in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Where to write the end-of-run report, if anywhere.
    pub report: Option<PathBuf>,
}

fn default_steps() -> usize {
    10
}

fn default_dt() -> f64 {
    1.0
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            steps: default_steps(),
            dt: default_dt(),
            report: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    pub name: String,
    pub model: ModelConfig,
    pub initial_mean: Vec<f64>,
    /// Diagonal of the initial pose covariance. Zero when omitted.
    #[serde(default)]
    pub initial_covariance: Vec<f64>,
    /// Compute `Q` once at setup instead of every step.
    #[serde(default)]
    pub constant_perturbation: bool,
    pub control: ControlConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// Commanded input, held for the whole run.
    pub input: Vec<f64>,
    /// Diagonal of the continuous-time input noise density.
    pub continuous_covariance: Vec<f64>,
    /// Std-dev of the noise injected into the commanded input each step.
    /// No jitter when omitted.
    #[serde(default)]
    pub jitter: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "PascalCase")]
pub enum ModelConfig {
    /// `x_new = F x + B u dt`, matrices given row by row.
    Linear {
        transition: Vec<Vec<f64>>,
        input: Vec<Vec<f64>>,
    },
    /// Position integrating a velocity input, Euler-discretized.
    Drift { axes: usize },
}

impl ModelConfig {
    pub fn build(&self) -> anyhow::Result<Box<dyn MotionModel>> {
        match self {
            ModelConfig::Linear { transition, input } => {
                let f = matrix_from_rows("transition", transition)?;
                let b = matrix_from_rows("input", input)?;
                Ok(Box::new(LinearMotion::new(f, b)?))
            }
            ModelConfig::Drift { axes } => {
                ensure!(*axes > 0, "a drift model needs at least one axis");
                Ok(Box::new(EulerDiscretization::new(VelocityIntegrator {
                    axes: *axes,
                })))
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ObjectConfig {
    pub name: String,
    pub mean: Vec<f64>,
    /// Diagonal of the prior covariance.
    pub covariance: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CorrelationConfig {
    /// Index into `robots`.
    pub robot: usize,
    /// Index into `objects`.
    pub object: usize,
    /// Robot-by-object covariance block, row by row.
    pub covariance: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub name: String,
    /// Index into `robots`.
    pub robot: usize,
}

// =========================================================================
// == Helpers ==
// =========================================================================

/// Builds a matrix from row-major nested arrays; every row must be the same length.
pub fn matrix_from_rows(what: &str, rows: &[Vec<f64>]) -> anyhow::Result<DMatrix<f64>> {
    ensure!(!rows.is_empty(), "{what} matrix has no rows");
    let ncols = rows[0].len();
    ensure!(
        rows.iter().all(|r| r.len() == ncols),
        "{what} matrix rows have different lengths"
    );
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(rows.len(), ncols, &flat))
}

/// Diagonal matrix of size `size`. An empty `diagonal` gives the zero matrix.
pub fn diagonal(what: &str, size: usize, diagonal: &[f64]) -> anyhow::Result<DMatrix<f64>> {
    if diagonal.is_empty() {
        return Ok(DMatrix::zeros(size, size));
    }
    ensure!(
        diagonal.len() == size,
        "{what} has {} entries, expected {size}",
        diagonal.len()
    );
    Ok(DMatrix::from_diagonal(&DVector::from_column_slice(diagonal)))
}
