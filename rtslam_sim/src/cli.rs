// rtslam_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// rtslam-sim: drives the EKF-SLAM prediction core through a scripted scenario.
///
/// Flags given here override the matching values from the scenario file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/two_robots.toml")]
    pub scenario: PathBuf,

    /// Number of prediction steps to run.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Seed for the input-jitter PRNG.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the end-of-run report.
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}
