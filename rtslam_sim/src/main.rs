// rtslam_sim/src/main.rs

use anyhow::Context;
use clap::Parser;
use log::info;

use rtslam_sim::cli::Cli;
use rtslam_sim::{ScenarioConfig, Simulation};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Loading scenario from: {}", cli.scenario.display());
    let mut config = ScenarioConfig::load(&cli.scenario)?;

    // Command-line flags win over the file.
    if let Some(steps) = cli.steps {
        config.simulation.steps = steps;
    }
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }
    if cli.report.is_some() {
        config.simulation.report = cli.report;
    }

    let mut sim = Simulation::from_config(&config).context("failed to build scenario")?;
    sim.run()?;

    for (_, robot) in sim.map().robots() {
        info!("{}", robot);
    }

    if let Some(path) = &config.simulation.report {
        sim.report().write(path)?;
        info!("report written to {}", path.display());
    }
    Ok(())
}
