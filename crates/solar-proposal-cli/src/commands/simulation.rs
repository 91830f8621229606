use clap::Args;
use serde_json::Value;

use solar_proposal_core::simulation::scenario::{self, SimulationAssumptions, SimulationInput};

use crate::input;

/// Arguments for the scenario simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// YAML or JSON file overriding the input's assumptions block
    #[arg(long)]
    pub assumptions: Option<String>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sim_input: SimulationInput = input::read_input(&args.input, "simulation")?;
    if let Some(ref path) = args.assumptions {
        let assumptions: SimulationAssumptions = input::file::read_config(path)?;
        log::info!("assumptions loaded from {path}");
        sim_input.assumptions = assumptions;
    }
    let result = scenario::run_scenario_simulation(&sim_input)?;
    Ok(serde_json::to_value(result)?)
}
