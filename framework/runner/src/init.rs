use clap::Parser;

use crate::cli::ModelTunnelScenarioCli;

/// Initialise logging and parse the command line for a scenario binary.
pub fn init() -> ModelTunnelScenarioCli {
    env_logger::init();

    ModelTunnelScenarioCli::parse()
}
