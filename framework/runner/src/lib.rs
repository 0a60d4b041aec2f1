mod benchmark;
mod cli;
mod config;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::benchmark::TrialFailure;
    pub use crate::cli::ModelTunnelScenarioCli;
    pub use crate::config::{HarnessConfig, MT_CONFIG_ENV};
    pub use crate::context::RunnerContext;
    pub use crate::definition::{
        GlobalHookMut, HookResult, ScenarioDefinitionBuilder, Workload, RUN_SUMMARY_PATH_ENV,
    };
    pub use crate::executor::Executor;
    pub use crate::run::{run, RunOutcome};
    pub use crate::types::ModelTunnelResult;
}
