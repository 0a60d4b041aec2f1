use std::path::PathBuf;

use model_tunnel_core::prelude::SetupError;

use crate::cli::ModelTunnelScenarioCli;
use crate::config::{config_path, load_config_file, ConfigFile, HarnessConfig};
use crate::context::RunnerContext;
use crate::init::init;
use crate::types::ModelTunnelResult;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut = fn(&mut RunnerContext) -> HookResult;

/// Environment variable naming the file that run summaries are appended to.
pub const RUN_SUMMARY_PATH_ENV: &str = "RUN_SUMMARY_PATH";

const DEFAULT_RUN_SUMMARY_PATH: &str = "run_summary.jsonl";

/// The operation a scenario measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Seed each tier with its records, then time the lookup of one record by id.
    PointLookup,
    /// Seed each tier with its records, then time an average-price-by-category aggregation.
    Aggregate,
    /// Time inserting the tier's records from a single unit of execution.
    BulkInsert,
    /// Time inserting the tier's records split into `workers` disjoint shards written concurrently.
    ConcurrentInsert,
}

impl Workload {
    /// Query workloads read data seeded once per tier. Insert workloads write their own.
    pub fn seeds_data(self) -> bool {
        matches!(self, Self::PointLookup | Self::Aggregate)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PointLookup => "point_lookup",
            Self::Aggregate => "aggregate",
            Self::BulkInsert => "bulk_insert",
            Self::ConcurrentInsert => "concurrent_insert",
        }
    }
}

/// The builder for a scenario definition.
///
/// This must be used at the start of a benchmark to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder {
    /// The name of the scenario, which should be unique within the benchmark suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ModelTunnelScenarioCli,
    workload: Option<Workload>,
    /// Scenario defaults, overridden by the config file and then the command line.
    defaults: HarnessConfig,
    /// Global setup hook. It runs once, before any trial, and is expected to register the engines.
    setup_fn: Option<GlobalHookMut>,
    /// Global teardown hook. It runs once after the last trial. Failures are logged, not returned.
    teardown_fn: Option<GlobalHookMut>,
}

pub struct ScenarioDefinition {
    pub name: String,
    pub workload: Workload,
    pub config: HarnessConfig,
    pub sections: toml::Table,
    pub no_progress: bool,
    pub run_id: Option<String>,
    pub run_summary_path: PathBuf,
    pub setup_fn: Option<GlobalHookMut>,
    pub teardown_fn: Option<GlobalHookMut>,
}

impl ScenarioDefinitionBuilder {
    /// Initialise logging and a new scenario definition from the command line arguments.
    /// See the [ScenarioDefinitionBuilder::name] for more information about the name.
    pub fn new_with_init(name: &str) -> Self {
        let cli = init();
        Self::new(name, cli)
    }

    /// Create a new scenario definition from an already parsed command line.
    pub fn new(name: &str, cli: ModelTunnelScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            workload: None,
            defaults: HarnessConfig::default(),
            setup_fn: None,
            teardown_fn: None,
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = Some(workload);
        self
    }

    pub fn with_default_tiers(mut self, tiers: Vec<usize>) -> Self {
        self.defaults.tiers = tiers;
        self
    }

    pub fn with_default_trials(mut self, trials: usize) -> Self {
        self.defaults.trials = trials;
        self
    }

    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.defaults.workers = workers;
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the global teardown hook [ScenarioDefinitionBuilder::teardown_fn] for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHookMut) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> ModelTunnelResult<ScenarioDefinition> {
        let workload = self.workload.ok_or_else(|| {
            SetupError::Config(format!("scenario {} has no workload", self.name))
        })?;

        let file = match config_path(self.cli.config.as_deref()) {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                load_config_file(&path)?
            }
            None => ConfigFile::default(),
        };

        let mut config = self.defaults;
        config.apply(file.harness);
        config.apply(self.cli.overrides());
        config.validate()?;

        let run_summary_path = self
            .cli
            .run_summary
            .clone()
            .or_else(|| std::env::var_os(RUN_SUMMARY_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_SUMMARY_PATH));

        Ok(ScenarioDefinition {
            name: self.name,
            workload,
            config,
            sections: file.sections,
            no_progress: self.cli.no_progress,
            run_id: self.cli.run_id,
            run_summary_path,
            setup_fn: self.setup_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}
