use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;

use model_tunnel_core::prelude::{EngineAdapter, ShutdownHandle};
use model_tunnel_instruments::Reporter;

use crate::config::HarnessConfig;
use crate::executor::Executor;
use crate::types::ModelTunnelResult;

/// State shared by the hooks of a scenario and the benchmark runner.
pub struct RunnerContext {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    config: HarnessConfig,
    sections: toml::Table,
    engines: Vec<Arc<dyn EngineAdapter>>,
}

impl Debug for RunnerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerContext")
            .field("config", &self.config)
            .field("sections", &self.sections.keys().collect::<Vec<_>>())
            .field(
                "engines",
                &self.engines.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl RunnerContext {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        config: HarnessConfig,
        sections: toml::Table,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            config,
            sections,
            engines: Vec::new(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Deserialize a top level section of the configuration file, e.g. `[stores]`.
    ///
    /// Returns `T::default()` when the section is missing.
    pub fn config_section<T: DeserializeOwned + Default>(&self, key: &str) -> ModelTunnelResult<T> {
        match self.sections.get(key) {
            Some(value) => value
                .clone()
                .try_into::<T>()
                .with_context(|| format!("Failed to parse [{key}] section")),
            None => Ok(T::default()),
        }
    }

    /// Register an engine to benchmark. Engines run in registration order within each trial.
    pub fn add_engine(&mut self, engine: impl EngineAdapter + 'static) {
        log::info!("Registered engine: {}", engine.name());
        self.engines.push(Arc::new(engine));
    }

    pub fn engines(&self) -> &[Arc<dyn EngineAdapter>] {
        &self.engines
    }

    /// Stop the scenario after the trial in progress. Results gathered so far are still reported.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub(crate) fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }
}
