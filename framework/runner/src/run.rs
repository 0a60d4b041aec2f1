use std::sync::Arc;

use anyhow::Context;

use model_tunnel_core::prelude::SetupError;
use model_tunnel_instruments::{print_comparison, ReportConfig, MT_DOCKER_PATH_ENV};
use model_tunnel_summary_model::{append_run_summary, RunSummary};

use crate::benchmark::{BenchmarkRunner, TrialFailure};
use crate::config::MT_CONFIG_ENV;
use crate::context::RunnerContext;
use crate::definition::{ScenarioDefinitionBuilder, RUN_SUMMARY_PATH_ENV};
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::trial_progress;
use crate::shutdown::start_shutdown_listener;

/// Environment variables recorded in the run summary when they are set.
const RECORDED_ENV: &[&str] = &[MT_CONFIG_ENV, MT_DOCKER_PATH_ENV, RUN_SUMMARY_PATH_ENV];

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// The summary appended to the run summary file, including per tier and engine results.
    pub run_summary: RunSummary,
    /// Every trial that was excluded from the results, in the order it happened.
    pub failures: Vec<TrialFailure>,
}

pub fn run(definition: ScenarioDefinitionBuilder) -> anyhow::Result<RunOutcome> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario: {} ({})",
        definition.name,
        definition.workload.name()
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let reporter = Arc::new(ReportConfig::default().enable_in_memory().init());
    let mut runner_context = RunnerContext::new(
        executor,
        reporter,
        shutdown_handle.clone(),
        definition.config.clone(),
        definition.sections.clone(),
    );

    if let Some(setup_fn) = definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    if runner_context.engines().is_empty() {
        return Err(SetupError::Config(format!(
            "scenario {} registered no engines in its setup hook",
            definition.name
        ))
        .into());
    }

    let config = runner_context.config().clone();
    let mut run_summary = RunSummary::new(
        definition
            .run_id
            .clone()
            .unwrap_or_else(|| nanoid::nanoid!()),
        definition.name.clone(),
        chrono::Utc::now().timestamp(),
        definition.workload.name().to_string(),
        config.trials,
        config.workers,
        config.tiers.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    run_summary.set_engines(
        runner_context
            .engines()
            .iter()
            .map(|e| e.name().to_string())
            .collect(),
    );
    for key in RECORDED_ENV {
        if let Ok(value) = std::env::var(key) {
            run_summary.add_env(key.to_string(), value);
        }
    }

    // Watch for the harness itself competing with the engines for CPU.
    start_monitor(shutdown_handle.new_listener());

    let sampler = config.sampler.build();
    let total_trials = config.tiers.len() * config.trials * runner_context.engines().len();
    let progress = trial_progress(total_trials as u64, definition.no_progress);

    let results = BenchmarkRunner {
        scenario: &definition.name,
        workload: definition.workload,
        config: &config,
        executor: runner_context.executor(),
        engines: runner_context.engines(),
        sampler: sampler.as_ref(),
        shutdown_handle: runner_context.shutdown_handle(),
        progress: &progress,
    }
    .run();
    progress.finish_and_clear();

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting to happen
        // cleanly. The hook is documented as 'best effort'
        if let Err(e) = teardown_fn(&mut runner_context) {
            log::error!("Teardown failed: {e:?}");
        }
    }

    runner_context.reporter().finalize();
    print_comparison(&definition.name, &results.summaries);

    if !results.failures.is_empty() {
        log::warn!(
            "{} trials failed and were excluded from the results",
            results.failures.len()
        );
    }

    run_summary.set_results(results.summaries);
    if let Err(e) = append_run_summary(&run_summary, &definition.run_summary_path) {
        log::error!(
            "Failed to write run summary to {}: {e:?}",
            definition.run_summary_path.display()
        );
    }

    // Stops the monitor thread.
    shutdown_handle.shutdown();

    Ok(RunOutcome {
        run_summary,
        failures: results.failures,
    })
}
