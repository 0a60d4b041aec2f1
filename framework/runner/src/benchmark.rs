use std::collections::BTreeMap;
use std::sync::Arc;

use indicatif::ProgressBar;
use rand::seq::SliceRandom;

use model_tunnel_core::prelude::{
    error_chain, AdapterError, EngineAdapter, InsertMode, Operation, SetupError, ShutdownHandle,
    WorkloadGenerator,
};
use model_tunnel_instruments::{sample_or_absent, ResourceSampler};
use model_tunnel_summary_model::{reduce, Sample, SummaryStat, TierSummary};

use crate::config::HarnessConfig;
use crate::definition::Workload;
use crate::executor::Executor;

/// A trial that produced no sample.
#[derive(Debug)]
pub struct TrialFailure {
    pub tier: usize,
    pub trial: usize,
    pub engine: String,
    pub error: AdapterError,
}

/// Drives every tier and trial of one scenario across the registered engines.
///
/// Trials run strictly one after another. Within a trial each engine runs its operation and is
/// sampled before the next engine starts, so a resource reading only reflects that engine's load.
pub(crate) struct BenchmarkRunner<'a> {
    pub scenario: &'a str,
    pub workload: Workload,
    pub config: &'a HarnessConfig,
    pub executor: &'a Executor,
    pub engines: &'a [Arc<dyn EngineAdapter>],
    pub sampler: &'a dyn ResourceSampler,
    pub shutdown_handle: &'a ShutdownHandle,
    pub progress: &'a ProgressBar,
}

#[derive(Debug, Default)]
pub(crate) struct BenchmarkResults {
    pub summaries: Vec<TierSummary>,
    pub failures: Vec<TrialFailure>,
}

impl BenchmarkRunner<'_> {
    pub(crate) fn run(&self) -> BenchmarkResults {
        let mut results = BenchmarkResults::default();

        for &tier in &self.config.tiers {
            if self.shutdown_handle.is_shutdown() {
                log::info!("Skipping tier {tier} of {}, shutting down", self.scenario);
                break;
            }

            log::info!(
                "Running tier {tier} of {} with {} trials",
                self.scenario,
                self.config.trials
            );
            self.progress.set_message(format!("tier {tier}"));

            match self.prepare(tier) {
                Ok(operation) => self.run_tier(tier, &operation, &mut results),
                Err(e) => {
                    log::error!(
                        "Skipping tier {tier} of {}: {}",
                        self.scenario,
                        error_chain(&e)
                    );
                    self.progress
                        .inc((self.config.trials * self.engines.len()) as u64);
                    results
                        .summaries
                        .extend(self.engines.iter().map(|engine| TierSummary {
                            tier,
                            engine: engine.name().to_string(),
                            trials_failed: self.config.trials,
                            stat: SummaryStat::default(),
                        }));
                }
            }
        }

        results
    }

    /// Build the tier's operation and, for query workloads, seed every engine with the tier's
    /// records. The same records go to every engine.
    fn prepare(&self, tier: usize) -> Result<Operation, SetupError> {
        let generator = WorkloadGenerator::new();

        match self.workload {
            Workload::BulkInsert => Ok(Operation::bulk_insert(
                generator.generate_shards(tier, 1),
                InsertMode::Serial,
            )),
            Workload::ConcurrentInsert => Ok(Operation::bulk_insert(
                generator.generate_shards(tier, self.config.workers),
                InsertMode::Concurrent,
            )),
            Workload::PointLookup | Workload::Aggregate => {
                let records = generator.generate(tier);
                let lookup_id = match &self.config.lookup_id {
                    Some(id) => Some(id.clone()),
                    None => records
                        .choose(&mut rand::thread_rng())
                        .map(|r| r.id.clone()),
                };

                let seed = Operation::bulk_insert(vec![records.into()], InsertMode::Serial);
                for engine in self.engines {
                    self.seed(engine.as_ref(), &seed)
                        .map_err(|source| SetupError::Prepare {
                            tier,
                            engine: engine.name().to_string(),
                            source,
                        })?;
                }

                match self.workload {
                    Workload::PointLookup => {
                        let id = lookup_id.ok_or_else(|| {
                            SetupError::Config(format!(
                                "tier {tier} has no records to look up"
                            ))
                        })?;
                        log::debug!("Tier {tier} looks up record {id}");
                        Ok(Operation::PointLookup { id })
                    }
                    _ => Ok(Operation::Aggregate),
                }
            }
        }
    }

    fn seed(&self, engine: &dyn EngineAdapter, seed: &Operation) -> Result<(), AdapterError> {
        let limit = self.config.trial_timeout;
        self.executor
            .execute_trial(engine.execute(&Operation::Clear), limit)?;
        let elapsed = self.executor.execute_trial(engine.execute(seed), limit)?;
        log::debug!(
            "Seeded {} records into {} in {:.3}s",
            seed.record_count(),
            engine.name(),
            elapsed.as_secs_f64()
        );
        Ok(())
    }

    fn run_tier(&self, tier: usize, operation: &Operation, results: &mut BenchmarkResults) {
        let mut samples: BTreeMap<&str, Vec<Sample>> = BTreeMap::new();
        let mut failed: BTreeMap<&str, usize> = BTreeMap::new();

        for trial in 0..self.config.trials {
            if self.shutdown_handle.is_shutdown() {
                log::info!(
                    "Stopping tier {tier} of {} after {trial} trials, shutting down",
                    self.scenario
                );
                break;
            }

            for engine in self.engines {
                let name = engine.name();
                match self.run_trial(engine.as_ref(), trial, operation) {
                    Ok(sample) => samples.entry(name).or_default().push(sample),
                    Err(error) => {
                        log::error!(
                            "Trial {trial} of tier {tier} in {} failed on {name}: {}",
                            self.scenario,
                            error_chain(&error)
                        );
                        *failed.entry(name).or_default() += 1;
                        results.failures.push(TrialFailure {
                            tier,
                            trial,
                            engine: name.to_string(),
                            error,
                        });
                    }
                }
                self.progress.inc(1);
            }
        }

        for engine in self.engines {
            let name = engine.name();
            let stat = reduce(samples.get(name).map(Vec::as_slice).unwrap_or_default());
            results.summaries.push(TierSummary {
                tier,
                engine: name.to_string(),
                trials_failed: failed.get(name).copied().unwrap_or_default(),
                stat,
            });
        }
    }

    /// One engine's part of a trial: reset if writing, run the timed operation, then sample.
    fn run_trial(
        &self,
        engine: &dyn EngineAdapter,
        trial: usize,
        operation: &Operation,
    ) -> Result<Sample, AdapterError> {
        let limit = self.config.trial_timeout;

        if !self.workload.seeds_data() {
            self.executor
                .execute_trial(engine.execute(&Operation::Clear), limit)?;
        }

        let latency = self
            .executor
            .execute_trial(engine.execute(operation), limit)?;

        let readings = engine
            .processes()
            .iter()
            .map(|process| (process.clone(), sample_or_absent(self.sampler, process)))
            .collect();

        Ok(Sample::new(trial, latency.as_secs_f64(), readings))
    }
}
