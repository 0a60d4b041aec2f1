use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

mod aggregate;
mod sample;

pub use aggregate::{mean_present, reduce, ResourceMeans, SummaryStat};
pub use sample::{ResourceReading, Sample};

/// Statistics for one engine in one tier of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    /// The data-size value of the tier.
    pub tier: usize,
    pub engine: String,
    /// Trials that failed and were excluded from [TierSummary::stat].
    pub trials_failed: usize,
    pub stat: SummaryStat,
}

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The operation measured by the scenario, e.g. `aggregate`.
    pub workload: String,
    /// The number of trials configured per tier
    pub trials: usize,
    /// The number of concurrent workers configured for bulk inserts
    pub workers: usize,
    /// The data-size tiers, in the order they were run
    pub tiers: Vec<usize>,
    /// The engines compared, in the order they were invoked within a trial
    pub engines: Vec<String>,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the runner is aware of.
    pub env: HashMap<String, String>,
    /// The version of Model Tunnel that was used for this run
    pub model_tunnel_version: String,
    /// Per tier and engine results
    ///
    /// Empty until the run has finished.
    #[serde(default)]
    pub results: Vec<TierSummary>,
}

impl RunSummary {
    /// Create a new run summary
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        workload: String,
        trials: usize,
        workers: usize,
        tiers: Vec<usize>,
        model_tunnel_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            workload,
            trials,
            workers,
            tiers,
            engines: Vec::new(),
            env: HashMap::with_capacity(0),
            model_tunnel_version,
            results: Vec::new(),
        }
    }

    pub fn set_engines(&mut self, engines: Vec<String>) {
        self.engines = engines;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    pub fn set_results(&mut self, results: Vec<TierSummary>) {
        self.results = results;
    }

    /// Look up the result for an engine in a tier.
    pub fn result_for(&self, tier: usize, engine: &str) -> Option<&TierSummary> {
        self.results
            .iter()
            .find(|r| r.tier == tier && r.engine == engine)
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to uniquely identify the configuration used to run the scenario.
    /// It uses the
    ///     - Scenario name
    ///     - Workload
    ///     - Trial and worker counts
    ///     - Tiers
    ///     - Engines
    ///     - Selected environment variables
    ///     - Model Tunnel version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        Digest::update(&mut hasher, self.workload.as_bytes());
        Digest::update(&mut hasher, (self.trials as u64).to_le_bytes());
        Digest::update(&mut hasher, (self.workers as u64).to_le_bytes());
        for tier in &self.tiers {
            Digest::update(&mut hasher, (*tier as u64).to_le_bytes());
        }
        for engine in &self.engines {
            Digest::update(&mut hasher, engine.as_bytes());
        }
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.model_tunnel_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_summary_runs(path: impl AsRef<Path>) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
