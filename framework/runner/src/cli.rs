use std::path::PathBuf;

use clap::Parser;

use model_tunnel_instruments::SamplerKind;

use crate::config::HarnessOverrides;

#[derive(Debug, Clone, Default, Parser)]
#[command(about, long_about = None)]
pub struct ModelTunnelScenarioCli {
    /// Path to a TOML configuration file.
    ///
    /// Falls back to the `MT_CONFIG` environment variable. Values given on the command line take
    /// precedence over values in the file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The number of trials to run per tier and engine
    #[clap(long)]
    pub trials: Option<usize>,

    /// The number of concurrent workers used by concurrent bulk inserts
    #[clap(long)]
    pub workers: Option<usize>,

    /// The data-size tiers to run, in order. For example `--tiers 100,1000,5000`.
    ///
    /// A tier is the total number of records. Concurrent inserts split it across the workers.
    #[clap(long, value_delimiter = ',')]
    pub tiers: Vec<usize>,

    /// The record id to look up in point lookup scenarios.
    ///
    /// Defaults to a random record from the data seeded for each tier.
    #[clap(long)]
    pub lookup_id: Option<String>,

    /// Seconds a single operation may take before its trial is recorded as failed
    #[clap(long)]
    pub trial_timeout_s: Option<u64>,

    /// How resource usage is sampled: `docker`, `process` or `disabled`
    #[clap(long)]
    pub sampler: Option<SamplerKind>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Set a custom run ID for this scenario.
    ///
    /// Defaults to a random ID.
    #[clap(long)]
    pub run_id: Option<String>,

    /// File to append the run summary to.
    ///
    /// Falls back to the `RUN_SUMMARY_PATH` environment variable, then `run_summary.jsonl`.
    #[clap(long)]
    pub run_summary: Option<PathBuf>,
}

impl ModelTunnelScenarioCli {
    pub(crate) fn overrides(&self) -> HarnessOverrides {
        HarnessOverrides {
            trials: self.trials,
            workers: self.workers,
            tiers: (!self.tiers.is_empty()).then(|| self.tiers.clone()),
            lookup_id: self.lookup_id.clone(),
            trial_timeout_s: self.trial_timeout_s,
            sampler: self.sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_list_and_sampler() {
        let cli = ModelTunnelScenarioCli::try_parse_from([
            "scalability",
            "--tiers",
            "100,1000,5000",
            "--sampler",
            "process",
            "--trials",
            "5",
            "--no-progress",
        ])
        .unwrap();

        assert_eq!(vec![100, 1000, 5000], cli.tiers);
        assert_eq!(Some(SamplerKind::Process), cli.sampler);
        assert!(cli.no_progress);

        let overrides = cli.overrides();
        assert_eq!(Some(5), overrides.trials);
        assert_eq!(None, overrides.workers);
        assert_eq!(Some(vec![100, 1000, 5000]), overrides.tiers);
    }

    #[test]
    fn rejects_unknown_sampler() {
        assert!(ModelTunnelScenarioCli::try_parse_from(["single_query", "--sampler", "perf"]).is_err());
    }
}
