mod docker;
mod process;

use std::str::FromStr;

use serde::Deserialize;

use model_tunnel_core::prelude::{error_chain, SampleError};
use model_tunnel_summary_model::ResourceReading;

pub use docker::{docker_path, DockerStatsSampler, MT_DOCKER_PATH_ENV};
pub use process::ProcessSampler;

/// A point-in-time utilisation of one process or container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// Polls a named external process for its current CPU and memory utilisation.
///
/// Implementations must not retry. A sample is taken straight after a trial and anything slow
/// here delays the next trial.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self, target: &str) -> Result<ResourceUsage, SampleError>;
}

/// Take a sample, recording an absent reading if the sampler fails.
pub fn sample_or_absent(sampler: &dyn ResourceSampler, target: &str) -> ResourceReading {
    match sampler.sample(target) {
        Ok(usage) => ResourceReading::new(usage.cpu_percent, usage.mem_percent),
        Err(SampleError::Disabled) => {
            log::trace!("Skipping resource sample for {target}, sampling is disabled");
            ResourceReading::absent()
        }
        Err(e) => {
            log::warn!("No resource sample for {target}: {}", error_chain(&e));
            ResourceReading::absent()
        }
    }
}

/// Parse a percentage such as `12.34%`.
///
/// Exactly one trailing `%` is accepted. Anything that is not a finite, non-negative number is
/// rejected, including placeholders like `--` that docker prints for stopped containers.
pub fn parse_percent(value: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if number.is_empty() {
        return Err(format!("empty percentage `{value}`"));
    }

    let parsed: f64 = number
        .parse()
        .map_err(|_| format!("not a percentage: `{value}`"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(format!("out of range percentage: `{value}`"));
    }

    Ok(parsed)
}

/// Always fails with [SampleError::Disabled], so every reading is absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSampler;

impl ResourceSampler for DisabledSampler {
    fn sample(&self, _target: &str) -> Result<ResourceUsage, SampleError> {
        Err(SampleError::Disabled)
    }
}

/// Which sampler the harness should use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Query container statistics through `docker stats`.
    #[default]
    Docker,
    /// Inspect processes on the local host.
    Process,
    Disabled,
}

impl FromStr for SamplerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "process" => Ok(Self::Process),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(format!(
                "unknown sampler `{other}`, expected one of docker, process, disabled"
            )),
        }
    }
}

impl SamplerKind {
    /// Build the sampler.
    ///
    /// A docker sampler that cannot find a docker binary degrades to [DisabledSampler] so the
    /// benchmark still runs, with absent resource readings.
    pub fn build(self) -> Box<dyn ResourceSampler> {
        match self {
            Self::Docker => match DockerStatsSampler::new() {
                Ok(sampler) => Box::new(sampler),
                Err(e) => {
                    log::warn!("Resource sampling disabled: {e:#}");
                    Box::new(DisabledSampler)
                }
            },
            Self::Process => Box::new(ProcessSampler::new()),
            Self::Disabled => Box::new(DisabledSampler),
        }
    }
}
