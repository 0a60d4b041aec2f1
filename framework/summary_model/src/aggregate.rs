use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Mean resource usage of one process over a set of trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeans {
    pub mean_cpu: Option<f64>,
    pub mean_mem: Option<f64>,
}

/// Summary of the samples of one engine within one tier of one scenario.
///
/// Derived from samples and never updated in place. Re-aggregating produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStat {
    /// Number of successful trials that contributed.
    pub trials: usize,
    /// Absent only when no trial succeeded.
    pub mean_latency: Option<f64>,
    pub mean_cpu: Option<f64>,
    pub mean_mem: Option<f64>,
    pub processes: BTreeMap<String, ResourceMeans>,
}

impl SummaryStat {
    /// True when nothing could be measured, e.g. every trial failed.
    pub fn is_absent(&self) -> bool {
        self.mean_latency.is_none() && self.mean_cpu.is_none() && self.mean_mem.is_none()
    }
}

/// Reduce an engine's samples into a [SummaryStat].
///
/// Latency is averaged over every sample. Resource means only include samples where the value
/// is present and are absent when no sample has one.
pub fn reduce(samples: &[Sample]) -> SummaryStat {
    let mean_latency = mean_present(samples.iter().map(|s| Some(s.latency_seconds)));
    let mean_cpu = mean_present(samples.iter().map(|s| s.cpu_percent));
    let mean_mem = mean_present(samples.iter().map(|s| s.mem_percent));

    let mut readings: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for sample in samples {
        for (process, reading) in &sample.processes {
            readings.entry(process.as_str()).or_default().push(*reading);
        }
    }

    let processes = readings
        .into_iter()
        .map(|(process, readings)| {
            let means = ResourceMeans {
                mean_cpu: mean_present(readings.iter().map(|r| r.cpu_percent)),
                mean_mem: mean_present(readings.iter().map(|r| r.mem_percent)),
            };
            (process.to_string(), means)
        })
        .collect();

    SummaryStat {
        trials: samples.len(),
        mean_latency,
        mean_cpu,
        mean_mem,
        processes,
    }
}

/// Mean of the present values, `None` if no value is present.
pub fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}
