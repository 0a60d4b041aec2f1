use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point-in-time resource reading for one process.
///
/// A missing value means the sampler could not produce one. It is not the same as `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReading {
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
}

impl ResourceReading {
    pub fn new(cpu_percent: f64, mem_percent: f64) -> Self {
        Self {
            cpu_percent: Some(cpu_percent),
            mem_percent: Some(mem_percent),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

/// The measurement of one trial against one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Index of the trial within its tier, starting at zero.
    pub trial: usize,
    pub latency_seconds: f64,
    /// Summed over all of the engine's processes. Absent if any process lacked a reading.
    pub cpu_percent: Option<f64>,
    /// Summed over all of the engine's processes. Absent if any process lacked a reading.
    pub mem_percent: Option<f64>,
    /// Reading per sampled process identity.
    pub processes: BTreeMap<String, ResourceReading>,
}

impl Sample {
    pub fn new(
        trial: usize,
        latency_seconds: f64,
        processes: BTreeMap<String, ResourceReading>,
    ) -> Self {
        let cpu_percent = sum_all(processes.values().map(|r| r.cpu_percent));
        let mem_percent = sum_all(processes.values().map(|r| r.mem_percent));

        Self {
            trial,
            latency_seconds,
            cpu_percent,
            mem_percent,
            processes,
        }
    }
}

/// Sum of the values, or `None` if there are none or any of them is missing.
fn sum_all(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut total = None;
    for value in values {
        total = Some(total.unwrap_or(0.0) + value?);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_usage_sums_processes() {
        let processes = BTreeMap::from([
            ("mongodb".to_string(), ResourceReading::new(10.0, 2.5)),
            ("neo4j".to_string(), ResourceReading::new(30.0, 7.5)),
        ]);

        let sample = Sample::new(0, 0.25, processes);
        assert_eq!(Some(40.0), sample.cpu_percent);
        assert_eq!(Some(10.0), sample.mem_percent);
    }

    #[test]
    fn partial_readings_leave_engine_usage_absent() {
        let processes = BTreeMap::from([
            ("mongodb".to_string(), ResourceReading::new(10.0, 2.5)),
            (
                "neo4j".to_string(),
                ResourceReading {
                    cpu_percent: None,
                    mem_percent: Some(7.5),
                },
            ),
        ]);

        let sample = Sample::new(1, 0.25, processes);
        assert_eq!(None, sample.cpu_percent);
        assert_eq!(Some(10.0), sample.mem_percent);
    }

    #[test]
    fn no_processes_means_no_usage() {
        let sample = Sample::new(0, 1.0, BTreeMap::new());
        assert_eq!(None, sample.cpu_percent);
        assert_eq!(None, sample.mem_percent);
    }
}
