use std::ffi::OsStr;

use parking_lot::Mutex;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use model_tunnel_core::prelude::SampleError;

use super::{ResourceSampler, ResourceUsage};

/// Samples processes running on the local host, matched by exact process name.
///
/// CPU is the usage accumulated since the previous sample summed across all matching processes,
/// so it may exceed 100% on multi-core hosts. Memory is resident memory as a percentage of total
/// host memory.
pub struct ProcessSampler {
    system: Mutex<System>,
}

impl std::fmt::Debug for ProcessSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSampler").finish_non_exhaustive()
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta, so take a baseline now.
        refresh(&mut system);
        Self {
            system: Mutex::new(system),
        }
    }
}

fn refresh(system: &mut System) {
    system.refresh_memory();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cpu().with_memory(),
    );
}

impl ResourceSampler for ProcessSampler {
    fn sample(&self, target: &str) -> Result<ResourceUsage, SampleError> {
        let mut system = self.system.lock();
        refresh(&mut system);

        let total_memory = system.total_memory();
        let (matched, cpu, memory) = system
            .processes_by_exact_name(OsStr::new(target))
            .fold((0usize, 0.0f64, 0u64), |(n, cpu, mem), p| {
                (n + 1, cpu + f64::from(p.cpu_usage()), mem + p.memory())
            });

        if matched == 0 {
            return Err(SampleError::NotFound(target.to_string()));
        }
        if total_memory == 0 {
            return Err(SampleError::Malformed {
                target: target.to_string(),
                reason: "host reported no total memory".to_string(),
            });
        }

        Ok(ResourceUsage {
            cpu_percent: cpu,
            mem_percent: memory as f64 / total_memory as f64 * 100.0,
        })
    }
}
