use std::collections::BTreeMap;
use std::time::{Duration, Instant};

mod report;
mod resource;

pub use report::{
    comparison_rows, print_comparison, ComparisonRow, InMemoryReporter, OperationRow,
    ReportCollector, ReportConfig, Reporter,
};
pub use resource::{
    docker_path, parse_percent, sample_or_absent, DisabledSampler, DockerStatsSampler,
    ProcessSampler, ResourceSampler, ResourceUsage, SamplerKind, MT_DOCKER_PATH_ENV,
};

/// Timing of a single backend operation, started when the record is created.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub is_error: bool,
    pub attr: BTreeMap<String, String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attr.insert(key.into(), value.to_string());
        self
    }

    /// Stop the clock. Only the first call has an effect.
    pub fn finish<T, E>(&mut self, response: &Result<T, E>) -> Duration {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
            self.is_error = response.is_err();
        }
        self.duration()
    }

    /// Elapsed time once finished, or the time running so far.
    pub fn duration(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }
}

/// Finish `record` against `response` and hand it to the reporter.
///
/// Returns the measured duration.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    mut record: OperationRecord,
    response: &Result<T, E>,
) -> Duration {
    let elapsed = record.finish(response);
    log::trace!(
        "Operation {} took {:.3}ms, failed? {}",
        record.operation_id,
        elapsed.as_secs_f64() * 1000.0,
        record.is_error
    );
    reporter.add_operation(&record);
    elapsed
}
