mod comparison_table;
mod in_memory_reporter;

use parking_lot::Mutex;

use crate::OperationRecord;

pub use comparison_table::{comparison_rows, print_comparison, ComparisonRow};
pub use in_memory_reporter::{InMemoryReporter, OperationRow};

pub trait ReportCollector: Send {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    fn finalize(&self);
}

/// Select which collectors receive operation records.
#[derive(Debug, Default)]
pub struct ReportConfig {
    in_memory: bool,
}

impl ReportConfig {
    pub fn enable_in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector>> = Vec::new();
        if self.in_memory {
            collectors.push(Box::new(InMemoryReporter::new()));
        }
        Reporter::new(collectors)
    }
}

/// Shared entry point for recording operations from any worker.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector>>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

impl Reporter {
    pub fn new(collectors: Vec<Box<dyn ReportCollector>>) -> Self {
        Self {
            collectors: collectors.into_iter().map(Mutex::new).collect(),
        }
    }

    /// A reporter that drops everything.
    pub fn noop() -> Self {
        Self::new(Vec::new())
    }

    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}
