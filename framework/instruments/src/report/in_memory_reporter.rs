mod operations_table;

use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::Table;

use crate::report::ReportCollector;
use crate::OperationRecord;

pub use operations_table::OperationRow;

/// Keeps every operation in memory and prints a summary of the operations at the end of the run.
///
/// Timings in the summary only include successful operations, failures are counted separately.
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<OperationRow> {
        self.operation_records
            .iter()
            .fold(BTreeMap::<&str, Vec<&OperationRecord>>::new(), |mut acc, record| {
                acc.entry(record.operation_id.as_str())
                    .or_default()
                    .push(record);
                acc
            })
            .into_iter()
            .map(|(operation_id, operations)| {
                let succeeded = operations
                    .iter()
                    .filter(|op| !op.is_error)
                    .map(|op| op.duration().as_secs_f64() * 1000.0)
                    .collect::<Vec<_>>();

                OperationRow {
                    operation_id: operation_id.to_string(),
                    avg_time_ms: (!succeeded.is_empty())
                        .then(|| succeeded.iter().sum::<f64>() / succeeded.len() as f64),
                    min_time_ms: succeeded.iter().copied().reduce(f64::min),
                    max_time_ms: succeeded.iter().copied().reduce(f64::max),
                    total_operations: operations.len(),
                    failed_operations: operations.len() - succeeded.len(),
                }
            })
            .collect()
    }

    pub(crate) fn print_summary_of_operations(&self) {
        let rows = self.rows();
        if rows.is_empty() {
            return;
        }

        println!("\nSummary of operations");
        let mut table = Table::new(rows);
        table.with(Style::modern());

        println!("{table}");
    }
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
    }
}
