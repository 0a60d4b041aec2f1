use tabled::settings::Style;
use tabled::{Table, Tabled};

use model_tunnel_summary_model::TierSummary;

/// One line of the engine comparison, per tier and engine or per tier, engine and process.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct ComparisonRow {
    #[tabled(rename = "Data Size")]
    pub tier: usize,
    #[tabled(rename = "Engine")]
    pub engine: String,
    #[tabled(rename = "Process")]
    pub process: String,
    #[tabled(rename = "Trials")]
    pub trials: usize,
    #[tabled(rename = "Failed")]
    pub failed: usize,
    #[tabled(rename = "Latency (s)", display = "latency")]
    pub mean_latency: Option<f64>,
    #[tabled(rename = "CPU (%)", display = "percent")]
    pub mean_cpu: Option<f64>,
    #[tabled(rename = "MEM (%)", display = "percent")]
    pub mean_mem: Option<f64>,
}

/// Flatten tier summaries into table rows.
///
/// Each engine gets a row for the engine as a whole, marked with process `*`, followed by one row
/// per process when the engine is hosted by more than one.
pub fn comparison_rows(summaries: &[TierSummary]) -> Vec<ComparisonRow> {
    let mut rows = Vec::new();
    for summary in summaries {
        let stat = &summary.stat;
        rows.push(ComparisonRow {
            tier: summary.tier,
            engine: summary.engine.clone(),
            process: "*".to_string(),
            trials: stat.trials,
            failed: summary.trials_failed,
            mean_latency: stat.mean_latency,
            mean_cpu: stat.mean_cpu,
            mean_mem: stat.mean_mem,
        });

        if stat.processes.len() > 1 {
            for (process, means) in &stat.processes {
                rows.push(ComparisonRow {
                    tier: summary.tier,
                    engine: summary.engine.clone(),
                    process: process.clone(),
                    trials: stat.trials,
                    failed: summary.trials_failed,
                    mean_latency: None,
                    mean_cpu: means.mean_cpu,
                    mean_mem: means.mean_mem,
                });
            }
        }
    }
    rows
}

pub fn print_comparison(scenario_name: &str, summaries: &[TierSummary]) {
    println!("\nAverage results for {scenario_name}");
    let mut table = Table::new(comparison_rows(summaries));
    table.with(Style::modern());

    println!("{table}");
}

fn latency(value: &Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

fn percent(value: &Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}
