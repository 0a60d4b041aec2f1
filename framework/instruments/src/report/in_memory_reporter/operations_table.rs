use tabled::Tabled;

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    #[tabled(display = "float2_or_na")]
    pub avg_time_ms: Option<f64>,
    #[tabled(display = "float2_or_na")]
    pub min_time_ms: Option<f64>,
    #[tabled(display = "float2_or_na")]
    pub max_time_ms: Option<f64>,
    pub total_operations: usize,
    pub failed_operations: usize,
}

fn float2_or_na(n: &Option<f64>) -> String {
    match n {
        Some(n) => format!("{:.2}", n),
        None => "n/a".to_string(),
    }
}
