use model_tunnel_engines::prelude::*;

fn main() -> ModelTunnelResult<()> {
    let builder = ScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_workload(Workload::BulkInsert)
        .with_default_tiers(vec![100, 1000, 5000])
        .use_setup(register_engines);

    let outcome = run(builder)?;
    if !outcome.failures.is_empty() {
        log::warn!(
            "{} trials failed, see the log above for details",
            outcome.failures.len()
        );
    }

    Ok(())
}
