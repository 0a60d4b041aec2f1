use model_tunnel_engines::prelude::*;

fn main() -> ModelTunnelResult<()> {
    let builder = ScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_workload(Workload::PointLookup)
        .with_default_tiers(vec![1000])
        .use_setup(register_engines);

    run(builder)?;

    Ok(())
}
