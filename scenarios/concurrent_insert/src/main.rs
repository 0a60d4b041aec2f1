use model_tunnel_engines::prelude::*;

fn teardown(ctx: &mut RunnerContext) -> HookResult {
    // Leave the stores empty for whichever scenario runs next.
    for engine in ctx.engines() {
        ctx.executor()
            .execute_in_place(async {
                engine.execute(&Operation::Clear).await?;
                Ok::<_, anyhow::Error>(())
            })?;
        log::info!("Cleared {}", engine.name());
    }

    Ok(())
}

fn main() -> ModelTunnelResult<()> {
    // 1000 products split across 5 workers, 200 each.
    let builder = ScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_workload(Workload::ConcurrentInsert)
        .with_default_workers(5)
        .with_default_tiers(vec![1000])
        .use_setup(register_engines)
        .use_teardown(teardown);

    run(builder)?;

    Ok(())
}
