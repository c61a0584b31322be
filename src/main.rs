use anyhow::{Context as _, Result};
use clap::Parser;
use obesity_dash::binding::Registry;
use obesity_dash::config::{init_tracing, Args};
use obesity_dash::context::Context;
use obesity_dash::dataset::RecordTable;
use obesity_dash::server::{serve, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let table = RecordTable::load(&args.data, &args.label_field)
        .with_context(|| format!("Failed to load dataset from {}", args.data.display()))?;
    let ctx = Arc::new(Context::new(table));
    let registry = Arc::new(Registry::dashboard(&ctx).context("Failed to build dashboard bindings")?);
    info!(controls = registry.controls().len(), slots = registry.bindings().len(), "bindings ready");

    let state = Arc::new(AppState::new(ctx, registry, args.max_sessions));
    serve(args.addr(), state)
        .await
        .with_context(|| format!("Failed to serve on {}", args.addr()))?;

    Ok(())
}
