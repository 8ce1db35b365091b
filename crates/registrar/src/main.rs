mod cli;
mod owners;

use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, WrapErr};

use registrar_core::genesis::seed_chain;
use registrar_core::rpc::{HttpRpcClient, NodeRpc};
use registrar_core::{Registrar, RegistryLayout};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let rpc = HttpRpcClient::new(args.rpc_rps).wrap_err("build RPC client")?;

    match args.command {
        cli::Command::Update(update) => run_update(Arc::new(rpc), update).await,
        cli::Command::Seed(seed) => run_seed(&rpc, seed).await,
    }
}

async fn run_update(rpc: Arc<dyn NodeRpc>, args: cli::UpdateArgs) -> eyre::Result<()> {
    let mut chains = args.chains.clone();
    if let (Some(path), Some(owner)) = (&args.codeowners, &args.owner) {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read CODEOWNERS file {}", path.display()))?;
        let owned = owners::select_chains(&content, owner);
        tracing::info!(owner = %owner, chains = owned.len(), "selected chains from CODEOWNERS");
        chains.extend(owned);
    }
    dedupe(&mut chains);
    if chains.is_empty() {
        return Err(eyre!(
            "no chains selected; pass --chain or --codeowners with --owner"
        ));
    }

    let registrar = Registrar::new(
        rpc,
        RegistryLayout::new(&args.registry),
        args.tuning.refresh_config(),
    )
    .wrap_err("configure registrar")?;

    let results = registrar.refresh_chains(&chains).await;
    let mut failed = 0;
    for (chain_id, result) in &results {
        match result {
            Ok(report) => println!(
                "{chain_id}: light root {} ({}/{} peers reachable)",
                report.root, report.reachable, report.known
            ),
            Err(e) => {
                failed += 1;
                println!("{chain_id}: failed: {e}");
            }
        }
    }

    if failed > 0 {
        return Err(eyre!(
            "{failed} of {} chains failed to refresh",
            results.len()
        ));
    }
    Ok(())
}

async fn run_seed(rpc: &dyn NodeRpc, args: cli::SeedArgs) -> eyre::Result<()> {
    let layout = RegistryLayout::new(&args.registry);
    let report = seed_chain(rpc, &layout, &args.rpc_url, args.chain_id.as_deref())
        .await
        .wrap_err_with(|| format!("seed chain from {}", args.rpc_url))?;

    println!();
    println!("  Seeded {}:", report.chain_id);
    println!("    Seed peer:    {} ({})", report.seed.id, report.seed.address);
    println!("    Light root:   {}", report.root);
    println!("    Genesis sum:  {}", report.genesis_sum);
    if !report.genesis_written {
        println!("    (existing genesis kept)");
    }
    println!();
    Ok(())
}

/// Drop repeated chain ids, keeping the first occurrence.
fn dedupe(chains: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    chains.retain(|chain| seen.insert(chain.clone()));
}
