#[path = "txload/cli.rs"]
mod cli;
#[path = "txload/setup.rs"]
mod setup;

use crate::cli::Cli;
use log::{error, info};
use txload_service::runner::{connect_dry_run, connect_nodes, run_and_report};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse_args();
    setup::init_logging(&args)?;
    let (config_path, result_path) = setup::paths(&args);
    info!("txload starting config={} result={} dry_run={}", config_path.display(), result_path.display(), args.dry_run);

    let config = setup::load_run_config(&config_path)?;
    info!(
        "config loaded nodes={} transactions_per_node={} outputs_per_transaction={} worker_count={}",
        config.nodes.len(),
        config.transactions_per_node,
        config.outputs_per_transaction,
        config.worker_count
    );

    let orchestrator = if args.dry_run { connect_dry_run(&config)?.0 } else { connect_nodes(&config)? };
    match run_and_report(&orchestrator, &result_path).await {
        Ok(result) => {
            info!("txload finished total_transactions={} achieved_tps={:.2}", result.total_transactions, result.achieved_tps);
            Ok(())
        }
        Err(err) => {
            error!("txload failed error={}", err);
            Err(err.into())
        }
    }
}
