//! Binds a loaded configuration to node clients and drives one load run.

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use txload_core::application::{Orchestrator, RunOutcome, RunSettings};
use txload_core::domain::{LoadResult, RetryPolicy, StabilizationPolicy};
use txload_core::foundation::{LoadError, Result};
use txload_core::infrastructure::config::LoadConfig;
use txload_core::infrastructure::rpc::{HttpNodeApi, MemoryLedger, MemoryNode, NodeApi};

use crate::report::write_result;

/// Orchestrator talking to the configured nodes over HTTPS.
pub fn connect_nodes(config: &LoadConfig) -> Result<Orchestrator> {
    let options = config.node_client_options();
    Orchestrator::connect(config.participants(), RunSettings::from_config(config), |participant| {
        let api: Arc<dyn NodeApi> = Arc::new(HttpNodeApi::new(participant, &options)?);
        Ok(api)
    })
}

/// Orchestrator over an in-process ledger with every wait zeroed.
///
/// The funder starts with enough to fund the fleet and prepare its own share.
pub fn connect_dry_run(config: &LoadConfig) -> Result<(Orchestrator, Arc<MemoryLedger>)> {
    let participants = config.participants();
    let funder = participants.first().ok_or_else(|| LoadError::ConfigError("no participants configured".to_string()))?;
    let grant = config
        .transactions_per_node
        .checked_mul(participants.len() as u64)
        .ok_or_else(|| LoadError::ConfigError("transactions_per_node too large for a dry run".to_string()))?;

    let ledger = Arc::new(MemoryLedger::new());
    for participant in &participants {
        ledger.register_wallet(&participant.wallet)?;
    }
    ledger.fund(&funder.wallet, grant)?;
    info!("dry run ledger ready participants={} funder={} grant={}", participants.len(), funder.address(), grant);

    let mut settings = RunSettings::from_config(config);
    settings.stabilization =
        StabilizationPolicy { settle_delay: Duration::ZERO, rounds: RetryPolicy::immediate(settings.stabilization.rounds.max_attempts) };
    settings.sender_readiness = RetryPolicy::immediate(settings.sender_readiness.max_attempts);
    settings.prepare_cooldown = Duration::ZERO;

    let orchestrator = Orchestrator::connect(participants, settings, |participant| {
        let api: Arc<dyn NodeApi> = Arc::new(MemoryNode::new(ledger.clone(), participant.identity.id.clone()));
        Ok(api)
    })?;
    Ok((orchestrator, ledger))
}

/// Runs the load test and persists the result. Nothing is written when the run fails.
pub async fn run_and_report(orchestrator: &Orchestrator, result_path: &Path) -> Result<LoadResult> {
    match orchestrator.run().await {
        RunOutcome::Succeeded(result) => {
            write_result(result_path, &result)?;
            Ok(result)
        }
        RunOutcome::Halted { defect, error } => {
            warn!("load run halted without a result defect={}", defect);
            Err(error)
        }
        RunOutcome::Failed(error) => Err(error),
    }
}
