use crate::application::dispatch::{DispatchEngine, DispatchSettings};
use crate::application::fanout::fan_out;
use crate::application::funding::FundingCoordinator;
use crate::application::participant::ParticipantContext;
use crate::application::preparer::OutputPreparer;
use crate::domain::{LoadResult, Participant, RetryPolicy, StabilizationPolicy, WalletAddress};
use crate::foundation::util::time::{now_utc, throughput};
use crate::foundation::{Defect, LoadError, LoadPhase, Result};
use crate::infrastructure::config::LoadConfig;
use crate::infrastructure::rpc::NodeApi;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Immutable run parameters handed to every phase.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    pub transactions_per_node: u64,
    pub outputs_per_batch: u64,
    pub receiver: WalletAddress,
    pub stabilization: StabilizationPolicy,
    pub sender_readiness: RetryPolicy,
    pub prepare_cooldown: Duration,
    pub dispatch: DispatchSettings,
}

impl RunSettings {
    pub fn from_config(config: &LoadConfig) -> Self {
        Self {
            transactions_per_node: config.transactions_per_node,
            outputs_per_batch: config.outputs_per_transaction,
            receiver: config.receiver(),
            stabilization: config.stabilization(),
            sender_readiness: config.sender_readiness(),
            prepare_cooldown: config.prepare_cooldown(),
            dispatch: DispatchSettings {
                worker_count: config.worker_count,
                sign_policy: config.sign_policy(),
                fresh_worker_address: config.dispatch.fresh_worker_address,
                progress_every: config.dispatch.progress_every,
            },
        }
    }
}

/// Terminal state of a load run.
#[derive(Debug)]
pub enum RunOutcome {
    Succeeded(LoadResult),
    /// First participant failure, tagged with its phase and participant.
    Failed(LoadError),
    /// A transaction broke value conservation; the run stopped without a result.
    Halted { defect: Defect, error: LoadError },
}

impl RunOutcome {
    pub fn into_result(self) -> Result<LoadResult> {
        match self {
            RunOutcome::Succeeded(result) => Ok(result),
            RunOutcome::Failed(error) | RunOutcome::Halted { error, .. } => Err(error),
        }
    }
}

/// Runs funding, preparation and dispatch across the fleet with a barrier between phases.
pub struct Orchestrator {
    contexts: Vec<Arc<ParticipantContext>>,
    settings: RunSettings,
}

impl Orchestrator {
    /// The first participant is the funder.
    pub fn new(contexts: Vec<Arc<ParticipantContext>>, settings: RunSettings) -> Self {
        Self { contexts, settings }
    }

    /// Binds each participant to the node `connect` returns for it.
    pub fn connect<C>(participants: Vec<Participant>, settings: RunSettings, connect: C) -> Result<Self>
    where
        C: Fn(&Participant) -> Result<Arc<dyn NodeApi>>,
    {
        let contexts = participants
            .into_iter()
            .map(|participant| {
                let node = connect(&participant)?;
                Ok(Arc::new(ParticipantContext::new(participant, node)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(contexts, settings))
    }

    pub fn participants(&self) -> &[Arc<ParticipantContext>] {
        &self.contexts
    }

    pub async fn run(&self) -> RunOutcome {
        match self.execute().await {
            Ok(result) => RunOutcome::Succeeded(result),
            Err(error) => match error.defect().cloned() {
                Some(defect) => {
                    error!("load run halted defect={} error={}", defect, error);
                    RunOutcome::Halted { defect, error }
                }
                None => {
                    error!("load run failed error={}", error);
                    RunOutcome::Failed(error)
                }
            },
        }
    }

    async fn execute(&self) -> Result<LoadResult> {
        let funder = self.contexts.first().cloned().ok_or_else(|| LoadError::ConfigError("no participants configured".to_string()))?;
        let node_count = self.contexts.len() as u64;
        let per_node = self.settings.transactions_per_node;
        let total = node_count.saturating_mul(per_node);
        info!("load run starting nodes={} total_transactions={}", node_count, total);

        info!("phase starting phase={}", LoadPhase::Funding);
        let funding = FundingCoordinator::new(
            funder.clone(),
            self.contexts.clone(),
            self.settings.stabilization,
            self.settings.sender_readiness,
        );
        let balances = funding.ensure_funds(per_node).await.map_err(|err| err.in_phase(LoadPhase::Funding, funder.address()))?;
        for (address, stable) in &balances {
            info!("starting balance address={} stable={}", address, stable);
        }

        info!("phase starting phase={}", LoadPhase::Preparation);
        let outputs_per_batch = self.settings.outputs_per_batch;
        let cooldown = self.settings.prepare_cooldown;
        let prepared = fan_out(self.contexts.clone(), |ctx| async move {
            OutputPreparer::new(ctx.clone(), cooldown)
                .prepare_outputs(per_node, outputs_per_batch)
                .await
                .map_err(|err| err.in_phase(LoadPhase::Preparation, ctx.address()))
        })
        .await?;
        info!("outputs prepared participants={}", prepared.len());

        info!("phase starting phase={}", LoadPhase::Dispatch);
        let start_time = now_utc();
        let started = Instant::now();
        let dispatch = self.settings.dispatch.clone();
        let receiver = self.settings.receiver.clone();
        let work = self.contexts.iter().cloned().zip(prepared).collect::<Vec<_>>();
        let reports = fan_out(work, |(ctx, batches)| {
            let dispatch = dispatch.clone();
            let receiver = receiver.clone();
            async move {
                let sent = async {
                    let keys = ctx.key_material().await?;
                    DispatchEngine::new(ctx.node.clone(), dispatch).send_transactions(&batches, keys, ctx.wallet(), &receiver).await
                };
                let report = sent.await.map_err(|err| err.in_phase(LoadPhase::Dispatch, ctx.address()))?;
                Ok((ctx.address(), report))
            }
        })
        .await?;
        let elapsed = started.elapsed();
        let end_time = now_utc();

        for (address, report) in &reports {
            info!(
                "participant dispatch report address={} queued={} succeeded={} elapsed_ms={} tps={:.2}",
                address,
                report.queued,
                report.succeeded,
                report.elapsed.as_millis(),
                report.tps
            );
        }
        let achieved_tps = throughput(total, elapsed);
        info!("load run finished nodes={} total_transactions={} elapsed_ms={} achieved_tps={:.2}", node_count, total, elapsed.as_millis(), achieved_tps);

        Ok(LoadResult { start_time, end_time, total_transactions: total, node_count, achieved_tps })
    }
}
