use crate::application::participant::ParticipantContext;
use crate::application::sender::WalletSender;
use crate::domain::{Payment, RetryPolicy, StabilizationPolicy};
use crate::foundation::{LoadError, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::sleep;

/// Seeds every participant from the funder and waits for fleet-wide balance convergence.
///
/// Settlement is asynchronous and unordered across nodes, so a poll round only passes when every
/// participant reports a settled, non-zero balance in the same pass.
pub struct FundingCoordinator {
    funder: Arc<ParticipantContext>,
    fleet: Vec<Arc<ParticipantContext>>,
    stabilization: StabilizationPolicy,
    sender_readiness: RetryPolicy,
}

impl FundingCoordinator {
    /// `fleet` is every participant, funder included.
    pub fn new(
        funder: Arc<ParticipantContext>,
        fleet: Vec<Arc<ParticipantContext>>,
        stabilization: StabilizationPolicy,
        sender_readiness: RetryPolicy,
    ) -> Self {
        Self { funder, fleet, stabilization, sender_readiness }
    }

    /// Returns each participant's stable balance, keyed by address, once the fleet has settled.
    pub async fn ensure_funds(&self, amount_per_participant: u64) -> Result<BTreeMap<String, u64>> {
        let funder_address = self.funder.address();
        let payments: Vec<Payment> = self
            .fleet
            .iter()
            .filter(|ctx| ctx.address() != funder_address)
            .map(|ctx| Payment::new(ctx.wallet().clone(), amount_per_participant))
            .collect();

        if payments.is_empty() {
            info!("funding skipped; no participants besides the funder funder={}", funder_address);
        } else {
            let sender = WalletSender::new(self.funder.node.clone(), self.funder.wallet().clone(), self.sender_readiness);
            let tx = sender.send_payments(&payments).await?;
            info!(
                "funding transaction submitted tx_id={} recipients={} amount_each={}",
                tx.id(),
                payments.len(),
                amount_per_participant
            );
        }

        debug!("waiting for funding to settle settle_delay_ms={}", self.stabilization.settle_delay.as_millis());
        sleep(self.stabilization.settle_delay).await;
        self.await_stable_balances().await
    }

    async fn await_stable_balances(&self) -> Result<BTreeMap<String, u64>> {
        let policy = self.stabilization.rounds;
        let mut pending = self.fleet.iter().map(|ctx| ctx.address()).collect::<Vec<_>>();
        for round in 0..policy.max_attempts {
            let delay = policy.delay_before(round);
            debug!("balance poll round={} delay_ms={}", round, delay.as_millis());
            sleep(delay).await;
            match self.poll_round().await {
                Ok(balances) => {
                    info!("balances stable participants={} round={}", balances.len(), round);
                    return Ok(balances);
                }
                Err(still_pending) => pending = still_pending,
            }
        }
        warn!("balances failed to stabilise attempts={} pending={:?}", policy.max_attempts, pending);
        Err(LoadError::StabilizationTimeout { attempts: policy.max_attempts, pending })
    }

    /// Abandons the pass at the first participant that is unreachable or not yet ready, returning
    /// it and everyone not yet polled.
    async fn poll_round(&self) -> std::result::Result<BTreeMap<String, u64>, Vec<String>> {
        let mut balances = BTreeMap::new();
        for (index, ctx) in self.fleet.iter().enumerate() {
            let address = ctx.address();
            let ready = match ctx.node.get_balance(&address).await {
                Ok(balance) if balance.is_ready() => {
                    debug!("balance settled address={} stable={}", address, balance.stable);
                    balances.insert(address, balance.stable);
                    true
                }
                Ok(balance) => {
                    debug!("balance not settled address={} stable={} unstable={}", address, balance.stable, balance.unstable);
                    false
                }
                Err(err) => {
                    warn!("balance query failed address={} error={}", address, err);
                    false
                }
            };
            if !ready {
                return Err(self.fleet[index..].iter().map(|ctx| ctx.address()).collect());
            }
        }
        Ok(balances)
    }
}
