use crate::application::participant::ParticipantContext;
use crate::domain::{build_transfer, largest_output, ChangePlacement, Payment, PreparedBatch, UnspentOutput};
use crate::foundation::{LoadError, Result, CHANGE_OUTPUT_POSITION, UNIT_AMOUNT};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Splits a participant's largest output into unit outputs through a chain of self-payments.
///
/// Each round spends the previous round's change output. That output is synthesized locally from
/// the signed transaction instead of being re-queried, so rounds never wait for confirmation. A
/// round that lands before its parent is accepted fails at submission like any other rejected
/// submission.
pub struct OutputPreparer {
    context: Arc<ParticipantContext>,
    cooldown: Duration,
}

impl OutputPreparer {
    pub fn new(context: Arc<ParticipantContext>, cooldown: Duration) -> Self {
        Self { context, cooldown }
    }

    /// Runs `total_outputs / outputs_per_batch` rounds in sequence; the remainder is dropped.
    pub async fn prepare_outputs(&self, total_outputs: u64, outputs_per_batch: u64) -> Result<Vec<PreparedBatch>> {
        if outputs_per_batch == 0 {
            return Err(LoadError::ConfigError("outputs_per_batch must be > 0".to_string()));
        }
        let ctx = &self.context;
        let wallet = ctx.wallet();
        info!("preparing outputs address={} total_outputs={} outputs_per_batch={}", wallet, total_outputs, outputs_per_batch);

        ctx.node.verify_identity().await?;
        let outputs = ctx.node.list_unspent_outputs(&wallet.key_identifier).await?;
        debug!("preparation outputs listed address={} count={}", wallet, outputs.len());
        let mut root = largest_output(outputs).ok_or_else(|| LoadError::NoUnspentOutputs { address: wallet.address() })?;
        if root.amount < total_outputs {
            return Err(LoadError::InsufficientRootOutput { available: root.amount, required: total_outputs });
        }

        let keys = ctx.key_material().await?;
        let batch_size = usize::try_from(outputs_per_batch)
            .map_err(|_| LoadError::ConfigError(format!("outputs_per_batch too large: {outputs_per_batch}")))?;
        let batch_positions = u32::try_from(outputs_per_batch)
            .map_err(|_| LoadError::ConfigError(format!("outputs_per_batch too large: {outputs_per_batch}")))?;
        let payments = vec![Payment::new(wallet.clone(), UNIT_AMOUNT); batch_size];
        let change_to = wallet.change_address();
        let rounds = total_outputs / outputs_per_batch;
        let mut batches = Vec::with_capacity(usize::try_from(rounds).unwrap_or_default());

        for round in 1..=rounds {
            debug!("preparation round={} root_tx={} root_position={} root_amount={}", round, root.transaction_id, root.output_position, root.amount);
            let tx = build_transfer(std::slice::from_ref(&root), &payments, &change_to, ChangePlacement::Leading)?;
            let signed = ctx.node.sign_transaction(&tx, keys).await?;
            ctx.node.submit_transaction(&signed).await?;

            let remaining = root.amount - outputs_per_batch;
            let unit_positions = if remaining > 0 { (1..=batch_positions).collect() } else { (0..batch_positions).collect() };
            info!("preparation round submitted address={} round={} tx_id={} remaining={}", wallet, round, signed.id(), remaining);

            root = UnspentOutput {
                transaction_id: signed.transaction_id.clone(),
                shard_id: signed.shard_id.clone(),
                output_position: CHANGE_OUTPUT_POSITION,
                address: change_to.address(),
                address_base: change_to.base.clone(),
                address_key_identifier: change_to.key_identifier.clone(),
                amount: remaining,
                transaction_date: signed.transaction_date.parse().unwrap_or_default(),
                address_version: root.address_version.clone(),
            };
            batches.push(PreparedBatch { transaction: signed, unit_positions });
        }

        info!("preparation rounds done address={} rounds={} cooldown_ms={}", wallet, batches.len(), self.cooldown.as_millis());
        sleep(self.cooldown).await;
        let refreshed = ctx.node.list_unspent_outputs(&wallet.key_identifier).await?;
        debug!("post-preparation outputs address={} count={}", wallet, refreshed.len());
        Ok(batches)
    }
}
