use crate::application::participant::key_material_for_outputs;
use crate::domain::{build_transfer, select_outputs, ChangePlacement, Payment, RetryPolicy, SignedTransaction, WalletAddress};
use crate::foundation::{Defect, LoadError, Result};
use crate::infrastructure::rpc::{retry_if, NodeApi};
use log::{debug, info};
use std::sync::Arc;

/// Spends from one wallet through its own node.
pub struct WalletSender {
    node: Arc<dyn NodeApi>,
    wallet: WalletAddress,
    readiness: RetryPolicy,
}

impl WalletSender {
    pub fn new(node: Arc<dyn NodeApi>, wallet: WalletAddress, readiness: RetryPolicy) -> Self {
        Self { node, wallet, readiness }
    }

    /// Pays every `payments` entry in one transaction, returning change to the sender.
    ///
    /// Waits for the sender's own balance to settle first. Outputs are picked largest first
    /// until the payment total is covered.
    pub async fn send_payments(&self, payments: &[Payment]) -> Result<SignedTransaction> {
        let required = payments
            .iter()
            .try_fold(0u64, |acc, payment| acc.checked_add(payment.amount))
            .ok_or(Defect::AmountOverflow { side: "outputs" })?;
        self.wait_until_settled().await?;

        let outputs = self.node.list_unspent_outputs(&self.wallet.key_identifier).await?;
        if outputs.is_empty() {
            return Err(LoadError::NoUnspentOutputs { address: self.wallet.address() });
        }
        let available = outputs.iter().map(|utxo| utxo.amount).fold(0u64, u64::saturating_add);
        debug!("sender outputs listed address={} count={} available={}", self.wallet, outputs.len(), available);

        let selection = select_outputs(outputs, required);
        if !selection.covers(required) {
            return Err(LoadError::InsufficientFunds { available: selection.total, required });
        }
        info!(
            "sender selected outputs address={} selected={} selected_total={} required={}",
            self.wallet,
            selection.selected.len(),
            selection.total,
            required
        );

        let keys = key_material_for_outputs(self.node.as_ref(), &selection.selected).await?;
        let tx = build_transfer(&selection.selected, payments, &self.wallet.change_address(), ChangePlacement::Trailing)?;
        let signed = self.node.sign_transaction(&tx, &keys).await?;
        self.node.submit_transaction(&signed).await?;
        info!("sender submitted transaction address={} tx_id={} outputs={}", self.wallet, signed.id(), tx.outputs().len());
        Ok(signed)
    }

    async fn wait_until_settled(&self) -> Result<()> {
        let address = self.wallet.address();
        let attempts = self.readiness.max_attempts;
        retry_if(
            self.readiness,
            |err| matches!(err, LoadError::StabilizationTimeout { .. }),
            |attempt| {
                let address = address.clone();
                async move {
                    let balance = self.node.get_balance(&address).await?;
                    if balance.unstable > 0 {
                        debug!(
                            "sender balance unsettled address={} attempt={} stable={} unstable={}",
                            address, attempt, balance.stable, balance.unstable
                        );
                        return Err(LoadError::StabilizationTimeout { attempts, pending: vec![address] });
                    }
                    Ok(())
                }
            },
        )
        .await
    }
}
