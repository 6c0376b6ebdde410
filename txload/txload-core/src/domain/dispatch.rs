use crate::domain::model::{Payment, PreparedBatch, UnsignedTransaction, UnspentOutput, WalletAddress};
use crate::domain::transaction::{build_transfer, ChangePlacement};
use crate::foundation::{Defect, UNIT_AMOUNT};

/// Expands prepared batches into one single-input, single-output transfer per unit output.
///
/// Order follows the batches, then the unit positions inside each batch.
pub fn expand_batches(batches: &[PreparedBatch], spender: &WalletAddress, receiver: &WalletAddress) -> Result<Vec<UnsignedTransaction>, Defect> {
    let capacity = batches.iter().map(|batch| batch.unit_positions.len()).sum();
    let mut work = Vec::with_capacity(capacity);
    let payment = [Payment::new(receiver.clone(), UNIT_AMOUNT)];
    for batch in batches {
        let tx = &batch.transaction;
        for position in &batch.unit_positions {
            let unit = UnspentOutput {
                transaction_id: tx.transaction_id.clone(),
                shard_id: tx.shard_id.clone(),
                output_position: *position,
                address: spender.address(),
                address_base: spender.base.clone(),
                address_key_identifier: spender.key_identifier.clone(),
                amount: UNIT_AMOUNT,
                ..Default::default()
            };
            work.push(build_transfer(&[unit], &payment, spender, ChangePlacement::Trailing)?);
        }
    }
    Ok(work)
}
