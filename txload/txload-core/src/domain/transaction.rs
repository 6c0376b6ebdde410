use crate::domain::model::{Payment, TransactionInput, TransactionOutput, UnsignedTransaction, UnspentOutput, WalletAddress};
use crate::foundation::{Defect, ADDRESS_VERSION, TRANSACTION_VERSION};

/// Where the change output goes in the output list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePlacement {
    /// Position 0, ahead of the payments (preparation rounds).
    Leading,
    /// After the payments (wallet sends).
    Trailing,
}

/// Input spending `utxo`.
///
/// The node expects the owning key identifier in both address fields of an input.
pub fn input_from_output(utxo: &UnspentOutput, input_position: u32) -> TransactionInput {
    TransactionInput {
        address_base: utxo.address_key_identifier.clone(),
        address_key_identifier: utxo.address_key_identifier.clone(),
        address_version: ADDRESS_VERSION.to_string(),
        output_position: utxo.output_position,
        output_transaction_date: utxo.transaction_date,
        output_transaction_id: utxo.transaction_id.clone(),
        output_shard_id: utxo.shard_id.clone(),
        input_position,
    }
}

/// Builds a transfer spending every `input` into `payments`, returning any surplus to `change_to`.
///
/// A change output is only added when the surplus is non-zero. Input and output totals must
/// match exactly; anything else is a [`Defect`].
pub fn build_transfer(
    inputs: &[UnspentOutput],
    payments: &[Payment],
    change_to: &WalletAddress,
    placement: ChangePlacement,
) -> Result<UnsignedTransaction, Defect> {
    let input_total = checked_total(inputs.iter().map(|utxo| utxo.amount), "inputs")?;
    let payment_total = checked_total(payments.iter().map(|payment| payment.amount), "outputs")?;
    let change = input_total
        .checked_sub(payment_total)
        .ok_or(Defect::ValueMismatch { inputs: input_total, outputs: payment_total })?;

    let mut outputs = Vec::with_capacity(payments.len() + 1);
    let change_output = (change > 0).then(|| TransactionOutput::to(change_to, change));
    if placement == ChangePlacement::Leading {
        outputs.extend(change_output.clone());
    }
    outputs.extend(payments.iter().map(|payment| TransactionOutput::to(&payment.to, payment.amount)));
    if placement == ChangePlacement::Trailing {
        outputs.extend(change_output);
    }

    let tx = UnsignedTransaction {
        transaction_version: TRANSACTION_VERSION.to_string(),
        transaction_output_list: outputs,
        transaction_input_list: inputs.iter().zip(0u32..).map(|(utxo, position)| input_from_output(utxo, position)).collect(),
    };
    check_conservation(inputs, &tx)?;
    Ok(tx)
}

/// Output totals of `tx` must equal the amounts of the outputs it spends.
pub fn check_conservation(spent: &[UnspentOutput], tx: &UnsignedTransaction) -> Result<(), Defect> {
    let inputs = checked_total(spent.iter().map(|utxo| utxo.amount), "inputs")?;
    let outputs = checked_total(tx.transaction_output_list.iter().map(|out| out.amount), "outputs")?;
    if inputs != outputs {
        return Err(Defect::ValueMismatch { inputs, outputs });
    }
    Ok(())
}

fn checked_total(mut amounts: impl Iterator<Item = u64>, side: &'static str) -> Result<u64, Defect> {
    amounts.try_fold(0u64, |acc, amount| acc.checked_add(amount)).ok_or(Defect::AmountOverflow { side })
}
