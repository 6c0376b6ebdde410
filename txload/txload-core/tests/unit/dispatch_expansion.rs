use crate::fixtures::{receiver, wallet};
use txload_core::domain::dispatch::expand_batches;
use txload_core::domain::{PreparedBatch, SignedTransaction};
use txload_core::foundation::{ShardId, TransactionId, UNIT_AMOUNT};

fn batch(id: &str, unit_positions: Vec<u32>) -> PreparedBatch {
    let transaction = SignedTransaction {
        transaction_id: TransactionId::from(id),
        inputs: Vec::new(),
        outputs: Vec::new(),
        signatures: Vec::new(),
        parents: Vec::new(),
        payload_hash: String::new(),
        transaction_date: "5".to_string(),
        shard_id: ShardId::from("shard-x"),
        version: String::new(),
        node_id_origin: String::new(),
    };
    PreparedBatch { transaction, unit_positions }
}

#[test]
fn test_expansion_when_batches_prepared_then_one_transfer_per_unit_output() {
    let spender = wallet(1);
    let batches = vec![batch("tx-1", (1..=5).collect()), batch("tx-2", (0..5).collect())];
    let work = expand_batches(&batches, &spender, &receiver()).expect("expand");
    assert_eq!(work.len(), 10);

    let spent = work
        .iter()
        .map(|tx| (tx.inputs()[0].output_transaction_id.to_string(), tx.inputs()[0].output_position))
        .collect::<Vec<_>>();
    assert_eq!(spent[0], ("tx-1".to_string(), 1));
    assert_eq!(spent[4], ("tx-1".to_string(), 5));
    assert_eq!(spent[5], ("tx-2".to_string(), 0));
    assert_eq!(spent[9], ("tx-2".to_string(), 4));
}

#[test]
fn test_expansion_when_transfer_built_then_unit_goes_to_receiver_without_change() {
    let spender = wallet(2);
    let work = expand_batches(&[batch("tx-9", vec![3])], &spender, &receiver()).expect("expand");
    let tx = &work[0];
    assert_eq!(tx.inputs().len(), 1);
    assert_eq!(tx.outputs().len(), 1);
    assert_eq!(tx.outputs()[0].amount, UNIT_AMOUNT);
    assert_eq!(tx.outputs()[0].address_base, receiver().base);
    assert_eq!(tx.outputs()[0].address_key_identifier, receiver().key_identifier);
    assert_eq!(tx.inputs()[0].address_key_identifier, spender.key_identifier);
    assert_eq!(tx.inputs()[0].output_shard_id.as_str(), "shard-x");
}

#[test]
fn test_expansion_when_no_batches_then_no_work() {
    let work = expand_batches(&[], &wallet(0), &receiver()).expect("expand");
    assert!(work.is_empty());
}
