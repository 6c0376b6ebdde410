use crate::fixtures::FleetBuilder;
use std::time::Duration;
use txload_core::application::OutputPreparer;
use txload_core::foundation::{ErrorCode, LoadError, NodeId, CHANGE_OUTPUT_POSITION};
use txload_core::infrastructure::rpc::NodeFaults;

#[tokio::test]
async fn test_preparation_when_rounds_chain_then_each_spends_previous_change() {
    let fleet = FleetBuilder::new(1).build();
    let batches = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(100, 10).await.expect("prepare");

    assert_eq!(batches.len(), 10);
    for pair in batches.windows(2) {
        let input = &pair[1].transaction.inputs[0];
        assert_eq!(&input.output_transaction_id, pair[0].transaction.id());
        assert_eq!(input.output_position, CHANGE_OUTPUT_POSITION);
    }
    for batch in &batches {
        assert_eq!(batch.unit_positions, (1..=10).collect::<Vec<u32>>());
        assert_eq!(batch.transaction.outputs[0].amount + 10, batch.transaction.outputs.iter().map(|out| out.amount).sum::<u64>());
    }
    assert_eq!(fleet.ledger.holdings("kid0"), 1_000);
    assert_eq!(fleet.ledger.submitted().len(), 10);
}

#[tokio::test]
async fn test_preparation_when_total_not_multiple_of_batch_then_remainder_dropped() {
    let fleet = FleetBuilder::new(1).build();
    let batches = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(105, 10).await.expect("prepare");
    assert_eq!(batches.len(), 10);
    assert_eq!(batches.iter().map(|batch| batch.unit_positions.len()).sum::<usize>(), 100);
}

#[tokio::test]
async fn test_preparation_when_root_exactly_consumed_then_last_round_has_no_change() {
    let fleet = FleetBuilder::new(1).funder_balance(10).build();
    let batches = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(10, 5).await.expect("prepare");

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].unit_positions, vec![1, 2, 3, 4, 5]);
    assert_eq!(batches[1].unit_positions, vec![0, 1, 2, 3, 4]);
    assert_eq!(batches[1].transaction.outputs.len(), 5);
}

#[tokio::test]
async fn test_preparation_when_largest_output_too_small_then_insufficient_root() {
    let fleet = FleetBuilder::new(1).funder_balance(5).grant(0, 4).build();
    let err = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(9, 3).await.unwrap_err();
    match err {
        LoadError::InsufficientRootOutput { available, required } => {
            assert_eq!(available, 5);
            assert_eq!(required, 9);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fleet.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_preparation_when_wallet_empty_then_no_unspent_outputs() {
    let fleet = FleetBuilder::new(2).build();
    let err = OutputPreparer::new(fleet.context(1), Duration::ZERO).prepare_outputs(10, 5).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoUnspentOutputs);
}

#[tokio::test]
async fn test_preparation_when_node_identity_differs_then_mismatch_before_any_spend() {
    let faults = NodeFaults { reported_id: Some(NodeId::from("someone-else")), ..Default::default() };
    let fleet = FleetBuilder::new(1).faults(0, faults).build();
    let err = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(10, 5).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NodeIdentityMismatch);
    assert!(fleet.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_preparation_when_batch_size_zero_then_config_error() {
    let fleet = FleetBuilder::new(1).build();
    let err = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(10, 0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigError);
}

#[tokio::test]
async fn test_preparation_when_submission_rejected_then_run_stops_at_that_round() {
    let faults = NodeFaults { submit_limit: Some(3), ..Default::default() };
    let fleet = FleetBuilder::new(1).faults(0, faults).build();
    let err = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(100, 10).await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(fleet.ledger.submitted().len(), 3);
}
