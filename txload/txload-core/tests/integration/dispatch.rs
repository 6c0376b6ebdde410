use crate::fixtures::{dispatch_settings, receiver, Fleet, FleetBuilder};
use std::collections::BTreeSet;
use std::time::Duration;
use txload_core::application::{DispatchEngine, DispatchSettings, OutputPreparer};
use txload_core::domain::{DispatchReport, PreparedBatch, RetryPolicy};
use txload_core::foundation::{ErrorCode, Result, TransactionId};
use txload_core::infrastructure::rpc::NodeFaults;

async fn prepared_fleet(total: u64, per_batch: u64) -> (Fleet, Vec<PreparedBatch>) {
    let fleet = FleetBuilder::new(1).build();
    let batches = OutputPreparer::new(fleet.funder(), Duration::ZERO).prepare_outputs(total, per_batch).await.expect("prepare");
    (fleet, batches)
}

async fn dispatch(fleet: &Fleet, batches: &[PreparedBatch], settings: DispatchSettings) -> Result<DispatchReport> {
    let funder = fleet.funder();
    let keys = funder.key_material().await?;
    DispatchEngine::new(funder.node.clone(), settings).send_transactions(batches, keys, funder.wallet(), &receiver()).await
}

/// Ids accepted after preparation finished.
fn dispatched_ids(fleet: &Fleet, prepared: usize) -> BTreeSet<TransactionId> {
    fleet.ledger.submitted().into_iter().skip(prepared).collect()
}

#[tokio::test]
async fn test_dispatch_when_node_accepts_everything_then_every_unit_output_is_spent() {
    let (fleet, batches) = prepared_fleet(100, 10).await;
    let report = dispatch(&fleet, &batches, dispatch_settings(4)).await.expect("dispatch");

    assert_eq!(report.queued, 100);
    assert_eq!(report.succeeded, 100);
    assert_eq!(fleet.ledger.holdings(&receiver().key_identifier), 100);
    assert_eq!(dispatched_ids(&fleet, batches.len()).len(), 100);
}

#[tokio::test]
async fn test_dispatch_when_worker_count_varies_then_same_transactions_submitted() {
    let mut outcomes = Vec::new();
    for workers in [1usize, 2, 16] {
        let (fleet, batches) = prepared_fleet(100, 10).await;
        let unsignable = NodeFaults { unsignable_positions: BTreeSet::from([1]), ..Default::default() };
        fleet.nodes[0].set_faults(unsignable).expect("faults");

        let report = dispatch(&fleet, &batches, dispatch_settings(workers)).await.expect("dispatch");
        assert_eq!(report.queued, 100);
        assert_eq!(report.succeeded, 90, "workers={workers}");
        outcomes.push(dispatched_ids(&fleet, batches.len()));
    }
    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);
}

#[tokio::test]
async fn test_dispatch_when_sign_rejected_within_budget_then_retried_to_success() {
    let (fleet, batches) = prepared_fleet(20, 10).await;
    fleet.nodes[0].set_faults(NodeFaults { sign_rejections: 2, ..Default::default() }).expect("faults");
    let settings = DispatchSettings { sign_policy: RetryPolicy::immediate(3), ..dispatch_settings(3) };

    let report = dispatch(&fleet, &batches, settings).await.expect("dispatch");
    assert_eq!(report.succeeded, 20);
}

#[tokio::test]
async fn test_dispatch_when_sign_budget_exhausted_then_transactions_skipped_and_queue_drained() {
    let (fleet, batches) = prepared_fleet(20, 10).await;
    fleet.nodes[0].set_faults(NodeFaults { sign_rejections: 2, ..Default::default() }).expect("faults");
    let settings = DispatchSettings { sign_policy: RetryPolicy::immediate(2), ..dispatch_settings(3) };

    let report = dispatch(&fleet, &batches, settings).await.expect("dispatch");
    assert_eq!(report.queued, 20);
    assert_eq!(report.succeeded, 0);
    assert!(dispatched_ids(&fleet, batches.len()).is_empty());
}

#[tokio::test]
async fn test_dispatch_when_submission_fails_then_worker_stops() {
    let (fleet, batches) = prepared_fleet(50, 10).await;
    let accepted = fleet.nodes[0].accepted();
    fleet.nodes[0].set_faults(NodeFaults { submit_limit: Some(accepted + 25), ..Default::default() }).expect("faults");

    let report = dispatch(&fleet, &batches, dispatch_settings(1)).await.expect("dispatch");
    assert_eq!(report.queued, 50);
    assert_eq!(report.succeeded, 25);
}

#[tokio::test]
async fn test_dispatch_when_workers_cannot_get_address_then_nothing_sent() {
    let (fleet, batches) = prepared_fleet(20, 10).await;
    fleet.nodes[0].set_faults(NodeFaults { fail_new_address: true, ..Default::default() }).expect("faults");

    let report = dispatch(&fleet, &batches, dispatch_settings(2)).await.expect("dispatch");
    assert_eq!(report.succeeded, 0);

    let settings = DispatchSettings { fresh_worker_address: false, ..dispatch_settings(2) };
    let report = dispatch(&fleet, &batches, settings).await.expect("dispatch");
    assert_eq!(report.succeeded, 20);
}

#[tokio::test]
async fn test_dispatch_when_no_workers_then_config_error() {
    let (fleet, batches) = prepared_fleet(10, 10).await;
    let err = dispatch(&fleet, &batches, dispatch_settings(0)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigError);
}
