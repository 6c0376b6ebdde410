use crate::fixtures::{instant_stabilization, wallet, Fleet, FleetBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use txload_core::application::{FundingCoordinator, WalletSender};
use txload_core::domain::{Payment, RetryPolicy, StabilizationPolicy, WalletAddress};
use txload_core::foundation::{ErrorCode, LoadError};
use txload_core::infrastructure::rpc::{MemoryNode, NodeApi, NodeFaults};

fn coordinator(fleet: &crate::fixtures::Fleet, stabilization: StabilizationPolicy) -> FundingCoordinator {
    FundingCoordinator::new(fleet.funder(), fleet.contexts.clone(), stabilization, RetryPolicy::immediate(3))
}

#[tokio::test]
async fn test_funding_when_fleet_settles_then_balances_recorded_per_participant() {
    let fleet = FleetBuilder::new(3).build();
    let balances = coordinator(&fleet, instant_stabilization(3)).ensure_funds(10).await.expect("funding");

    assert_eq!(balances.len(), 3);
    assert_eq!(balances[&fleet.context(0).address()], 980);
    assert_eq!(balances[&fleet.context(1).address()], 10);
    assert_eq!(balances[&fleet.context(2).address()], 10);

    let submitted = fleet.ledger.submitted();
    assert_eq!(submitted.len(), 1);
    let funding_tx = fleet.ledger.transaction(&submitted[0]).expect("funding tx");
    let paid = funding_tx.outputs.iter().filter(|out| out.address_key_identifier != "kid0").map(|out| out.amount).collect::<Vec<_>>();
    assert_eq!(paid, vec![10, 10]);
    assert_eq!(funding_tx.outputs.last().map(|out| out.amount), Some(980));
}

#[tokio::test]
async fn test_funding_when_single_participant_then_no_transaction_sent() {
    let fleet = FleetBuilder::new(1).build();
    let balances = coordinator(&fleet, instant_stabilization(1)).ensure_funds(10).await.expect("funding");
    assert_eq!(balances.len(), 1);
    assert!(fleet.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_funding_when_funder_short_then_insufficient_funds() {
    let fleet = FleetBuilder::new(3).funder_balance(15).build();
    let err = coordinator(&fleet, instant_stabilization(3)).ensure_funds(10).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientFunds);
    assert!(fleet.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_funding_when_funder_has_nothing_then_no_unspent_outputs() {
    let fleet = FleetBuilder::new(2).funder_balance(0).build();
    let err = coordinator(&fleet, instant_stabilization(3)).ensure_funds(10).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoUnspentOutputs);
}

#[tokio::test]
async fn test_funding_when_balance_query_fails_once_then_round_abandoned_and_retried() {
    let faults = NodeFaults { balance_errors: 1, ..Default::default() };
    let fleet = FleetBuilder::new(3).faults(1, faults).build();
    let balances = coordinator(&fleet, instant_stabilization(2)).ensure_funds(10).await.expect("funding");
    assert_eq!(balances.len(), 3);
}

#[tokio::test]
async fn test_funding_when_single_round_and_query_fails_then_pending_lists_rest_of_fleet() {
    let faults = NodeFaults { balance_errors: 1, ..Default::default() };
    let fleet = FleetBuilder::new(3).faults(1, faults).build();
    let err = coordinator(&fleet, instant_stabilization(1)).ensure_funds(10).await.unwrap_err();
    match err {
        LoadError::StabilizationTimeout { attempts, pending } => {
            assert_eq!(attempts, 1);
            assert_eq!(pending, vec![fleet.context(1).address(), fleet.context(2).address()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_funding_when_settlement_slower_than_rounds_then_timeout() {
    let fleet = FleetBuilder::new(3).settlement_polls(100).build();
    let err = coordinator(&fleet, instant_stabilization(3)).ensure_funds(10).await.unwrap_err();
    match err {
        LoadError::StabilizationTimeout { attempts, pending } => {
            assert_eq!(attempts, 3);
            assert_eq!(pending.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_funding_when_settlement_lags_then_later_round_succeeds() {
    // Each owner needs three polls; a round stops at the first unsettled participant.
    let fleet = FleetBuilder::new(3).settlement_polls(2).build();
    assert!(coordinator(&fleet, instant_stabilization(6)).ensure_funds(10).await.is_err());

    let fleet = FleetBuilder::new(3).settlement_polls(2).build();
    let balances = coordinator(&fleet, instant_stabilization(7)).ensure_funds(10).await.expect("funding");
    assert_eq!(balances.values().sum::<u64>(), 1_000);
}

#[tokio::test(start_paused = true)]
async fn test_funding_when_default_schedule_exhausted_then_waits_settle_delay_plus_linear_rounds() {
    let fleet = FleetBuilder::new(2).faults(1, NodeFaults { balance_errors: u32::MAX, ..Default::default() }).build();
    let stabilization = StabilizationPolicy { settle_delay: Duration::from_secs(15), rounds: RetryPolicy::linear(12, Duration::from_secs(2)) };
    let started = Instant::now();
    let err = coordinator(&fleet, stabilization).ensure_funds(10).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::StabilizationTimeout);
    // 15s settle + 2s * (0 + 1 + ... + 11)
    assert_eq!(started.elapsed(), Duration::from_secs(15 + 132));
}

/// Pays the funder from an outside wallet so its balance arrives through a submitted transaction.
async fn credit_funder_through_transfer(fleet: &Fleet, amount: u64) {
    let donor = WalletAddress::new("donorbase", "donorkid");
    fleet.ledger.fund(&donor, amount).expect("fund donor");
    let node: Arc<dyn NodeApi> = Arc::new(MemoryNode::new(fleet.ledger.clone(), "node-donor"));
    WalletSender::new(node, donor, RetryPolicy::immediate(1))
        .send_payments(&[Payment::new(wallet(0), amount)])
        .await
        .expect("credit funder");
}

#[tokio::test]
async fn test_funding_when_funder_balance_unsettled_past_readiness_budget_then_timeout_without_sending() {
    let fleet = FleetBuilder::new(2).funder_balance(0).settlement_polls(4).build();
    credit_funder_through_transfer(&fleet, 1_000).await;
    let submitted_before = fleet.ledger.submitted().len();

    let coordinator = FundingCoordinator::new(fleet.funder(), fleet.contexts.clone(), instant_stabilization(12), RetryPolicy::immediate(3));
    let err = coordinator.ensure_funds(10).await.unwrap_err();
    match err {
        LoadError::StabilizationTimeout { pending, .. } => assert_eq!(pending, vec![fleet.funder().address()]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fleet.ledger.submitted().len(), submitted_before);
}

#[tokio::test]
async fn test_funding_when_funder_balance_settles_within_readiness_budget_then_funding_sent() {
    let fleet = FleetBuilder::new(2).funder_balance(0).settlement_polls(4).build();
    credit_funder_through_transfer(&fleet, 1_000).await;
    let submitted_before = fleet.ledger.submitted().len();

    // Four unsettled polls for the funder's credit, then four per owner after funding.
    let coordinator = FundingCoordinator::new(fleet.funder(), fleet.contexts.clone(), instant_stabilization(12), RetryPolicy::immediate(6));
    let balances = coordinator.ensure_funds(10).await.expect("funding");

    assert_eq!(fleet.ledger.submitted().len(), submitted_before + 1);
    assert_eq!(balances[&fleet.funder().address()], 990);
    assert_eq!(balances[&fleet.context(1).address()], 10);
}
