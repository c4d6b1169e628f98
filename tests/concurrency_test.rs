mod common;

use common::*;
use shiftpay::adapters::mock_gateway::MockGateway;
use shiftpay::adapters::notify::LogNotifier;
use shiftpay::domain::event::{EventKey, EventStatus, ProcessOutcome, ReconcileResult};
use shiftpay::domain::payment::PaymentStatus;
use shiftpay::domain::store::{EventLedger, PaymentStore};
use shiftpay::infra::memory::MemoryStore;
use shiftpay::services::{escrow, reconciler};

// Five deliveries of the SAME event id land at once. Exactly one may apply
// the transition; the rest must observe the ledger (duplicate or in-flight),
// never a second side effect.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_storm_applies_exactly_once() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = held_record(&store, &gateway).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        let event = capture_event("evt_storm", &record);
        handles.push(tokio::spawn(async move {
            reconciler::process_event(&store, &LogNotifier, event).await.unwrap()
        }));
    }

    let mut applied = 0;
    let mut others = 0;
    for h in handles {
        match h.await.unwrap() {
            ReconcileResult::Fresh(ProcessOutcome::Applied { .. }) => applied += 1,
            ReconcileResult::Duplicate(_) | ReconcileResult::InFlight => others += 1,
            other => panic!("unexpected result: {other:?}"),
        }
    }
    assert_eq!(applied, 1, "exactly one delivery applies");
    assert_eq!(others, 4);

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::InEscrow);

    let key = EventKey::new(GATEWAY, "evt_storm").unwrap();
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Processed);
}

// Five capture notifications with DISTINCT event ids race on one record.
// Each gets its own ledger entry, but only one wins the conditional write;
// the rest re-read and settle as no-ops.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_duplicates_yield_one_apply_rest_noop() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = held_record(&store, &gateway).await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let store = store.clone();
        let event = capture_event(&format!("evt_d{i}"), &record);
        handles.push(tokio::spawn(async move {
            reconciler::process_event(&store, &LogNotifier, event).await.unwrap()
        }));
    }

    let mut applied = 0;
    let mut noop = 0;
    for h in handles {
        match h.await.unwrap() {
            ReconcileResult::Fresh(ProcessOutcome::Applied { .. }) => applied += 1,
            ReconcileResult::Fresh(ProcessOutcome::NoOp { .. }) => noop += 1,
            other => panic!("unexpected result: {other:?}"),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(noop, 4);

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::InEscrow);
    assert!(stored.escrow_held_at.is_some());
}

// Two operators hit release at the same time. One payout, not two.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_release_issues_one_payout() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let gateway = gateway.clone();
        let id = record.id;
        handles.push(tokio::spawn(async move {
            escrow::release(&store, &gateway, id).await
        }));
    }

    let mut ok = 0;
    let mut lost = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(_) => lost += 1,
        }
    }
    assert_eq!(ok, 1, "exactly one release wins");
    assert_eq!(lost, 1);
    assert_eq!(gateway.payouts().len(), 1);

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Released);
}
