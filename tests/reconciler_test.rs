mod common;

use common::*;
use serde_json::json;
use shiftpay::adapters::mock_gateway::MockGateway;
use shiftpay::adapters::mock_notifier::{MockNotifier, Notification};
use shiftpay::adapters::notify::LogNotifier;
use shiftpay::domain::error::EscrowError;
use shiftpay::domain::event::{EventKey, EventStatus, ProcessOutcome, ReconcileResult};
use shiftpay::domain::payment::PaymentStatus;
use shiftpay::domain::store::{EventLedger, PaymentStore};
use shiftpay::infra::memory::MemoryStore;
use shiftpay::services::{escrow, reconciler};

#[tokio::test]
async fn capture_webhook_moves_hold_into_escrow() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = held_record(&store, &gateway).await;

    let result = reconciler::process_event(&store, &LogNotifier, capture_event("evt_1", &record))
        .await
        .unwrap();
    match result {
        ReconcileResult::Fresh(ProcessOutcome::Applied {
            record_id,
            new_status,
        }) => {
            assert_eq!(record_id, record.id);
            assert_eq!(new_status, PaymentStatus::InEscrow);
        }
        other => panic!("expected Applied, got {other:?}"),
    }

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::InEscrow);
    assert!(stored.escrow_held_at.is_some());

    let key = EventKey::new(GATEWAY, "evt_1").unwrap();
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Processed);
    assert!(entry.result.is_some());
}

#[tokio::test]
async fn full_lifecycle_ends_paid_out() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;

    escrow::release(&store, &gateway, record.id).await.unwrap();

    let result = reconciler::process_event(
        &store,
        &LogNotifier,
        transfer_created_event("evt_tc", &record, "tr_77"),
    )
    .await
    .unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Applied {
            new_status: PaymentStatus::Released,
            ..
        })
    ));

    let result = reconciler::process_event(&store, &LogNotifier, transfer_paid_event("evt_tp", &record, "tr_77"))
        .await
        .unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Applied {
            new_status: PaymentStatus::PaidOut,
            ..
        })
    ));

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::PaidOut);
    assert!(stored.status.is_terminal());
    assert_eq!(stored.transfer_id.unwrap().as_str(), "tr_77");
    assert!(stored.payout_completed_at.is_some());
}

#[tokio::test]
async fn duplicate_delivery_replays_stored_result() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = held_record(&store, &gateway).await;

    let first = reconciler::process_event(&store, &LogNotifier, capture_event("evt_dup", &record))
        .await
        .unwrap();
    assert!(matches!(first, ReconcileResult::Fresh(_)));
    let held_at = store
        .get_record(record.id)
        .await
        .unwrap()
        .unwrap()
        .escrow_held_at;

    let second = reconciler::process_event(&store, &LogNotifier, capture_event("evt_dup", &record))
        .await
        .unwrap();
    match second {
        ReconcileResult::Duplicate(Some(stored)) => {
            assert_eq!(stored["outcome"], json!("applied"));
        }
        other => panic!("expected Duplicate with stored result, got {other:?}"),
    }

    // no side effects on replay
    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::InEscrow);
    assert_eq!(stored.escrow_held_at, held_at);
}

#[tokio::test]
async fn late_capture_with_fresh_event_id_is_noop() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;

    let result = reconciler::process_event(&store, &LogNotifier, capture_event("evt_late", &record))
        .await
        .unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::NoOp {
            current_status: PaymentStatus::InEscrow,
            ..
        })
    ));
}

#[tokio::test]
async fn out_of_order_transfer_paid_fails_retryable_then_lands() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;
    escrow::release(&store, &gateway, record.id).await.unwrap();

    // transfer_paid before transfer_created: rejected, record untouched
    let err = reconciler::process_event(&store, &LogNotifier, transfer_paid_event("evt_ooo", &record, "tr_9"))
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::Precondition(_)));
    assert!(err.is_retryable());

    let key = EventKey::new(GATEWAY, "evt_ooo").unwrap();
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Failed);
    assert!(entry.retryable);
    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Released);
    assert!(stored.transfer_id.is_none());

    // predecessor lands, then the gateway redelivers the same event id
    reconciler::process_event(&store, &LogNotifier, transfer_created_event("evt_tc", &record, "tr_9"))
        .await
        .unwrap();
    let result = reconciler::process_event(&store, &LogNotifier, transfer_paid_event("evt_ooo", &record, "tr_9"))
        .await
        .unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Applied {
            new_status: PaymentStatus::PaidOut,
            ..
        })
    ));
}

#[tokio::test]
async fn orphaned_event_is_processed_and_flagged() {
    let store = MemoryStore::new();

    let orphan = event(
        "evt_orphan",
        "capture_succeeded",
        json!({"payment_intent_id": "pi_nobody_knows"}),
    );
    let result = reconciler::process_event(&store, &LogNotifier, orphan).await.unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Orphaned)
    ));

    let key = EventKey::new(GATEWAY, "evt_orphan").unwrap();
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Processed);
    assert!(entry.orphaned);
}

#[tokio::test]
async fn unknown_event_type_is_recorded_not_dropped() {
    let store = MemoryStore::new();

    let stray = event("evt_unk", "invoice.finalized", json!({}));
    let result = reconciler::process_event(&store, &LogNotifier, stray).await.unwrap();
    match result {
        ReconcileResult::Fresh(ProcessOutcome::Unsupported { event_type }) => {
            assert_eq!(event_type, "invoice.finalized");
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }

    let key = EventKey::new(GATEWAY, "evt_unk").unwrap();
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Processed);
    assert!(!entry.orphaned);
}

#[tokio::test]
async fn charge_refunded_never_moves_the_record() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;

    let refund_signal = event(
        "evt_ref",
        "charge_refunded",
        json!({"metadata": {"payment_record_id": record.id.to_string()}}),
    );
    let result = reconciler::process_event(&store, &LogNotifier, refund_signal).await.unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Ignored { .. })
    ));

    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::InEscrow);
    assert_eq!(stored.refund_amount.minor_units(), 0);
}

#[tokio::test]
async fn capture_failed_is_terminal_and_blocks_late_success() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = held_record(&store, &gateway).await;

    let result = reconciler::process_event(
        &store,
        &LogNotifier,
        capture_failed_event("evt_cf", &record, "card declined"),
    )
    .await
    .unwrap();
    assert!(matches!(
        result,
        ReconcileResult::Fresh(ProcessOutcome::Applied {
            new_status: PaymentStatus::Failed,
            ..
        })
    ));
    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.error_message.as_deref(), Some("card declined"));

    // a contradictory success after terminal failure is rejected, not applied
    let err = reconciler::process_event(&store, &LogNotifier, capture_event("evt_cs_late", &record))
        .await
        .unwrap_err();
    assert!(matches!(err, EscrowError::Precondition(_)));
    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn mismatched_transfer_id_is_rejected() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;
    escrow::release(&store, &gateway, record.id).await.unwrap();

    reconciler::process_event(&store, &LogNotifier, transfer_created_event("evt_tc", &record, "tr_real"))
        .await
        .unwrap();

    let err =
        reconciler::process_event(&store, &LogNotifier, transfer_paid_event("evt_tp", &record, "tr_other"))
            .await
            .unwrap_err();
    assert!(matches!(err, EscrowError::Precondition(_)));
    let stored = store.get_record(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Released);
}

#[tokio::test]
async fn retry_reopens_only_retryable_failures() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let record = escrowed_record(&store, &gateway).await;

    // a precondition failure leaves a retryable FAILED entry
    reconciler::process_event(&store, &LogNotifier, transfer_paid_event("evt_r", &record, "tr_1"))
        .await
        .unwrap_err();
    let key = EventKey::new(GATEWAY, "evt_r").unwrap();
    assert!(reconciler::retry_event(&store, &key).await.unwrap());
    let entry = store.get_event(&key).await.unwrap().unwrap();
    assert_eq!(entry.status, EventStatus::Pending);

    // processed entries are not reopenable
    reconciler::process_event(&store, &LogNotifier, capture_event("evt_done", &held_record(&store, &gateway).await))
        .await
        .unwrap();
    let done = EventKey::new(GATEWAY, "evt_done").unwrap();
    assert!(!reconciler::retry_event(&store, &done).await.unwrap());
}

#[tokio::test]
async fn failed_capture_notifies_the_assignment() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let notifier = MockNotifier::new();
    let record = held_record(&store, &gateway).await;

    reconciler::process_event(
        &store,
        &notifier,
        capture_failed_event("evt_nf", &record, "card declined"),
    )
    .await
    .unwrap();
    assert_eq!(notifier.sent(), vec![Notification::Failed(record.id)]);

    // duplicate delivery replays the stored result without notifying again
    reconciler::process_event(
        &store,
        &notifier,
        capture_failed_event("evt_nf", &record, "card declined"),
    )
    .await
    .unwrap();
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn completed_payout_notifies_the_worker() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    let notifier = MockNotifier::new();
    let record = escrowed_record(&store, &gateway).await;
    escrow::release(&store, &gateway, record.id).await.unwrap();

    // attaching the transfer id is not a terminal move, so no notification yet
    reconciler::process_event(
        &store,
        &notifier,
        transfer_created_event("evt_ntc", &record, "tr_n1"),
    )
    .await
    .unwrap();
    assert!(notifier.sent().is_empty());

    reconciler::process_event(
        &store,
        &notifier,
        transfer_paid_event("evt_ntp", &record, "tr_n1"),
    )
    .await
    .unwrap();
    assert_eq!(notifier.sent(), vec![Notification::Paid(record.id)]);
}
