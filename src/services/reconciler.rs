use {
    crate::domain::{
        error::EscrowError,
        event::{EventKey, EventKind, GatewayEvent, ProcessOutcome, ReconcileResult},
        notify::StatusNotifier,
        payment::{PaymentRecord, PaymentStatus},
        store::{EventHandle, EventLedger, PaymentStore},
    },
    chrono::Utc,
};

/// What a single event should do to a payment record, decided before any
/// write happens.
#[derive(Debug)]
enum Decision {
    /// Write `updated`, conditioned on the status the decision was based on.
    Apply {
        updated: Box<PaymentRecord>,
        expected: PaymentStatus,
    },
    NoOp,
    Ignored,
    Unsupported,
    /// The required prior state has not landed yet (out-of-order delivery)
    /// or the event contradicts the record.
    Precondition(String),
}

/// Process one verified gateway event end to end: dedup via the ledger,
/// claim the key, map the event to a guarded transition, commit transition
/// and ledger advance atomically.
///
/// Every code path updates the ledger before returning; an `Err` here means
/// the entry was marked FAILED and the gateway should redeliver.
pub async fn process_event<S>(
    store: &S,
    notifier: &dyn StatusNotifier,
    event: GatewayEvent,
) -> Result<ReconcileResult, EscrowError>
where
    S: PaymentStore + EventLedger,
{
    let check = store.should_process(&event.key).await?;
    if !check.should_process {
        tracing::info!(key = %event.key, "duplicate event, replaying stored result");
        return Ok(ReconcileResult::Duplicate(check.existing_result));
    }

    let handle = store.record_event(&event).await?;

    match store.mark_processing(&handle).await {
        Ok(()) => {}
        Err(EscrowError::ConcurrentProcessing(_)) => {
            tracing::info!(key = %event.key, "event already claimed by another worker");
            return Ok(ReconcileResult::InFlight);
        }
        Err(e) => return Err(e),
    }

    match apply(store, notifier, &event, &handle).await {
        Ok(outcome) => Ok(ReconcileResult::Fresh(outcome)),
        Err(e) => {
            let retryable = e.is_retryable();
            if let Err(mark_err) = store
                .mark_failed(&handle, &e.to_string(), retryable)
                .await
            {
                tracing::error!(key = %event.key, error = %mark_err, "failed to mark ledger entry");
            }
            tracing::warn!(key = %event.key, error = %e, retryable, "event processing failed");
            Err(e)
        }
    }
}

/// Operator action: re-open a retryable FAILED ledger entry so the next
/// delivery (or sweep) processes it again.
pub async fn retry_event<S: EventLedger>(store: &S, key: &EventKey) -> Result<bool, EscrowError> {
    store.reset_for_retry(key).await
}

async fn apply<S>(
    store: &S,
    notifier: &dyn StatusNotifier,
    event: &GatewayEvent,
    handle: &EventHandle,
) -> Result<ProcessOutcome, EscrowError>
where
    S: PaymentStore + EventLedger,
{
    let Some(record) = lookup_record(store, event).await? else {
        if let EventKind::Unsupported(ref t) = event.kind {
            let outcome = ProcessOutcome::Unsupported {
                event_type: t.clone(),
            };
            store.mark_processed(handle, &outcome, false).await?;
            tracing::warn!(key = %event.key, event_type = %t, "unsupported event type recorded");
            return Ok(outcome);
        }
        // An unmatched event must never block ledger progress: processed,
        // but flagged for operator review.
        let outcome = ProcessOutcome::Orphaned;
        store.mark_processed(handle, &outcome, true).await?;
        tracing::warn!(key = %event.key, event_type = %event.event_type, "orphaned event, no matching record");
        return Ok(outcome);
    };

    // A lost conditional write means a racing writer moved the record under
    // us; re-read and re-decide exactly once.
    let mut current = record;
    for attempt in 0..2 {
        match decide(&current, event) {
            Decision::Apply { updated, expected } => {
                let outcome = ProcessOutcome::Applied {
                    record_id: updated.id,
                    new_status: updated.status,
                };
                if store
                    .commit_applied(handle, &updated, expected, &outcome)
                    .await?
                {
                    tracing::info!(
                        key = %event.key,
                        record_id = %updated.id,
                        status = %updated.status,
                        "transition applied"
                    );
                    notify_transition(notifier, &updated).await;
                    return Ok(outcome);
                }
                if attempt == 0 {
                    current = store
                        .get_record(current.id)
                        .await?
                        .ok_or(EscrowError::NotFound(current.id))?;
                    continue;
                }
                return Err(EscrowError::Conflict(format!(
                    "record {} changed twice while applying {}",
                    current.id, event.event_type
                )));
            }
            Decision::NoOp => {
                let outcome = ProcessOutcome::NoOp {
                    record_id: current.id,
                    current_status: current.status,
                };
                store.mark_processed(handle, &outcome, false).await?;
                return Ok(outcome);
            }
            Decision::Ignored => {
                let outcome = ProcessOutcome::Ignored {
                    event_type: event.event_type.clone(),
                };
                store.mark_processed(handle, &outcome, false).await?;
                tracing::warn!(
                    key = %event.key,
                    record_id = %current.id,
                    "refund signal recorded; no automatic action without an explicit authorized refund"
                );
                return Ok(outcome);
            }
            Decision::Unsupported => {
                let outcome = ProcessOutcome::Unsupported {
                    event_type: event.event_type.clone(),
                };
                store.mark_processed(handle, &outcome, false).await?;
                tracing::warn!(key = %event.key, event_type = %event.event_type, "unsupported event type recorded");
                return Ok(outcome);
            }
            Decision::Precondition(reason) => {
                return Err(EscrowError::Precondition(reason));
            }
        }
    }
    unreachable!("apply loop always returns within two attempts")
}

/// Terminal-ish transitions fan out to the owning collaborators. Delivery
/// errors are logged; the ledger commit already happened and stands.
async fn notify_transition(notifier: &dyn StatusNotifier, record: &PaymentRecord) {
    let sent = match record.status {
        PaymentStatus::Failed => notifier.payment_failed(record).await,
        PaymentStatus::PaidOut => notifier.worker_paid(record).await,
        _ => return,
    };
    if let Err(e) = sent {
        tracing::warn!(record_id = %record.id, error = %e, "status notification failed");
    }
}

async fn lookup_record<S: PaymentStore>(
    store: &S,
    event: &GatewayEvent,
) -> Result<Option<PaymentRecord>, EscrowError> {
    if let Some(id) = event.record_hint
        && let Some(record) = store.get_record(id).await?
    {
        return Ok(Some(record));
    }
    if let Some(ref intent) = event.intent_id
        && let Some(record) = store.find_by_intent(intent).await?
    {
        return Ok(Some(record));
    }
    if let Some(ref transfer) = event.transfer_id
        && let Some(record) = store.find_by_transfer(transfer).await?
    {
        return Ok(Some(record));
    }
    Ok(None)
}

/// The fixed event→transition table. Pure; all writes happen in the caller.
fn decide(record: &PaymentRecord, event: &GatewayEvent) -> Decision {
    let now = Utc::now();
    let expected = record.status;

    match &event.kind {
        EventKind::CaptureSucceeded => match record.status {
            PaymentStatus::Pending => {
                let mut updated = record.clone();
                if updated.payment_intent_id.is_none() {
                    updated.payment_intent_id = event.intent_id.clone();
                }
                match updated.mark_captured(now) {
                    Ok(()) => Decision::Apply {
                        updated: Box::new(updated),
                        expected,
                    },
                    Err(e) => Decision::Precondition(e.to_string()),
                }
            }
            status if status.spine_rank() >= Some(1) => Decision::NoOp,
            status => Decision::Precondition(format!(
                "capture_succeeded while record is {status}"
            )),
        },
        EventKind::CaptureFailed => match record.status {
            PaymentStatus::Pending => {
                let mut updated = record.clone();
                let reason = event
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "capture failed".to_string());
                match updated.mark_capture_failed(reason, now) {
                    Ok(()) => Decision::Apply {
                        updated: Box::new(updated),
                        expected,
                    },
                    Err(e) => Decision::Precondition(e.to_string()),
                }
            }
            PaymentStatus::Failed => Decision::NoOp,
            status => Decision::Precondition(format!(
                "capture_failed while record is {status}"
            )),
        },
        EventKind::TransferCreated => {
            let Some(ref transfer) = event.transfer_id else {
                return Decision::Precondition("transfer_created without a transfer_id".into());
            };
            if let Some(ref existing) = record.transfer_id {
                return if existing == transfer {
                    Decision::NoOp
                } else {
                    Decision::Precondition(format!(
                        "transfer {transfer} conflicts with recorded {existing}"
                    ))
                };
            }
            if record.status != PaymentStatus::Released {
                return Decision::Precondition(format!(
                    "transfer_created while record is {}",
                    record.status
                ));
            }
            let mut updated = record.clone();
            match updated.record_transfer(transfer.clone(), now) {
                Ok(()) => Decision::Apply {
                    updated: Box::new(updated),
                    expected,
                },
                Err(e) => Decision::Precondition(e.to_string()),
            }
        }
        EventKind::TransferPaid => match record.status {
            PaymentStatus::PaidOut => Decision::NoOp,
            PaymentStatus::Released => {
                let Some(ref recorded) = record.transfer_id else {
                    return Decision::Precondition(
                        "transfer_paid before transfer_created landed".into(),
                    );
                };
                if let Some(ref transfer) = event.transfer_id
                    && transfer != recorded
                {
                    return Decision::Precondition(format!(
                        "transfer_paid for {transfer} but record holds {recorded}"
                    ));
                }
                let mut updated = record.clone();
                match updated.mark_paid_out(now) {
                    Ok(()) => Decision::Apply {
                        updated: Box::new(updated),
                        expected,
                    },
                    Err(e) => Decision::Precondition(e.to_string()),
                }
            }
            status => Decision::Precondition(format!(
                "transfer_paid while record is {status}"
            )),
        },
        // Refunds never auto-cancel anything tied to a workforce payout;
        // they require an explicit authorized refund call.
        EventKind::ChargeRefunded => Decision::Ignored,
        EventKind::Unsupported(_) => Decision::Unsupported,
    }
}
