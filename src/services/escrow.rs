use {
    crate::domain::{
        costing::CostBreakdown,
        error::EscrowError,
        gateway::{CaptureCommand, PaymentGateway, PayoutCommand, RemoteChargeStatus},
        money::MoneyAmount,
        notify::StatusNotifier,
        payment::{DisputeResolution, PaymentRecord, PaymentStatus},
        store::PaymentStore,
    },
    chrono::Utc,
    uuid::Uuid,
};

/// Everything the shift-assignment workflow hands over when a shift needs
/// funds held.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub shift_assignment_id: Uuid,
    pub worker_id: Uuid,
    pub business_id: Uuid,
    pub breakdown: CostBreakdown,
}

/// Create the PENDING record and fire the capture command. Returns as soon
/// as the record is durable — the gateway's webhook, not this call, decides
/// whether the capture worked. A command timeout therefore leaves the
/// record PENDING rather than failing it.
pub async fn create_hold<S: PaymentStore>(
    store: &S,
    gateway: &dyn PaymentGateway,
    req: HoldRequest,
) -> Result<PaymentRecord, EscrowError> {
    if let Some(existing) = store.find_by_assignment(req.shift_assignment_id).await? {
        return Err(EscrowError::AlreadyInEscrow(existing.id));
    }

    let mut record = PaymentRecord::new_hold(
        req.shift_assignment_id,
        req.worker_id,
        req.business_id,
        &req.breakdown,
        Utc::now(),
    );
    record.check_invariants()?;
    store.insert_record(&record).await?;

    let cmd = CaptureCommand {
        record_id: record.id,
        business_id: record.business_id,
        amount: record.amount_gross,
        currency: record.currency,
    };
    match gateway.issue_capture(cmd).await {
        Ok(intent) => {
            record.payment_intent_id = Some(intent);
            // The capture webhook may already have landed; if so the intent
            // id arrived with it and this write is obsolete — drop it.
            if !store
                .update_record(&record, PaymentStatus::Pending)
                .await?
            {
                record = store
                    .get_record(record.id)
                    .await?
                    .ok_or(EscrowError::NotFound(record.id))?;
            }
        }
        Err(e) => {
            tracing::warn!(
                record_id = %record.id,
                error = %e,
                "capture command unresolved, awaiting webhook"
            );
        }
    }

    tracing::info!(
        record_id = %record.id,
        assignment_id = %record.shift_assignment_id,
        gross = %record.amount_gross,
        "escrow hold created"
    );
    Ok(record)
}

/// Poll/reconcile fallback for a missed capture webhook. Checks the
/// gateway's current view before touching anything, and writes
/// conditionally so it cannot race a concurrently-arriving webhook.
pub async fn confirm_capture<S: PaymentStore>(
    store: &S,
    gateway: &dyn PaymentGateway,
    notifier: &dyn StatusNotifier,
    record_id: Uuid,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    if record.status != PaymentStatus::Pending {
        return Ok(record);
    }
    let Some(ref intent) = record.payment_intent_id else {
        return Ok(record);
    };

    let mut updated = record.clone();
    match gateway.fetch_charge_status(intent).await? {
        RemoteChargeStatus::Held => updated.mark_captured(Utc::now())?,
        RemoteChargeStatus::Failed { reason } => {
            updated.mark_capture_failed(reason, Utc::now())?
        }
        RemoteChargeStatus::Pending => return Ok(record),
    }

    if store
        .update_record(&updated, PaymentStatus::Pending)
        .await?
    {
        tracing::info!(record_id = %updated.id, status = %updated.status, "capture confirmed by poll");
        if updated.status == PaymentStatus::Failed
            && let Err(e) = notifier.payment_failed(&updated).await
        {
            tracing::warn!(record_id = %updated.id, error = %e, "status notification failed");
        }
        Ok(updated)
    } else {
        // the webhook path won; its result stands
        store
            .get_record(record_id)
            .await?
            .ok_or(EscrowError::NotFound(record_id))
    }
}

/// Release held funds to the worker and fire the payout command. Also
/// covers a record already RELEASED by dispute resolution whose payout has
/// not been initiated yet.
pub async fn release<S: PaymentStore>(
    store: &S,
    gateway: &dyn PaymentGateway,
    record_id: Uuid,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    let releasable = record.status == PaymentStatus::InEscrow
        || (record.status == PaymentStatus::Released && record.payout_initiated_at.is_none());
    if !releasable {
        return Err(EscrowError::NotReleasable {
            id: record.id,
            status: record.status,
        });
    }
    let Some(intent) = record.payment_intent_id.clone() else {
        return Err(EscrowError::NotReleasable {
            id: record.id,
            status: record.status,
        });
    };

    let expected = record.status;
    let mut updated = record;
    if updated.status == PaymentStatus::InEscrow {
        updated.mark_released(Utc::now())?;
    }
    updated.payout_initiated_at = Some(Utc::now());

    if !store.update_record(&updated, expected).await? {
        return Err(EscrowError::Conflict(format!(
            "record {record_id} changed while releasing"
        )));
    }

    let cmd = PayoutCommand {
        record_id: updated.id,
        worker_id: updated.worker_id,
        amount: updated.worker_amount,
        currency: updated.currency,
        intent_id: intent,
    };
    // Transfer ids come back through transfer_created webhooks. A command
    // error clears payout_initiated_at again so a retry (caller or sweep)
    // can re-issue; the rail dedupes on the record_id carried in the
    // command.
    if let Err(e) = gateway.issue_payout(cmd).await {
        tracing::warn!(record_id = %updated.id, error = %e, "payout command unresolved, will retry");
        updated.payout_initiated_at = None;
        if !store
            .update_record(&updated, PaymentStatus::Released)
            .await?
        {
            // a webhook landed meanwhile; its view of the payout stands
            updated = store
                .get_record(record_id)
                .await?
                .ok_or(EscrowError::NotFound(record_id))?;
        }
        return Ok(updated);
    }

    tracing::info!(record_id = %updated.id, worker_amount = %updated.worker_amount, "escrow released");
    Ok(updated)
}

/// File a dispute; freezes release/payout until resolved.
pub async fn file_dispute<S: PaymentStore>(
    store: &S,
    notifier: &dyn StatusNotifier,
    record_id: Uuid,
    reason: &str,
    filed_by: &str,
    evidence_ref: Option<String>,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    let expected = record.status;
    let mut updated = record;
    updated.file_dispute(reason, filed_by, evidence_ref, Utc::now())?;

    if !store.update_record(&updated, expected).await? {
        return Err(EscrowError::Conflict(format!(
            "record {record_id} changed while filing dispute"
        )));
    }

    tracing::warn!(record_id = %updated.id, filed_by, "payment disputed, payouts frozen");
    if let Err(e) = notifier.payment_disputed(&updated).await {
        tracing::warn!(record_id = %updated.id, error = %e, "status notification failed");
    }
    Ok(updated)
}

/// Manual dispute resolution: back to RELEASED or out via REFUNDED.
pub async fn resolve_dispute<S: PaymentStore>(
    store: &S,
    record_id: Uuid,
    resolution: DisputeResolution,
    adjustment: i64,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    let mut updated = record;
    updated.resolve_dispute(resolution, adjustment, Utc::now())?;

    if !store
        .update_record(&updated, PaymentStatus::Disputed)
        .await?
    {
        return Err(EscrowError::Conflict(format!(
            "record {record_id} changed while resolving dispute"
        )));
    }

    tracing::info!(record_id = %updated.id, status = %updated.status, "dispute resolved");
    Ok(updated)
}

/// Explicit approved refund — the only path a refund takes; gateway refund
/// events on their own never trigger this.
pub async fn refund<S: PaymentStore>(
    store: &S,
    record_id: Uuid,
    amount: MoneyAmount,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    let expected = record.status;
    let mut updated = record;
    updated.apply_refund(amount, Utc::now())?;

    if !store.update_record(&updated, expected).await? {
        return Err(EscrowError::Conflict(format!(
            "record {record_id} changed while refunding"
        )));
    }

    tracing::info!(record_id = %updated.id, refund = %amount, "refund applied");
    Ok(updated)
}

/// Cancel before the money moved (shift/assignment cancelled).
pub async fn cancel<S: PaymentStore>(
    store: &S,
    record_id: Uuid,
) -> Result<PaymentRecord, EscrowError> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or(EscrowError::NotFound(record_id))?;

    let expected = record.status;
    let mut updated = record;
    updated.cancel(Utc::now())?;

    if !store.update_record(&updated, expected).await? {
        return Err(EscrowError::Conflict(format!(
            "record {record_id} changed while cancelling"
        )));
    }

    tracing::info!(record_id = %updated.id, "payment cancelled");
    Ok(updated)
}
