use {
    super::{PgStore, rows::EventRow},
    crate::domain::{
        error::EscrowError,
        event::{EventKey, GatewayEvent, ProcessOutcome, WebhookEvent},
        ids::{IntentId, TransferId},
        payment::{PaymentRecord, PaymentStatus},
        store::{EventHandle, EventLedger, ShouldProcess},
    },
    chrono::{DateTime, Utc},
    sqlx::postgres::{PgQueryResult, PgRow},
    sqlx::{PgExecutor, Row},
    uuid::Uuid,
};

/// The conditional write at the heart of the concurrency model: the row is
/// touched only while its status is still what the caller last read.
pub(super) async fn conditional_record_update(
    executor: impl PgExecutor<'_>,
    record: &PaymentRecord,
    expected: PaymentStatus,
) -> Result<PgQueryResult, EscrowError> {
    let result = sqlx::query(
        r#"
        UPDATE payment_records SET
            amount_net = $1, refund_amount = $2, dispute_adjustment_amount = $3,
            adjustment_amount = $4, payment_intent_id = $5, transfer_id = $6,
            status = $7, error_message = $8, disputed = $9, dispute_reason = $10,
            dispute_status = $11, dispute_evidence_ref = $12, dispute_filed_by = $13,
            escrow_held_at = $14, released_at = $15, payout_initiated_at = $16,
            payout_completed_at = $17, disputed_at = $18, refunded_at = $19,
            resolved_at = $20, updated_at = now()
        WHERE id = $21 AND status = $22
        "#,
    )
    .bind(record.amount_net.minor_units())
    .bind(record.refund_amount.minor_units())
    .bind(record.dispute_adjustment_amount)
    .bind(record.adjustment_amount)
    .bind(record.payment_intent_id.as_ref().map(IntentId::as_str))
    .bind(record.transfer_id.as_ref().map(TransferId::as_str))
    .bind(record.status.as_str())
    .bind(record.error_message.as_deref())
    .bind(record.disputed)
    .bind(record.dispute_reason.as_deref())
    .bind(record.dispute_status.map(|s| s.as_str()))
    .bind(record.dispute_evidence_ref.as_deref())
    .bind(record.dispute_filed_by.as_deref())
    .bind(record.escrow_held_at)
    .bind(record.released_at)
    .bind(record.payout_initiated_at)
    .bind(record.payout_completed_at)
    .bind(record.disputed_at)
    .bind(record.refunded_at)
    .bind(record.resolved_at)
    .bind(record.id)
    .bind(expected.as_str())
    .execute(executor)
    .await?;
    Ok(result)
}

impl EventLedger for PgStore {
    async fn should_process(&self, key: &EventKey) -> Result<ShouldProcess, EscrowError> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT status, result FROM webhook_events \
             WHERE gateway = $1 AND external_event_id = $2",
        )
        .bind(&key.gateway)
        .bind(&key.external_event_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) if row.get::<String, _>("status") == "processed" => Ok(ShouldProcess {
                should_process: false,
                existing_result: row.get("result"),
            }),
            _ => Ok(ShouldProcess {
                should_process: true,
                existing_result: None,
            }),
        }
    }

    async fn record_event(&self, event: &GatewayEvent) -> Result<EventHandle, EscrowError> {
        // Upsert keeps PROCESSING/PROCESSED rows untouched; PENDING and
        // retryable FAILED rows are refreshed for this delivery.
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events
                (id, gateway, external_event_id, event_type, raw_payload,
                 status, retryable, attempt_count, orphaned, received_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', false, 1, false, now())
            ON CONFLICT (gateway, external_event_id) DO UPDATE SET
                raw_payload = CASE
                    WHEN webhook_events.status = 'pending'
                      OR (webhook_events.status = 'failed' AND webhook_events.retryable)
                    THEN EXCLUDED.raw_payload
                    ELSE webhook_events.raw_payload END,
                attempt_count = CASE
                    WHEN webhook_events.status = 'pending'
                      OR (webhook_events.status = 'failed' AND webhook_events.retryable)
                    THEN webhook_events.attempt_count + 1
                    ELSE webhook_events.attempt_count END,
                failure_reason = CASE
                    WHEN webhook_events.status = 'failed' AND webhook_events.retryable
                    THEN NULL
                    ELSE webhook_events.failure_reason END,
                status = CASE
                    WHEN webhook_events.status = 'failed' AND webhook_events.retryable
                    THEN 'pending'
                    ELSE webhook_events.status END
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&event.key.gateway)
        .bind(&event.key.external_event_id)
        .bind(&event.event_type)
        .bind(&event.raw_payload)
        .fetch_one(self.pool())
        .await?;

        Ok(EventHandle {
            id,
            key: event.key.clone(),
        })
    }

    async fn mark_processing(&self, handle: &EventHandle) -> Result<(), EscrowError> {
        let result = sqlx::query(
            "UPDATE webhook_events SET status = 'processing' \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(handle.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(EscrowError::ConcurrentProcessing(handle.key.to_string()));
        }
        Ok(())
    }

    async fn mark_processed(
        &self,
        handle: &EventHandle,
        result: &ProcessOutcome,
        orphaned: bool,
    ) -> Result<(), EscrowError> {
        sqlx::query(
            "UPDATE webhook_events \
             SET status = 'processed', result = $2, orphaned = $3, \
                 retryable = false, failure_reason = NULL, processed_at = now() \
             WHERE id = $1",
        )
        .bind(handle.id)
        .bind(serde_json::to_value(result)?)
        .bind(orphaned)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        handle: &EventHandle,
        reason: &str,
        retryable: bool,
    ) -> Result<(), EscrowError> {
        sqlx::query(
            "UPDATE webhook_events \
             SET status = 'failed', failure_reason = $2, retryable = $3 \
             WHERE id = $1",
        )
        .bind(handle.id)
        .bind(reason)
        .bind(retryable)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn commit_applied(
        &self,
        handle: &EventHandle,
        record: &PaymentRecord,
        expected: PaymentStatus,
        result: &ProcessOutcome,
    ) -> Result<bool, EscrowError> {
        let mut tx = self.pool().begin().await?;

        let updated = conditional_record_update(&mut *tx, record, expected).await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE webhook_events \
             SET status = 'processed', result = $2, retryable = false, \
                 failure_reason = NULL, processed_at = now() \
             WHERE id = $1",
        )
        .bind(handle.id)
        .bind(serde_json::to_value(result)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn reset_for_retry(&self, key: &EventKey) -> Result<bool, EscrowError> {
        let result = sqlx::query(
            "UPDATE webhook_events \
             SET status = 'pending', attempt_count = attempt_count + 1 \
             WHERE gateway = $1 AND external_event_id = $2 \
               AND status = 'failed' AND retryable",
        )
        .bind(&key.gateway)
        .bind(&key.external_event_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sweep_retryable(
        &self,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<u64, EscrowError> {
        // SKIP LOCKED so concurrent sweepers never contend.
        let result = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'pending', attempt_count = attempt_count + 1
            WHERE id IN (
                SELECT id FROM webhook_events
                WHERE status = 'failed' AND retryable AND received_at < $1
                ORDER BY received_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            "#,
        )
        .bind(before)
        .bind(limit)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn get_event(&self, key: &EventKey) -> Result<Option<WebhookEvent>, EscrowError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, gateway, external_event_id, event_type, raw_payload, \
                    status, retryable, failure_reason, attempt_count, orphaned, \
                    result, received_at, processed_at \
             FROM webhook_events \
             WHERE gateway = $1 AND external_event_id = $2",
        )
        .bind(&key.gateway)
        .bind(&key.external_event_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(WebhookEvent::try_from).transpose()
    }
}
