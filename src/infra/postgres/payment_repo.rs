use {
    super::{
        PgStore,
        rows::{PAYMENT_COLUMNS, PaymentRow},
    },
    crate::domain::{
        error::EscrowError,
        ids::{IntentId, TransferId},
        payment::{PaymentRecord, PaymentStatus},
        store::PaymentStore,
    },
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

fn rows_to_records(rows: Vec<PaymentRow>) -> Result<Vec<PaymentRecord>, EscrowError> {
    rows.into_iter().map(PaymentRecord::try_from).collect()
}

impl PgStore {
    async fn fetch_one_by(
        &self,
        where_clause: &str,
        bind: &str,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        let sql =
            format!("SELECT {PAYMENT_COLUMNS} FROM payment_records WHERE {where_clause} = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(bind)
            .fetch_optional(self.pool())
            .await?;
        row.map(PaymentRecord::try_from).transpose()
    }
}

impl PaymentStore for PgStore {
    async fn insert_record(&self, record: &PaymentRecord) -> Result<(), EscrowError> {
        sqlx::query(
            r#"
            INSERT INTO payment_records
                (id, shift_assignment_id, worker_id, business_id, currency,
                 amount_gross, platform_fee, vat_amount, agency_commission,
                 worker_amount, amount_net, refund_amount,
                 dispute_adjustment_amount, adjustment_amount,
                 payment_intent_id, transfer_id, status, error_message,
                 disputed, dispute_reason, dispute_status, dispute_evidence_ref,
                 dispute_filed_by, escrow_held_at, released_at,
                 payout_initiated_at, payout_completed_at, disputed_at,
                 refunded_at, resolved_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24,
                    $25, $26, $27, $28, $29, $30, $31, $32)
            "#,
        )
        .bind(record.id)
        .bind(record.shift_assignment_id)
        .bind(record.worker_id)
        .bind(record.business_id)
        .bind(record.currency.as_str())
        .bind(record.amount_gross.minor_units())
        .bind(record.platform_fee.minor_units())
        .bind(record.vat_amount.minor_units())
        .bind(record.agency_commission.minor_units())
        .bind(record.worker_amount.minor_units())
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
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PaymentRecord>, EscrowError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payment_records WHERE id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_by_assignment(
        &self,
        shift_assignment_id: Uuid,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_records WHERE shift_assignment_id = $1"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(shift_assignment_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_by_intent(
        &self,
        intent: &IntentId,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        self.fetch_one_by("payment_intent_id", intent.as_str()).await
    }

    async fn find_by_transfer(
        &self,
        transfer: &TransferId,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        self.fetch_one_by("transfer_id", transfer.as_str()).await
    }

    async fn update_record(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool, EscrowError> {
        let result = super::event_repo::conditional_record_update(self.pool(), record, expected)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_records \
             WHERE business_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(business_id)
            .fetch_all(self.pool())
            .await?;
        rows_to_records(rows)
    }

    async fn stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_records \
             WHERE status = 'pending' AND payment_intent_id IS NOT NULL \
               AND updated_at < $1 \
             ORDER BY updated_at LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(older_than)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        rows_to_records(rows)
    }

    async fn stale_released(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_records \
             WHERE status = 'released' AND payout_initiated_at IS NULL \
               AND updated_at < $1 \
             ORDER BY updated_at LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(older_than)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        rows_to_records(rows)
    }
}
