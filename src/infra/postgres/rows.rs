use {
    crate::domain::{
        error::EscrowError,
        event::{EventKey, EventStatus, WebhookEvent},
        ids::{IntentId, TransferId},
        money::{Currency, MoneyAmount},
        payment::{DisputeStatus, PaymentRecord, PaymentStatus},
    },
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub const PAYMENT_COLUMNS: &str = "id, shift_assignment_id, worker_id, business_id, currency, \
     amount_gross, platform_fee, vat_amount, agency_commission, worker_amount, amount_net, \
     refund_amount, dispute_adjustment_amount, adjustment_amount, payment_intent_id, \
     transfer_id, status, error_message, disputed, dispute_reason, dispute_status, \
     dispute_evidence_ref, dispute_filed_by, escrow_held_at, released_at, payout_initiated_at, \
     payout_completed_at, disputed_at, refunded_at, resolved_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub shift_assignment_id: Uuid,
    pub worker_id: Uuid,
    pub business_id: Uuid,
    pub currency: String,
    pub amount_gross: i64,
    pub platform_fee: i64,
    pub vat_amount: i64,
    pub agency_commission: i64,
    pub worker_amount: i64,
    pub amount_net: i64,
    pub refund_amount: i64,
    pub dispute_adjustment_amount: i64,
    pub adjustment_amount: i64,
    pub payment_intent_id: Option<String>,
    pub transfer_id: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub disputed: bool,
    pub dispute_reason: Option<String>,
    pub dispute_status: Option<String>,
    pub dispute_evidence_ref: Option<String>,
    pub dispute_filed_by: Option<String>,
    pub escrow_held_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub payout_initiated_at: Option<DateTime<Utc>>,
    pub payout_completed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = EscrowError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            id: row.id,
            shift_assignment_id: row.shift_assignment_id,
            worker_id: row.worker_id,
            business_id: row.business_id,
            currency: Currency::try_from(row.currency.as_str())?,
            amount_gross: MoneyAmount::new(row.amount_gross)?,
            platform_fee: MoneyAmount::new(row.platform_fee)?,
            vat_amount: MoneyAmount::new(row.vat_amount)?,
            agency_commission: MoneyAmount::new(row.agency_commission)?,
            worker_amount: MoneyAmount::new(row.worker_amount)?,
            amount_net: MoneyAmount::new(row.amount_net)?,
            refund_amount: MoneyAmount::new(row.refund_amount)?,
            dispute_adjustment_amount: row.dispute_adjustment_amount,
            adjustment_amount: row.adjustment_amount,
            payment_intent_id: row.payment_intent_id.map(IntentId::new).transpose()?,
            transfer_id: row.transfer_id.map(TransferId::new).transpose()?,
            status: PaymentStatus::try_from(row.status.as_str())?,
            error_message: row.error_message,
            disputed: row.disputed,
            dispute_reason: row.dispute_reason,
            dispute_status: row
                .dispute_status
                .as_deref()
                .map(DisputeStatus::try_from)
                .transpose()?,
            dispute_evidence_ref: row.dispute_evidence_ref,
            dispute_filed_by: row.dispute_filed_by,
            escrow_held_at: row.escrow_held_at,
            released_at: row.released_at,
            payout_initiated_at: row.payout_initiated_at,
            payout_completed_at: row.payout_completed_at,
            disputed_at: row.disputed_at,
            refunded_at: row.refunded_at,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub gateway: String,
    pub external_event_id: String,
    pub event_type: String,
    pub raw_payload: serde_json::Value,
    pub status: String,
    pub retryable: bool,
    pub failure_reason: Option<String>,
    pub attempt_count: i32,
    pub orphaned: bool,
    pub result: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for WebhookEvent {
    type Error = EscrowError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEvent {
            id: row.id,
            key: EventKey::new(row.gateway, row.external_event_id)?,
            event_type: row.event_type,
            raw_payload: row.raw_payload,
            status: EventStatus::try_from(row.status.as_str())?,
            retryable: row.retryable,
            failure_reason: row.failure_reason,
            attempt_count: row.attempt_count,
            orphaned: row.orphaned,
            result: row.result,
            received_at: row.received_at,
            processed_at: row.processed_at,
        })
    }
}
