use {
    super::error::EscrowError,
    super::event::{EventKey, GatewayEvent, ProcessOutcome, WebhookEvent},
    super::ids::{IntentId, TransferId},
    super::payment::{PaymentRecord, PaymentStatus},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Answer to "have we fully processed this key before?".
#[derive(Debug, Clone)]
pub struct ShouldProcess {
    pub should_process: bool,
    /// Stored outcome from the first processing pass, for replay.
    pub existing_result: Option<serde_json::Value>,
}

/// Opaque handle to a ledger row, returned by `record_event` and consumed
/// by the mark_* calls.
#[derive(Debug, Clone)]
pub struct EventHandle {
    pub id: Uuid,
    pub key: EventKey,
}

/// Durable store for payment records. Every mutation is a single-row
/// conditional write — `expected` is the status the caller last read, and
/// the write fails (returns `false`) if another writer got there first.
pub trait PaymentStore: Send + Sync {
    fn insert_record(
        &self,
        record: &PaymentRecord,
    ) -> impl Future<Output = Result<(), EscrowError>> + Send;

    fn get_record(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<PaymentRecord>, EscrowError>> + Send;

    fn find_by_assignment(
        &self,
        shift_assignment_id: Uuid,
    ) -> impl Future<Output = Result<Option<PaymentRecord>, EscrowError>> + Send;

    fn find_by_intent(
        &self,
        intent: &IntentId,
    ) -> impl Future<Output = Result<Option<PaymentRecord>, EscrowError>> + Send;

    fn find_by_transfer(
        &self,
        transfer: &TransferId,
    ) -> impl Future<Output = Result<Option<PaymentRecord>, EscrowError>> + Send;

    /// Conditional write: persists `record` only while the stored status
    /// still equals `expected`. Returns `false` when the race was lost.
    fn update_record(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> impl Future<Output = Result<bool, EscrowError>> + Send;

    /// Records for a business's transaction history, newest first.
    fn list_for_business(
        &self,
        business_id: Uuid,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>, EscrowError>> + Send;

    /// PENDING records with an intent id that have been silent since
    /// `older_than` — candidates for a gateway status poll.
    fn stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>, EscrowError>> + Send;

    /// RELEASED records whose payout command never went out (failed or was
    /// never issued) and that have been silent since `older_than` —
    /// candidates for a payout retry.
    fn stale_released(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>, EscrowError>> + Send;
}

/// Idempotency ledger: exactly-once processing over at-least-once delivery.
pub trait EventLedger: Send + Sync {
    fn should_process(
        &self,
        key: &EventKey,
    ) -> impl Future<Output = Result<ShouldProcess, EscrowError>> + Send;

    /// Insert-or-refresh the PENDING row for this key. Idempotent;
    /// redelivery before processing overwrites the payload and bumps the
    /// attempt count, and re-opens a retryable FAILED row.
    fn record_event(
        &self,
        event: &GatewayEvent,
    ) -> impl Future<Output = Result<EventHandle, EscrowError>> + Send;

    /// PENDING → PROCESSING. `ConcurrentProcessing` if another worker
    /// already holds this key (conditional update, not a lock).
    fn mark_processing(
        &self,
        handle: &EventHandle,
    ) -> impl Future<Output = Result<(), EscrowError>> + Send;

    /// PROCESSING → PROCESSED with the outcome to replay to duplicates.
    fn mark_processed(
        &self,
        handle: &EventHandle,
        result: &ProcessOutcome,
        orphaned: bool,
    ) -> impl Future<Output = Result<(), EscrowError>> + Send;

    /// PROCESSING → FAILED. Retryable rows are re-opened by redelivery or
    /// the sweep.
    fn mark_failed(
        &self,
        handle: &EventHandle,
        reason: &str,
        retryable: bool,
    ) -> impl Future<Output = Result<(), EscrowError>> + Send;

    /// Atomically apply a record transition and advance the ledger row to
    /// PROCESSED — one transaction, so a crash can only re-run the whole
    /// step. Returns `false` (ledger untouched, still PROCESSING) when the
    /// conditional record write lost its race.
    fn commit_applied(
        &self,
        handle: &EventHandle,
        record: &PaymentRecord,
        expected: PaymentStatus,
        result: &ProcessOutcome,
    ) -> impl Future<Output = Result<bool, EscrowError>> + Send;

    /// Operator action: FAILED(retryable) → PENDING with a bumped attempt
    /// count. Returns whether a row was reset.
    fn reset_for_retry(
        &self,
        key: &EventKey,
    ) -> impl Future<Output = Result<bool, EscrowError>> + Send;

    /// Sweep: re-open retryable FAILED rows received before `before`.
    /// Returns the number of rows re-opened.
    fn sweep_retryable(
        &self,
        before: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<u64, EscrowError>> + Send;

    fn get_event(
        &self,
        key: &EventKey,
    ) -> impl Future<Output = Result<Option<WebhookEvent>, EscrowError>> + Send;
}
