use {
    crate::domain::{
        error::EscrowError,
        event::{EventKey, EventStatus, GatewayEvent, ProcessOutcome, WebhookEvent},
        ids::{IntentId, TransferId},
        payment::{PaymentRecord, PaymentStatus},
        store::{EventHandle, EventLedger, PaymentStore, ShouldProcess},
    },
    chrono::{DateTime, Utc},
    std::collections::HashMap,
    std::sync::{Arc, Mutex},
    uuid::Uuid,
};

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, PaymentRecord>,
    events: HashMap<EventKey, WebhookEvent>,
}

/// In-process store with the same conditional-update semantics as the
/// Postgres implementation. Backs the test suite and local demos; all
/// checks and writes for one call happen under a single mutex scope, which
/// stands in for the single-row atomic updates of the durable store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

impl PaymentStore for MemoryStore {
    async fn insert_record(&self, record: &PaymentRecord) -> Result<(), EscrowError> {
        let mut inner = self.lock();
        if inner.records.contains_key(&record.id) {
            return Err(EscrowError::Conflict(format!(
                "record {} already exists",
                record.id
            )));
        }
        // mirrors the unique index on shift_assignment_id
        if inner
            .records
            .values()
            .any(|r| r.shift_assignment_id == record.shift_assignment_id)
        {
            return Err(EscrowError::Conflict(format!(
                "assignment {} already has a payment record",
                record.shift_assignment_id
            )));
        }
        inner.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<PaymentRecord>, EscrowError> {
        Ok(self.lock().records.get(&id).cloned())
    }

    async fn find_by_assignment(
        &self,
        shift_assignment_id: Uuid,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.shift_assignment_id == shift_assignment_id)
            .cloned())
    }

    async fn find_by_intent(
        &self,
        intent: &IntentId,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.payment_intent_id.as_ref() == Some(intent))
            .cloned())
    }

    async fn find_by_transfer(
        &self,
        transfer: &TransferId,
    ) -> Result<Option<PaymentRecord>, EscrowError> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.transfer_id.as_ref() == Some(transfer))
            .cloned())
    }

    async fn update_record(
        &self,
        record: &PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool, EscrowError> {
        let mut inner = self.lock();
        let stored = inner
            .records
            .get_mut(&record.id)
            .ok_or(EscrowError::NotFound(record.id))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = record.clone();
        Ok(true)
    }

    async fn list_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let mut records: Vec<PaymentRecord> = self
            .lock()
            .records
            .values()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let mut records: Vec<PaymentRecord> = self
            .lock()
            .records
            .values()
            .filter(|r| {
                r.status == PaymentStatus::Pending
                    && r.payment_intent_id.is_some()
                    && r.updated_at < older_than
            })
            .cloned()
            .collect();
        records.sort_by_key(|r| r.updated_at);
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn stale_released(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, EscrowError> {
        let mut records: Vec<PaymentRecord> = self
            .lock()
            .records
            .values()
            .filter(|r| {
                r.status == PaymentStatus::Released
                    && r.payout_initiated_at.is_none()
                    && r.updated_at < older_than
            })
            .cloned()
            .collect();
        records.sort_by_key(|r| r.updated_at);
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

impl EventLedger for MemoryStore {
    async fn should_process(&self, key: &EventKey) -> Result<ShouldProcess, EscrowError> {
        let inner = self.lock();
        match inner.events.get(key) {
            Some(ev) if ev.status == EventStatus::Processed => Ok(ShouldProcess {
                should_process: false,
                existing_result: ev.result.clone(),
            }),
            _ => Ok(ShouldProcess {
                should_process: true,
                existing_result: None,
            }),
        }
    }

    async fn record_event(&self, event: &GatewayEvent) -> Result<EventHandle, EscrowError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let entry = inner
            .events
            .entry(event.key.clone())
            .or_insert_with(|| WebhookEvent {
                id: Uuid::now_v7(),
                key: event.key.clone(),
                event_type: event.event_type.clone(),
                raw_payload: event.raw_payload.clone(),
                status: EventStatus::Pending,
                retryable: false,
                failure_reason: None,
                attempt_count: 0,
                orphaned: false,
                result: None,
                received_at: now,
                processed_at: None,
            });
        match entry.status {
            EventStatus::Pending => {
                entry.raw_payload = event.raw_payload.clone();
                entry.attempt_count += 1;
            }
            EventStatus::Failed if entry.retryable => {
                entry.status = EventStatus::Pending;
                entry.failure_reason = None;
                entry.raw_payload = event.raw_payload.clone();
                entry.attempt_count += 1;
            }
            // PROCESSING is owned by another worker; PROCESSED and
            // permanent FAILED rows are left untouched.
            _ => {}
        }
        Ok(EventHandle {
            id: entry.id,
            key: event.key.clone(),
        })
    }

    async fn mark_processing(&self, handle: &EventHandle) -> Result<(), EscrowError> {
        let mut inner = self.lock();
        let entry = inner
            .events
            .get_mut(&handle.key)
            .ok_or(EscrowError::NotFound(handle.id))?;
        if entry.status != EventStatus::Pending {
            return Err(EscrowError::ConcurrentProcessing(handle.key.to_string()));
        }
        entry.status = EventStatus::Processing;
        Ok(())
    }

    async fn mark_processed(
        &self,
        handle: &EventHandle,
        result: &ProcessOutcome,
        orphaned: bool,
    ) -> Result<(), EscrowError> {
        let mut inner = self.lock();
        let entry = inner
            .events
            .get_mut(&handle.key)
            .ok_or(EscrowError::NotFound(handle.id))?;
        entry.status = EventStatus::Processed;
        entry.result = Some(serde_json::to_value(result)?);
        entry.orphaned = orphaned;
        entry.retryable = false;
        entry.failure_reason = None;
        entry.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(
        &self,
        handle: &EventHandle,
        reason: &str,
        retryable: bool,
    ) -> Result<(), EscrowError> {
        let mut inner = self.lock();
        let entry = inner
            .events
            .get_mut(&handle.key)
            .ok_or(EscrowError::NotFound(handle.id))?;
        entry.status = EventStatus::Failed;
        entry.failure_reason = Some(reason.to_string());
        entry.retryable = retryable;
        Ok(())
    }

    async fn commit_applied(
        &self,
        handle: &EventHandle,
        record: &PaymentRecord,
        expected: PaymentStatus,
        result: &ProcessOutcome,
    ) -> Result<bool, EscrowError> {
        let mut inner = self.lock();
        let stored = inner
            .records
            .get_mut(&record.id)
            .ok_or(EscrowError::NotFound(record.id))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = record.clone();
        let entry = inner
            .events
            .get_mut(&handle.key)
            .ok_or(EscrowError::NotFound(handle.id))?;
        entry.status = EventStatus::Processed;
        entry.result = Some(serde_json::to_value(result)?);
        entry.retryable = false;
        entry.failure_reason = None;
        entry.processed_at = Some(Utc::now());
        Ok(true)
    }

    async fn reset_for_retry(&self, key: &EventKey) -> Result<bool, EscrowError> {
        let mut inner = self.lock();
        match inner.events.get_mut(key) {
            Some(entry) if entry.status == EventStatus::Failed && entry.retryable => {
                entry.status = EventStatus::Pending;
                entry.attempt_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn sweep_retryable(
        &self,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<u64, EscrowError> {
        let mut inner = self.lock();
        let mut reopened = 0u64;
        for entry in inner.events.values_mut() {
            if reopened >= limit.max(0) as u64 {
                break;
            }
            if entry.status == EventStatus::Failed
                && entry.retryable
                && entry.received_at < before
            {
                entry.status = EventStatus::Pending;
                entry.attempt_count += 1;
                reopened += 1;
            }
        }
        Ok(reopened)
    }

    async fn get_event(&self, key: &EventKey) -> Result<Option<WebhookEvent>, EscrowError> {
        Ok(self.lock().events.get(key).cloned())
    }
}
