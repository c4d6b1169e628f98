use {
    super::error::EscrowError,
    super::ids::{IntentId, TransferId},
    super::payment::PaymentStatus,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Dedup key for one gateway notification. Unique, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub gateway: String,
    pub external_event_id: String,
}

impl EventKey {
    pub fn new(
        gateway: impl Into<String>,
        external_event_id: impl Into<String>,
    ) -> Result<Self, EscrowError> {
        let gateway = gateway.into();
        let external_event_id = external_event_id.into();
        if gateway.trim().is_empty() || external_event_id.trim().is_empty() {
            return Err(EscrowError::Validation(
                "event key needs a gateway and an event id".into(),
            ));
        }
        Ok(Self {
            gateway,
            external_event_id,
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gateway, self.external_event_id)
    }
}

/// Closed set of gateway event kinds. Unknown types land in `Unsupported`
/// so they are recorded and visible, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CaptureSucceeded,
    CaptureFailed,
    TransferCreated,
    TransferPaid,
    ChargeRefunded,
    Unsupported(String),
}

impl EventKind {
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "capture_succeeded" => Self::CaptureSucceeded,
            "capture_failed" => Self::CaptureFailed,
            "transfer_created" => Self::TransferCreated,
            "transfer_paid" => Self::TransferPaid,
            "charge_refunded" => Self::ChargeRefunded,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// A verified, parsed inbound notification, ready for the ledger.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub key: EventKey,
    pub kind: EventKind,
    pub event_type: String,
    /// Our record id when the gateway echoes back command metadata.
    pub record_hint: Option<Uuid>,
    pub intent_id: Option<IntentId>,
    pub transfer_id: Option<TransferId>,
    pub failure_reason: Option<String>,
    pub provider_ts: i64,
    pub raw_payload: serde_json::Value,
}

impl GatewayEvent {
    /// Parse the generic webhook envelope:
    /// `{"id", "type", "created", "data": {"payment_intent_id"?,
    /// "transfer_id"?, "reason"?, "metadata": {"payment_record_id"?}}}`.
    pub fn parse(gateway: &str, payload: serde_json::Value) -> Result<Self, EscrowError> {
        let event_id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EscrowError::Validation("event is missing \"id\"".into()))?;
        let event_type = payload
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EscrowError::Validation("event is missing \"type\"".into()))?
            .to_string();
        let provider_ts = payload.get("created").and_then(|v| v.as_i64()).unwrap_or(0);

        let data = payload.get("data").cloned().unwrap_or(serde_json::Value::Null);
        let record_hint = data
            .get("metadata")
            .and_then(|m| m.get("payment_record_id"))
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        let intent_id = data
            .get("payment_intent_id")
            .and_then(|v| v.as_str())
            .map(IntentId::new)
            .transpose()?;
        let transfer_id = data
            .get("transfer_id")
            .and_then(|v| v.as_str())
            .map(TransferId::new)
            .transpose()?;
        let failure_reason = data
            .get("reason")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Self {
            key: EventKey::new(gateway, event_id)?,
            kind: EventKind::parse(&event_type),
            event_type,
            record_hint,
            intent_id,
            transfer_id,
            failure_reason,
            provider_ts,
            raw_payload: payload,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = EscrowError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(EscrowError::Validation(format!(
                "unknown event status: {other}"
            ))),
        }
    }
}

/// Ledger row for one event key.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub key: EventKey,
    pub event_type: String,
    pub raw_payload: serde_json::Value,
    pub status: EventStatus,
    pub retryable: bool,
    pub failure_reason: Option<String>,
    pub attempt_count: i32,
    pub orphaned: bool,
    pub result: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// What processing an event did. Stored on the ledger row and replayed
/// verbatim to duplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// A state transition (or transfer-id attach) was applied.
    Applied {
        record_id: Uuid,
        new_status: PaymentStatus,
    },
    /// Matched a record but the effect had already been applied.
    NoOp {
        record_id: Uuid,
        current_status: PaymentStatus,
    },
    /// Recorded but deliberately takes no action (refund signals need an
    /// explicit authorized call).
    Ignored { event_type: String },
    /// Unknown event type — recorded and surfaced for review.
    Unsupported { event_type: String },
    /// No payment record matched — flagged for operator review.
    Orphaned,
}

/// Result of one webhook delivery.
#[derive(Debug, Clone)]
pub enum ReconcileResult {
    /// First time this key was processed to completion.
    Fresh(ProcessOutcome),
    /// Key already PROCESSED — the stored outcome, re-served with no side
    /// effects.
    Duplicate(Option<serde_json::Value>),
    /// Another worker holds PROCESSING for this key right now.
    InFlight,
}
