use {
    super::error::EscrowError,
    super::ids::{IntentId, TransferId},
    super::money::{Currency, MoneyAmount},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

/// Capture/hold command issued when a hold is created. `record_id` travels
/// as command metadata and is echoed back in webhook events, which is how
/// reconciliation finds the record even before an intent id is stored.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    pub record_id: Uuid,
    pub business_id: Uuid,
    pub amount: MoneyAmount,
    pub currency: Currency,
}

/// Payout command issued on release.
#[derive(Debug, Clone)]
pub struct PayoutCommand {
    pub record_id: Uuid,
    pub worker_id: Uuid,
    pub amount: MoneyAmount,
    pub currency: Currency,
    pub intent_id: IntentId,
}

/// Gateway-side view of a charge, for the poll/reconcile fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChargeStatus {
    Held,
    Failed { reason: String },
    Pending,
}

/// The funds-movement rail. Implementations must apply their own bounded
/// timeouts; callers treat a timeout as "outcome unknown, webhook will
/// tell", never as failure.
pub trait PaymentGateway: Send + Sync {
    fn issue_capture(
        &self,
        cmd: CaptureCommand,
    ) -> Pin<Box<dyn Future<Output = Result<IntentId, EscrowError>> + Send + '_>>;

    fn issue_payout(
        &self,
        cmd: PayoutCommand,
    ) -> Pin<Box<dyn Future<Output = Result<TransferId, EscrowError>> + Send + '_>>;

    fn fetch_charge_status(
        &self,
        intent: &IntentId,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteChargeStatus, EscrowError>> + Send + '_>>;
}
