use {
    super::error::EscrowError,
    super::payment::PaymentRecord,
    std::{future::Future, pin::Pin},
};

/// Outbound status notifications to the collaborators that own the shift
/// workflow: the assignment hears about capture failures, the worker hears
/// about completed payouts, both sides hear about disputes. Fire-and-forget
/// from the payment path's point of view; callers log delivery errors and
/// never let them block or roll back a transition.
pub trait StatusNotifier: Send + Sync {
    /// Capture failed; the owning assignment should mark `payment_failed`.
    fn payment_failed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>>;

    /// Payout transfer confirmed; the worker should hear they were paid.
    fn worker_paid<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>>;

    /// Payment entered dispute; payouts are frozen until resolution.
    fn payment_disputed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>>;
}
