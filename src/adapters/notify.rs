use {
    crate::domain::{error::EscrowError, notify::StatusNotifier, payment::PaymentRecord},
    std::{future::Future, pin::Pin},
};

/// Default notification sink until a real collaborator transport is wired
/// in: emits each notification as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl StatusNotifier for LogNotifier {
    fn payment_failed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                record_id = %record.id,
                assignment_id = %record.shift_assignment_id,
                reason = record.error_message.as_deref().unwrap_or("unknown"),
                "notify assignment: payment failed"
            );
            Ok(())
        })
    }

    fn worker_paid<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                record_id = %record.id,
                worker_id = %record.worker_id,
                amount = %record.worker_amount,
                "notify worker: payout completed"
            );
            Ok(())
        })
    }

    fn payment_disputed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                record_id = %record.id,
                assignment_id = %record.shift_assignment_id,
                worker_id = %record.worker_id,
                "notify both parties: payment disputed, payouts frozen"
            );
            Ok(())
        })
    }
}
