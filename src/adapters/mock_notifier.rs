use {
    crate::domain::{error::EscrowError, notify::StatusNotifier, payment::PaymentRecord},
    std::future::Future,
    std::pin::Pin,
    std::sync::{Arc, Mutex},
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Failed(Uuid),
    Paid(Uuid),
    Disputed(Uuid),
}

/// Recording notifier for tests: remembers every notification in order.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, n: Notification) {
        self.sent.lock().unwrap().push(n);
    }
}

impl StatusNotifier for MockNotifier {
    fn payment_failed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            self.push(Notification::Failed(record.id));
            Ok(())
        })
    }

    fn worker_paid<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            self.push(Notification::Paid(record.id));
            Ok(())
        })
    }

    fn payment_disputed<'a>(
        &'a self,
        record: &'a PaymentRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EscrowError>> + Send + 'a>> {
        Box::pin(async move {
            self.push(Notification::Disputed(record.id));
            Ok(())
        })
    }
}
