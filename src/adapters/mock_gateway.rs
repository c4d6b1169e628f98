use {
    crate::domain::{
        error::EscrowError,
        gateway::{CaptureCommand, PaymentGateway, PayoutCommand, RemoteChargeStatus},
        ids::{IntentId, TransferId},
    },
    std::collections::HashMap,
    std::future::Future,
    std::pin::Pin,
    std::sync::atomic::{AtomicU64, Ordering},
    std::sync::{Arc, Mutex},
};

/// Scriptable gateway for tests and local demos. Hands out sequential
/// intent/transfer ids, remembers every command, and can be told what a
/// status poll should answer.
#[derive(Clone, Default)]
pub struct MockGateway {
    counter: Arc<AtomicU64>,
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner {
    captures: Vec<CaptureCommand>,
    payouts: Vec<PayoutCommand>,
    charge_status: HashMap<String, RemoteChargeStatus>,
    fail_commands: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command return a gateway error (simulated timeout).
    pub fn fail_commands(&self, fail: bool) {
        self.inner.lock().unwrap().fail_commands = fail;
    }

    pub fn set_charge_status(&self, intent: &IntentId, status: RemoteChargeStatus) {
        self.inner
            .lock()
            .unwrap()
            .charge_status
            .insert(intent.as_str().to_string(), status);
    }

    pub fn captures(&self) -> Vec<CaptureCommand> {
        self.inner.lock().unwrap().captures.clone()
    }

    pub fn payouts(&self) -> Vec<PayoutCommand> {
        self.inner.lock().unwrap().payouts.clone()
    }
}

impl PaymentGateway for MockGateway {
    fn issue_capture(
        &self,
        cmd: CaptureCommand,
    ) -> Pin<Box<dyn Future<Output = Result<IntentId, EscrowError>> + Send + '_>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_commands {
                return Err(EscrowError::Gateway("capture command timed out".into()));
            }
            inner.captures.push(cmd);
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            IntentId::new(format!("pi_mock_{n}"))
        })
    }

    fn issue_payout(
        &self,
        cmd: PayoutCommand,
    ) -> Pin<Box<dyn Future<Output = Result<TransferId, EscrowError>> + Send + '_>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_commands {
                return Err(EscrowError::Gateway("payout command timed out".into()));
            }
            inner.payouts.push(cmd);
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            TransferId::new(format!("tr_mock_{n}"))
        })
    }

    fn fetch_charge_status(
        &self,
        intent: &IntentId,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteChargeStatus, EscrowError>> + Send + '_>> {
        let intent = intent.clone();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            if inner.fail_commands {
                return Err(EscrowError::Gateway("status poll timed out".into()));
            }
            Ok(inner
                .charge_status
                .get(intent.as_str())
                .cloned()
                .unwrap_or(RemoteChargeStatus::Pending))
        })
    }
}
