use {super::payment::PaymentStatus, thiserror::Error, uuid::Uuid};

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("invalid rate: {0}")]
    InvalidRate(String),

    #[error("illegal transition: {from} → {to}")]
    IllegalTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("payment {0} already in escrow")]
    AlreadyInEscrow(Uuid),

    #[error("payment {id} not releasable from status {status}")]
    NotReleasable { id: Uuid, status: PaymentStatus },

    #[error("payment {0} already disputed")]
    AlreadyDisputed(Uuid),

    #[error("payment record not found: {0}")]
    NotFound(Uuid),

    #[error("event {0} is already being processed by another worker")]
    ConcurrentProcessing(String),

    #[error("conditional update lost: {0}")]
    Conflict(String),

    #[error("precondition not met: {0}")]
    Precondition(String),

    #[error("gateway: {0}")]
    Gateway(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("webhook signature: {0}")]
    WebhookSignature(String),
}

impl EscrowError {
    /// True when the gateway (or a sweep) should redeliver and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::Conflict(_) | Self::Database(_) | Self::Gateway(_)
        )
    }
}
