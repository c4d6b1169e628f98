use {
    super::error::EscrowError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
};

/// Gateway-side charge/hold identifier. Opaque — each gateway has its own
/// shape, so the only rule is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn new(id: impl Into<String>) -> Result<Self, EscrowError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EscrowError::Validation("IntentId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway-side payout transfer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    pub fn new(id: impl Into<String>) -> Result<Self, EscrowError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EscrowError::Validation("TransferId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
