use {
    super::costing::CostBreakdown,
    super::error::EscrowError,
    super::ids::{IntentId, TransferId},
    super::money::{Currency, MoneyAmount},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    InEscrow,
    Released,
    PaidOut,
    Failed,
    Disputed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InEscrow => "in_escrow",
            Self::Released => "released",
            Self::PaidOut => "paid_out",
            Self::Failed => "failed",
            Self::Disputed => "disputed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaidOut | Self::Failed | Self::Refunded | Self::Cancelled
        )
    }

    /// Position along the capture→escrow→release→payout spine. `None` for
    /// states off the spine (failed/refunded/cancelled). Used to tell an
    /// idempotent late duplicate from a genuinely contradictory event.
    pub fn spine_rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::InEscrow => Some(1),
            Self::Released | Self::Disputed => Some(2),
            Self::PaidOut => Some(3),
            Self::Failed | Self::Refunded | Self::Cancelled => None,
        }
    }

    /// The closed transition table. Anything not listed here is illegal.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, InEscrow)
                | (Pending, Failed)
                | (InEscrow, Released)
                | (InEscrow, Disputed)
                | (Released, PaidOut)
                | (Released, Disputed)
                | (Disputed, Released)
                | (Pending, Refunded)
                | (InEscrow, Refunded)
                | (Released, Refunded)
                | (Disputed, Refunded)
                | (Pending, Cancelled)
                | (InEscrow, Cancelled)
                | (Released, Cancelled)
                | (Disputed, Cancelled)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EscrowError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_escrow" => Ok(Self::InEscrow),
            "released" => Ok(Self::Released),
            "paid_out" => Ok(Self::PaidOut),
            "failed" => Ok(Self::Failed),
            "disputed" => Ok(Self::Disputed),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EscrowError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
        }
    }
}

impl TryFrom<&str> for DisputeStatus {
    type Error = EscrowError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "open" => Ok(Self::Open),
            "under_review" => Ok(Self::UnderReview),
            "resolved" => Ok(Self::Resolved),
            other => Err(EscrowError::Validation(format!(
                "unknown dispute status: {other}"
            ))),
        }
    }
}

/// How a dispute is settled by manual review.
#[derive(Debug, Clone)]
pub enum DisputeResolution {
    ReleaseToWorker,
    RefundToBusiness { amount: MoneyAmount },
}

/// One shift payment: amounts frozen at hold time, a status driven by the
/// transition table above, and the gateway identifiers that webhooks
/// reconcile against. Never deleted — terminal rows stay for audit/export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub shift_assignment_id: Uuid,
    pub worker_id: Uuid,
    pub business_id: Uuid,

    pub currency: Currency,
    pub amount_gross: MoneyAmount,
    pub platform_fee: MoneyAmount,
    pub vat_amount: MoneyAmount,
    pub agency_commission: MoneyAmount,
    pub worker_amount: MoneyAmount,
    pub amount_net: MoneyAmount,
    pub refund_amount: MoneyAmount,
    /// Signed minor units; bounded by ±amount_gross.
    pub dispute_adjustment_amount: i64,
    pub adjustment_amount: i64,

    pub payment_intent_id: Option<IntentId>,
    pub transfer_id: Option<TransferId>,

    pub status: PaymentStatus,
    pub error_message: Option<String>,

    pub disputed: bool,
    pub dispute_reason: Option<String>,
    pub dispute_status: Option<DisputeStatus>,
    pub dispute_evidence_ref: Option<String>,
    pub dispute_filed_by: Option<String>,

    pub escrow_held_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub payout_initiated_at: Option<DateTime<Utc>>,
    pub payout_completed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// New PENDING record with amounts frozen from a cost breakdown.
    pub fn new_hold(
        shift_assignment_id: Uuid,
        worker_id: Uuid,
        business_id: Uuid,
        breakdown: &CostBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            shift_assignment_id,
            worker_id,
            business_id,
            currency: breakdown.currency,
            amount_gross: breakdown.escrow_amount,
            platform_fee: breakdown.platform_fee_amount,
            vat_amount: breakdown.vat_amount,
            agency_commission: breakdown.agency_commission,
            worker_amount: breakdown.worker_amount,
            amount_net: breakdown.worker_amount,
            refund_amount: MoneyAmount::ZERO,
            dispute_adjustment_amount: 0,
            adjustment_amount: 0,
            payment_intent_id: None,
            transfer_id: None,
            status: PaymentStatus::Pending,
            error_message: None,
            disputed: false,
            dispute_reason: None,
            dispute_status: None,
            dispute_evidence_ref: None,
            dispute_filed_by: None,
            escrow_held_at: None,
            released_at: None,
            payout_initiated_at: None,
            payout_completed_at: None,
            disputed_at: None,
            refunded_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure(&self, next: PaymentStatus) -> Result<(), EscrowError> {
        if !self.status.can_transition_to(&next) {
            return Err(EscrowError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(())
    }

    fn set_status(&mut self, next: PaymentStatus, now: DateTime<Utc>) {
        self.status = next;
        self.updated_at = now;
    }

    /// Gateway confirmed the capture — funds are held.
    pub fn mark_captured(&mut self, now: DateTime<Utc>) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::InEscrow)?;
        self.escrow_held_at = Some(now);
        self.set_status(PaymentStatus::InEscrow, now);
        Ok(())
    }

    /// Gateway could not capture — the assignment sees `payment_failed`.
    pub fn mark_capture_failed(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::Failed)?;
        self.error_message = Some(reason.into());
        self.set_status(PaymentStatus::Failed, now);
        Ok(())
    }

    /// Held funds are now owed to the worker.
    pub fn mark_released(&mut self, now: DateTime<Utc>) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::Released)?;
        self.released_at = Some(now);
        self.set_status(PaymentStatus::Released, now);
        Ok(())
    }

    /// Payout transfer confirmed by the gateway.
    pub fn mark_paid_out(&mut self, now: DateTime<Utc>) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::PaidOut)?;
        self.payout_completed_at = Some(now);
        self.set_status(PaymentStatus::PaidOut, now);
        Ok(())
    }

    pub fn file_dispute(
        &mut self,
        reason: impl Into<String>,
        filed_by: impl Into<String>,
        evidence_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        if self.disputed && self.status == PaymentStatus::Disputed {
            return Err(EscrowError::AlreadyDisputed(self.id));
        }
        self.ensure(PaymentStatus::Disputed)?;
        self.disputed = true;
        self.dispute_reason = Some(reason.into());
        self.dispute_filed_by = Some(filed_by.into());
        self.dispute_evidence_ref = evidence_ref;
        self.dispute_status = Some(DisputeStatus::Open);
        self.disputed_at = Some(now);
        self.set_status(PaymentStatus::Disputed, now);
        Ok(())
    }

    pub fn resolve_dispute(
        &mut self,
        resolution: DisputeResolution,
        adjustment: i64,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        if self.status != PaymentStatus::Disputed {
            return Err(EscrowError::IllegalTransition {
                from: self.status,
                to: PaymentStatus::Disputed,
            });
        }
        if adjustment.unsigned_abs() > self.amount_gross.minor_units() as u64 {
            return Err(EscrowError::Validation(format!(
                "dispute adjustment {adjustment} exceeds gross {}",
                self.amount_gross
            )));
        }
        self.dispute_adjustment_amount = adjustment;
        self.dispute_status = Some(DisputeStatus::Resolved);
        self.resolved_at = Some(now);
        match resolution {
            DisputeResolution::ReleaseToWorker => {
                self.ensure(PaymentStatus::Released)?;
                self.released_at = Some(now);
                self.set_status(PaymentStatus::Released, now);
            }
            DisputeResolution::RefundToBusiness { amount } => {
                self.ensure(PaymentStatus::Refunded)?;
                self.set_refund(amount, now)?;
            }
        }
        self.recompute_net();
        Ok(())
    }

    /// Explicit approved refund. Terminal.
    pub fn apply_refund(
        &mut self,
        amount: MoneyAmount,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::Refunded)?;
        self.set_refund(amount, now)?;
        self.recompute_net();
        Ok(())
    }

    fn set_refund(&mut self, amount: MoneyAmount, now: DateTime<Utc>) -> Result<(), EscrowError> {
        if amount > self.amount_gross {
            return Err(EscrowError::Validation(format!(
                "refund {amount} exceeds gross {}",
                self.amount_gross
            )));
        }
        self.refund_amount = amount;
        self.refunded_at = Some(now);
        self.set_status(PaymentStatus::Refunded, now);
        Ok(())
    }

    /// Shift/assignment cancelled before the money moved. Terminal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), EscrowError> {
        self.ensure(PaymentStatus::Cancelled)?;
        self.set_status(PaymentStatus::Cancelled, now);
        Ok(())
    }

    /// Attach the payout transfer id reported by the gateway. Legal only
    /// once released; re-attaching the same id is a no-op upstream.
    pub fn record_transfer(
        &mut self,
        transfer: TransferId,
        now: DateTime<Utc>,
    ) -> Result<(), EscrowError> {
        if self.status != PaymentStatus::Released {
            return Err(EscrowError::Precondition(format!(
                "transfer reported while status is {}",
                self.status
            )));
        }
        self.transfer_id = Some(transfer);
        self.payout_initiated_at.get_or_insert(now);
        self.updated_at = now;
        Ok(())
    }

    fn recompute_net(&mut self) {
        let base = self
            .amount_gross
            .saturating_sub(self.refund_amount)
            .minor_units();
        let adjusted = base + self.dispute_adjustment_amount + self.adjustment_amount;
        let clamped = adjusted.clamp(0, self.amount_gross.minor_units());
        self.amount_net = MoneyAmount::new(clamped).unwrap_or(MoneyAmount::ZERO);
    }

    /// Money invariants that must hold in every status.
    pub fn check_invariants(&self) -> Result<(), EscrowError> {
        let parts = self.worker_amount.minor_units()
            + self.platform_fee.minor_units()
            + self.vat_amount.minor_units()
            + self.agency_commission.minor_units();
        if (parts - self.amount_gross.minor_units()).abs() > 1 {
            return Err(EscrowError::Validation(format!(
                "gross {} does not match component sum {parts}",
                self.amount_gross
            )));
        }
        if self.amount_net > self.amount_gross {
            return Err(EscrowError::Validation(format!(
                "net {} exceeds gross {}",
                self.amount_net, self.amount_gross
            )));
        }
        let gross = self.amount_gross.minor_units() as u64;
        if self.dispute_adjustment_amount.unsigned_abs() > gross
            || self.adjustment_amount.unsigned_abs() > gross
        {
            return Err(EscrowError::Validation(
                "adjustment exceeds gross".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::costing::{RateCard, ShiftTerms, VatBase, quote};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn breakdown() -> CostBreakdown {
        let rates = RateCard {
            platform_fee_rate: Decimal::from_str("0.35").unwrap(),
            vat_rate: Decimal::from_str("0.18").unwrap(),
            agency_commission_rate: Decimal::from_str("0.10").unwrap(),
            weekend_rate: Decimal::ZERO,
            night_rate: Decimal::ZERO,
            holiday_rate: Decimal::ZERO,
            urgent_fill_rate: Decimal::ZERO,
            vat_base: VatBase::FeeInclusive,
            currency: Currency::Usd,
        };
        let terms = ShiftTerms {
            hourly_rate: Decimal::from(20),
            hours: Decimal::from(8),
            is_weekend: false,
            is_night_shift: false,
            is_public_holiday: false,
            is_urgent_fill: false,
        };
        quote(&terms, &rates).unwrap()
    }

    fn record() -> PaymentRecord {
        PaymentRecord::new_hold(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Uuid::now_v7(),
            &breakdown(),
            Utc::now(),
        )
    }

    #[test]
    fn new_hold_satisfies_invariants() {
        let r = record();
        assert_eq!(r.status, PaymentStatus::Pending);
        r.check_invariants().unwrap();
    }

    #[test]
    fn happy_path_spine() {
        let mut r = record();
        let now = Utc::now();
        r.mark_captured(now).unwrap();
        assert_eq!(r.status, PaymentStatus::InEscrow);
        assert!(r.escrow_held_at.is_some());

        r.mark_released(now).unwrap();
        assert_eq!(r.status, PaymentStatus::Released);

        r.record_transfer(TransferId::new("tr_1").unwrap(), now).unwrap();
        r.mark_paid_out(now).unwrap();
        assert_eq!(r.status, PaymentStatus::PaidOut);
        assert!(r.payout_completed_at.is_some());
        r.check_invariants().unwrap();
    }

    #[test]
    fn cannot_release_before_capture() {
        let mut r = record();
        let err = r.mark_released(Utc::now()).unwrap_err();
        assert!(matches!(err, EscrowError::IllegalTransition { .. }));
        assert_eq!(r.status, PaymentStatus::Pending);
    }

    #[test]
    fn cannot_pay_out_before_release() {
        let mut r = record();
        r.mark_captured(Utc::now()).unwrap();
        let err = r.mark_paid_out(Utc::now()).unwrap_err();
        assert!(matches!(err, EscrowError::IllegalTransition { .. }));
        assert_eq!(r.status, PaymentStatus::InEscrow);
    }

    #[test]
    fn dispute_freezes_then_resolves_to_release() {
        let mut r = record();
        let now = Utc::now();
        r.mark_captured(now).unwrap();
        r.file_dispute("hours contested", "business", None, now).unwrap();
        assert_eq!(r.status, PaymentStatus::Disputed);
        assert!(r.disputed);

        // frozen: no release while disputed
        assert!(r.mark_released(now).is_err());

        r.resolve_dispute(DisputeResolution::ReleaseToWorker, -500, now)
            .unwrap();
        assert_eq!(r.status, PaymentStatus::Released);
        assert_eq!(r.dispute_adjustment_amount, -500);
        assert!(r.resolved_at.is_some());
        r.check_invariants().unwrap();
    }

    #[test]
    fn dispute_can_resolve_to_refund() {
        let mut r = record();
        let now = Utc::now();
        r.mark_captured(now).unwrap();
        r.file_dispute("no-show", "business", None, now).unwrap();
        r.resolve_dispute(
            DisputeResolution::RefundToBusiness {
                amount: r.amount_gross,
            },
            0,
            now,
        )
        .unwrap();
        assert_eq!(r.status, PaymentStatus::Refunded);
        assert_eq!(r.refund_amount, r.amount_gross);
        assert_eq!(r.amount_net, MoneyAmount::ZERO);
    }

    #[test]
    fn double_dispute_is_rejected() {
        let mut r = record();
        let now = Utc::now();
        r.mark_captured(now).unwrap();
        r.file_dispute("a", "worker", None, now).unwrap();
        assert!(matches!(
            r.file_dispute("b", "worker", None, now),
            Err(EscrowError::AlreadyDisputed(_))
        ));
    }

    #[test]
    fn refund_bounded_by_gross() {
        let mut r = record();
        let now = Utc::now();
        r.mark_captured(now).unwrap();
        let too_much = r.amount_gross + MoneyAmount::new(1).unwrap();
        assert!(r.apply_refund(too_much, now).is_err());
        assert_eq!(r.status, PaymentStatus::InEscrow);
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut r = record();
        let now = Utc::now();
        r.mark_capture_failed("card declined", now).unwrap();
        assert!(r.status.is_terminal());
        assert!(r.mark_captured(now).is_err());
        assert!(r.cancel(now).is_err());
        assert!(r.apply_refund(MoneyAmount::ZERO, now).is_err());
    }

    #[test]
    fn transfer_requires_released() {
        let mut r = record();
        let err = r
            .record_transfer(TransferId::new("tr_x").unwrap(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EscrowError::Precondition(_)));
    }
}
