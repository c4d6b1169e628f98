use {
    super::error::EscrowError,
    super::money::{Currency, MoneyAmount},
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
};

/// Which amounts VAT is charged on. Jurisdiction-dependent; the default
/// grosses up the platform fee together with the base pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatBase {
    FeeInclusive,
    FeeOnly,
    BaseOnly,
}

/// Configured rates for a marketplace tenant. All rates are fractions
/// (0.35 = 35%), surcharges stack additively onto the surge multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCard {
    pub platform_fee_rate: Decimal,
    pub vat_rate: Decimal,
    pub agency_commission_rate: Decimal,
    pub weekend_rate: Decimal,
    pub night_rate: Decimal,
    pub holiday_rate: Decimal,
    pub urgent_fill_rate: Decimal,
    pub vat_base: VatBase,
    pub currency: Currency,
}

impl RateCard {
    fn validate(&self) -> Result<(), EscrowError> {
        let rates = [
            ("platform_fee_rate", self.platform_fee_rate),
            ("vat_rate", self.vat_rate),
            ("agency_commission_rate", self.agency_commission_rate),
            ("weekend_rate", self.weekend_rate),
            ("night_rate", self.night_rate),
            ("holiday_rate", self.holiday_rate),
            ("urgent_fill_rate", self.urgent_fill_rate),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO {
                return Err(EscrowError::InvalidRate(format!(
                    "{name} cannot be negative, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Shift parameters as fixed by the assignment workflow.
#[derive(Debug, Clone)]
pub struct ShiftTerms {
    pub hourly_rate: Decimal,
    pub hours: Decimal,
    pub is_weekend: bool,
    pub is_night_shift: bool,
    pub is_public_holiday: bool,
    pub is_urgent_fill: bool,
}

/// Fee breakdown for one shift. Ephemeral — embedded into a payment record
/// at creation, never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub surge_multiplier: Decimal,
    pub base_worker_pay: MoneyAmount,
    pub platform_fee_amount: MoneyAmount,
    pub vat_amount: MoneyAmount,
    pub agency_commission: MoneyAmount,
    pub worker_amount: MoneyAmount,
    pub escrow_amount: MoneyAmount,
    pub total_business_cost: MoneyAmount,
    pub currency: Currency,
}

/// Turn shift terms and a rate card into a fee breakdown.
///
/// Pure and deterministic: every component is rounded half-even to the
/// currency's minor unit and the totals are sums of the rounded components,
/// so `escrow = worker + commission + fee + vat` holds exactly.
pub fn quote(terms: &ShiftTerms, rates: &RateCard) -> Result<CostBreakdown, EscrowError> {
    rates.validate()?;
    if terms.hours <= Decimal::ZERO {
        return Err(EscrowError::InvalidRate(format!(
            "shift duration must be positive, got {} hours",
            terms.hours
        )));
    }
    if terms.hourly_rate < Decimal::ZERO {
        return Err(EscrowError::InvalidRate(format!(
            "hourly rate cannot be negative, got {}",
            terms.hourly_rate
        )));
    }

    let mut surge = Decimal::ONE;
    if terms.is_weekend {
        surge += rates.weekend_rate;
    }
    if terms.is_night_shift {
        surge += rates.night_rate;
    }
    if terms.is_public_holiday {
        surge += rates.holiday_rate;
    }
    if terms.is_urgent_fill {
        surge += rates.urgent_fill_rate;
    }

    let currency = rates.currency;
    let base_decimal = terms.hourly_rate * terms.hours * surge;
    let base_worker_pay = MoneyAmount::from_decimal(base_decimal, currency)?;

    let platform_fee_amount =
        MoneyAmount::from_decimal(base_decimal * rates.platform_fee_rate, currency)?;
    let agency_commission =
        MoneyAmount::from_decimal(base_decimal * rates.agency_commission_rate, currency)?;

    let vat_base = match rates.vat_base {
        VatBase::FeeInclusive => base_decimal * (Decimal::ONE + rates.platform_fee_rate),
        VatBase::FeeOnly => base_decimal * rates.platform_fee_rate,
        VatBase::BaseOnly => base_decimal,
    };
    let vat_amount = MoneyAmount::from_decimal(vat_base * rates.vat_rate, currency)?;

    let worker_amount = base_worker_pay.checked_sub(agency_commission).ok_or_else(|| {
        EscrowError::InvalidRate(format!(
            "agency commission {agency_commission} exceeds base pay {base_worker_pay}"
        ))
    })?;

    let escrow_amount = base_worker_pay + platform_fee_amount + vat_amount;

    Ok(CostBreakdown {
        surge_multiplier: surge,
        base_worker_pay,
        platform_fee_amount,
        vat_amount,
        agency_commission,
        worker_amount,
        escrow_amount,
        total_business_cost: escrow_amount,
        currency,
    })
}
