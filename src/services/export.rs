use crate::domain::payment::PaymentRecord;

/// Transaction-history projection: one CSV row per payment record, newest
/// first as provided. Formatting only — no business logic lives here.
pub fn transaction_history_csv(records: &[PaymentRecord]) -> String {
    let mut out = String::from(
        "date,shift_assignment_id,status,amount_gross,platform_fee,amount_net,disputed,gateway_reference\n",
    );
    for r in records {
        let reference = r
            .transfer_id
            .as_ref()
            .map(|t| t.as_str())
            .or(r.payment_intent_id.as_ref().map(|i| i.as_str()))
            .unwrap_or("");
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            r.created_at.format("%Y-%m-%d"),
            r.shift_assignment_id,
            r.status,
            r.currency.format_minor(r.amount_gross.minor_units()),
            r.currency.format_minor(r.platform_fee.minor_units()),
            r.currency.format_minor(r.amount_net.minor_units()),
            r.disputed,
            reference,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::costing::{RateCard, ShiftTerms, VatBase, quote};
    use crate::domain::money::Currency;
    use crate::domain::payment::PaymentRecord;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn renders_header_and_rows() {
        let rates = RateCard {
            platform_fee_rate: Decimal::from_str("0.35").unwrap(),
            vat_rate: Decimal::from_str("0.18").unwrap(),
            agency_commission_rate: Decimal::ZERO,
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
        let breakdown = quote(&terms, &rates).unwrap();
        let record = PaymentRecord::new_hold(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Uuid::now_v7(),
            &breakdown,
            Utc::now(),
        );

        let csv = transaction_history_csv(&[record.clone()]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("date,shift_assignment_id"));
        let row = lines.next().unwrap();
        assert!(row.contains("pending"));
        assert!(row.contains("254.88"));
        assert!(row.contains(&record.shift_assignment_id.to_string()));
    }

    #[test]
    fn empty_input_is_header_only() {
        let csv = transaction_history_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}
