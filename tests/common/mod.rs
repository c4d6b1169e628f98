#![allow(dead_code)]

use rust_decimal::Decimal;
use serde_json::{Value, json};
use shiftpay::adapters::mock_gateway::MockGateway;
use shiftpay::adapters::notify::LogNotifier;
use shiftpay::domain::costing::{CostBreakdown, RateCard, ShiftTerms, VatBase, quote};
use shiftpay::domain::event::GatewayEvent;
use shiftpay::domain::money::Currency;
use shiftpay::domain::payment::PaymentRecord;
use shiftpay::domain::store::PaymentStore;
use shiftpay::infra::memory::MemoryStore;
use shiftpay::services::{escrow, escrow::HoldRequest, reconciler};
use std::str::FromStr;
use uuid::Uuid;

pub const GATEWAY: &str = "testpay";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 20/h × 8h, fee 35%, VAT 18% fee-inclusive, commission 10%:
/// base 160.00, worker 144.00, commission 16.00, fee 56.00, VAT 38.88,
/// escrow 254.88.
pub fn standard_rates() -> RateCard {
    RateCard {
        platform_fee_rate: dec("0.35"),
        vat_rate: dec("0.18"),
        agency_commission_rate: dec("0.10"),
        weekend_rate: dec("0.25"),
        night_rate: dec("0.15"),
        holiday_rate: dec("0.50"),
        urgent_fill_rate: dec("0.20"),
        vat_base: VatBase::FeeInclusive,
        currency: Currency::Usd,
    }
}

pub fn standard_terms() -> ShiftTerms {
    ShiftTerms {
        hourly_rate: dec("20"),
        hours: dec("8"),
        is_weekend: false,
        is_night_shift: false,
        is_public_holiday: false,
        is_urgent_fill: false,
    }
}

pub fn standard_breakdown() -> CostBreakdown {
    quote(&standard_terms(), &standard_rates()).unwrap()
}

pub fn hold_request() -> HoldRequest {
    HoldRequest {
        shift_assignment_id: Uuid::now_v7(),
        worker_id: Uuid::now_v7(),
        business_id: Uuid::now_v7(),
        breakdown: standard_breakdown(),
    }
}

/// Create a hold through the orchestrator; comes back PENDING with a mock
/// intent id attached.
pub async fn held_record(store: &MemoryStore, gateway: &MockGateway) -> PaymentRecord {
    escrow::create_hold(store, gateway, hold_request())
        .await
        .expect("create_hold failed")
}

/// Held record pushed into IN_ESCROW by its capture webhook.
pub async fn escrowed_record(store: &MemoryStore, gateway: &MockGateway) -> PaymentRecord {
    let record = held_record(store, gateway).await;
    let event_id = format!("evt_cap_{}", record.id);
    reconciler::process_event(store, &LogNotifier, capture_event(&event_id, &record))
        .await
        .expect("capture event failed");
    store
        .get_record(record.id)
        .await
        .unwrap()
        .expect("record vanished")
}

pub fn event(event_id: &str, event_type: &str, data: Value) -> GatewayEvent {
    GatewayEvent::parse(
        GATEWAY,
        json!({
            "id": event_id,
            "type": event_type,
            "created": 1_700_000_000,
            "data": data,
        }),
    )
    .expect("event parse failed")
}

pub fn capture_event(event_id: &str, record: &PaymentRecord) -> GatewayEvent {
    let intent = record
        .payment_intent_id
        .as_ref()
        .map(|i| i.as_str().to_string())
        .unwrap_or_else(|| "pi_unknown".to_string());
    event(
        event_id,
        "capture_succeeded",
        json!({
            "payment_intent_id": intent,
            "metadata": {"payment_record_id": record.id.to_string()},
        }),
    )
}

pub fn capture_failed_event(event_id: &str, record: &PaymentRecord, reason: &str) -> GatewayEvent {
    event(
        event_id,
        "capture_failed",
        json!({
            "reason": reason,
            "metadata": {"payment_record_id": record.id.to_string()},
        }),
    )
}

pub fn transfer_created_event(
    event_id: &str,
    record: &PaymentRecord,
    transfer: &str,
) -> GatewayEvent {
    event(
        event_id,
        "transfer_created",
        json!({
            "transfer_id": transfer,
            "metadata": {"payment_record_id": record.id.to_string()},
        }),
    )
}

pub fn transfer_paid_event(event_id: &str, record: &PaymentRecord, transfer: &str) -> GatewayEvent {
    event(
        event_id,
        "transfer_paid",
        json!({
            "transfer_id": transfer,
            "metadata": {"payment_record_id": record.id.to_string()},
        }),
    )
}
