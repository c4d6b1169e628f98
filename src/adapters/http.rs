use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, signature::verify_signature},
        domain::{
            error::EscrowError,
            event::{GatewayEvent, ProcessOutcome, ReconcileResult},
            store::{EventLedger, PaymentStore},
        },
        services::reconciler,
    },
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, Path, State},
        http::HeaderMap,
        routing::{get, post},
    },
    std::time::Duration,
    tower_http::timeout::TimeoutLayer,
};

pub fn router<S>(state: AppState<S>) -> Router
where
    S: PaymentStore + EventLedger + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook/{gateway}", post(webhook_handler::<S>))
        .layer(DefaultBodyLimit::max(64 * 1024)) // gateway events are small
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state)
}

#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(gateway = %gateway, event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn webhook_handler<S>(
    State(state): State<AppState<S>>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: PaymentStore + EventLedger + Clone + Send + Sync + 'static,
{
    let sig = headers
        .get("X-Webhook-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            EscrowError::WebhookSignature("missing X-Webhook-Signature header".into())
        })?;
    if !verify_signature(&state.webhook_secret, body.as_bytes(), sig) {
        return Err(EscrowError::WebhookSignature("signature mismatch".into()).into());
    }

    let payload: serde_json::Value = serde_json::from_str(&body).map_err(EscrowError::from)?;
    let event = GatewayEvent::parse(&gateway, payload)?;

    tracing::Span::current()
        .record("event_id", tracing::field::display(&event.key.external_event_id))
        .record("event_type", tracing::field::display(&event.event_type));

    match reconciler::process_event(&state.store, state.notifier.as_ref(), event).await? {
        ReconcileResult::Fresh(outcome) => {
            let status = match &outcome {
                ProcessOutcome::Applied { new_status, .. } => {
                    tracing::info!(status = %new_status, "transition applied");
                    "applied"
                }
                ProcessOutcome::NoOp { current_status, .. } => {
                    tracing::info!(status = %current_status, "no-op, effect already applied");
                    "noop"
                }
                ProcessOutcome::Ignored { .. } => "ignored",
                ProcessOutcome::Unsupported { .. } => "unsupported",
                ProcessOutcome::Orphaned => "orphaned",
            };
            Ok(Json(serde_json::json!({"status": status})))
        }
        ReconcileResult::Duplicate(prior) => Ok(Json(serde_json::json!({
            "status": "duplicate",
            "result": prior,
        }))),
        ReconcileResult::InFlight => {
            Ok(Json(serde_json::json!({"status": "in_flight"})))
        }
    }
}
