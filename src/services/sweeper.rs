use {
    crate::domain::{
        gateway::PaymentGateway,
        notify::StatusNotifier,
        store::{EventLedger, PaymentStore},
    },
    crate::services::escrow,
    chrono::{Duration as ChronoDuration, Utc},
    std::sync::Arc,
    std::time::Duration,
    tokio::sync::watch,
};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often the sweep runs.
    pub interval: Duration,
    /// Retryable FAILED ledger entries older than this are re-opened.
    pub retry_backoff: ChronoDuration,
    /// PENDING records silent for longer than this get a gateway poll.
    pub pending_timeout: ChronoDuration,
    pub batch_size: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retry_backoff: ChronoDuration::minutes(5),
            pending_timeout: ChronoDuration::minutes(15),
            batch_size: 50,
        }
    }
}

/// Background reconciliation sweep: re-opens retryable FAILED ledger
/// entries and, when a gateway client is wired in, polls long-silent
/// PENDING holds and retries RELEASED records whose payout command never
/// went out.
pub async fn run_sweeper<S>(
    store: S,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: Arc<dyn StatusNotifier>,
    config: SweepConfig,
    mut shutdown: watch::Receiver<bool>,
) where
    S: PaymentStore + EventLedger,
{
    tracing::info!("reconciliation sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("reconciliation sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        let cutoff = Utc::now() - config.retry_backoff;
        match store.sweep_retryable(cutoff, config.batch_size).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "re-opened retryable ledger entries"),
            Err(e) => tracing::error!(error = %e, "ledger sweep error"),
        }

        let Some(ref gateway) = gateway else { continue };
        let silent_since = Utc::now() - config.pending_timeout;
        let stale = match store.stale_pending(silent_since, config.batch_size).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "stale-pending scan error");
                continue;
            }
        };
        for record in stale {
            match escrow::confirm_capture(&store, gateway.as_ref(), notifier.as_ref(), record.id)
                .await
            {
                Ok(updated) if updated.status != record.status => {
                    tracing::info!(
                        record_id = %updated.id,
                        status = %updated.status,
                        "silent hold resolved by gateway poll"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "gateway poll failed");
                }
            }
        }

        // RELEASED with no payout in flight: the payout command failed (or
        // a dispute resolution released without one). Re-issue it.
        let stuck = match store.stale_released(silent_since, config.batch_size).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "stale-released scan error");
                continue;
            }
        };
        for record in stuck {
            match escrow::release(&store, gateway.as_ref(), record.id).await {
                Ok(updated) if updated.payout_initiated_at.is_some() => {
                    tracing::info!(record_id = %updated.id, "stuck payout re-issued");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "payout retry failed");
                }
            }
        }
    }
}
