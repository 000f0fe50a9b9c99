use {
    super::reconciler::WebhookReconciler,
    crate::domain::{
        error::PaymentError,
        payment::ReconcileOutcome,
        repository::PaymentRepository,
    },
    chrono::{TimeDelta, Utc},
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

pub const SWEEP_BATCH: i64 = 20;

#[derive(Debug, Clone, Copy)]
pub struct SweeperSettings {
    pub interval: Duration,
    pub stale_after: Duration,
}

/// Periodically pull the provider state of payments that never got a
/// webhook, so a lost delivery does not leave them pending forever.
pub async fn run_sweeper(
    repo: Arc<dyn PaymentRepository>,
    reconciler: Arc<WebhookReconciler>,
    settings: SweeperSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("pending payment sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("pending payment sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }

        match sweep_once(&*repo, &reconciler, settings.stale_after).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "stale payments advanced"),
            Err(e) => tracing::error!(error = %e, "sweeper error"),
        }
    }
}

/// One pass over the least recently swept batch. Every payment looked at is
/// touched afterwards, so a batch of long-lived pending charges (boletos
/// wait days) rotates instead of hiding newer ones. Returns how many
/// payments changed status.
pub async fn sweep_once(
    repo: &dyn PaymentRepository,
    reconciler: &WebhookReconciler,
    stale_after: Duration,
) -> Result<usize, PaymentError> {
    let age = TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::minutes(10));
    let stale = repo.find_stale_unsettled(Utc::now() - age, SWEEP_BATCH).await?;

    let mut advanced = 0;
    for payment in &stale {
        match reconciler.sync_from_gateway(payment.id).await {
            Ok(ReconcileOutcome::Updated { .. }) => advanced += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(payment_id = %payment.id, gateway = %payment.gateway, error = %e, "sweep sync failed");
            }
        }
        if let Err(e) = repo.mark_swept(payment.id).await {
            tracing::warn!(payment_id = %payment.id, error = %e, "could not mark payment as swept");
        }
    }
    Ok(advanced)
}
