use {
    super::hooks::PostCommitHooks,
    crate::{
        adapters::registry::GatewayRegistry,
        domain::{
            error::PaymentError,
            extract,
            payment::{Payment, PaymentStatus, ReconcileOutcome, StatusUpdate},
            repository::PaymentRepository,
            status::map_status,
        },
    },
    serde_json::Value,
    std::sync::Arc,
    tracing::Span,
    uuid::Uuid,
};

const RECENT_IDS_ON_MISS: i64 = 10;

/// What the provider says about one payment, from a webhook body or a pull.
struct Observation {
    provider_status: String,
    status_detail: Option<String>,
    gateway_transaction_id: Option<String>,
    data: Value,
    from_webhook: bool,
}

/// Applies provider-reported status to stored payments. Deliveries may be
/// concurrent, out of order or repeated; every write is a single-row update
/// guarded by the status it was decided against.
pub struct WebhookReconciler {
    repo: Arc<dyn PaymentRepository>,
    registry: Arc<GatewayRegistry>,
    hooks: PostCommitHooks,
}

impl WebhookReconciler {
    pub fn new(
        repo: Arc<dyn PaymentRepository>,
        registry: Arc<GatewayRegistry>,
        hooks: PostCommitHooks,
    ) -> Self {
        Self {
            repo,
            registry,
            hooks,
        }
    }

    /// Malformed payloads (no payment id) are a `Validation` error; an
    /// unknown payment is the `NotFound` outcome, not an error.
    #[tracing::instrument(skip_all, fields(external_id, payment_id, outcome))]
    pub async fn handle_webhook(&self, payload: &Value) -> Result<ReconcileOutcome, PaymentError> {
        let object = extract::payment_object(payload);
        let external_id = extract::object_id(object).ok_or_else(|| {
            PaymentError::Validation("webhook payload carries no payment id".into())
        })?;
        Span::current().record("external_id", external_id.as_str());

        let Some(payment) = self.locate(&external_id, object).await? else {
            let recent = self
                .repo
                .recent_gateway_payment_ids(RECENT_IDS_ON_MISS)
                .await
                .unwrap_or_default();
            tracing::warn!(
                external_id = %external_id,
                recent = ?recent,
                "webhook for unknown payment"
            );
            Span::current().record("outcome", "not_found");
            return Ok(ReconcileOutcome::NotFound { external_id });
        };
        Span::current().record("payment_id", tracing::field::display(payment.id));

        let observation = match extract::object_status(object) {
            Some(provider_status) => Observation {
                provider_status,
                status_detail: object
                    .get("status_detail")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                gateway_transaction_id: extract::transaction_id(object),
                data: payload.clone(),
                from_webhook: true,
            },
            None => {
                // Notification without a status: ask the provider.
                let gateway_payment_id =
                    payment.gateway_payment_id.as_deref().unwrap_or(&external_id);
                let fetched = self
                    .registry
                    .get(payment.gateway)?
                    .fetch(gateway_payment_id)
                    .await?;
                Observation {
                    provider_status: fetched.provider_status,
                    status_detail: fetched.status_detail,
                    gateway_transaction_id: fetched.gateway_transaction_id,
                    data: payload.clone(),
                    from_webhook: true,
                }
            }
        };

        let outcome = self.apply(payment, observation).await?;
        Span::current().record("outcome", outcome.as_str());
        Ok(outcome)
    }

    /// Pull-based reconciliation: same decision and effects as a webhook,
    /// without marking the payment as webhook-confirmed.
    #[tracing::instrument(skip(self), fields(gateway, outcome))]
    pub async fn sync_from_gateway(&self, payment_id: Uuid) -> Result<ReconcileOutcome, PaymentError> {
        let payment = self
            .repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| PaymentError::not_found(format!("payment {payment_id}")))?;
        Span::current().record("gateway", payment.gateway.as_str());

        let gateway_payment_id = payment.gateway_payment_id.clone().ok_or_else(|| {
            PaymentError::precondition("payment has no provider id to sync from")
        })?;
        let fetched = self
            .registry
            .get(payment.gateway)?
            .fetch(&gateway_payment_id)
            .await?;

        let observation = Observation {
            provider_status: fetched.provider_status,
            status_detail: fetched.status_detail,
            gateway_transaction_id: fetched.gateway_transaction_id,
            data: fetched.raw,
            from_webhook: false,
        };
        let outcome = self.apply(payment, observation).await?;
        Span::current().record("outcome", outcome.as_str());
        Ok(outcome)
    }

    /// By provider id first, then by transaction id. A transaction-id hit
    /// gets its missing provider id filled in.
    async fn locate(&self, external_id: &str, object: &Value) -> Result<Option<Payment>, PaymentError> {
        if let Some(payment) = self.repo.find_by_gateway_payment_id(external_id).await? {
            return Ok(Some(payment));
        }

        let mut candidates = vec![external_id.to_string()];
        if let Some(tx_id) = extract::transaction_id(object).filter(|t| t != external_id) {
            candidates.push(tx_id);
        }
        for candidate in &candidates {
            let Some(mut payment) = self.repo.find_by_gateway_transaction_id(candidate).await? else {
                continue;
            };
            if self.repo.backfill_gateway_payment_id(payment.id, external_id).await? {
                tracing::info!(payment_id = %payment.id, external_id, "backfilled provider payment id");
                payment.gateway_payment_id = Some(external_id.to_string());
            }
            return Ok(Some(payment));
        }
        Ok(None)
    }

    async fn apply(
        &self,
        payment: Payment,
        observation: Observation,
    ) -> Result<ReconcileOutcome, PaymentError> {
        let mapped = map_status(payment.gateway, &observation.provider_status);
        let (from, to) = (payment.status, mapped.status);

        if from == to {
            tracing::debug!(payment_id = %payment.id, status = %from, "status unchanged");
            return Ok(ReconcileOutcome::Unchanged(payment.id));
        }
        if !from.can_transition_to(&to) {
            tracing::warn!(
                payment_id = %payment.id,
                %from,
                %to,
                provider_status = %observation.provider_status,
                "invalid status transition, ignored"
            );
            return Ok(ReconcileOutcome::Ignored {
                payment_id: payment.id,
                from,
                to,
            });
        }

        let update = StatusUpdate {
            status: to,
            status_detail: observation.status_detail.or(Some(mapped.detail)),
            gateway_transaction_id: observation.gateway_transaction_id,
            webhook_received: observation.from_webhook,
            webhook_data: Some(observation.data),
        };
        let written = self
            .repo
            .conditional_update_status(payment.id, Some(from), &update)
            .await?;
        if !written {
            tracing::info!(payment_id = %payment.id, %from, %to, "concurrent update won, skipping");
            return Ok(ReconcileOutcome::Unchanged(payment.id));
        }

        tracing::info!(payment_id = %payment.id, %from, %to, "payment status updated");

        if to == PaymentStatus::Approved {
            let committed = Payment {
                status: to,
                status_detail: update.status_detail,
                gateway_transaction_id: update
                    .gateway_transaction_id
                    .or(payment.gateway_transaction_id.clone()),
                webhook_received: payment.webhook_received || update.webhook_received,
                ..payment.clone()
            };
            let succeeded = self.hooks.run(&committed).await;
            tracing::debug!(payment_id = %payment.id, succeeded, "post-commit hooks finished");
        }

        Ok(ReconcileOutcome::Updated {
            payment_id: payment.id,
            from,
            to,
        })
    }
}
