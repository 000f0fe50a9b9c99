use {
    crate::{
        adapters::registry::GatewayRegistry,
        domain::{
            error::PaymentError,
            money::MoneyAmount,
            payment::{Payment, PaymentStatus, StatusUpdate},
            repository::PaymentRepository,
        },
    },
    std::sync::Arc,
    uuid::Uuid,
};

pub const REFUND_REQUESTED_DETAIL: &str = "refund_requested";

pub struct RefundCoordinator {
    repo: Arc<dyn PaymentRepository>,
    registry: Arc<GatewayRegistry>,
}

impl RefundCoordinator {
    pub fn new(repo: Arc<dyn PaymentRepository>, registry: Arc<GatewayRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Full refund when `amount` is `None`. Partial amounts go to the
    /// provider as given; the payment still ends up `refunded`.
    #[tracing::instrument(skip(self), fields(gateway))]
    pub async fn refund(
        &self,
        payment_id: Uuid,
        amount: Option<MoneyAmount>,
    ) -> Result<Payment, PaymentError> {
        let payment = self.load(payment_id).await?;
        tracing::Span::current().record("gateway", payment.gateway.as_str());

        if payment.status != PaymentStatus::Approved {
            return Err(PaymentError::precondition(format!(
                "payment not refundable in its current state ({})",
                payment.status
            )));
        }
        let gateway_payment_id = payment.gateway_payment_id.as_deref().ok_or_else(|| {
            PaymentError::precondition("payment has no provider id to refund")
        })?;

        self.registry
            .get(payment.gateway)?
            .refund(gateway_payment_id, amount)
            .await?;

        let update = StatusUpdate {
            status: PaymentStatus::Refunded,
            status_detail: Some(REFUND_REQUESTED_DETAIL.to_string()),
            gateway_transaction_id: None,
            webhook_received: false,
            webhook_data: None,
        };
        let written = self
            .repo
            .conditional_update_status(payment.id, Some(PaymentStatus::Approved), &update)
            .await?;
        if written {
            tracing::info!(payment_id = %payment.id, "payment refunded");
        } else {
            // The provider accepted the refund; a webhook moved the row first.
            tracing::warn!(payment_id = %payment.id, "refund accepted but status changed concurrently");
        }

        self.load(payment_id).await
    }

    async fn load(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        self.repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| PaymentError::not_found(format!("payment {payment_id}")))
    }
}
