use {
    crate::{
        adapters::registry::GatewayRegistry,
        domain::{
            collaborators::{NewNotification, NotificationKind, NotificationService, OrderService},
            error::PaymentError,
            gateway::{CardData, ChargeRequest, CustomerInfo, PixData},
            money::MoneyAmount,
            payment::{Gateway, NewPayment, NewPaymentParams, Payment, PaymentMethod, PaymentStatus},
            repository::PaymentRepository,
        },
    },
    chrono::Utc,
    serde::Deserialize,
    serde_json::json,
    std::sync::Arc,
    tracing::Span,
    uuid::Uuid,
};

fn default_installments() -> u32 {
    1
}

/// Checkout input. `amount` is in centavos.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub gateway: Gateway,
    pub method: PaymentMethod,
    pub amount: MoneyAmount,
    #[serde(default = "default_installments")]
    pub installments: u32,
    pub description: Option<String>,
    pub customer: CustomerInfo,
    pub card: Option<CardData>,
    pub remote_ip: Option<String>,
}

impl CreatePaymentRequest {
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.amount.cents() <= 0 {
            return Err(PaymentError::Validation("amount must be greater than zero".into()));
        }
        if self.installments == 0 {
            return Err(PaymentError::Validation("installments must be at least 1".into()));
        }
        if self.installments > 1 && self.method != PaymentMethod::CreditCard {
            return Err(PaymentError::Validation(format!(
                "installments are only available for credit card, not {}",
                self.method
            )));
        }
        if self.method.is_card() && self.card.is_none() {
            return Err(PaymentError::Validation("card data is required for card payments".into()));
        }
        Ok(())
    }
}

pub struct PaymentOrchestrator {
    repo: Arc<dyn PaymentRepository>,
    registry: Arc<GatewayRegistry>,
    orders: Arc<dyn OrderService>,
    notifications: Arc<dyn NotificationService>,
}

impl PaymentOrchestrator {
    pub fn new(
        repo: Arc<dyn PaymentRepository>,
        registry: Arc<GatewayRegistry>,
        orders: Arc<dyn OrderService>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            repo,
            registry,
            orders,
            notifications,
        }
    }

    /// One call, one Payment: nothing is persisted when the provider
    /// refuses, and a retried checkout creates a new record.
    #[tracing::instrument(
        skip_all,
        fields(order_id = %request.order_id, gateway = %request.gateway, method = %request.method, payment_id)
    )]
    pub async fn create_payment(&self, request: CreatePaymentRequest) -> Result<Payment, PaymentError> {
        request.validate()?;
        let adapter = self.registry.get(request.gateway)?;

        let customer_ref = match adapter.customer_resolver() {
            Some(resolver) => Some(resolver.resolve(&request.customer).await?),
            None => None,
        };

        let payment_id = Uuid::now_v7();
        Span::current().record("payment_id", tracing::field::display(payment_id));

        let charge = ChargeRequest {
            payment_id,
            order_id: request.order_id,
            method: request.method,
            amount: request.amount,
            installments: request.installments,
            description: request
                .description
                .unwrap_or_else(|| format!("Pedido {}", request.order_id)),
            customer: request.customer,
            customer_ref,
            card: request.card,
            remote_ip: request.remote_ip,
            requested_at: Utc::now(),
        };
        let created = adapter.create(&charge).await?;

        if created.payment_method != request.method {
            tracing::warn!(
                requested = %request.method,
                effective = %created.payment_method,
                "provider changed the payment method"
            );
        }

        let new_payment = NewPayment::new(NewPaymentParams {
            id: payment_id,
            order_id: request.order_id,
            gateway: request.gateway,
            payment_method: created.payment_method,
            amount: request.amount,
            installments: request.installments,
            status: created.status,
            status_detail: created.status_detail,
            gateway_payment_id: created.gateway_payment_id,
            gateway_transaction_id: created.gateway_transaction_id,
            pix: created.pix,
        });
        let payment = self.repo.insert(&new_payment).await?;
        tracing::info!(status = %payment.status, "payment created");

        if payment.status == PaymentStatus::Pending
            && matches!(payment.payment_method, PaymentMethod::Pix | PaymentMethod::Boleto)
        {
            if let Err(e) = self.notify_pending(&payment).await {
                tracing::warn!(error = %e, "payment pending notification failed");
            }
        }

        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        self.repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| PaymentError::not_found(format!("payment {payment_id}")))
    }

    /// Stored PIX data, fetched from the provider and persisted on first
    /// access when checkout could not get it.
    #[tracing::instrument(skip(self))]
    pub async fn pix(&self, payment_id: Uuid) -> Result<PixData, PaymentError> {
        let payment = self.get_payment(payment_id).await?;
        if payment.payment_method != PaymentMethod::Pix {
            return Err(PaymentError::precondition(format!(
                "payment is {}, not pix",
                payment.payment_method
            )));
        }
        if let Some(pix) = payment.pix() {
            return Ok(pix);
        }

        let gateway_payment_id = payment.gateway_payment_id.as_deref().ok_or_else(|| {
            PaymentError::precondition("payment has no provider id to fetch pix data for")
        })?;
        let pix = self
            .registry
            .get(payment.gateway)?
            .fetch_pix_qr(gateway_payment_id)
            .await?;
        self.repo.update_pix(payment.id, &pix).await?;
        tracing::info!(%payment_id, "pix data fetched lazily");
        Ok(pix)
    }

    async fn notify_pending(&self, payment: &Payment) -> Result<(), PaymentError> {
        let Some(user_id) = self.orders.order_owner(payment.order_id).await? else {
            return Ok(());
        };
        let body = match payment.payment_method {
            PaymentMethod::Pix => format!("Pague R$ {} com PIX para confirmar seu pedido.", payment.amount),
            _ => format!("Pague o boleto de R$ {} para confirmar seu pedido.", payment.amount),
        };
        self.notifications
            .create_notification(&NewNotification {
                user_id,
                kind: NotificationKind::PaymentPending,
                title: "Pagamento pendente".into(),
                body,
                data: json!({
                    "payment_id": payment.id,
                    "order_id": payment.order_id,
                    "payment_method": payment.payment_method,
                }),
            })
            .await?;
        Ok(())
    }
}
