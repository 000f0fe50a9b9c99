pub mod customer;

use {
    super::http::{ProviderAuth, ProviderHttp},
    crate::domain::{
        BoxFuture,
        billing::{due_at, due_date, installment_plan},
        error::PaymentError,
        extract,
        gateway::{
            CardData, ChargeRequest, CustomerRef, CustomerResolver, GatewayAdapter,
            NormalizedPayment, PixData,
        },
        money::MoneyAmount,
        payment::{Gateway, PaymentMethod},
        status::map_status,
    },
    customer::AsaasCustomerResolver,
    serde_json::{Map, Value, json},
    std::{sync::Arc, time::Duration},
};

pub const DEFAULT_BASE_URL: &str = "https://api.asaas.com/v3";

/// Fragments (lowercased) of the "billing type not allowed for this charge"
/// rejection that triggers the boleto + pay-with-card fallback.
const BILLING_TYPE_REJECTION_MARKERS: &[&str] = &[
    "invalid_billingtype",
    "billingtype not allowed",
    "billing type not allowed",
    "forma de pagamento não permitida",
    "forma de pagamento nao permitida",
    "payment method not allowed",
];

#[derive(Clone)]
pub struct AsaasConfig {
    pub api_key: String,
    pub base_url: String,
}

pub struct AsaasAdapter {
    http: Arc<ProviderHttp>,
    customers: AsaasCustomerResolver,
}

impl AsaasAdapter {
    pub fn new(config: AsaasConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let http = Arc::new(ProviderHttp::new(
            Gateway::Asaas,
            config.base_url,
            ProviderAuth::Header {
                name: "access_token",
                value: config.api_key,
            },
            timeout,
        )?);
        Ok(Self {
            customers: AsaasCustomerResolver::new(http.clone()),
            http,
        })
    }
}

impl GatewayAdapter for AsaasAdapter {
    fn gateway(&self) -> Gateway {
        Gateway::Asaas
    }

    fn create<'a>(&'a self, request: &'a ChargeRequest) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(self.create_inner(request))
    }

    fn fetch<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(async move {
            let raw = self.http.get(&format!("/payments/{gateway_payment_id}")).await?;
            normalize(raw, PaymentMethod::Boleto)
        })
    }

    fn fetch_pix_qr<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, PixData> {
        Box::pin(self.fetch_pix_qr_inner(gateway_payment_id))
    }

    fn refund<'a>(
        &'a self,
        gateway_payment_id: &'a str,
        amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let body = match amount {
                Some(a) => json!({ "value": a.to_decimal() }),
                None => json!({}),
            };
            self.http
                .post(&format!("/payments/{gateway_payment_id}/refund"), &body, &[])
                .await?;
            Ok(())
        })
    }

    fn customer_resolver(&self) -> Option<&dyn CustomerResolver> {
        Some(&self.customers)
    }
}

impl AsaasAdapter {
    async fn create_inner(&self, req: &ChargeRequest) -> Result<NormalizedPayment, PaymentError> {
        // Checked before anything touches the network, customer creation included.
        if req.customer.tax_id.is_none() {
            return Err(PaymentError::precondition(
                "CPF/CNPJ is required for asaas payments",
            ));
        }
        if req.method.is_card() && req.card.is_none() {
            return Err(PaymentError::precondition(
                "card data is required for card payments",
            ));
        }

        let customer = match &req.customer_ref {
            Some(c) => c.clone(),
            None => self.customers.resolve_customer(&req.customer).await?,
        };

        let body = charge_body(req, &customer, billing_type(req.method), true);
        let created = match self.http.post("/payments", &body, &[]).await {
            Ok(raw) => normalize(raw, req.method)?,
            Err(err) if req.method.is_card() && is_billing_type_rejection(&err) => {
                return self.create_via_boleto_then_card(req, &customer, err).await;
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            payment_id = %req.payment_id,
            gateway_payment_id = %created.gateway_payment_id,
            method = %created.payment_method,
            "asaas charge created"
        );

        if created.payment_method == PaymentMethod::Pix {
            return Ok(self.with_pix(created, req).await);
        }
        Ok(created)
    }

    /// The provider refuses card billing types on "create charge" for some
    /// accounts. Open the charge as boleto, then pay it with the card. When
    /// paying fails, the boleto charge is still a valid payment and is
    /// returned as such.
    async fn create_via_boleto_then_card(
        &self,
        req: &ChargeRequest,
        customer: &CustomerRef,
        rejection: PaymentError,
    ) -> Result<NormalizedPayment, PaymentError> {
        tracing::warn!(
            payment_id = %req.payment_id,
            requested = %req.method,
            "card billing type refused ({rejection}), retrying as boleto + pay-with-card"
        );

        let body = charge_body(req, customer, billing_type(PaymentMethod::Boleto), false);
        let charge = self.http.post("/payments", &body, &[]).await?;
        let boleto = normalize(charge, PaymentMethod::Boleto)?;

        let card = card_fields(req);
        let pay_path = format!("/payments/{}/payWithCreditCard", boleto.gateway_payment_id);
        match self.http.post(&pay_path, &Value::Object(card), &[]).await {
            Ok(paid) => {
                let paid = normalize(paid, req.method)?;
                tracing::info!(
                    payment_id = %req.payment_id,
                    gateway_payment_id = %paid.gateway_payment_id,
                    "boleto charge paid with card"
                );
                Ok(paid)
            }
            Err(err) => {
                tracing::warn!(
                    payment_id = %req.payment_id,
                    gateway_payment_id = %boleto.gateway_payment_id,
                    requested = %req.method,
                    effective = %boleto.payment_method,
                    "pay-with-card failed ({err}), keeping boleto charge"
                );
                Ok(boleto)
            }
        }
    }

    /// Fill PIX fields, falling back to the QR endpoint when the create
    /// response carried none. A failed QR fetch leaves them for a later lazy
    /// fetch instead of failing the checkout.
    async fn with_pix(&self, mut created: NormalizedPayment, req: &ChargeRequest) -> NormalizedPayment {
        let expires_at = due_at(Some(PaymentMethod::Pix), req.requested_at);
        if let Some(code) = extract::pix_code(&created.raw) {
            created.pix = Some(PixData {
                code,
                qr_code_base64: extract::pix_qr_image(&created.raw),
                expires_at: Some(expires_at),
            });
            return created;
        }

        match self.fetch_pix_qr_inner(&created.gateway_payment_id).await {
            Ok(pix) => {
                created.pix = Some(PixData {
                    expires_at: Some(expires_at),
                    ..pix
                });
            }
            Err(e) => {
                tracing::warn!(
                    gateway_payment_id = %created.gateway_payment_id,
                    error = %e,
                    "pix qr code not available yet"
                );
            }
        }
        created
    }

    async fn fetch_pix_qr_inner(&self, gateway_payment_id: &str) -> Result<PixData, PaymentError> {
        let raw = self
            .http
            .get(&format!("/payments/{gateway_payment_id}/pixQrCode"))
            .await?;
        let code = extract::pix_code(&raw).ok_or_else(|| {
            PaymentError::not_found(format!("no pix code for asaas payment {gateway_payment_id}"))
        })?;
        Ok(PixData {
            code,
            qr_code_base64: extract::pix_qr_image(&raw),
            expires_at: extract::pix_expiration(&raw),
        })
    }
}

pub fn billing_type(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Pix => "PIX",
        PaymentMethod::Boleto => "BOLETO",
        PaymentMethod::CreditCard => "CREDIT_CARD",
        PaymentMethod::DebitCard => "DEBIT_CARD",
    }
}

fn method_from_billing_type(raw: &str) -> Option<PaymentMethod> {
    match raw {
        "PIX" => Some(PaymentMethod::Pix),
        "BOLETO" => Some(PaymentMethod::Boleto),
        "CREDIT_CARD" => Some(PaymentMethod::CreditCard),
        "DEBIT_CARD" => Some(PaymentMethod::DebitCard),
        _ => None,
    }
}

/// Body for `POST /payments`. Card fields are only attached when
/// `with_card` is set and the billing type is a card one.
pub fn charge_body(
    req: &ChargeRequest,
    customer: &CustomerRef,
    billing_type: &str,
    with_card: bool,
) -> Value {
    let mut body = Map::new();
    body.insert("customer".into(), json!(customer.id));
    body.insert("billingType".into(), json!(billing_type));
    body.insert("value".into(), json!(req.amount.to_decimal()));
    body.insert("dueDate".into(), json!(due_date(Some(req.method), req.requested_at)));
    body.insert("description".into(), json!(req.description));
    body.insert("externalReference".into(), json!(req.order_id.to_string()));

    if let Some(plan) = installment_plan(req.amount, req.installments) {
        body.insert("installmentCount".into(), json!(plan.count));
        body.insert("installmentValue".into(), json!(plan.value.to_decimal()));
    }

    let card_billing = matches!(billing_type, "CREDIT_CARD" | "DEBIT_CARD");
    if with_card && card_billing {
        body.extend(card_fields(req));
    }
    Value::Object(body)
}

/// `creditCard` + `creditCardHolderInfo`, or `creditCardToken` when the
/// checkout already holds a provider token.
pub fn card_fields(req: &ChargeRequest) -> Map<String, Value> {
    let mut fields = Map::new();
    let card = req.card.clone().unwrap_or_default();

    if let Some(ip) = &req.remote_ip {
        fields.insert("remoteIp".into(), json!(ip));
    }
    if let Some(token) = &card.token {
        fields.insert("creditCardToken".into(), json!(token));
        return fields;
    }

    fields.insert("creditCard".into(), credit_card(&card, &req.customer.name));
    let address = req.customer.address.clone().unwrap_or_default();
    fields.insert(
        "creditCardHolderInfo".into(),
        json!({
            "name": card.holder_name.as_deref().unwrap_or(&req.customer.name),
            "email": req.customer.email,
            "cpfCnpj": req.customer.tax_id.as_ref().map(|t| t.as_str()),
            "postalCode": address.postal_code,
            "addressNumber": address.number,
            "addressComplement": address.complement,
            "phone": req.customer.phone,
        }),
    );
    fields
}

fn credit_card(card: &CardData, fallback_holder: &str) -> Value {
    json!({
        "holderName": card.holder_name.as_deref().unwrap_or(fallback_holder),
        "number": card.number,
        "expiryMonth": card.expiry_month,
        "expiryYear": card.expiry_year,
        "ccv": card.cvv,
    })
}

pub fn is_billing_type_rejection(err: &PaymentError) -> bool {
    let PaymentError::Provider { code, message, .. } = err else {
        return false;
    };
    let code_hit = code
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("invalid_billingType"));
    let message = message.to_lowercase();
    code_hit
        || BILLING_TYPE_REJECTION_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
}

/// Shared by create and fetch. `fallback_method` applies when the response
/// carries no recognizable `billingType`.
fn normalize(raw: Value, fallback_method: PaymentMethod) -> Result<NormalizedPayment, PaymentError> {
    let gateway_payment_id = extract::object_id(&raw).ok_or_else(|| PaymentError::Provider {
        gateway: Gateway::Asaas,
        status: 200,
        message: "payment response without id".into(),
        code: None,
    })?;
    let provider_status = extract::object_status(&raw).unwrap_or_else(|| "PENDING".to_string());
    let mapped = map_status(Gateway::Asaas, &provider_status);
    let payment_method = raw
        .get("billingType")
        .and_then(Value::as_str)
        .and_then(method_from_billing_type)
        .unwrap_or(fallback_method);

    Ok(NormalizedPayment {
        gateway_payment_id,
        gateway_transaction_id: extract::transaction_id(&raw),
        payment_method,
        status: mapped.status,
        status_detail: Some(mapped.detail),
        provider_status,
        pix: None,
        raw,
    })
}
