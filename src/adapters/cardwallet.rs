use {
    super::http::{ProviderAuth, ProviderHttp},
    crate::domain::{
        BoxFuture,
        billing::{due_at, installment_plan},
        error::PaymentError,
        extract,
        gateway::{ChargeRequest, GatewayAdapter, NormalizedPayment, PixData},
        money::MoneyAmount,
        payment::{Gateway, PaymentMethod},
        status::map_status,
    },
    chrono::{FixedOffset, SecondsFormat},
    serde_json::{Map, Value, json},
    std::time::Duration,
    uuid::Uuid,
};

pub const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

#[derive(Clone)]
pub struct CardWalletConfig {
    pub access_token: String,
    pub base_url: String,
    pub notification_url: Option<String>,
}

/// Card/wallet provider. Bearer-token auth, no provider-side customer
/// records; the buyer travels inline as `payer`.
pub struct CardWalletAdapter {
    http: ProviderHttp,
    notification_url: Option<String>,
}

impl CardWalletAdapter {
    pub fn new(config: CardWalletConfig, timeout: Duration) -> Result<Self, PaymentError> {
        Ok(Self {
            http: ProviderHttp::new(
                Gateway::CardWallet,
                config.base_url,
                ProviderAuth::Bearer(config.access_token),
                timeout,
            )?,
            notification_url: config.notification_url,
        })
    }
}

impl GatewayAdapter for CardWalletAdapter {
    fn gateway(&self) -> Gateway {
        Gateway::CardWallet
    }

    fn create<'a>(&'a self, request: &'a ChargeRequest) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(self.create_inner(request))
    }

    fn fetch<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(async move {
            let raw = self.http.get(&format!("/v1/payments/{gateway_payment_id}")).await?;
            let mut fetched = normalize(raw, PaymentMethod::CreditCard)?;
            fetched.pix = pix_from(&fetched.raw);
            Ok(fetched)
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
                Some(a) => json!({ "amount": a.to_decimal() }),
                None => json!({}),
            };
            self.http
                .post(
                    &format!("/v1/payments/{gateway_payment_id}/refunds"),
                    &body,
                    &[("X-Idempotency-Key", Uuid::now_v7().to_string())],
                )
                .await?;
            Ok(())
        })
    }
}

impl CardWalletAdapter {
    async fn create_inner(&self, req: &ChargeRequest) -> Result<NormalizedPayment, PaymentError> {
        let body = payment_body(req, self.notification_url.as_deref())?;
        let raw = self
            .http
            .post(
                "/v1/payments",
                &body,
                &[("X-Idempotency-Key", req.payment_id.to_string())],
            )
            .await?;
        let mut created = normalize(raw, req.method)?;

        tracing::info!(
            payment_id = %req.payment_id,
            gateway_payment_id = %created.gateway_payment_id,
            status = %created.status,
            "cardwallet payment created"
        );

        if created.payment_method != PaymentMethod::Pix {
            return Ok(created);
        }

        let expires_at = Some(due_at(Some(PaymentMethod::Pix), req.requested_at));
        created.pix = match pix_from(&created.raw) {
            Some(pix) => Some(PixData { expires_at, ..pix }),
            None => match self.fetch_pix_qr_inner(&created.gateway_payment_id).await {
                Ok(pix) => Some(PixData { expires_at, ..pix }),
                Err(e) => {
                    tracing::warn!(
                        gateway_payment_id = %created.gateway_payment_id,
                        error = %e,
                        "pix qr code not available yet"
                    );
                    None
                }
            },
        };
        Ok(created)
    }

    /// The provider has no QR endpoint; the payment itself carries the
    /// transaction data once it is ready.
    async fn fetch_pix_qr_inner(&self, gateway_payment_id: &str) -> Result<PixData, PaymentError> {
        let raw = self.http.get(&format!("/v1/payments/{gateway_payment_id}")).await?;
        pix_from(&raw).ok_or_else(|| {
            PaymentError::not_found(format!(
                "no pix code for cardwallet payment {gateway_payment_id}"
            ))
        })
    }
}

/// Body for `POST /v1/payments`.
pub fn payment_body(req: &ChargeRequest, notification_url: Option<&str>) -> Result<Value, PaymentError> {
    let mut body = Map::new();
    body.insert("transaction_amount".into(), json!(req.amount.to_decimal()));
    body.insert("description".into(), json!(req.description));
    body.insert("external_reference".into(), json!(req.order_id.to_string()));

    let mut payer = Map::new();
    payer.insert("email".into(), json!(req.customer.email));
    payer.insert("first_name".into(), json!(req.customer.name));
    if let Some(tax_id) = &req.customer.tax_id {
        let kind = if tax_id.is_cnpj() { "CNPJ" } else { "CPF" };
        payer.insert(
            "identification".into(),
            json!({ "type": kind, "number": tax_id.as_str() }),
        );
    }
    body.insert("payer".into(), Value::Object(payer));

    match req.method {
        PaymentMethod::Pix | PaymentMethod::Boleto => {
            let method_id = if req.method == PaymentMethod::Pix { "pix" } else { "bolbradesco" };
            body.insert("payment_method_id".into(), json!(method_id));
            if let Some(brt) = FixedOffset::west_opt(3 * 3600) {
                let due = due_at(Some(req.method), req.requested_at).with_timezone(&brt);
                body.insert(
                    "date_of_expiration".into(),
                    json!(due.to_rfc3339_opts(SecondsFormat::Millis, false)),
                );
            }
        }
        PaymentMethod::CreditCard | PaymentMethod::DebitCard => {
            let card = req.card.as_ref().ok_or_else(|| {
                PaymentError::precondition("card data is required for card payments")
            })?;
            let token = card.token.as_ref().ok_or_else(|| {
                PaymentError::precondition("cardwallet requires a card token")
            })?;
            let brand = card.brand.as_ref().ok_or_else(|| {
                PaymentError::precondition("cardwallet requires the card brand")
            })?;
            body.insert("token".into(), json!(token));
            body.insert("payment_method_id".into(), json!(brand));
            if let Some(issuer) = &card.issuer_id {
                body.insert("issuer_id".into(), json!(issuer));
            }
            if let Some(plan) = installment_plan(req.amount, req.installments) {
                body.insert("installments".into(), json!(plan.count));
            }
        }
    }

    if let Some(url) = notification_url {
        body.insert("notification_url".into(), json!(url));
    }
    Ok(Value::Object(body))
}

fn method_from_response(raw: &Value) -> Option<PaymentMethod> {
    if raw.get("payment_method_id").and_then(Value::as_str) == Some("pix") {
        return Some(PaymentMethod::Pix);
    }
    match raw.get("payment_type_id").and_then(Value::as_str)? {
        "bank_transfer" => Some(PaymentMethod::Pix),
        "ticket" => Some(PaymentMethod::Boleto),
        "credit_card" => Some(PaymentMethod::CreditCard),
        "debit_card" => Some(PaymentMethod::DebitCard),
        _ => None,
    }
}

fn pix_from(raw: &Value) -> Option<PixData> {
    Some(PixData {
        code: extract::pix_code(raw)?,
        qr_code_base64: extract::pix_qr_image(raw),
        expires_at: extract::pix_expiration(raw),
    })
}

fn normalize(raw: Value, fallback_method: PaymentMethod) -> Result<NormalizedPayment, PaymentError> {
    let gateway_payment_id = extract::object_id(&raw).ok_or_else(|| PaymentError::Provider {
        gateway: Gateway::CardWallet,
        status: 200,
        message: "payment response without id".into(),
        code: None,
    })?;
    let provider_status = extract::object_status(&raw).unwrap_or_else(|| "pending".to_string());
    let mapped = map_status(Gateway::CardWallet, &provider_status);
    let status_detail = if mapped.recognized {
        raw.get("status_detail")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(mapped.detail)
    } else {
        mapped.detail
    };

    Ok(NormalizedPayment {
        gateway_payment_id,
        gateway_transaction_id: extract::transaction_id(&raw),
        payment_method: method_from_response(&raw).unwrap_or(fallback_method),
        status: mapped.status,
        status_detail: Some(status_detail),
        provider_status,
        pix: None,
        raw,
    })
}
