use {
    super::errors::ApiError,
    crate::{
        AppState,
        domain::{
            error::PaymentError,
            gateway::PixData,
            money::MoneyAmount,
            payment::{Gateway, Payment, PaymentMethod, PaymentStatus},
        },
        services::orchestrator::CreatePaymentRequest,
    },
    axum::{
        Json,
        body::Bytes,
        extract::{Path, State},
        http::StatusCode,
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    uuid::Uuid,
};

/// What clients see of a payment. Raw provider payloads stay internal.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: Gateway,
    pub payment_method: PaymentMethod,
    pub amount: MoneyAmount,
    pub installments: u32,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub pix: Option<PixData>,
    pub webhook_received: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        Self {
            pix: p.pix(),
            id: p.id,
            order_id: p.order_id,
            gateway: p.gateway,
            payment_method: p.payment_method,
            amount: p.amount,
            installments: p.installments,
            status: p.status,
            status_detail: p.status_detail,
            gateway_payment_id: p.gateway_payment_id,
            webhook_received: p.webhook_received,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    /// Centavos; omitted for a full refund.
    #[serde(default)]
    pub amount: Option<MoneyAmount>,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentView>), ApiError> {
    let payment = state.orchestrator.create_payment(request).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentView>, ApiError> {
    let payment = state.orchestrator.get_payment(id).await?;
    Ok(Json(payment.into()))
}

pub async fn get_pix(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PixData>, ApiError> {
    Ok(Json(state.orchestrator.pix(id).await?))
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<PaymentView>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RefundRequest::default()
    } else {
        serde_json::from_slice::<RefundRequest>(&body)
            .map_err(|e| PaymentError::Validation(format!("invalid refund body: {e}")))?
    };
    let payment = state.refunds.refund(id, request.amount).await?;
    Ok(Json(payment.into()))
}

pub async fn sync_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.reconciler.sync_from_gateway(id).await?;
    let payment = PaymentView::from(state.orchestrator.get_payment(id).await?);
    Ok(Json(json!({
        "status": outcome.as_str(),
        "payment": payment,
    })))
}
