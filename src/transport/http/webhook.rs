use {
    super::errors::ApiError,
    crate::{
        AppState,
        domain::{error::PaymentError, payment::ReconcileOutcome},
    },
    axum::{
        Json,
        extract::State,
        http::{HeaderMap, StatusCode},
    },
    serde_json::{Value, json},
};

const TOKEN_HEADERS: [&str; 2] = ["asaas-access-token", "x-webhook-token"];

fn check_token(expected: Option<&str>, headers: &HeaderMap) -> Result<(), PaymentError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = TOKEN_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(PaymentError::WebhookAuth("token mismatch".into())),
        None => Err(PaymentError::WebhookAuth("missing webhook token".into())),
    }
}

/// Single endpoint for every provider. Anything the reconciler can decide
/// about is answered 200 so the provider stops redelivering; only auth
/// failures and infrastructure errors are not.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    check_token(state.webhook.token.as_deref(), &headers)?;

    let payload: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("skipping unparseable webhook body: {e}");
            return Ok((StatusCode::OK, Json(json!({"status": "ignored_invalid_data"}))));
        }
    };

    match state.reconciler.handle_webhook(&payload).await {
        Ok(ReconcileOutcome::NotFound { external_id }) if state.webhook.retry_unknown_payment => {
            tracing::info!(%external_id, "unknown payment, asking provider to redeliver");
            Ok((StatusCode::NOT_FOUND, Json(json!({"status": "not_found"}))))
        }
        Ok(outcome) => {
            tracing::info!(outcome = outcome.as_str(), "webhook processed");
            Ok((StatusCode::OK, Json(json!({"status": outcome.as_str()}))))
        }
        Err(PaymentError::Validation(msg)) => {
            tracing::warn!("skipping invalid webhook data: {msg}");
            Ok((StatusCode::OK, Json(json!({"status": "ignored_invalid_data"}))))
        }
        Err(e) => Err(e.into()),
    }
}

