use {
    crate::domain::error::PaymentError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
};

/// HTTP face of [`PaymentError`].
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match &self.0 {
            PaymentError::Configuration(gateway) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "payment_method_unavailable",
                format!("payments through {gateway} are not available"),
            ),
            PaymentError::Precondition(msg) => {
                (StatusCode::CONFLICT, "precondition_failed", msg.clone())
            }
            PaymentError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            PaymentError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            PaymentError::Provider {
                gateway, message, ..
            } => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                format!("{gateway}: {message}"),
            ),
            PaymentError::Transport(err) => {
                tracing::warn!("provider transport error: {err}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "provider_unreachable",
                    "payment provider did not answer in time".to_string(),
                )
            }
            PaymentError::WebhookAuth(_) => (
                StatusCode::UNAUTHORIZED,
                "webhook_unauthorized",
                "invalid webhook token".to_string(),
            ),
            PaymentError::Database(err) => {
                tracing::error!("database error: {err}");
                internal()
            }
            PaymentError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                internal()
            }
            PaymentError::Collaborator(err) => {
                tracing::error!("collaborator error: {err}");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
