pub mod errors;
pub mod payments;
pub mod webhook;

use {
    crate::AppState,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    std::time::Duration,
    tower_http::timeout::TimeoutLayer,
};

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook", post(webhook::webhook_handler))
        .route("/payments", post(payments::create_payment))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/pix", get(payments::get_pix))
        .route("/payments/{id}/refund", post(payments::refund_payment))
        .route("/payments/{id}/sync", post(payments::sync_payment))
        .layer(DefaultBodyLimit::max(64 * 1024)) // provider webhooks are a few KB
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
