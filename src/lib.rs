pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod transport;

use {
    services::{orchestrator::PaymentOrchestrator, reconciler::WebhookReconciler, refund::RefundCoordinator},
    std::sync::Arc,
};

#[derive(Clone, Default)]
pub struct WebhookSettings {
    pub token: Option<Arc<str>>,
    pub retry_unknown_payment: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub reconciler: Arc<WebhookReconciler>,
    pub refunds: Arc<RefundCoordinator>,
    pub webhook: WebhookSettings,
}
