use {
    paygate_sync::{
        AppState, WebhookSettings,
        adapters::registry::GatewayRegistry,
        config::Config,
        domain::{
            collaborators::{NotificationService, OrderService, RealtimePublisher},
            repository::PaymentRepository,
        },
        infra::{
            postgres::{
                notification_repo::PgNotificationService, order_repo::PgOrderService,
                payment_repo::PgPaymentRepository,
            },
            realtime::BroadcastPublisher,
        },
        services::{
            hooks::PostCommitHooks,
            orchestrator::PaymentOrchestrator,
            reconciler::WebhookReconciler,
            refund::RefundCoordinator,
            sweeper::{SweeperSettings, run_sweeper},
        },
        transport::http::router,
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,paygate_sync=debug")),
        )
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let registry = Arc::new(GatewayRegistry::from_config(&config).expect("failed to build gateway clients"));
    let repo: Arc<dyn PaymentRepository> = Arc::new(PgPaymentRepository::new(pool.clone()));
    let orders: Arc<dyn OrderService> = Arc::new(PgOrderService::new(pool.clone()));
    let notifications: Arc<dyn NotificationService> =
        Arc::new(PgNotificationService::new(pool.clone()));
    let realtime: Arc<dyn RealtimePublisher> = Arc::new(BroadcastPublisher::new(256));

    let hooks = PostCommitHooks::standard(orders.clone(), notifications.clone(), realtime);
    let reconciler = Arc::new(WebhookReconciler::new(repo.clone(), registry.clone(), hooks));
    let state = AppState {
        orchestrator: Arc::new(PaymentOrchestrator::new(
            repo.clone(),
            registry.clone(),
            orders,
            notifications,
        )),
        reconciler: reconciler.clone(),
        refunds: Arc::new(RefundCoordinator::new(repo.clone(), registry)),
        webhook: WebhookSettings {
            token: config.webhook_token.as_deref().map(Arc::from),
            retry_unknown_payment: config.webhook_retry_unknown_payment,
        },
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_sweeper(
        repo,
        reconciler,
        SweeperSettings {
            interval: config.sweeper_interval,
            stale_after: config.sweeper_stale_after,
        },
        shutdown_rx,
    ));

    // Checkout may chain customer lookup, charge creation and a QR fetch.
    let app = router(state, config.http_timeout * 3);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "sweeper task failed");
    }
    pool.close().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
