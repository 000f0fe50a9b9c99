use {
    crate::domain::{
        BoxFuture,
        collaborators::{
            NewNotification, NotificationKind, NotificationService, ORDER_CONFIRMED,
            OrderService, PAYMENT_UPDATED_EVENT, RealtimePublisher, user_channel,
        },
        error::PaymentError,
        payment::Payment,
    },
    serde_json::json,
    std::{sync::Arc, time::Duration},
    tokio::task::JoinSet,
    uuid::Uuid,
};

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// What every hook sees: the committed payment and the buyer that owns its
/// order (looked up once per run).
#[derive(Debug, Clone)]
pub struct HookContext {
    pub payment: Payment,
    pub owner: Option<Uuid>,
}

/// Side effect that runs after an approval has been committed. A hook
/// failing never affects the payment or the other hooks.
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a self, ctx: &'a HookContext) -> BoxFuture<'a, ()>;
}

pub struct ConfirmOrder {
    orders: Arc<dyn OrderService>,
}

impl PostCommitHook for ConfirmOrder {
    fn name(&self) -> &'static str {
        "confirm_order"
    }

    fn run<'a>(&'a self, ctx: &'a HookContext) -> BoxFuture<'a, ()> {
        self.orders.set_order_status(ctx.payment.order_id, ORDER_CONFIRMED)
    }
}

pub struct NotifyApproved {
    notifications: Arc<dyn NotificationService>,
}

impl PostCommitHook for NotifyApproved {
    fn name(&self) -> &'static str {
        "notify_approved"
    }

    fn run<'a>(&'a self, ctx: &'a HookContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(user_id) = ctx.owner else {
                tracing::debug!(order_id = %ctx.payment.order_id, "order has no owner, skipping notification");
                return Ok(());
            };
            let notification = NewNotification {
                user_id,
                kind: NotificationKind::PaymentApproved,
                title: "Pagamento aprovado".into(),
                body: format!(
                    "O pagamento de R$ {} do seu pedido foi aprovado.",
                    ctx.payment.amount
                ),
                data: json!({
                    "payment_id": ctx.payment.id,
                    "order_id": ctx.payment.order_id,
                }),
            };
            self.notifications.create_notification(&notification).await?;
            Ok(())
        })
    }
}

pub struct PublishUpdate {
    realtime: Arc<dyn RealtimePublisher>,
}

impl PostCommitHook for PublishUpdate {
    fn name(&self) -> &'static str {
        "publish_update"
    }

    fn run<'a>(&'a self, ctx: &'a HookContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(user_id) = ctx.owner else {
                return Ok(());
            };
            let payload = json!({
                "payment_id": ctx.payment.id,
                "order_id": ctx.payment.order_id,
                "status": ctx.payment.status,
            });
            self.realtime
                .publish(&user_channel(user_id), PAYMENT_UPDATED_EVENT, &payload)
                .await
        })
    }
}

/// Marks the "payment pending" notifications created at checkout as read.
pub struct ClearPendingNotifications {
    notifications: Arc<dyn NotificationService>,
}

impl PostCommitHook for ClearPendingNotifications {
    fn name(&self) -> &'static str {
        "clear_pending_notifications"
    }

    fn run<'a>(&'a self, ctx: &'a HookContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(user_id) = ctx.owner else {
                return Ok(());
            };
            let ids = self
                .notifications
                .unread_notification_ids(user_id, NotificationKind::PaymentPending, ctx.payment.id)
                .await?;
            if ids.is_empty() {
                return Ok(());
            }
            self.notifications.mark_notifications_read(&ids).await
        })
    }
}

pub struct PostCommitHooks {
    orders: Arc<dyn OrderService>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
    timeout: Duration,
}

impl PostCommitHooks {
    /// The approval side effects, in registration order: confirm the order,
    /// notify the buyer, publish the update, clear pending notifications.
    pub fn standard(
        orders: Arc<dyn OrderService>,
        notifications: Arc<dyn NotificationService>,
        realtime: Arc<dyn RealtimePublisher>,
    ) -> Self {
        Self {
            hooks: vec![
                Arc::new(ConfirmOrder {
                    orders: orders.clone(),
                }),
                Arc::new(NotifyApproved {
                    notifications: notifications.clone(),
                }),
                Arc::new(PublishUpdate { realtime }),
                Arc::new(ClearPendingNotifications { notifications }),
            ],
            orders,
            timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn push(&mut self, hook: Arc<dyn PostCommitHook>) {
        self.hooks.push(hook);
    }

    /// Runs every hook in its own task and waits for all of them. Returns
    /// how many succeeded; failures and timeouts are only logged.
    ///
    /// The whole run is detached from the caller: dropping the returned
    /// future (a webhook client hanging up after the commit) does not cancel
    /// the hooks.
    pub async fn run(&self, payment: &Payment) -> usize {
        let orders = self.orders.clone();
        let hooks = self.hooks.clone();
        let limit = self.timeout;
        let payment = payment.clone();
        let payment_id = payment.id;

        match tokio::spawn(run_detached(orders, hooks, limit, payment)).await {
            Ok(succeeded) => succeeded,
            Err(e) => {
                tracing::error!(%payment_id, error = %e, "post-commit hooks aborted");
                0
            }
        }
    }
}

async fn run_detached(
    orders: Arc<dyn OrderService>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
    limit: Duration,
    payment: Payment,
) -> usize {
    // Bounded like a hook; an unknown owner only skips the buyer-facing hooks.
    let owner = match tokio::time::timeout(limit, orders.order_owner(payment.order_id)).await {
        Ok(Ok(owner)) => owner,
        Ok(Err(e)) => {
            tracing::warn!(order_id = %payment.order_id, error = %e, "order owner lookup failed");
            None
        }
        Err(_) => {
            tracing::warn!(order_id = %payment.order_id, timeout_ms = limit.as_millis() as u64, "order owner lookup timed out");
            None
        }
    };
    let payment_id = payment.id;
    let ctx = Arc::new(HookContext { payment, owner });

    let mut set = JoinSet::new();
    for hook in hooks {
        let ctx = ctx.clone();
        set.spawn(async move {
            let name = hook.name();
            let result = match tokio::time::timeout(limit, hook.run(&ctx)).await {
                Ok(result) => result,
                Err(_) => Err(PaymentError::Collaborator(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                ))),
            };
            (name, result)
        });
    }

    let mut succeeded = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(()))) => succeeded += 1,
            Ok((hook, Err(e))) => {
                tracing::warn!(%payment_id, hook, error = %e, "post-commit hook failed");
            }
            Err(e) => {
                tracing::error!(%payment_id, error = %e, "post-commit hook panicked");
            }
        }
    }
    succeeded
}
