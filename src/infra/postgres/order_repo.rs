use {
    crate::domain::{BoxFuture, collaborators::OrderService, error::PaymentError},
    sqlx::PgPool,
    uuid::Uuid,
};

/// Storefront `orders` table. Owned by the order module; this adapter only
/// flips the status and reads the owner.
#[derive(Clone)]
pub struct PgOrderService {
    pool: PgPool,
}

impl PgOrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_status_inner(&self, order_id: Uuid, status: &str) -> Result<(), PaymentError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PaymentError::Collaborator(format!("order {order_id} not found")));
        }
        Ok(())
    }

    async fn owner_inner(&self, order_id: Uuid) -> Result<Option<Uuid>, PaymentError> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }
}

impl OrderService for PgOrderService {
    fn set_order_status<'a>(&'a self, order_id: Uuid, status: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.set_status_inner(order_id, status))
    }

    fn order_owner(&self, order_id: Uuid) -> BoxFuture<'_, Option<Uuid>> {
        Box::pin(self.owner_inner(order_id))
    }
}
