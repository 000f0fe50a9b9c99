use {
    crate::domain::{
        BoxFuture,
        collaborators::{NewNotification, NotificationKind, NotificationService},
        error::PaymentError,
    },
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(Clone)]
pub struct PgNotificationService {
    pool: PgPool,
}

impl PgNotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn create_inner(&self, n: &NewNotification) -> Result<Uuid, PaymentError> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, type, title, body, data, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, now())
            "#,
        )
        .bind(id)
        .bind(n.user_id)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.body)
        .bind(&n.data)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn unread_inner(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        payment_id: Uuid,
    ) -> Result<Vec<Uuid>, PaymentError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM notifications
            WHERE user_id = $1 AND type = $2 AND read = false
              AND data->>'payment_id' = $3
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(payment_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn mark_read_inner(&self, ids: &[Uuid]) -> Result<(), PaymentError> {
        sqlx::query("UPDATE notifications SET read = true WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl NotificationService for PgNotificationService {
    fn create_notification<'a>(&'a self, notification: &'a NewNotification) -> BoxFuture<'a, Uuid> {
        Box::pin(self.create_inner(notification))
    }

    fn unread_notification_ids(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Vec<Uuid>> {
        Box::pin(self.unread_inner(user_id, kind, payment_id))
    }

    fn mark_notifications_read<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, ()> {
        Box::pin(self.mark_read_inner(ids))
    }
}
