use {
    crate::domain::{
        BoxFuture,
        error::PaymentError,
        gateway::PixData,
        money::MoneyAmount,
        payment::{Gateway, NewPayment, Payment, PaymentMethod, PaymentStatus, StatusUpdate},
        repository::PaymentRepository,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

const PAYMENT_COLUMNS: &str = "id, order_id, gateway, payment_method, amount, installments, \
     status, status_detail, gateway_payment_id, gateway_transaction_id, pix_code, \
     pix_qr_code_base64, pix_expires_at, webhook_received, webhook_data, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    gateway: String,
    payment_method: String,
    amount: i64,
    installments: i32,
    status: String,
    status_detail: Option<String>,
    gateway_payment_id: Option<String>,
    gateway_transaction_id: Option<String>,
    pix_code: Option<String>,
    pix_qr_code_base64: Option<String>,
    pix_expires_at: Option<DateTime<Utc>>,
    webhook_received: bool,
    webhook_data: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PaymentError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            gateway: Gateway::try_from(row.gateway.as_str())?,
            payment_method: PaymentMethod::try_from(row.payment_method.as_str())?,
            amount: MoneyAmount::new(row.amount)?,
            installments: u32::try_from(row.installments).unwrap_or(1),
            status: PaymentStatus::try_from(row.status.as_str())?,
            status_detail: row.status_detail,
            gateway_payment_id: row.gateway_payment_id,
            gateway_transaction_id: row.gateway_transaction_id,
            pix_code: row.pix_code,
            pix_qr_code_base64: row.pix_qr_code_base64,
            pix_expires_at: row.pix_expires_at,
            webhook_received: row.webhook_received,
            webhook_data: row.webhook_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_inner(&self, p: &NewPayment) -> Result<Payment, PaymentError> {
        let installments = i32::try_from(p.installments())
            .map_err(|_| PaymentError::Validation("installments out of range".into()))?;
        let pix = p.pix();

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (
                id, order_id, gateway, payment_method, amount, installments, status,
                status_detail, gateway_payment_id, gateway_transaction_id,
                pix_code, pix_qr_code_base64, pix_expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(p.id())
        .bind(p.order_id())
        .bind(p.gateway().as_str())
        .bind(p.payment_method().as_str())
        .bind(p.amount().cents())
        .bind(installments)
        .bind(p.status().as_str())
        .bind(p.status_detail())
        .bind(p.gateway_payment_id())
        .bind(p.gateway_transaction_id())
        .bind(pix.map(|x| x.code.as_str()))
        .bind(pix.and_then(|x| x.qr_code_base64.as_deref()))
        .bind(pix.and_then(|x| x.expires_at))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Payment>, PaymentError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE {column} = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_id_inner(&self, id: Uuid) -> Result<Option<Payment>, PaymentError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn backfill_inner(&self, id: Uuid, gateway_payment_id: &str) -> Result<bool, PaymentError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET gateway_payment_id = $2, updated_at = now()
            WHERE id = $1 AND (gateway_payment_id IS NULL OR gateway_payment_id = '')
            "#,
        )
        .bind(id)
        .bind(gateway_payment_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Single statement; the row lock taken by UPDATE serializes concurrent
    /// deliveries and the status predicate makes the loser a no-op.
    async fn conditional_update_inner(
        &self,
        id: Uuid,
        expected: Option<PaymentStatus>,
        update: &StatusUpdate,
    ) -> Result<bool, PaymentError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                status_detail = COALESCE($3, status_detail),
                gateway_transaction_id = COALESCE($4, gateway_transaction_id),
                webhook_received = webhook_received OR $5,
                webhook_data = COALESCE($6, webhook_data),
                updated_at = now()
            WHERE id = $1 AND ($7::text IS NULL OR status = $7)
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.status_detail.as_deref())
        .bind(update.gateway_transaction_id.as_deref())
        .bind(update.webhook_received)
        .bind(update.webhook_data.as_ref())
        .bind(expected.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_pix_inner(&self, id: Uuid, pix: &PixData) -> Result<(), PaymentError> {
        sqlx::query(
            r#"
            UPDATE payments
            SET pix_code = $2, pix_qr_code_base64 = $3, pix_expires_at = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&pix.code)
        .bind(pix.qr_code_base64.as_deref())
        .bind(pix.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_ids_inner(&self, limit: i64) -> Result<Vec<String>, PaymentError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT gateway_payment_id FROM payments
            WHERE gateway_payment_id IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn find_stale_inner(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, PaymentError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE status IN ('pending', 'processing')
              AND gateway <> 'mock'
              AND created_at < $1
            ORDER BY updated_at
            LIMIT $2
            "#
        ))
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn mark_swept_inner(&self, id: Uuid) -> Result<(), PaymentError> {
        sqlx::query("UPDATE payments SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl PaymentRepository for PgPaymentRepository {
    fn insert<'a>(&'a self, payment: &'a NewPayment) -> BoxFuture<'a, Payment> {
        Box::pin(self.insert_inner(payment))
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Option<Payment>> {
        Box::pin(self.find_by_id_inner(id))
    }

    fn find_by_gateway_payment_id<'a>(
        &'a self,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>> {
        Box::pin(self.find_one("gateway_payment_id", gateway_payment_id))
    }

    fn find_by_gateway_transaction_id<'a>(
        &'a self,
        gateway_transaction_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>> {
        Box::pin(self.find_one("gateway_transaction_id", gateway_transaction_id))
    }

    fn backfill_gateway_payment_id<'a>(
        &'a self,
        id: Uuid,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, bool> {
        Box::pin(self.backfill_inner(id, gateway_payment_id))
    }

    fn conditional_update_status<'a>(
        &'a self,
        id: Uuid,
        expected: Option<PaymentStatus>,
        update: &'a StatusUpdate,
    ) -> BoxFuture<'a, bool> {
        Box::pin(self.conditional_update_inner(id, expected, update))
    }

    fn update_pix<'a>(&'a self, id: Uuid, pix: &'a PixData) -> BoxFuture<'a, ()> {
        Box::pin(self.update_pix_inner(id, pix))
    }

    fn recent_gateway_payment_ids(&self, limit: i64) -> BoxFuture<'_, Vec<String>> {
        Box::pin(self.recent_ids_inner(limit))
    }

    fn find_stale_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> BoxFuture<'_, Vec<Payment>> {
        Box::pin(self.find_stale_inner(older_than, limit))
    }

    fn mark_swept(&self, id: Uuid) -> BoxFuture<'_, ()> {
        Box::pin(self.mark_swept_inner(id))
    }
}
