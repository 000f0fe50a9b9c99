use {
    super::BoxFuture,
    super::gateway::PixData,
    super::payment::{NewPayment, Payment, PaymentStatus, StatusUpdate},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Storage for the one entity this crate owns. Rows are inserted once and
/// afterwards only touched through single-row conditional writes.
pub trait PaymentRepository: Send + Sync {
    fn insert<'a>(&'a self, payment: &'a NewPayment) -> BoxFuture<'a, Payment>;

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Option<Payment>>;

    fn find_by_gateway_payment_id<'a>(
        &'a self,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>>;

    fn find_by_gateway_transaction_id<'a>(
        &'a self,
        gateway_transaction_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>>;

    /// Only fills an empty `gateway_payment_id`; never overwrites one.
    fn backfill_gateway_payment_id<'a>(
        &'a self,
        id: Uuid,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, bool>;

    /// Applies `update` iff the row exists and, when `expected` is given,
    /// still has that status. Returns whether a row was written.
    fn conditional_update_status<'a>(
        &'a self,
        id: Uuid,
        expected: Option<PaymentStatus>,
        update: &'a StatusUpdate,
    ) -> BoxFuture<'a, bool>;

    fn update_pix<'a>(&'a self, id: Uuid, pix: &'a PixData) -> BoxFuture<'a, ()>;

    /// Most recent provider ids, for not-found diagnostics.
    fn recent_gateway_payment_ids(&self, limit: i64) -> BoxFuture<'_, Vec<String>>;

    /// Pending/processing payments of real providers created before
    /// `older_than`, least recently touched first. Mock payments never
    /// appear: nothing outside the process can settle them.
    fn find_stale_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> BoxFuture<'_, Vec<Payment>>;

    /// Bumps `updated_at` so a payment that was just swept moves to the back
    /// of the stale queue.
    fn mark_swept(&self, id: Uuid) -> BoxFuture<'_, ()>;
}
