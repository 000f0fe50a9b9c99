use {
    crate::domain::{
        BoxFuture,
        error::PaymentError,
        gateway::PixData,
        payment::{Gateway, NewPayment, Payment, PaymentStatus, StatusUpdate},
        repository::PaymentRepository,
    },
    chrono::{DateTime, Utc},
    std::sync::{Mutex, MutexGuard},
    uuid::Uuid,
};

/// Process-local repository for tests and database-less runs. One lock
/// around the whole table gives the same single-row atomicity the
/// Postgres conditional UPDATE does.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    rows: Mutex<Vec<Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Payment> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Payment>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_sync(&self, new: &NewPayment) -> Result<Payment, PaymentError> {
        let mut rows = self.lock();
        let duplicate = rows.iter().any(|p| {
            p.id == new.id()
                || (p.gateway == new.gateway()
                    && p.gateway_payment_id.as_deref() == Some(new.gateway_payment_id()))
        });
        if duplicate {
            return Err(PaymentError::Validation(format!(
                "payment {} or provider id {} already stored",
                new.id(),
                new.gateway_payment_id()
            )));
        }
        let payment = new.to_payment(Utc::now());
        rows.push(payment.clone());
        Ok(payment)
    }

    fn find_where(&self, pred: impl Fn(&Payment) -> bool) -> Option<Payment> {
        self.lock()
            .iter()
            .filter(|p| pred(p))
            .max_by_key(|p| p.created_at)
            .cloned()
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut Payment) -> bool) -> bool {
        let mut rows = self.lock();
        match rows.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                let changed = f(p);
                if changed {
                    p.updated_at = Utc::now();
                }
                changed
            }
            None => false,
        }
    }
}

fn apply_update(p: &mut Payment, expected: Option<PaymentStatus>, update: &StatusUpdate) -> bool {
    if expected.is_some_and(|s| s != p.status) {
        return false;
    }
    p.status = update.status;
    if update.status_detail.is_some() {
        p.status_detail = update.status_detail.clone();
    }
    if update.gateway_transaction_id.is_some() {
        p.gateway_transaction_id = update.gateway_transaction_id.clone();
    }
    p.webhook_received |= update.webhook_received;
    if update.webhook_data.is_some() {
        p.webhook_data = update.webhook_data.clone();
    }
    true
}

impl PaymentRepository for InMemoryPaymentRepository {
    fn insert<'a>(&'a self, payment: &'a NewPayment) -> BoxFuture<'a, Payment> {
        Box::pin(async move { self.insert_sync(payment) })
    }

    fn find_by_id(&self, id: Uuid) -> BoxFuture<'_, Option<Payment>> {
        Box::pin(async move { Ok(self.find_where(|p| p.id == id)) })
    }

    fn find_by_gateway_payment_id<'a>(
        &'a self,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>> {
        Box::pin(async move {
            Ok(self.find_where(|p| p.gateway_payment_id.as_deref() == Some(gateway_payment_id)))
        })
    }

    fn find_by_gateway_transaction_id<'a>(
        &'a self,
        gateway_transaction_id: &'a str,
    ) -> BoxFuture<'a, Option<Payment>> {
        Box::pin(async move {
            Ok(self.find_where(|p| {
                p.gateway_transaction_id.as_deref() == Some(gateway_transaction_id)
            }))
        })
    }

    fn backfill_gateway_payment_id<'a>(
        &'a self,
        id: Uuid,
        gateway_payment_id: &'a str,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            Ok(self.modify(id, |p| {
                if p.gateway_payment_id.as_deref().is_some_and(|g| !g.is_empty()) {
                    return false;
                }
                p.gateway_payment_id = Some(gateway_payment_id.to_string());
                true
            }))
        })
    }

    fn conditional_update_status<'a>(
        &'a self,
        id: Uuid,
        expected: Option<PaymentStatus>,
        update: &'a StatusUpdate,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move { Ok(self.modify(id, |p| apply_update(p, expected, update))) })
    }

    fn update_pix<'a>(&'a self, id: Uuid, pix: &'a PixData) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.modify(id, |p| {
                p.pix_code = Some(pix.code.clone());
                p.pix_qr_code_base64 = pix.qr_code_base64.clone();
                p.pix_expires_at = pix.expires_at;
                true
            });
            Ok(())
        })
    }

    fn recent_gateway_payment_ids(&self, limit: i64) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut rows = self.all();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows
                .into_iter()
                .filter_map(|p| p.gateway_payment_id)
                .take(usize::try_from(limit).unwrap_or(0))
                .collect())
        })
    }

    fn find_stale_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> BoxFuture<'_, Vec<Payment>> {
        Box::pin(async move {
            let mut stale: Vec<Payment> = self
                .all()
                .into_iter()
                .filter(|p| {
                    p.gateway != Gateway::Mock
                        && p.status.is_unsettled()
                        && p.created_at < older_than
                })
                .collect();
            stale.sort_by_key(|p| p.updated_at);
            stale.truncate(usize::try_from(limit).unwrap_or(0));
            Ok(stale)
        })
    }

    fn mark_swept(&self, id: Uuid) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.modify(id, |_| true);
            Ok(())
        })
    }
}
