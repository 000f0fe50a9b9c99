//! Contracts this crate calls but does not implement the systems behind:
//! the storefront's orders, user notifications, and realtime fan-out.

use {
    super::BoxFuture,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

pub const ORDER_CONFIRMED: &str = "confirmed";
pub const PAYMENT_UPDATED_EVENT: &str = "payment:updated";

pub fn user_channel(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

pub trait OrderService: Send + Sync {
    fn set_order_status<'a>(&'a self, order_id: Uuid, status: &'a str) -> BoxFuture<'a, ()>;

    /// The buyer that owns the order, if the order exists.
    fn order_owner(&self, order_id: Uuid) -> BoxFuture<'_, Option<Uuid>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentPending,
    PaymentApproved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "payment_pending",
            Self::PaymentApproved => "payment_approved",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

pub trait NotificationService: Send + Sync {
    fn create_notification<'a>(&'a self, notification: &'a NewNotification) -> BoxFuture<'a, Uuid>;

    /// Unread notifications of `kind` whose data references `payment_id`.
    fn unread_notification_ids(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Vec<Uuid>>;

    fn mark_notifications_read<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, ()>;
}

pub trait RealtimePublisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a str,
        payload: &'a serde_json::Value,
    ) -> BoxFuture<'a, ()>;
}
