pub mod notification_repo;
pub mod order_repo;
pub mod payment_repo;
