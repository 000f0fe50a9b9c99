pub mod billing;
pub mod collaborators;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod id;
pub mod money;
pub mod payment;
pub mod repository;
pub mod status;

use std::{future::Future, pin::Pin};

/// Boxed future returned by every port so the traits stay object-safe.
pub type BoxFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, error::PaymentError>> + Send + 'a>>;
