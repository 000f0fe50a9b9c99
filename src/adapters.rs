pub mod asaas;
pub mod cardwallet;
pub mod http;
pub mod mock;
pub mod registry;
