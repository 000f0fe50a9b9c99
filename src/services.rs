pub mod hooks;
pub mod orchestrator;
pub mod reconciler;
pub mod refund;
pub mod sweeper;
