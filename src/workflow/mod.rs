pub mod part_flow;
pub mod retry_coordinator;

pub use part_flow::PartFlow;
pub use retry_coordinator::RetryCoordinator;
