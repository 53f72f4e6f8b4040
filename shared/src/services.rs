pub mod dynamodb_service;
pub mod queue_service;

pub use dynamodb_service::*;
pub use queue_service::*;
