//! Order execution layer: precision handling and gateway

pub mod gateway;
pub mod precision;

pub use gateway::{OrderGateway, RetryPolicy};
pub use precision::PrecisionResolver;
