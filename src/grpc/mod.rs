//! gRPC decision service consumed by the web tier.

pub mod proto;
mod server;
mod service;

pub use server::GrpcServer;
pub use service::RateLimitServiceImpl;

// Re-export commonly used types
pub use proto::{
    rate_limit_service_server::RateLimitServiceServer, Code, HeaderValue, RateLimitRequest,
    RateLimitResponse, RecordResponse,
};
