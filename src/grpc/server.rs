//! gRPC server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{error, info};

use super::proto::rate_limit_service_server::RateLimitServiceServer;
use super::service::RateLimitServiceImpl;
use crate::error::{Result, VotegateError};
use crate::ratelimit::{ExclusionList, RateLimiter, RateLimiterBackend};

/// gRPC server for the rate limit service.
pub struct GrpcServer<R: RateLimiterBackend + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    rate_limiter: Arc<R>,
    /// Paths that bypass the limiter
    exclusions: Arc<ExclusionList>,
}

impl GrpcServer<RateLimiter> {
    /// Create a new gRPC server around the in-memory rate limiter.
    pub fn new(addr: SocketAddr, rate_limiter: Arc<RateLimiter>, exclusions: ExclusionList) -> Self {
        Self::with_backend(addr, rate_limiter, exclusions)
    }
}

impl<R: RateLimiterBackend + 'static> GrpcServer<R> {
    /// Create a new gRPC server around any rate limiter backend.
    pub fn with_backend(addr: SocketAddr, rate_limiter: Arc<R>, exclusions: ExclusionList) -> Self {
        Self {
            addr,
            rate_limiter,
            exclusions: Arc::new(exclusions),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the gRPC server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let service = RateLimitServiceImpl::new(self.rate_limiter, self.exclusions);

        info!(
            addr = %self.addr,
            "Starting gRPC server for RateLimitService with graceful shutdown"
        );

        Server::builder()
            .add_service(RateLimitServiceServer::new(service))
            .serve_with_shutdown(self.addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "gRPC server failed");
                VotegateError::Grpc(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{LimiterSettings, PolicyTable, SystemClock};

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(
            PolicyTable::default(),
            LimiterSettings::default(),
            Arc::new(SystemClock),
        ));
        let server = GrpcServer::new(addr, rate_limiter, ExclusionList::default());
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown_signal() {
        let addr: SocketAddr = "127.0.0.1:18961".parse().unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(
            PolicyTable::default(),
            LimiterSettings::default(),
            Arc::new(SystemClock),
        ));
        let server = GrpcServer::new(addr, rate_limiter, ExclusionList::default());

        let result = server
            .serve_with_shutdown(tokio::time::sleep(std::time::Duration::from_millis(50)))
            .await;
        assert!(result.is_ok());
    }
}
